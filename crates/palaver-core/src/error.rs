// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Palaver operator console core.

use thiserror::Error;

/// The primary error type used across the Palaver workspace.
#[derive(Debug, Error)]
pub enum PalaverError {
    /// Configuration errors (invalid TOML, missing required fields, bad URLs).
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport errors (connection refused, DNS failure, malformed response body).
    #[error("http error: {message}")]
    Http {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A non-2xx REST response, surfaced verbatim to the caller.
    ///
    /// The gateway does not interpret business-level errors; `body` carries
    /// whatever the server sent.
    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Push transport errors (bad endpoint URL, socket handshake failure).
    #[error("push error: {message}")]
    Push { message: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PalaverError {
    /// True if this is an authorization failure (HTTP 401).
    ///
    /// A 401 surfaced from the gateway means the refresh-and-retry protocol
    /// already ran and failed; callers should treat it as a forced logout.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, PalaverError::Api { status: 401, .. })
    }
}
