// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the operator console.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use palaver_store::ListOrder;
use serde::{Deserialize, Serialize};

/// Top-level Palaver configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PalaverConfig {
    /// REST backend settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Push event stream settings.
    #[serde(default)]
    pub push: PushConfig,

    /// Credential persistence settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Console behavior settings.
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// REST backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the platform REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Push event stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    /// Websocket endpoint of the dialog event stream.
    #[serde(default = "default_push_url")]
    pub url: String,

    /// Handshake timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Delay before the first reconnect attempt, in seconds. Doubles per
    /// consecutive failure up to `reconnect_max_secs`.
    #[serde(default = "default_reconnect_initial_secs")]
    pub reconnect_initial_secs: u64,

    /// Cap on the reconnect delay, in seconds.
    #[serde(default = "default_reconnect_max_secs")]
    pub reconnect_max_secs: u64,

    /// Give up after this many consecutive failed attempts. `None` retries
    /// for as long as the session holds a token.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: default_push_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_initial_secs: default_reconnect_initial_secs(),
            reconnect_max_secs: default_reconnect_max_secs(),
            max_attempts: None,
        }
    }
}

fn default_push_url() -> String {
    "ws://127.0.0.1:8000/ws/dialogs".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_reconnect_initial_secs() -> u64 {
    3
}

fn default_reconnect_max_secs() -> u64 {
    60
}

/// Credential persistence configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Override for the credential file location. `None` uses the XDG
    /// default (`~/.config/palaver/credentials.json`).
    #[serde(default)]
    pub credentials_path: Option<String>,
}

/// Console behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where a dialog lands in its list after an update.
    #[serde(default)]
    pub list_order: ListOrder,

    /// Dialogs fetched per page when listing.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            list_order: ListOrder::default(),
            page_size: default_page_size(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_page_size() -> u32 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = PalaverConfig::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.push.reconnect_initial_secs, 3);
        assert_eq!(config.push.reconnect_max_secs, 60);
        assert!(config.push.max_attempts.is_none());
        assert_eq!(config.console.log_level, "info");
        assert_eq!(config.console.list_order, ListOrder::MoveToFront);
    }
}
