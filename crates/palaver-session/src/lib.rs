// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable storage for the session credential pair.
//!
//! The access/refresh token pair lives under a single file as JSON
//! `{"access_token": ..., "refresh_token": ...}`. Writes complete before the
//! call returns, so a process restart immediately after login or logout
//! observes the new state. Storage unavailability is never fatal: a missing,
//! unreadable, or corrupt file reads as "logged out".

use std::path::{Path, PathBuf};

use palaver_core::CredentialPair;
use tracing::warn;

/// File-backed store for the current credential pair.
///
/// Construct one instance and share it; there are no process-wide globals, so
/// tests can point separate instances at separate files.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the default XDG location
    /// (`~/.config/palaver/credentials.json`).
    pub fn at_default_path() -> Self {
        let path = dirs::config_dir()
            .map(|d| d.join("palaver/credentials.json"))
            .unwrap_or_else(|| PathBuf::from(".palaver-credentials.json"));
        Self::new(path)
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored credential pair, if any.
    ///
    /// Absence, read failure, and parse failure all return `None`.
    pub fn read(&self) -> Option<CredentialPair> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(pair) => Some(pair),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "stored credentials are unreadable, treating as logged out");
                None
            }
        }
    }

    /// Replace the stored pair, durably, before returning.
    pub fn replace(&self, pair: &CredentialPair) {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(err) = std::fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %err, "failed to create credential directory");
            return;
        }
        let json = match serde_json::to_string(pair) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to serialize credentials");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %err, "failed to persist credentials");
        }
    }

    /// Remove the stored pair. Missing file is already cleared.
    pub fn clear(&self) {
        if let Err(err) = std::fs::remove_file(&self.path)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %err, "failed to remove credentials");
        }
    }
}
