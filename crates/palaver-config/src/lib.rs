// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Palaver operator console.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and diagnostic error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use palaver_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("API: {}", config.api.base_url);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{ApiConfig, ConsoleConfig, PalaverConfig, PushConfig, SessionConfig};

use std::path::Path;

use tracing::debug;

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to miette diagnostics with typo suggestions
pub fn load_and_validate() -> Result<PalaverConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            debug!(api = %config.api.base_url, push = %config.push.url, "configuration loaded");
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from a specific file path and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<PalaverConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<PalaverConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_produces_suggestion() {
        let errors = load_and_validate_str("[api]\nbase_uri = \"http://x\"\n").unwrap_err();
        match &errors[0] {
            ConfigError::UnknownKey { key, suggestion, .. } => {
                assert_eq!(key, "base_uri");
                assert_eq!(suggestion.as_deref(), Some("base_url"));
            }
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn semantic_errors_surface_after_parse() {
        let errors =
            load_and_validate_str("[push]\nurl = \"http://not-a-socket\"\n").unwrap_err();
        assert!(matches!(errors[0], ConfigError::Validation { .. }));
    }
}
