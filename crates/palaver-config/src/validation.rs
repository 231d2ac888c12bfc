// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as URL schemes and backoff window ordering.

use crate::diagnostic::ConfigError;
use crate::model::PalaverConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PalaverConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.api.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("api.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    let push_url = config.push.url.trim();
    if !push_url.starts_with("ws://") && !push_url.starts_with("wss://") {
        errors.push(ConfigError::Validation {
            message: format!("push.url `{push_url}` must start with ws:// or wss://"),
        });
    }

    if config.api.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "api.request_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.push.reconnect_initial_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "push.reconnect_initial_secs must be at least 1".to_string(),
        });
    }

    if config.push.reconnect_max_secs < config.push.reconnect_initial_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "push.reconnect_max_secs ({}) must be >= push.reconnect_initial_secs ({})",
                config.push.reconnect_max_secs, config.push.reconnect_initial_secs
            ),
        });
    }

    if config.push.max_attempts == Some(0) {
        errors.push(ConfigError::Validation {
            message: "push.max_attempts must be at least 1 when set".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.console.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "console.log_level `{}` is not one of: {}",
                config.console.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.console.page_size == 0 || config.console.page_size > 100 {
        errors.push(ConfigError::Validation {
            message: format!(
                "console.page_size must be between 1 and 100, got {}",
                config.console.page_size
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&PalaverConfig::default()).is_ok());
    }

    #[test]
    fn rejects_non_websocket_push_url() {
        let mut config = PalaverConfig::default();
        config.push.url = "http://example.com/ws".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("push.url"));
    }

    #[test]
    fn rejects_inverted_backoff_window() {
        let mut config = PalaverConfig::default();
        config.push.reconnect_initial_secs = 120;
        config.push.reconnect_max_secs = 60;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("reconnect_max_secs"));
    }

    #[test]
    fn collects_all_errors_without_failing_fast() {
        let mut config = PalaverConfig::default();
        config.api.base_url = "ftp://nope".to_string();
        config.console.log_level = "loud".to_string();
        config.console.page_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
