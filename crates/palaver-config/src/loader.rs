// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./palaver.toml` > `~/.config/palaver/palaver.toml`
//! > `/etc/palaver/palaver.toml` with environment variable overrides via the
//! `PALAVER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PalaverConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/palaver/palaver.toml` (system-wide)
/// 3. `~/.config/palaver/palaver.toml` (user XDG config)
/// 4. `./palaver.toml` (local directory)
/// 5. `PALAVER_*` environment variables
pub fn load_config() -> Result<PalaverConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PalaverConfig::default()))
        .merge(Toml::file("/etc/palaver/palaver.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("palaver/palaver.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("palaver.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<PalaverConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PalaverConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PalaverConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PalaverConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `PALAVER_API_BASE_URL` must map to
/// `api.base_url`, not `api.base.url`.
fn env_provider() -> Env {
    Env::prefixed("PALAVER_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("api_", "api.", 1)
            .replacen("push_", "push.", 1)
            .replacen("session_", "session.", 1)
            .replacen("console_", "console.", 1);
        mapped.into()
    })
}
