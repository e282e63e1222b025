// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./convoy.toml` > `~/.config/convoy/convoy.toml` >
//! `/etc/convoy/convoy.toml` with environment variable overrides via the
//! `CONVOY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ConvoyConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/convoy/convoy.toml` (system-wide)
/// 3. `~/.config/convoy/convoy.toml` (user XDG config)
/// 4. `./convoy.toml` (local directory)
/// 5. `CONVOY_*` environment variables
pub fn load_config() -> Result<ConvoyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConvoyConfig::default()))
        .merge(Toml::file("/etc/convoy/convoy.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("convoy/convoy.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("convoy.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ConvoyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConvoyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ConvoyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConvoyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` instead of `Env::split("_")` so keys that themselves
/// contain underscores stay intact: `CONVOY_BUFFER_INITIAL_WAIT_MS` must map
/// to `buffer.initial_wait_ms`, not `buffer.initial.wait.ms`.
fn env_provider() -> Env {
    Env::prefixed("CONVOY_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("buffer_", "buffer.", 1)
            .replacen("fleet_", "fleet.", 1)
            .replacen("dispatch_", "dispatch.", 1);
        mapped.into()
    })
}
