// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model with strict unknown-field rejection and serde defaults.
//!
//! Every section uses `deny_unknown_fields` so typos surface as diagnostics
//! instead of silently falling back to defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the Convoy relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvoyConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Default for ConvoyConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            buffer: BufferConfig::default(),
            fleet: FleetConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Service identity and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name used in log output.
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Default tracing filter when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "convoy".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Message debounce windows.
///
/// A burst of messages from one user is held until `initial_wait_ms` of
/// silence; if messages were still arriving when the window fired, a shorter
/// `additional_wait_ms` settle window runs before the flush.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferConfig {
    #[serde(default = "default_initial_wait_ms")]
    pub initial_wait_ms: u64,
    #[serde(default = "default_additional_wait_ms")]
    pub additional_wait_ms: u64,
}

impl BufferConfig {
    pub fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    pub fn additional_wait(&self) -> Duration {
        Duration::from_millis(self.additional_wait_ms)
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            initial_wait_ms: default_initial_wait_ms(),
            additional_wait_ms: default_additional_wait_ms(),
        }
    }
}

fn default_initial_wait_ms() -> u64 {
    12_000
}

fn default_additional_wait_ms() -> u64 {
    5_000
}

/// Tenant fleet reconciliation cadence and cache freshness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetConfig {
    /// Interval between reconciliation ticks.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// How long the active-tenant list may be served from cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl FleetConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_update_interval_ms() -> u64 {
    180_000
}

fn default_cache_ttl_secs() -> u64 {
    120
}

/// AI dispatch behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Reply-style instruction appended to every agent's system prompt.
    #[serde(default = "default_system_prompt_suffix")]
    pub system_prompt_suffix: String,
    /// How many recent messages are handed to the provider as context.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            system_prompt_suffix: default_system_prompt_suffix(),
            context_window: default_context_window(),
        }
    }
}

fn default_system_prompt_suffix() -> String {
    "Keep replies short, direct, and conversational, like a chat message.".to_string()
}

fn default_context_window() -> usize {
    15
}
