// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-zero debounce windows and a sane tick interval.

use crate::diagnostic::ConfigError;
use crate::model::ConvoyConfig;

const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ConvoyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "service.name must not be empty".to_string(),
        });
    }

    // Accept directive-style filters too ("convoy=debug,info"); only flag
    // plain values that are clearly not a level.
    let level = config.service.log_level.trim();
    if !level.is_empty()
        && !level.contains('=')
        && !level.contains(',')
        && !KNOWN_LOG_LEVELS.contains(&level)
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level `{level}` is not a known level (trace, debug, info, warn, error) or filter directive"
            ),
        });
    }

    if config.buffer.initial_wait_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "buffer.initial_wait_ms must be greater than zero".to_string(),
        });
    }

    if config.buffer.additional_wait_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "buffer.additional_wait_ms must be greater than zero".to_string(),
        });
    }

    if config.buffer.additional_wait_ms > config.buffer.initial_wait_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "buffer.additional_wait_ms ({}) must not exceed buffer.initial_wait_ms ({})",
                config.buffer.additional_wait_ms, config.buffer.initial_wait_ms
            ),
        });
    }

    if config.fleet.update_interval_ms < 1000 {
        errors.push(ConfigError::Validation {
            message: format!(
                "fleet.update_interval_ms must be at least 1000, got {}",
                config.fleet.update_interval_ms
            ),
        });
    }

    if config.fleet.cache_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "fleet.cache_ttl_secs must be greater than zero".to_string(),
        });
    }

    if config.dispatch.context_window == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.context_window must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = ConvoyConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_initial_wait_fails_validation() {
        let mut config = ConvoyConfig::default();
        config.buffer.initial_wait_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("initial_wait_ms"))
        ));
    }

    #[test]
    fn settle_window_longer_than_release_window_fails() {
        let mut config = ConvoyConfig::default();
        config.buffer.initial_wait_ms = 1000;
        config.buffer.additional_wait_ms = 2000;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("must not exceed"))
        ));
    }

    #[test]
    fn subsecond_tick_interval_fails() {
        let mut config = ConvoyConfig::default();
        config.fleet.update_interval_ms = 500;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("update_interval_ms"))
        ));
    }

    #[test]
    fn filter_directives_pass_log_level_check() {
        let mut config = ConvoyConfig::default();
        config.service.log_level = "convoy=debug,info".to_string();
        assert!(validate_config(&config).is_ok());

        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }
}
