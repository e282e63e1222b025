// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared across the Convoy relay crates.

use thiserror::Error;

/// The primary error type used across all Convoy adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ConvoyError {
    /// Configuration errors (missing tenant/agent/credential records, bad settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Store backend errors (lookup failure, write failure, serialization).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// External channel errors (connection failure, send failure, closed socket).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// AI provider errors (API failure, malformed response, unsupported capability).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The owning team's trial has ended and no active subscription exists.
    /// Business outcome, not a fault; dispatch stops before any provider call.
    #[error("trial expired for team {team_id} and no active subscription")]
    TrialExpired { team_id: String },

    /// Internal notification errors (event fan-out failure).
    #[error("notify error: {0}")]
    Notify(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConvoyError {
    /// Wrap an arbitrary error as a store error.
    pub fn store<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConvoyError::Store {
            source: Box::new(source),
        }
    }

    /// Build a channel error from a message alone.
    pub fn channel(message: impl Into<String>) -> Self {
        ConvoyError::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Build a provider error from a message alone.
    pub fn provider(message: impl Into<String>) -> Self {
        ConvoyError::Provider {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let err = ConvoyError::Config("tenant `acme-main` not found".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: tenant `acme-main` not found"
        );

        let err = ConvoyError::TrialExpired {
            team_id: "team-1".to_string(),
        };
        assert!(err.to_string().contains("team-1"));
        assert!(err.to_string().contains("trial expired"));
    }

    #[test]
    fn channel_error_carries_optional_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err = ConvoyError::Channel {
            message: "send failed".to_string(),
            source: Some(Box::new(io)),
        };
        assert!(std::error::Error::source(&err).is_some());

        let bare = ConvoyError::channel("socket closed");
        assert!(std::error::Error::source(&bare).is_none());
    }
}
