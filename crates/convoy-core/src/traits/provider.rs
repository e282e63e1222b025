// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI provider seam: reply generation and optional audio transcription.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ConvoyError;
use crate::types::{AgentRecord, ContextTurn};

/// A configured AI backend able to answer a user's combined message.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Generate a reply to `message`, given the agent's system prompt and the
    /// recent turns of the conversation (oldest first).
    async fn generate_reply(
        &self,
        message: &str,
        system_prompt: Option<&str>,
        context: &[ContextTurn],
    ) -> Result<String, ConvoyError>;

    /// Transcribe base64-encoded audio (optionally a data URL) to text.
    ///
    /// Not every backend can do this; the default refuses.
    async fn transcribe_audio(
        &self,
        _audio_base64: &str,
        _language: Option<&str>,
    ) -> Result<String, ConvoyError> {
        Err(ConvoyError::provider(
            "audio transcription is not supported by this provider",
        ))
    }
}

/// Builds a provider for an agent record plus the API key resolved for it.
pub trait ProviderFactory: Send + Sync {
    fn create(
        &self,
        agent: &AgentRecord,
        api_key: &str,
    ) -> Result<Arc<dyn AiProvider>, ConvoyError>;
}
