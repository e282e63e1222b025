// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Groq provider adapter.
//!
//! Groq exposes an OpenAI-compatible chat surface plus a hosted Whisper
//! transcription endpoint, so this is the one provider that also implements
//! `transcribe_audio`.

use async_trait::async_trait;

use convoy_core::{AgentRecord, AiProvider, ContextTurn, ConvoyError};

use crate::client::{ChatClient, build_thread};

const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const WHISPER_MODEL: &str = "whisper-large-v3";
const DEFAULT_TEMPERATURE: f64 = 0.5;
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct GroqProvider {
    client: ChatClient,
}

impl GroqProvider {
    /// Build a provider from an agent record, filling unset tuning fields
    /// with Groq defaults.
    pub fn new(api_key: &str, agent: &AgentRecord) -> Result<Self, ConvoyError> {
        let client = ChatClient::new(
            api_key,
            GROQ_API_BASE,
            agent.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            agent.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            agent.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        )?;
        Ok(Self { client })
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }
}

#[async_trait]
impl AiProvider for GroqProvider {
    async fn generate_reply(
        &self,
        message: &str,
        system_prompt: Option<&str>,
        context: &[ContextTurn],
    ) -> Result<String, ConvoyError> {
        let thread = build_thread(message, system_prompt, context);
        self.client.chat(thread).await
    }

    async fn transcribe_audio(
        &self,
        audio_base64: &str,
        language: Option<&str>,
    ) -> Result<String, ConvoyError> {
        self.client
            .transcribe(audio_base64, language, WHISPER_MODEL)
            .await
    }
}
