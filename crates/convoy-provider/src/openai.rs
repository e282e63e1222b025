// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI provider adapter.

use async_trait::async_trait;

use convoy_core::{AgentRecord, AiProvider, ContextTurn, ConvoyError};

use crate::client::{ChatClient, build_thread};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f64 = 0.5;
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct OpenAiProvider {
    client: ChatClient,
}

impl OpenAiProvider {
    /// Build a provider from an agent record, filling unset tuning fields
    /// with OpenAI defaults.
    pub fn new(api_key: &str, agent: &AgentRecord) -> Result<Self, ConvoyError> {
        let client = ChatClient::new(
            api_key,
            OPENAI_API_BASE,
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
impl AiProvider for OpenAiProvider {
    async fn generate_reply(
        &self,
        message: &str,
        system_prompt: Option<&str>,
        context: &[ContextTurn],
    ) -> Result<String, ConvoyError> {
        let thread = build_thread(message, system_prompt, context);
        self.client.chat(thread).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_core::ProviderKind;

    fn agent(model: Option<&str>) -> AgentRecord {
        AgentRecord {
            id: "agent-1".to_string(),
            title: "Support Bot".to_string(),
            provider: ProviderKind::OpenAi,
            model: model.map(String::from),
            temperature: None,
            max_tokens: None,
            team_id: "team-1".to_string(),
            system_prompt: "You are a support agent.".to_string(),
            credential_id: "cred-1".to_string(),
        }
    }

    #[test]
    fn unset_model_falls_back_to_default() {
        let provider = OpenAiProvider::new("sk-test", &agent(None)).unwrap();
        assert_eq!(provider.model(), DEFAULT_MODEL);
    }

    #[test]
    fn explicit_model_is_kept() {
        let provider = OpenAiProvider::new("sk-test", &agent(Some("gpt-4o"))).unwrap();
        assert_eq!(provider.model(), "gpt-4o");
    }
}
