// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider selection keyed on the agent's [`ProviderKind`].

use std::sync::Arc;

use convoy_core::{AgentRecord, AiProvider, ConvoyError, ProviderFactory, ProviderKind};

use crate::groq::GroqProvider;
use crate::openai::OpenAiProvider;

/// Builds HTTP-backed providers for agent records.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpProviderFactory;

impl ProviderFactory for HttpProviderFactory {
    fn create(
        &self,
        agent: &AgentRecord,
        api_key: &str,
    ) -> Result<Arc<dyn AiProvider>, ConvoyError> {
        match agent.provider {
            ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(api_key, agent)?)),
            ProviderKind::Groq => Ok(Arc::new(GroqProvider::new(api_key, agent)?)),
        }
    }
}
