// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock AI provider and factory with scripted replies.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use convoy_core::{
    AgentRecord, AiProvider, ContextTurn, ConvoyError, ProviderFactory,
};

/// One recorded `generate_reply` invocation.
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub message: String,
    pub system_prompt: Option<String>,
    pub context_len: usize,
}

/// Provider returning queued replies and recording every call.
#[derive(Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<ProviderCall>>,
    fail: AtomicBool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply; replies are consumed in order. With the queue empty,
    /// `generate_reply` answers `"mock reply"`.
    pub async fn queue_reply(&self, reply: &str) {
        self.replies.lock().await.push_back(reply.to_string());
    }

    /// Make `generate_reply` fail until cleared.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl AiProvider for MockProvider {
    async fn generate_reply(
        &self,
        message: &str,
        system_prompt: Option<&str>,
        context: &[ContextTurn],
    ) -> Result<String, ConvoyError> {
        self.calls.lock().await.push(ProviderCall {
            message: message.to_string(),
            system_prompt: system_prompt.map(String::from),
            context_len: context.len(),
        });
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConvoyError::provider("scripted provider failure"));
        }
        let reply = self.replies.lock().await.pop_front();
        Ok(reply.unwrap_or_else(|| "mock reply".to_string()))
    }
}

/// Factory handing out one shared [`MockProvider`], recording which agents
/// and keys it was asked for.
pub struct MockProviderFactory {
    provider: Arc<MockProvider>,
    created_for: std::sync::Mutex<Vec<(String, String)>>,
}

impl MockProviderFactory {
    pub fn new(provider: Arc<MockProvider>) -> Self {
        Self {
            provider,
            created_for: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// (agent id, api key) pairs `create` was called with.
    pub fn created_for(&self) -> Vec<(String, String)> {
        self.created_for.lock().unwrap().clone()
    }
}

impl ProviderFactory for MockProviderFactory {
    fn create(
        &self,
        agent: &AgentRecord,
        api_key: &str,
    ) -> Result<Arc<dyn AiProvider>, ConvoyError> {
        self.created_for
            .lock()
            .unwrap()
            .push((agent.id.clone(), api_key.to_string()));
        Ok(Arc::clone(&self.provider) as Arc<dyn AiProvider>)
    }
}
