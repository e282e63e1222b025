// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`StoreAdapter`] implementation.
//!
//! The relay treats persistence as a deployment concern behind the
//! `StoreAdapter` seam; this crate provides the reference implementation the
//! binary starts with and the test suites run against. All collections live
//! behind one mutex, so every operation is a short critical section.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use convoy_core::{
    AgentRecord, Conversation, ConversationStatus, ConvoyError, Credential, MessageRecord,
    ParticipantRole, StoreAdapter, TeamOwner, TenantRecord,
};

#[derive(Default)]
struct Inner {
    conversations: HashMap<String, Conversation>,
    messages: Vec<MessageRecord>,
    tenants: HashMap<String, TenantRecord>,
    agents: HashMap<String, AgentRecord>,
    credentials: HashMap<String, Credential>,
    team_owners: HashMap<String, TeamOwner>,
}

/// In-memory store; cheap to construct, shared behind `Arc<dyn StoreAdapter>`.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an agent record (fixture/setup helper).
    pub async fn put_agent(&self, agent: AgentRecord) {
        self.inner.lock().await.agents.insert(agent.id.clone(), agent);
    }

    /// Seed a credential record (fixture/setup helper).
    pub async fn put_credential(&self, credential: Credential) {
        self.inner
            .lock()
            .await
            .credentials
            .insert(credential.id.clone(), credential);
    }

    /// Seed a team owner's billing state (fixture/setup helper).
    pub async fn put_team_owner(&self, team_id: &str, owner: TeamOwner) {
        self.inner
            .lock()
            .await
            .team_owners
            .insert(team_id.to_string(), owner);
    }

    /// Total number of persisted messages. Debug accessor.
    pub async fn message_count(&self) -> usize {
        self.inner.lock().await.messages.len()
    }
}

fn involves_user(conversation: &Conversation, user_id: &str) -> bool {
    conversation
        .participants
        .iter()
        .any(|p| p.role == ParticipantRole::User && p.participant_id == user_id)
}

#[async_trait]
impl StoreAdapter for InMemoryStore {
    async fn find_open_conversation(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Conversation>, ConvoyError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .conversations
            .values()
            .filter(|c| {
                c.status == ConversationStatus::Open
                    && c.tenant_id == tenant_id
                    && involves_user(c, user_id)
            })
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn find_latest_closed_conversation(
        &self,
        user_id: &str,
    ) -> Result<Option<Conversation>, ConvoyError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .conversations
            .values()
            .filter(|c| c.status == ConversationStatus::Closed && involves_user(c, user_id))
            .max_by_key(|c| c.closed_at.unwrap_or(c.created_at))
            .cloned())
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ConvoyError> {
        Ok(self.inner.lock().await.conversations.get(id).cloned())
    }

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), ConvoyError> {
        self.inner
            .lock()
            .await
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<(), ConvoyError> {
        let mut inner = self.inner.lock().await;
        match inner.conversations.get_mut(&conversation.id) {
            Some(existing) => {
                *existing = conversation.clone();
                Ok(())
            }
            None => Err(ConvoyError::Internal(format!(
                "update of unknown conversation {}",
                conversation.id
            ))),
        }
    }

    async fn insert_message(&self, message: &MessageRecord) -> Result<(), ConvoyError> {
        self.inner.lock().await.messages.push(message.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, ConvoyError> {
        let inner = self.inner.lock().await;
        let mut messages: Vec<MessageRecord> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id.as_deref() == Some(conversation_id))
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.split_off(skip))
    }

    async fn list_active_tenants(&self) -> Result<Vec<TenantRecord>, ConvoyError> {
        let inner = self.inner.lock().await;
        let mut tenants: Vec<TenantRecord> =
            inner.tenants.values().filter(|t| t.active).cloned().collect();
        tenants.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        Ok(tenants)
    }

    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantRecord>, ConvoyError> {
        Ok(self.inner.lock().await.tenants.get(tenant_id).cloned())
    }

    async fn create_tenant(&self, tenant: &TenantRecord) -> Result<(), ConvoyError> {
        self.inner
            .lock()
            .await
            .tenants
            .insert(tenant.tenant_id.clone(), tenant.clone());
        Ok(())
    }

    async fn set_tenant_active(&self, tenant_id: &str, active: bool) -> Result<(), ConvoyError> {
        let mut inner = self.inner.lock().await;
        match inner.tenants.get_mut(tenant_id) {
            Some(tenant) => {
                tenant.active = active;
                Ok(())
            }
            None => Err(ConvoyError::Internal(format!(
                "unknown tenant {tenant_id}"
            ))),
        }
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>, ConvoyError> {
        Ok(self.inner.lock().await.agents.get(agent_id).cloned())
    }

    async fn get_credential(
        &self,
        credential_id: &str,
    ) -> Result<Option<Credential>, ConvoyError> {
        Ok(self.inner.lock().await.credentials.get(credential_id).cloned())
    }

    async fn get_team_owner(&self, team_id: &str) -> Result<Option<TeamOwner>, ConvoyError> {
        Ok(self.inner.lock().await.team_owners.get(team_id).cloned())
    }
}
