// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence seam for conversations, messages, tenants, and billing records.

use async_trait::async_trait;

use crate::error::ConvoyError;
use crate::types::{
    AgentRecord, Conversation, Credential, MessageRecord, TeamOwner, TenantRecord,
};

/// Backing store for everything the relay reads and writes.
///
/// The surface is plain CRUD; callers own all invariants. In particular
/// "at most one OPEN conversation per (user, tenant)" is maintained by the
/// conversation manager, not enforced here.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Find the OPEN conversation this user has with this tenant, if any.
    async fn find_open_conversation(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Conversation>, ConvoyError>;

    /// Find the user's most recently closed conversation, if any.
    async fn find_latest_closed_conversation(
        &self,
        user_id: &str,
    ) -> Result<Option<Conversation>, ConvoyError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ConvoyError>;

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), ConvoyError>;

    /// Replace the stored conversation with the given state, keyed by id.
    async fn update_conversation(&self, conversation: &Conversation) -> Result<(), ConvoyError>;

    async fn insert_message(&self, message: &MessageRecord) -> Result<(), ConvoyError>;

    /// The most recent messages of a conversation, oldest first.
    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, ConvoyError>;

    /// All tenants currently marked active; the reconciliation source of truth.
    async fn list_active_tenants(&self) -> Result<Vec<TenantRecord>, ConvoyError>;

    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantRecord>, ConvoyError>;

    async fn create_tenant(&self, tenant: &TenantRecord) -> Result<(), ConvoyError>;

    async fn set_tenant_active(&self, tenant_id: &str, active: bool) -> Result<(), ConvoyError>;

    async fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>, ConvoyError>;

    async fn get_credential(
        &self,
        credential_id: &str,
    ) -> Result<Option<Credential>, ConvoyError>;

    /// Billing state of the account owning the given team.
    async fn get_team_owner(&self, team_id: &str) -> Result<Option<TeamOwner>, ConvoyError>;
}
