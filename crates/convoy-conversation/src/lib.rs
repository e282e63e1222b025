// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle management.
//!
//! A conversation is OPEN or CLOSED, carries a ticket number and priority,
//! and lists its participants (the end user and the tenant's AI agent).
//! Closing a user's conversation and having them write again reopens the
//! most recent closed one instead of starting from scratch: the ticket
//! number survives and `reopen_count` grows, so support history stays in
//! one thread.
//!
//! The manager maintains "at most one OPEN conversation per (user, tenant)"
//! by always looking up an existing OPEN conversation before creating one.
//! Lookup and create are separate store calls, so two racing writers can
//! still both create; the store does not enforce uniqueness and the race is
//! accepted.

pub mod ticket;

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use convoy_core::{
    Conversation, ConversationMetadata, ConversationStatus, ConvoyError, Participant,
    ParticipantRole, StoreAdapter, TicketPriority,
};

/// Identifier used for the AI side of every conversation.
pub const AI_PARTICIPANT_ID: &str = "ai";

pub struct ConversationManager {
    store: Arc<dyn StoreAdapter>,
}

impl ConversationManager {
    pub fn new(store: Arc<dyn StoreAdapter>) -> Self {
        Self { store }
    }

    /// The OPEN conversation for this user on this tenant, creating or
    /// reopening one if none exists.
    pub async fn ensure_open(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<Conversation, ConvoyError> {
        if let Some(open) = self.store.find_open_conversation(user_id, tenant_id).await? {
            return Ok(open);
        }
        self.create_or_reopen(user_id, tenant_id).await
    }

    /// Reopen the user's most recently closed conversation, or create a new
    /// one if they have none.
    ///
    /// Reopening preserves the ticket number and increments `reopen_count`;
    /// a new conversation gets a fresh ticket, MEDIUM priority, and the user
    /// and AI agent as participants. Both paths stamp routing metadata
    /// resolved from the tenant's agent.
    pub async fn create_or_reopen(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<Conversation, ConvoyError> {
        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| ConvoyError::Config(format!("tenant `{tenant_id}` not found")))?;
        let agent = self.store.get_agent(&tenant.agent_id).await?.ok_or_else(|| {
            ConvoyError::Config(format!(
                "agent `{}` for tenant `{tenant_id}` not found",
                tenant.agent_id
            ))
        })?;

        let now = Utc::now();
        let metadata = ConversationMetadata {
            team_id: agent.team_id.clone(),
            agent_title: agent.title.clone(),
            tenant_id: tenant_id.to_string(),
            ai_model: agent.model.clone(),
        };

        if let Some(mut conversation) =
            self.store.find_latest_closed_conversation(user_id).await?
        {
            conversation.status = ConversationStatus::Open;
            conversation.reopen_count += 1;
            conversation.tenant_id = tenant_id.to_string();
            conversation.last_activity = now;
            conversation.closed_at = None;
            conversation.closed_by = None;
            conversation.metadata = Some(metadata);
            if conversation.ticket_number.is_empty() {
                conversation.ticket_number = ticket::generate(now);
            }
            for participant in &mut conversation.participants {
                participant.left_at = None;
            }
            self.store.update_conversation(&conversation).await?;
            info!(
                conversation = %conversation.id,
                ticket = %conversation.ticket_number,
                reopen_count = conversation.reopen_count,
                "conversation reopened"
            );
            return Ok(conversation);
        }

        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            status: ConversationStatus::Open,
            ticket_number: ticket::generate(now),
            priority: TicketPriority::default(),
            tenant_id: tenant_id.to_string(),
            participants: vec![
                Participant {
                    participant_id: user_id.to_string(),
                    role: ParticipantRole::User,
                    joined_at: now,
                    left_at: None,
                },
                Participant {
                    participant_id: AI_PARTICIPANT_ID.to_string(),
                    role: ParticipantRole::Ai,
                    joined_at: now,
                    left_at: None,
                },
            ],
            reopen_count: 0,
            ai_enabled: true,
            last_activity: now,
            closed_at: None,
            closed_by: None,
            metadata: Some(metadata),
            created_at: now,
        };
        self.store.create_conversation(&conversation).await?;
        info!(
            conversation = %conversation.id,
            ticket = %conversation.ticket_number,
            tenant = %tenant_id,
            "conversation created"
        );
        Ok(conversation)
    }

    /// Close a conversation, recording who closed it and stamping every
    /// remaining participant's leave time. Closing a closed conversation is
    /// a no-op.
    pub async fn close(
        &self,
        conversation_id: &str,
        closed_by: &str,
    ) -> Result<Conversation, ConvoyError> {
        let mut conversation =
            self.store.get_conversation(conversation_id).await?.ok_or_else(|| {
                ConvoyError::Config(format!("conversation `{conversation_id}` not found"))
            })?;
        if conversation.status == ConversationStatus::Closed {
            return Ok(conversation);
        }

        let now = Utc::now();
        conversation.status = ConversationStatus::Closed;
        conversation.closed_at = Some(now);
        conversation.closed_by = Some(closed_by.to_string());
        conversation.last_activity = now;
        for participant in &mut conversation.participants {
            if participant.left_at.is_none() {
                participant.left_at = Some(now);
            }
        }
        self.store.update_conversation(&conversation).await?;
        info!(
            conversation = %conversation.id,
            closed_by = %closed_by,
            "conversation closed"
        );
        Ok(conversation)
    }

    /// Close the OPEN conversation a user has with a tenant, attributed to
    /// the user themselves. Returns `None` when there is nothing to close.
    pub async fn close_for_user(
        &self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Conversation>, ConvoyError> {
        match self.store.find_open_conversation(user_id, tenant_id).await? {
            Some(conversation) => Ok(Some(self.close(&conversation.id, user_id).await?)),
            None => Ok(None),
        }
    }

    /// Set a conversation's status directly, refreshing its activity stamp.
    ///
    /// This is the raw setter; [`ConversationManager::close`] is the proper
    /// close path (it stamps `closed_at` and participant leave times).
    pub async fn update_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> Result<Conversation, ConvoyError> {
        let mut conversation =
            self.store.get_conversation(conversation_id).await?.ok_or_else(|| {
                ConvoyError::Config(format!("conversation `{conversation_id}` not found"))
            })?;
        conversation.status = status;
        conversation.last_activity = Utc::now();
        self.store.update_conversation(&conversation).await?;
        Ok(conversation)
    }

    /// Set a conversation's ticket priority, refreshing its activity stamp.
    pub async fn update_priority(
        &self,
        conversation_id: &str,
        priority: TicketPriority,
    ) -> Result<Conversation, ConvoyError> {
        let mut conversation =
            self.store.get_conversation(conversation_id).await?.ok_or_else(|| {
                ConvoyError::Config(format!("conversation `{conversation_id}` not found"))
            })?;
        conversation.priority = priority;
        conversation.last_activity = Utc::now();
        self.store.update_conversation(&conversation).await?;
        Ok(conversation)
    }
}
