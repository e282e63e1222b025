// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared domain types for the Convoy relay.
//!
//! These are the records exchanged between the store, the fleet, the
//! conversation manager, and the dispatcher. They are plain data; all
//! behavior lives in the crates that operate on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ConversationStatus {
    Open,
    Closed,
}

/// Priority attached to a conversation's support ticket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Role of a conversation participant or message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParticipantRole {
    User,
    Ai,
}

/// Which AI backend an agent record points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ProviderKind {
    #[serde(rename = "OPENAI")]
    #[strum(serialize = "OPENAI")]
    OpenAi,
    Groq,
}

/// A member of a conversation, with join/leave timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: String,
    pub role: ParticipantRole,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

/// Routing metadata captured when a conversation is opened or reopened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMetadata {
    pub team_id: String,
    pub agent_title: String,
    pub tenant_id: String,
    pub ai_model: Option<String>,
}

/// A support conversation between an end user and the tenant's AI agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub status: ConversationStatus,
    /// Human-facing ticket identifier, `TK-YYYYMM` plus a random suffix.
    /// Preserved across close/reopen cycles.
    pub ticket_number: String,
    pub priority: TicketPriority,
    pub tenant_id: String,
    pub participants: Vec<Participant>,
    /// Number of times this conversation has been reopened after a close.
    pub reopen_count: u32,
    /// When false, the dispatcher skips this conversation silently.
    pub ai_enabled: bool,
    pub last_activity: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
    pub metadata: Option<ConversationMetadata>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Whether the given user is a participant (regardless of leave stamps).
    pub fn has_participant(&self, participant_id: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.participant_id == participant_id)
    }
}

/// A persisted chat message, user-authored or AI-authored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    /// None for user messages persisted before a conversation exists.
    pub conversation_id: Option<String>,
    pub sender: ParticipantRole,
    pub sender_id: String,
    pub recipient_id: String,
    pub text: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A tenant's registration row: one external chat connection per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    pub tenant_id: String,
    pub display_name: String,
    pub server_url: String,
    pub team_id: String,
    pub agent_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a new tenant connection.
#[derive(Debug, Clone)]
pub struct TenantDescriptor {
    pub tenant_id: String,
    pub server_url: String,
    pub team_id: String,
    pub agent_id: String,
}

impl TenantDescriptor {
    /// Build the stored record. The display name is the first segment of the
    /// tenant id before any `-` separator.
    pub fn into_record(self, now: DateTime<Utc>) -> TenantRecord {
        let display_name = self
            .tenant_id
            .split('-')
            .next()
            .unwrap_or(self.tenant_id.as_str())
            .to_string();
        TenantRecord {
            tenant_id: self.tenant_id,
            display_name,
            server_url: self.server_url,
            team_id: self.team_id,
            agent_id: self.agent_id,
            active: true,
            created_at: now,
        }
    }
}

/// An AI agent configuration owned by a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub title: String,
    pub provider: ProviderKind,
    /// Model override; providers fall back to their own default when None.
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub team_id: String,
    pub system_prompt: String,
    pub credential_id: String,
}

/// An API credential referenced by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub key: String,
}

/// Billing state of the account that owns a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamOwner {
    pub trial_end_date: Option<DateTime<Utc>>,
    pub subscription_status: Option<String>,
}

impl TeamOwner {
    /// True when the trial has ended and no active subscription covers the team.
    pub fn trial_expired(&self, now: DateTime<Utc>) -> bool {
        let trial_ended = self.trial_end_date.is_some_and(|end| end < now);
        let subscribed = self.subscription_status.as_deref() == Some("active");
        trial_ended && !subscribed
    }
}

/// A message arriving from a tenant's external chat connection.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub tenant_id: String,
    pub sender_id: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// One prior turn handed to a provider as conversation context.
#[derive(Debug, Clone)]
pub struct ContextTurn {
    pub role: ParticipantRole,
    pub text: String,
}

/// Events published on the internal notifier as messages move through the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    UserMessage {
        message_id: String,
        tenant_id: String,
        sender_id: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
    AiReply {
        message_id: String,
        conversation_id: String,
        tenant_id: String,
        recipient_id: String,
        text: String,
        agent_title: String,
        model: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl RelayEvent {
    /// The end user this event concerns, for recipient-scoped subscriptions.
    pub fn recipient(&self) -> &str {
        match self {
            RelayEvent::UserMessage { sender_id, .. } => sender_id,
            RelayEvent::AiReply { recipient_id, .. } => recipient_id,
        }
    }

    /// The tenant connection this event flowed through.
    pub fn tenant_id(&self) -> &str {
        match self {
            RelayEvent::UserMessage { tenant_id, .. } => tenant_id,
            RelayEvent::AiReply { tenant_id, .. } => tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_and_priority_round_trip_uppercase() {
        assert_eq!(ConversationStatus::Open.to_string(), "OPEN");
        assert_eq!(ConversationStatus::from_str("CLOSED").unwrap(), ConversationStatus::Closed);
        assert_eq!(TicketPriority::default(), TicketPriority::Medium);
        assert_eq!(TicketPriority::High.to_string(), "HIGH");
    }

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!(ProviderKind::from_str("OPENAI").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_str("openai").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_str("Groq").unwrap(), ProviderKind::Groq);
        assert!(ProviderKind::from_str("GEMINI").is_err());
    }

    #[test]
    fn tenant_descriptor_derives_display_name() {
        let now = Utc::now();
        let record = TenantDescriptor {
            tenant_id: "acme-support-01".to_string(),
            server_url: "wss://chat.example.net".to_string(),
            team_id: "team-1".to_string(),
            agent_id: "agent-1".to_string(),
        }
        .into_record(now);
        assert_eq!(record.display_name, "acme");
        assert!(record.active);
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn trial_gate_requires_both_conditions() {
        let now = Utc::now();
        let past = now - chrono::Duration::days(3);
        let future = now + chrono::Duration::days(3);

        // Trial ended, not subscribed: expired.
        let owner = TeamOwner {
            trial_end_date: Some(past),
            subscription_status: Some("canceled".to_string()),
        };
        assert!(owner.trial_expired(now));

        // Trial ended but an active subscription covers it.
        let owner = TeamOwner {
            trial_end_date: Some(past),
            subscription_status: Some("active".to_string()),
        };
        assert!(!owner.trial_expired(now));

        // Trial still running.
        let owner = TeamOwner {
            trial_end_date: Some(future),
            subscription_status: None,
        };
        assert!(!owner.trial_expired(now));

        // No trial end date recorded at all.
        let owner = TeamOwner {
            trial_end_date: None,
            subscription_status: None,
        };
        assert!(!owner.trial_expired(now));
    }

    #[test]
    fn relay_event_serializes_with_type_tag() {
        let event = RelayEvent::UserMessage {
            message_id: "m1".to_string(),
            tenant_id: "acme-1".to_string(),
            sender_id: "user-9".to_string(),
            text: "hello".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "user_message");
        assert_eq!(event.recipient(), "user-9");
        assert_eq!(event.tenant_id(), "acme-1");
    }
}
