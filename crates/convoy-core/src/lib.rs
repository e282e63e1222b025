// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types, errors, and adapter traits for the Convoy relay.
//!
//! Convoy bridges multi-tenant external chat connections to AI agents:
//! inbound user messages are debounced into bursts, answered by a
//! provider-backed agent, and delivered back over the tenant's connection.
//! This crate holds the vocabulary every other crate speaks: the
//! [`ConvoyError`] type, the domain records, and the seams
//! ([`StoreAdapter`], [`AiProvider`], [`ExternalChannel`],
//! [`InternalNotifier`]) the concrete crates implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ConvoyError;
pub use traits::{
    AiProvider, ChannelConnector, ExternalChannel, InternalNotifier, OutboundDelivery,
    ProviderFactory, StoreAdapter,
};
pub use types::{
    AgentRecord, ContextTurn, Conversation, ConversationMetadata, ConversationStatus, Credential,
    InboundMessage, MessageRecord, Participant, ParticipantRole, ProviderKind, RelayEvent,
    TeamOwner, TenantDescriptor, TenantRecord, TicketPriority,
};
