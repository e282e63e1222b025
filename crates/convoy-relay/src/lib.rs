// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The relay pipeline loop.
//!
//! Consumes the fleet's shared inbound stream and, per message: persists
//! the raw user message, publishes the user-message event, feeds the
//! debounce buffer, and hands a released combined burst to the AI
//! dispatcher. Each message is handled on its own task so one slow
//! dispatch never stalls the stream.
//!
//! Dispatch failures are terminal for that burst: they are logged and the
//! user simply receives no reply. The loop itself only stops on shutdown.

pub mod notify;
pub mod shutdown;

pub use notify::BroadcastNotifier;
pub use shutdown::install_signal_handler;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use convoy_buffer::MessageBuffer;
use convoy_core::{
    ConvoyError, InboundMessage, InternalNotifier, MessageRecord, ParticipantRole, RelayEvent,
    StoreAdapter,
};
use convoy_dispatch::AiDispatcher;

/// Shared collaborators of the relay pipeline.
pub struct RelayContext {
    pub store: Arc<dyn StoreAdapter>,
    pub notifier: Arc<dyn InternalNotifier>,
    pub buffer: MessageBuffer,
    pub dispatcher: Arc<AiDispatcher>,
}

pub struct RelayLoop {
    inbound: mpsc::Receiver<InboundMessage>,
    ctx: Arc<RelayContext>,
}

impl RelayLoop {
    pub fn new(inbound: mpsc::Receiver<InboundMessage>, ctx: Arc<RelayContext>) -> Self {
        Self { inbound, ctx }
    }

    /// Run until cancelled or until every inbound sender is gone.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("relay loop started");
        loop {
            tokio::select! {
                maybe_message = self.inbound.recv() => {
                    match maybe_message {
                        Some(message) => {
                            let ctx = Arc::clone(&self.ctx);
                            tokio::spawn(handle_inbound(ctx, message));
                        }
                        None => {
                            info!("inbound stream ended");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("relay loop stopping");
                    break;
                }
            }
        }
        // Pending bursts cannot flush once the loop is gone; resolve their
        // callers instead of leaving them hanging.
        self.ctx.buffer.clear_all().await;
    }
}

async fn handle_inbound(ctx: Arc<RelayContext>, message: InboundMessage) {
    let record = MessageRecord {
        id: Uuid::new_v4().to_string(),
        conversation_id: None,
        sender: ParticipantRole::User,
        sender_id: message.sender_id.clone(),
        recipient_id: message.tenant_id.clone(),
        text: message.text.clone(),
        metadata: None,
        created_at: message.received_at,
    };
    if let Err(e) = ctx.store.insert_message(&record).await {
        // Persistence is an audit trail; the reply path still runs.
        error!(
            tenant = %message.tenant_id,
            user = %message.sender_id,
            error = %e,
            "failed to persist inbound message"
        );
    }

    let event = RelayEvent::UserMessage {
        message_id: record.id.clone(),
        tenant_id: message.tenant_id.clone(),
        sender_id: message.sender_id.clone(),
        text: message.text.clone(),
        timestamp: message.received_at,
    };
    if let Err(e) = ctx.notifier.publish(event).await {
        warn!(error = %e, "failed to publish user message event");
    }

    let Some(combined) = ctx
        .buffer
        .add_message(&message.sender_id, &message.tenant_id, &message.text)
        .await
    else {
        // Absorbed into a later caller's flush, or cleared.
        return;
    };

    match ctx
        .dispatcher
        .dispatch(&message.tenant_id, &message.sender_id, &combined)
        .await
    {
        Ok(Some(outcome)) => {
            debug!(
                conversation = %outcome.conversation_id,
                tenant = %message.tenant_id,
                user = %message.sender_id,
                "AI reply dispatched"
            );
        }
        Ok(None) => {
            debug!(
                tenant = %message.tenant_id,
                user = %message.sender_id,
                "dispatch skipped"
            );
        }
        Err(ConvoyError::TrialExpired { team_id }) => {
            warn!(
                team = %team_id,
                tenant = %message.tenant_id,
                "dispatch blocked: trial expired without active subscription"
            );
        }
        Err(e) => {
            error!(
                tenant = %message.tenant_id,
                user = %message.sender_id,
                error = %e,
                "dispatch failed, user receives no reply"
            );
        }
    }
}
