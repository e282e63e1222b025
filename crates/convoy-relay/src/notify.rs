// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast-based implementation of [`InternalNotifier`].
//!
//! Relay events fan out to in-process subscribers over a tokio broadcast
//! channel. Publishing with no subscribers succeeds; slow subscribers that
//! fall behind the channel capacity lose the oldest events, which is
//! acceptable for a UI/monitoring feed.

use async_trait::async_trait;
use tokio::sync::broadcast;

use convoy_core::{ConvoyError, InternalNotifier, RelayEvent};

pub struct BroadcastNotifier {
    tx: broadcast::Sender<RelayEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to every relay event.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.tx.subscribe()
    }

    /// Subscribe to events concerning one user. Events for other recipients
    /// are filtered out by the returned stream's `recv` wrapper.
    pub fn subscribe_for(&self, recipient_id: &str) -> RecipientEvents {
        RecipientEvents {
            rx: self.tx.subscribe(),
            recipient_id: recipient_id.to_string(),
        }
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl InternalNotifier for BroadcastNotifier {
    async fn publish(&self, event: RelayEvent) -> Result<(), ConvoyError> {
        // send only fails with zero subscribers, which is not an error here.
        let _ = self.tx.send(event);
        Ok(())
    }
}

/// Recipient-scoped view over the event stream.
pub struct RecipientEvents {
    rx: broadcast::Receiver<RelayEvent>,
    recipient_id: String,
}

impl RecipientEvents {
    /// The next event addressed to this recipient.
    ///
    /// Returns `None` once the notifier is dropped. Lagged events are
    /// skipped.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.recipient() == self.recipient_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
