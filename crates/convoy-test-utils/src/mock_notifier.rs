// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock internal notifier recording published events.

use async_trait::async_trait;
use tokio::sync::Mutex;

use convoy_core::{ConvoyError, InternalNotifier, RelayEvent};

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<RelayEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<RelayEvent> {
        self.events.lock().await.clone()
    }

    pub async fn event_count(&self) -> usize {
        self.events.lock().await.len()
    }
}

#[async_trait]
impl InternalNotifier for RecordingNotifier {
    async fn publish(&self, event: RelayEvent) -> Result<(), ConvoyError> {
        self.events.lock().await.push(event);
        Ok(())
    }
}
