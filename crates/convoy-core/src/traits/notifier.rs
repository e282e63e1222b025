// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal event fan-out seam (dashboards, operator UIs, audit taps).

use async_trait::async_trait;

use crate::error::ConvoyError;
use crate::types::RelayEvent;

/// Publishes relay events to in-process subscribers.
///
/// Publishing must never block message flow; implementations with no
/// subscribers succeed silently.
#[async_trait]
pub trait InternalNotifier: Send + Sync {
    async fn publish(&self, event: RelayEvent) -> Result<(), ConvoyError>;
}
