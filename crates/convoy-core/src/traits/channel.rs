// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External chat channel seam.
//!
//! A channel is one live connection to a tenant's chat network. The fleet
//! manager owns channels; the dispatcher only sees [`OutboundDelivery`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ConvoyError;
use crate::types::{InboundMessage, TenantRecord};

/// One live connection to a tenant's external chat network.
#[async_trait]
pub trait ExternalChannel: Send + Sync {
    /// The tenant this connection belongs to.
    fn tenant_id(&self) -> &str;

    /// Wait for the next inbound message. Returns a channel error with a
    /// message containing "closed" once the connection is gone for good.
    async fn receive(&self) -> Result<InboundMessage, ConvoyError>;

    /// Deliver a text message to a user on this tenant's network.
    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<(), ConvoyError>;

    /// Tear down the connection. Idempotent.
    async fn disconnect(&self) -> Result<(), ConvoyError>;
}

/// Establishes channels for tenant records; the transport-specific piece.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self, tenant: &TenantRecord)
    -> Result<Arc<dyn ExternalChannel>, ConvoyError>;
}

/// Outbound-only view over the fleet, consumed by the dispatcher.
#[async_trait]
pub trait OutboundDelivery: Send + Sync {
    async fn send_text(
        &self,
        tenant_id: &str,
        recipient_id: &str,
        text: &str,
    ) -> Result<(), ConvoyError>;
}
