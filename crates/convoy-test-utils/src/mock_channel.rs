// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock external channel and connector.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, mpsc};

use convoy_core::{ChannelConnector, ConvoyError, ExternalChannel, InboundMessage, TenantRecord};

/// Scripted external channel: inbound messages are pushed by the test,
/// outbound sends are recorded.
pub struct MockChannel {
    tenant_id: String,
    inbound_tx: Mutex<Option<mpsc::Sender<InboundMessage>>>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl MockChannel {
    pub fn new(tenant_id: &str) -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            tenant_id: tenant_id.to_string(),
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Inject an inbound message as if the external network delivered it.
    pub async fn push_inbound(&self, sender_id: &str, text: &str) {
        let tx = self.inbound_tx.lock().await;
        if let Some(tx) = tx.as_ref() {
            let _ = tx
                .send(InboundMessage {
                    tenant_id: self.tenant_id.clone(),
                    sender_id: sender_id.to_string(),
                    text: text.to_string(),
                    received_at: Utc::now(),
                })
                .await;
        }
    }

    /// Everything sent through this channel, as (recipient, text) pairs.
    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn is_disconnected(&self) -> bool {
        self.inbound_tx.lock().await.is_none()
    }
}

#[async_trait]
impl ExternalChannel for MockChannel {
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    async fn receive(&self) -> Result<InboundMessage, ConvoyError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| ConvoyError::channel("connection closed"))
    }

    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<(), ConvoyError> {
        self.sent
            .lock()
            .await
            .push((recipient_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConvoyError> {
        // Dropping the sender makes receive() report a closed connection.
        self.inbound_tx.lock().await.take();
        Ok(())
    }
}

/// Connector handing out [`MockChannel`]s, with per-tenant scripted failure.
#[derive(Default)]
pub struct MockConnector {
    channels: Mutex<HashMap<String, Arc<MockChannel>>>,
    fail_for: Mutex<HashSet<String>>,
    connect_count: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future connects for this tenant fail.
    pub async fn fail_tenant(&self, tenant_id: &str) {
        self.fail_for.lock().await.insert(tenant_id.to_string());
    }

    /// Let future connects for this tenant succeed again.
    pub async fn heal_tenant(&self, tenant_id: &str) {
        self.fail_for.lock().await.remove(tenant_id);
    }

    /// The live mock channel for a tenant, if one was connected.
    pub async fn channel(&self, tenant_id: &str) -> Option<Arc<MockChannel>> {
        self.channels.lock().await.get(tenant_id).cloned()
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelConnector for MockConnector {
    async fn connect(
        &self,
        tenant: &TenantRecord,
    ) -> Result<Arc<dyn ExternalChannel>, ConvoyError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.lock().await.contains(&tenant.tenant_id) {
            return Err(ConvoyError::channel(format!(
                "scripted connect failure for {}",
                tenant.tenant_id
            )));
        }
        let channel = Arc::new(MockChannel::new(&tenant.tenant_id));
        self.channels
            .lock()
            .await
            .insert(tenant.tenant_id.clone(), Arc::clone(&channel));
        Ok(channel)
    }
}
