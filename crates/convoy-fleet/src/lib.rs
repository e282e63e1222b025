// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant connection fleet management.
//!
//! The fleet keeps one live external channel per active tenant and makes the
//! live map converge on the store's active set: `initialize` connects
//! everything at startup, and a periodic reconciliation tick connects
//! tenants that appeared and disconnects tenants that were deactivated.
//! One tenant's connect failure never blocks the rest; the failed tenant is
//! retried on the next tick.
//!
//! Every connected channel gets an ingest task forwarding its inbound
//! messages into one shared mpsc stream, which the relay loop consumes.
//! Outbound replies go through the same live map via [`OutboundDelivery`].

pub mod cache;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use convoy_buffer::MessageBuffer;
use convoy_config::FleetConfig;
use convoy_core::{
    ChannelConnector, ConvoyError, ExternalChannel, InboundMessage, OutboundDelivery,
    StoreAdapter, TenantDescriptor, TenantRecord,
};

use crate::cache::TenantCache;

/// Capacity of the shared inbound stream all ingest tasks feed.
const INBOUND_CHANNEL_CAPACITY: usize = 512;

/// Where a tenant's connection is in its life cycle. A tenant with no entry
/// in the live map is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Entry reserved, connect in flight.
    Connecting,
    /// Channel live, ingest task running.
    Connected,
    /// Teardown in progress.
    Removing,
}

struct TenantConnection {
    state: ConnectionState,
    channel: Option<Arc<dyn ExternalChannel>>,
    ingest: Option<JoinHandle<()>>,
}

pub struct FleetManager {
    store: Arc<dyn StoreAdapter>,
    connector: Arc<dyn ChannelConnector>,
    buffer: MessageBuffer,
    cache: TenantCache,
    live: Mutex<HashMap<String, TenantConnection>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    tick_running: AtomicBool,
    update_interval: Duration,
}

impl FleetManager {
    /// Build the fleet and the inbound stream it feeds.
    pub fn new(
        store: Arc<dyn StoreAdapter>,
        connector: Arc<dyn ChannelConnector>,
        buffer: MessageBuffer,
        config: &FleetConfig,
    ) -> (Arc<Self>, mpsc::Receiver<InboundMessage>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let fleet = Arc::new(Self {
            store,
            connector,
            buffer,
            cache: TenantCache::new(config.cache_ttl()),
            live: Mutex::new(HashMap::new()),
            inbound_tx,
            tick_running: AtomicBool::new(false),
            update_interval: config.update_interval(),
        });
        (fleet, inbound_rx)
    }

    /// Connect every active tenant at startup. Per-tenant failures are
    /// logged and left for the next reconciliation tick.
    pub async fn initialize(&self) -> Result<(), ConvoyError> {
        let tenants = self.cache.get_or_load(self.store.as_ref()).await?;
        let total = tenants.len();
        let mut failed = 0usize;
        for tenant in &tenants {
            if let Err(e) = self.connect_tenant(tenant).await {
                failed += 1;
                warn!(
                    tenant = %tenant.tenant_id,
                    error = %e,
                    "failed to connect tenant during startup"
                );
            }
        }
        info!(total, connected = total - failed, failed, "fleet initialized");
        Ok(())
    }

    /// One reconciliation pass: converge the live map on the store's active
    /// set. If a pass is already in flight, this one is skipped (not queued).
    pub async fn reconcile(&self) -> Result<(), ConvoyError> {
        if self.tick_running.swap(true, Ordering::SeqCst) {
            warn!("reconciliation tick already running, skipping");
            return Ok(());
        }
        let result = self.reconcile_inner().await;
        self.tick_running.store(false, Ordering::SeqCst);
        result
    }

    async fn reconcile_inner(&self) -> Result<(), ConvoyError> {
        let active = self.cache.get_or_load(self.store.as_ref()).await?;

        for tenant in &active {
            let already_live = self.live.lock().await.contains_key(&tenant.tenant_id);
            if already_live {
                continue;
            }
            if let Err(e) = self.connect_tenant(tenant).await {
                warn!(
                    tenant = %tenant.tenant_id,
                    error = %e,
                    "failed to connect tenant, will retry next tick"
                );
            }
        }

        let active_ids: HashSet<&str> =
            active.iter().map(|t| t.tenant_id.as_str()).collect();
        let stale: Vec<String> = {
            let live = self.live.lock().await;
            live.keys()
                .filter(|id| !active_ids.contains(id.as_str()))
                .cloned()
                .collect()
        };
        for tenant_id in stale {
            self.disconnect_tenant(&tenant_id).await;
        }

        Ok(())
    }

    /// Run reconciliation on a fixed interval until cancelled.
    pub fn spawn_reconciler(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let fleet = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(fleet.update_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = fleet.reconcile().await {
                            error!(error = %e, "reconciliation tick failed");
                        }
                    }
                    _ = cancel.cancelled() => {
                        debug!("reconciler stopping");
                        break;
                    }
                }
            }
        })
    }

    /// Register a new tenant: persist it, make it visible to reconciliation,
    /// and connect it now.
    pub async fn add_instance(
        &self,
        descriptor: TenantDescriptor,
    ) -> Result<TenantRecord, ConvoyError> {
        let record = descriptor.into_record(Utc::now());
        self.store.create_tenant(&record).await?;
        self.cache.upsert(record.clone()).await;
        self.connect_tenant(&record).await?;
        info!(tenant = %record.tenant_id, "tenant registered");
        Ok(record)
    }

    /// Deactivate a tenant: tear down its connection, mark it inactive in
    /// the store, and drop its buffered messages.
    pub async fn remove_instance(&self, tenant_id: &str) -> Result<(), ConvoyError> {
        self.disconnect_tenant(tenant_id).await;
        self.store.set_tenant_active(tenant_id, false).await?;
        self.cache.remove(tenant_id).await;
        info!(tenant = %tenant_id, "tenant removed");
        Ok(())
    }

    /// Tenant ids with a fully connected channel.
    pub async fn connected_tenants(&self) -> Vec<String> {
        let live = self.live.lock().await;
        let mut ids: Vec<String> = live
            .iter()
            .filter(|(_, entry)| entry.state == ConnectionState::Connected)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Connection state for a tenant; `None` means absent.
    pub async fn connection_state(&self, tenant_id: &str) -> Option<ConnectionState> {
        self.live.lock().await.get(tenant_id).map(|entry| entry.state)
    }

    /// Disconnect every tenant. Called on shutdown.
    pub async fn shutdown(&self) {
        let tenant_ids: Vec<String> = self.live.lock().await.keys().cloned().collect();
        for tenant_id in tenant_ids {
            self.disconnect_tenant(&tenant_id).await;
        }
    }

    async fn connect_tenant(&self, tenant: &TenantRecord) -> Result<(), ConvoyError> {
        {
            let mut live = self.live.lock().await;
            if live.contains_key(&tenant.tenant_id) {
                return Ok(());
            }
            live.insert(
                tenant.tenant_id.clone(),
                TenantConnection {
                    state: ConnectionState::Connecting,
                    channel: None,
                    ingest: None,
                },
            );
        }

        match self.connector.connect(tenant).await {
            Ok(channel) => {
                let mut live = self.live.lock().await;
                match live.get_mut(&tenant.tenant_id) {
                    Some(entry) if entry.state == ConnectionState::Connecting => {
                        let ingest = tokio::spawn(Self::ingest_loop(
                            Arc::clone(&channel),
                            self.inbound_tx.clone(),
                            tenant.tenant_id.clone(),
                        ));
                        entry.state = ConnectionState::Connected;
                        entry.channel = Some(channel);
                        entry.ingest = Some(ingest);
                        info!(tenant = %tenant.tenant_id, "tenant connected");
                        Ok(())
                    }
                    _ => {
                        // Removed while the connect was in flight.
                        drop(live);
                        let _ = channel.disconnect().await;
                        Ok(())
                    }
                }
            }
            Err(e) => {
                self.live.lock().await.remove(&tenant.tenant_id);
                Err(e)
            }
        }
    }

    async fn disconnect_tenant(&self, tenant_id: &str) {
        let (channel, ingest) = {
            let mut live = self.live.lock().await;
            match live.get_mut(tenant_id) {
                Some(entry) => {
                    entry.state = ConnectionState::Removing;
                    (entry.channel.take(), entry.ingest.take())
                }
                None => return,
            }
        };

        if let Some(channel) = channel
            && let Err(e) = channel.disconnect().await
        {
            warn!(tenant = %tenant_id, error = %e, "error disconnecting channel");
        }
        if let Some(ingest) = ingest {
            ingest.abort();
        }

        self.live.lock().await.remove(tenant_id);
        self.buffer.clear_tenant(tenant_id).await;
        info!(tenant = %tenant_id, "tenant disconnected");
    }

    /// Forward one channel's inbound messages into the shared stream.
    async fn ingest_loop(
        channel: Arc<dyn ExternalChannel>,
        inbound_tx: mpsc::Sender<InboundMessage>,
        tenant_id: String,
    ) {
        loop {
            match channel.receive().await {
                Ok(message) => {
                    if inbound_tx.send(message).await.is_err() {
                        debug!(tenant = %tenant_id, "inbound sink dropped, stopping ingest");
                        break;
                    }
                }
                Err(e) => {
                    if e.to_string().contains("closed") {
                        info!(tenant = %tenant_id, "channel closed, stopping ingest");
                        break;
                    }
                    warn!(tenant = %tenant_id, error = %e, "error receiving from channel");
                    // Pause so a persistently failing channel cannot spin hot.
                    tokio::time::sleep(Duration::from_millis(250)).await;
                }
            }
        }
    }
}

#[async_trait]
impl OutboundDelivery for FleetManager {
    async fn send_text(
        &self,
        tenant_id: &str,
        recipient_id: &str,
        text: &str,
    ) -> Result<(), ConvoyError> {
        let channel = {
            let live = self.live.lock().await;
            live.get(tenant_id).and_then(|entry| entry.channel.clone())
        };
        match channel {
            Some(channel) => channel.send_text(recipient_id, text).await,
            None => Err(ConvoyError::channel(format!(
                "no live connection for tenant `{tenant_id}`"
            ))),
        }
    }
}
