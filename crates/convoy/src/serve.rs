// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `convoy serve` command implementation.
//!
//! Wires the full relay: store adapter, debounce buffer, tenant fleet with
//! its periodic reconciler, conversation manager, provider factory, AI
//! dispatcher, broadcast notifier, and the relay loop itself. Supports
//! graceful shutdown via signal handlers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use convoy_buffer::MessageBuffer;
use convoy_config::ConvoyConfig;
use convoy_conversation::ConversationManager;
use convoy_core::{
    ChannelConnector, ConvoyError, ExternalChannel, InternalNotifier, OutboundDelivery,
    StoreAdapter, TenantRecord,
};
use convoy_dispatch::AiDispatcher;
use convoy_fleet::FleetManager;
use convoy_provider::HttpProviderFactory;
use convoy_relay::{BroadcastNotifier, RelayContext, RelayLoop, install_signal_handler};
use convoy_store::InMemoryStore;

/// Connector used until a real transport adapter is wired in.
///
/// Deployments plug their chat transport in here; with none configured,
/// every connect fails and the fleet retries on its next reconciliation
/// tick, so registering tenants stays safe.
struct NullConnector;

#[async_trait]
impl ChannelConnector for NullConnector {
    async fn connect(
        &self,
        tenant: &TenantRecord,
    ) -> Result<Arc<dyn ExternalChannel>, ConvoyError> {
        Err(ConvoyError::channel(format!(
            "no transport adapter configured for tenant `{}`",
            tenant.tenant_id
        )))
    }
}

/// Runs the `convoy serve` command.
///
/// Builds every collaborator from configuration, starts the fleet and its
/// reconciler, and enters the relay loop until a shutdown signal arrives.
pub async fn run_serve(config: ConvoyConfig) -> Result<(), ConvoyError> {
    init_tracing(&config.service.log_level);

    info!(service = config.service.name.as_str(), "starting convoy serve");

    let store: Arc<dyn StoreAdapter> = Arc::new(InMemoryStore::new());
    let buffer = MessageBuffer::new(
        config.buffer.initial_wait(),
        config.buffer.additional_wait(),
    );

    let connector: Arc<dyn ChannelConnector> = Arc::new(NullConnector);
    let (fleet, inbound_rx) = FleetManager::new(
        Arc::clone(&store),
        connector,
        buffer.clone(),
        &config.fleet,
    );
    fleet.initialize().await?;

    let notifier = Arc::new(BroadcastNotifier::default());
    let conversations = Arc::new(ConversationManager::new(Arc::clone(&store)));
    let dispatcher = Arc::new(AiDispatcher::new(
        Arc::clone(&store),
        conversations,
        Arc::new(HttpProviderFactory),
        Arc::clone(&notifier) as Arc<dyn InternalNotifier>,
        Arc::clone(&fleet) as Arc<dyn OutboundDelivery>,
        config.dispatch.clone(),
    ));

    let ctx = Arc::new(RelayContext {
        store,
        notifier: notifier as Arc<dyn InternalNotifier>,
        buffer,
        dispatcher,
    });

    let cancel = install_signal_handler();
    let reconciler = fleet.spawn_reconciler(cancel.clone());

    RelayLoop::new(inbound_rx, ctx).run(cancel).await;

    // Relay loop has exited; tear down the fleet before reporting done.
    let _ = reconciler.await;
    fleet.shutdown().await;

    info!("convoy serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("convoy={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
