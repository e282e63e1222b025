// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-TTL read-through cache for the active tenant list.
//!
//! Reconciliation runs often enough that hitting the store on every tick is
//! wasteful; the cache serves the list for its TTL and refreshes from the
//! store once it goes stale. Registration and removal update it in place so
//! changes are visible before the next refresh.

use tokio::sync::Mutex;
use tokio::time::Instant;

use convoy_core::{ConvoyError, StoreAdapter, TenantRecord};

struct CacheEntry {
    fetched_at: Instant,
    tenants: Vec<TenantRecord>,
}

pub struct TenantCache {
    ttl: std::time::Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl TenantCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// The active tenant list, from cache when fresh, otherwise reloaded
    /// from the store.
    pub async fn get_or_load(
        &self,
        store: &dyn StoreAdapter,
    ) -> Result<Vec<TenantRecord>, ConvoyError> {
        let mut entry = self.entry.lock().await;
        if let Some(cached) = entry.as_ref()
            && cached.fetched_at.elapsed() < self.ttl
        {
            return Ok(cached.tenants.clone());
        }
        let tenants = store.list_active_tenants().await?;
        *entry = Some(CacheEntry {
            fetched_at: Instant::now(),
            tenants: tenants.clone(),
        });
        Ok(tenants)
    }

    /// Insert or replace one tenant in the cached list, if one is held.
    pub async fn upsert(&self, tenant: TenantRecord) {
        let mut entry = self.entry.lock().await;
        if let Some(cached) = entry.as_mut() {
            cached.tenants.retain(|t| t.tenant_id != tenant.tenant_id);
            cached.tenants.push(tenant);
        }
    }

    /// Drop one tenant from the cached list, if one is held.
    pub async fn remove(&self, tenant_id: &str) {
        let mut entry = self.entry.lock().await;
        if let Some(cached) = entry.as_mut() {
            cached.tenants.retain(|t| t.tenant_id != tenant_id);
        }
    }

    /// Force the next read to hit the store.
    pub async fn invalidate(&self) {
        *self.entry.lock().await = None;
    }
}
