// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounced per-user message coalescing.
//!
//! Users of chat networks send thoughts as several short messages in quick
//! succession. Answering each one separately wastes provider calls and
//! produces disjointed replies, so the buffer holds a user's burst until it
//! goes quiet, then releases one combined message.
//!
//! Debounce runs in two stages: every message (re)arms a release timer of
//! `initial_wait`; if the release fires while messages are still landing, a
//! shorter `additional_wait` settle timer runs before the flush. A flush
//! joins the burst's texts with newlines in arrival order and resolves every
//! pending `add_message` call exactly once. The call whose timer drove the
//! flush receives the combined text; calls absorbed into it receive `None`,
//! so each flush triggers exactly one downstream dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use convoy_config::BufferConfig;

/// Buffer state is keyed per user per tenant connection; the same user
/// talking to two tenants holds two independent bursts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BufferKey {
    user_id: String,
    tenant_id: String,
}

#[derive(Debug)]
struct BufferedLine {
    text: String,
    received_at: Instant,
}

struct BufferState {
    lines: Vec<BufferedLine>,
    last_message_at: Instant,
    waiters: Vec<oneshot::Sender<Option<String>>>,
    release_timer: Option<JoinHandle<()>>,
    settle_timer: Option<JoinHandle<()>>,
}

impl BufferState {
    fn new(now: Instant) -> Self {
        Self {
            lines: Vec::new(),
            last_message_at: now,
            waiters: Vec::new(),
            release_timer: None,
            settle_timer: None,
        }
    }

    fn cancel_timers(&mut self) {
        if let Some(timer) = self.release_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.settle_timer.take() {
            timer.abort();
        }
    }
}

struct Shared {
    states: Mutex<HashMap<BufferKey, BufferState>>,
    initial_wait: Duration,
    additional_wait: Duration,
}

impl Shared {
    /// Body of the release timer armed by the most recent `add_message`.
    async fn release_after_wait(self: Arc<Self>, key: BufferKey) {
        tokio::time::sleep(self.initial_wait).await;
        // An aborted stale timer dies here, before it can touch the state.
        let mut states = self.states.lock().await;
        let Some(state) = states.get_mut(&key) else {
            return;
        };
        if state.last_message_at.elapsed() < self.initial_wait {
            // Messages were still landing when this window fired. Hold the
            // burst for a shorter settle window before flushing.
            let shared = Arc::clone(&self);
            let settle_key = key.clone();
            state.settle_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(shared.additional_wait).await;
                let mut states = shared.states.lock().await;
                Self::flush(&mut states, &settle_key);
            }));
            return;
        }
        Self::flush(&mut states, &key);
    }

    /// Remove the key's state and resolve every waiter exactly once.
    ///
    /// The most recent waiter owns the flush and receives the combined text;
    /// earlier waiters were absorbed into it and receive `None`. A key with
    /// no buffered lines resolves all waiters with `None`.
    fn flush(states: &mut HashMap<BufferKey, BufferState>, key: &BufferKey) {
        let Some(mut state) = states.remove(key) else {
            return;
        };
        // Aborting a finished timer, including the one running this flush,
        // is a no-op.
        state.cancel_timers();

        if state.lines.is_empty() {
            for waiter in state.waiters.drain(..) {
                let _ = waiter.send(None);
            }
            return;
        }

        // Stable sort: lines that share a timestamp keep arrival order.
        state.lines.sort_by_key(|line| line.received_at);
        let combined = state
            .lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            user = %key.user_id,
            tenant = %key.tenant_id,
            lines = state.lines.len(),
            "buffer flushed"
        );

        let owner = state.waiters.pop();
        for waiter in state.waiters.drain(..) {
            let _ = waiter.send(None);
        }
        if let Some(owner) = owner {
            let _ = owner.send(Some(combined));
        }
    }

    /// Drop a key's state, resolving all waiters with `None`.
    fn discard(states: &mut HashMap<BufferKey, BufferState>, key: &BufferKey) {
        if let Some(mut state) = states.remove(key) {
            state.cancel_timers();
            debug!(
                user = %key.user_id,
                tenant = %key.tenant_id,
                discarded = state.lines.len(),
                "buffer cleared"
            );
            for waiter in state.waiters.drain(..) {
                let _ = waiter.send(None);
            }
        }
    }
}

/// Debounced message coalescer, cheap to clone and share.
#[derive(Clone)]
pub struct MessageBuffer {
    shared: Arc<Shared>,
}

impl MessageBuffer {
    pub fn new(initial_wait: Duration, additional_wait: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                states: Mutex::new(HashMap::new()),
                initial_wait,
                additional_wait,
            }),
        }
    }

    pub fn from_config(config: &BufferConfig) -> Self {
        Self::new(config.initial_wait(), config.additional_wait())
    }

    /// Append a message to the user's burst and wait for the burst to flush.
    ///
    /// Resolves with `Some(combined)` when this call's timer performed the
    /// flush, or `None` when the message was absorbed into a later caller's
    /// flush or the buffer was cleared before flushing.
    pub async fn add_message(&self, user_id: &str, tenant_id: &str, text: &str) -> Option<String> {
        let key = BufferKey {
            user_id: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
        };
        let (tx, rx) = oneshot::channel();
        {
            let now = Instant::now();
            let mut states = self.shared.states.lock().await;
            let state = states.entry(key.clone()).or_insert_with(|| BufferState::new(now));
            // The burst is still growing; the previous timers no longer apply.
            state.cancel_timers();
            state.lines.push(BufferedLine {
                text: text.to_string(),
                received_at: now,
            });
            state.last_message_at = now;
            state.waiters.push(tx);

            debug!(
                user = %key.user_id,
                tenant = %key.tenant_id,
                pending = state.lines.len(),
                "message buffered"
            );

            let shared = Arc::clone(&self.shared);
            let timer_key = key.clone();
            state.release_timer = Some(tokio::spawn(shared.release_after_wait(timer_key)));
        }
        rx.await.unwrap_or(None)
    }

    /// Drop any buffered burst for the given user, resolving its pending
    /// callers with `None`.
    pub async fn clear_buffer(&self, user_id: &str, tenant_id: &str) {
        let key = BufferKey {
            user_id: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
        };
        let mut states = self.shared.states.lock().await;
        Shared::discard(&mut states, &key);
    }

    /// Drop every buffered burst belonging to a tenant connection. Called
    /// when the tenant is removed from the fleet.
    pub async fn clear_tenant(&self, tenant_id: &str) {
        let mut states = self.shared.states.lock().await;
        let keys: Vec<BufferKey> = states
            .keys()
            .filter(|key| key.tenant_id == tenant_id)
            .cloned()
            .collect();
        for key in keys {
            Shared::discard(&mut states, &key);
        }
    }

    /// Drop every buffered burst. Called on shutdown.
    pub async fn clear_all(&self) {
        let mut states = self.shared.states.lock().await;
        let keys: Vec<BufferKey> = states.keys().cloned().collect();
        for key in keys {
            Shared::discard(&mut states, &key);
        }
    }

    /// Number of messages currently buffered for a user. Debug accessor.
    pub async fn pending_len(&self, user_id: &str, tenant_id: &str) -> usize {
        let key = BufferKey {
            user_id: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
        };
        let states = self.shared.states.lock().await;
        states.get(&key).map_or(0, |state| state.lines.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_buffer() -> MessageBuffer {
        MessageBuffer::new(Duration::from_secs(12), Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn single_message_flushes_alone() {
        let buffer = test_buffer();
        let combined = buffer.add_message("user-1", "tenant-1", "Hello").await;
        assert_eq!(combined.as_deref(), Some("Hello"));
        assert_eq!(buffer.pending_len("user-1", "tenant-1").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_combines_in_arrival_order() {
        let buffer = test_buffer();
        let (first, second) = tokio::join!(
            buffer.add_message("user-1", "tenant-1", "Hello"),
            buffer.add_message("user-1", "tenant-1", "how are you"),
        );
        // The later caller's timer drove the flush and owns the combined text.
        assert_eq!(first, None);
        assert_eq!(second.as_deref(), Some("Hello\nhow are you"));
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_messages_still_share_one_flush() {
        let buffer = test_buffer();
        let early = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.add_message("user-1", "tenant-1", "first").await })
        };
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(buffer.pending_len("user-1", "tenant-1").await, 1);

        // Second message lands inside the first window and re-arms it.
        let combined = buffer.add_message("user-1", "tenant-1", "second").await;
        assert_eq!(combined.as_deref(), Some("first\nsecond"));
        assert_eq!(early.await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_isolated_per_user_and_tenant() {
        let buffer = test_buffer();
        let (a, b, c) = tokio::join!(
            buffer.add_message("user-1", "tenant-1", "one"),
            buffer.add_message("user-2", "tenant-1", "two"),
            buffer.add_message("user-1", "tenant-2", "three"),
        );
        assert_eq!(a.as_deref(), Some("one"));
        assert_eq!(b.as_deref(), Some("two"));
        assert_eq!(c.as_deref(), Some("three"));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_buffer_resolves_waiters_with_none() {
        let buffer = test_buffer();
        let pending = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.add_message("user-1", "tenant-1", "doomed").await })
        };
        // Let the add run before clearing.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(buffer.pending_len("user-1", "tenant-1").await, 1);

        buffer.clear_buffer("user-1", "tenant-1").await;
        assert_eq!(pending.await.unwrap(), None);
        assert_eq!(buffer.pending_len("user-1", "tenant-1").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_tenant_drops_only_that_tenant() {
        let buffer = test_buffer();
        let doomed = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.add_message("user-1", "tenant-1", "a").await })
        };
        let survivor = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.add_message("user-1", "tenant-2", "b").await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        buffer.clear_tenant("tenant-1").await;
        assert_eq!(doomed.await.unwrap(), None);
        assert_eq!(survivor.await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_text_is_buffered_like_any_other() {
        let buffer = test_buffer();
        let (first, second) = tokio::join!(
            buffer.add_message("user-1", "tenant-1", ""),
            buffer.add_message("user-1", "tenant-1", "after"),
        );
        assert_eq!(first, None);
        assert_eq!(second.as_deref(), Some("\nafter"));
    }

    #[tokio::test(start_paused = true)]
    async fn new_burst_starts_fresh_after_flush() {
        let buffer = test_buffer();
        let first = buffer.add_message("user-1", "tenant-1", "one").await;
        assert_eq!(first.as_deref(), Some("one"));

        let second = buffer.add_message("user-1", "tenant-1", "two").await;
        assert_eq!(second.as_deref(), Some("two"));
    }
}
