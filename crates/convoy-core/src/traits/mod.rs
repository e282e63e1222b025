// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by the concrete crates of the workspace.

pub mod channel;
pub mod notifier;
pub mod provider;
pub mod store;

pub use channel::{ChannelConnector, ExternalChannel, OutboundDelivery};
pub use notifier::InternalNotifier;
pub use provider::{AiProvider, ProviderFactory};
pub use store::StoreAdapter;
