// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for Convoy integration tests: a scripted external channel
//! and connector, a scripted AI provider and factory, and an event-recording
//! notifier.

pub mod mock_channel;
pub mod mock_notifier;
pub mod mock_provider;

pub use mock_channel::{MockChannel, MockConnector};
pub use mock_notifier::RecordingNotifier;
pub use mock_provider::{MockProvider, MockProviderFactory, ProviderCall};
