// SPDX-FileCopyrightText: 2026 Convoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI provider adapters for the Convoy relay.
//!
//! Implements [`convoy_core::AiProvider`] over the OpenAI-compatible chat
//! completion API for OpenAI and Groq, and [`convoy_core::ProviderFactory`]
//! to select between them per agent record.

pub mod client;
pub mod factory;
pub mod groq;
pub mod openai;
pub mod types;

pub use factory::HttpProviderFactory;
pub use groq::GroqProvider;
pub use openai::OpenAiProvider;
