// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Chloe chat assistant.
//!
//! This crate provides the collaborator traits, error type, and common types
//! shared by the dispatch engine, the message sources, and the completion
//! providers.

pub mod client_cache;
pub mod error;
pub mod traits;
pub mod types;

pub use client_cache::ClientCache;
pub use error::ChloeError;
pub use types::{AdapterType, ChatId, HealthStatus, MessageId, UserId};

pub use traits::{
    ChatHandle, CompletionProvider, ImageGenerator, MessageSource, PluginAdapter,
    SpeechSynthesizer, Transcriber,
};
