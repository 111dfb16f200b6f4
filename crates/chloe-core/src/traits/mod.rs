// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The engine depends only on these interfaces; every chat platform, completion
//! backend, and media service is a variant implementation behind them.

pub mod adapter;
pub mod chat;
pub mod media;
pub mod provider;
pub mod source;

pub use adapter::PluginAdapter;
pub use chat::ChatHandle;
pub use media::{ImageGenerator, SpeechSynthesizer, Transcriber};
pub use provider::CompletionProvider;
pub use source::MessageSource;
