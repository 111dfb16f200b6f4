// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion provider trait for LLM backends (OpenAI-compatible APIs, etc.).

use async_trait::async_trait;

use crate::error::ChloeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionRequest, CompletionResponse};

/// Adapter for chat-completion backends.
///
/// Implementations perform exactly one round trip per call; deadlines and
/// retries are owned by the caller.
#[async_trait]
pub trait CompletionProvider: PluginAdapter {
    /// Sends a completion request and returns the provider's choices.
    async fn complete(&self, request: CompletionRequest)
    -> Result<CompletionResponse, ChloeError>;
}
