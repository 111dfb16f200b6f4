// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message source trait for chat platform integrations (Telegram, remote bridges, console).

use async_trait::async_trait;

use crate::error::ChloeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::InboundMessage;

/// A lazy, unbounded, non-restartable stream of inbound messages.
#[async_trait]
pub trait MessageSource: PluginAdapter {
    /// Establishes the connection to the platform and starts producing messages.
    async fn connect(&mut self) -> Result<(), ChloeError>;

    /// Receives the next inbound message.
    ///
    /// Returns [`ChloeError::SourceClosed`] once the source is exhausted; any
    /// other error is transient and the caller may keep receiving.
    async fn receive(&self) -> Result<InboundMessage, ChloeError>;
}
