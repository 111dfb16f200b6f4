// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply sink for a single chat.

use std::path::Path;

use async_trait::async_trait;

use crate::types::{ChatId, MessageId};

/// Capability set of a chat as seen by the engine.
///
/// Reply methods are fire-and-forget: implementations log their own delivery
/// failures and never surface them to the engine.
#[async_trait]
pub trait ChatHandle: Send + Sync {
    /// Identity of this chat.
    fn id(&self) -> &ChatId;

    /// Number of participants including the bot. Two or fewer means a direct chat.
    async fn member_count(&self) -> usize;

    /// The bot's own username on this platform, used for `@mention` detection.
    fn bot_username(&self) -> &str;

    /// Sends `text` as a reply to message `to`.
    async fn reply_message(&self, text: &str, to: &MessageId);

    /// Sends the image at `path` as a reply to message `to`.
    async fn reply_image(&self, path: &Path, to: &MessageId);

    /// Sends the audio at `path` as a reply to message `to`.
    async fn reply_voice(&self, path: &Path, to: &MessageId);

    /// Sends `text` as a reply to `to`, prefixed by a visually quoted `quote`.
    async fn quote_message(&self, text: &str, to: &MessageId, quote: &str);
}
