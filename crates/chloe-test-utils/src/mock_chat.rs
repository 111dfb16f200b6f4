// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat handle that captures every reply for assertion.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use chloe_core::{ChatHandle, ChatId, MessageId};

/// A reply captured by [`MockChat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text {
        text: String,
        to: MessageId,
    },
    Image {
        path: String,
        to: MessageId,
        /// Whether the file existed when the reply was sent.
        existed: bool,
    },
    Voice {
        path: String,
        to: MessageId,
        existed: bool,
    },
    Quote {
        text: String,
        to: MessageId,
        quote: String,
    },
}

impl Reply {
    /// The text body for text and quote replies.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } | Self::Quote { text, .. } => Some(text),
            Self::Image { .. } | Self::Voice { .. } => None,
        }
    }

    pub fn reply_to(&self) -> &MessageId {
        match self {
            Self::Text { to, .. }
            | Self::Image { to, .. }
            | Self::Voice { to, .. }
            | Self::Quote { to, .. } => to,
        }
    }
}

/// A chat that records replies instead of delivering them.
pub struct MockChat {
    id: ChatId,
    members: AtomicUsize,
    bot_username: String,
    replies: Mutex<Vec<Reply>>,
    notify: Notify,
}

impl MockChat {
    /// A chat with `members` participants including the bot.
    pub fn new(id: &str, members: usize, bot_username: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ChatId::from(id),
            members: AtomicUsize::new(members),
            bot_username: bot_username.to_string(),
            replies: Mutex::new(Vec::new()),
            notify: Notify::new(),
        })
    }

    /// A one-to-one chat with the bot `chloe_bot`.
    pub fn direct(id: &str) -> Arc<Self> {
        Self::new(id, 2, "chloe_bot")
    }

    /// A group chat of five with the bot `chloe_bot`.
    pub fn group(id: &str) -> Arc<Self> {
        Self::new(id, 5, "chloe_bot")
    }

    pub fn set_member_count(&self, members: usize) {
        self.members.store(members, Ordering::SeqCst);
    }

    pub async fn replies(&self) -> Vec<Reply> {
        self.replies.lock().await.clone()
    }

    /// Text bodies of text and quote replies, in delivery order.
    pub async fn texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .await
            .iter()
            .filter_map(|r| r.text().map(str::to_string))
            .collect()
    }

    /// Wait until at least `count` replies were captured, or `within` elapses.
    pub async fn wait_for_replies(&self, count: usize, within: Duration) -> Vec<Reply> {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            let notified = self.notify.notified();
            {
                let replies = self.replies.lock().await;
                if replies.len() >= count {
                    return replies.clone();
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.replies().await;
            }
        }
    }

    async fn record(&self, reply: Reply) {
        self.replies.lock().await.push(reply);
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl ChatHandle for MockChat {
    fn id(&self) -> &ChatId {
        &self.id
    }

    async fn member_count(&self) -> usize {
        self.members.load(Ordering::SeqCst)
    }

    fn bot_username(&self) -> &str {
        &self.bot_username
    }

    async fn reply_message(&self, text: &str, to: &MessageId) {
        self.record(Reply::Text {
            text: text.to_string(),
            to: to.clone(),
        })
        .await;
    }

    async fn reply_image(&self, path: &Path, to: &MessageId) {
        self.record(Reply::Image {
            path: path.display().to_string(),
            to: to.clone(),
            existed: path.exists(),
        })
        .await;
    }

    async fn reply_voice(&self, path: &Path, to: &MessageId) {
        self.record(Reply::Voice {
            path: path.display().to_string(),
            to: to.clone(),
            existed: path.exists(),
        })
        .await;
    }

    async fn quote_message(&self, text: &str, to: &MessageId, quote: &str) {
        self.record(Reply::Quote {
            text: text.to_string(),
            to: to.clone(),
            quote: quote.to_string(),
        })
        .await;
    }
}
