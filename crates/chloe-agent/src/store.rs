// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of conversation contexts keyed by chat.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use chloe_core::ChatId;

use crate::conversation::{ConversationContext, ConversationSettings};

/// Shared handle to one chat's context. Hold the lock for a whole exchange.
pub type SharedContext = Arc<Mutex<ConversationContext>>;

/// Lazily creates one [`ConversationContext`] per chat.
pub struct ConversationStore {
    settings: Arc<ConversationSettings>,
    contexts: DashMap<ChatId, SharedContext>,
}

impl ConversationStore {
    pub fn new(settings: ConversationSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            contexts: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    /// The context for `chat`, created on first use. Concurrent callers for
    /// the same chat always receive the same instance.
    pub fn get_or_create(&self, chat: &ChatId) -> SharedContext {
        let entry = self.contexts.entry(chat.clone()).or_insert_with(|| {
            debug!(chat_id = %chat, "creating conversation context");
            Arc::new(Mutex::new(ConversationContext::new(
                chat.clone(),
                Arc::clone(&self.settings),
                Instant::now(),
            )))
        });
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Drop contexts idle for longer than the configured eviction age.
    ///
    /// Contexts that are locked or handed out to a caller are kept. Returns
    /// the number of contexts removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let Some(max_idle) = self.settings.idle_eviction else {
            return 0;
        };
        let mut evicted = 0;
        self.contexts.retain(|chat, context| {
            if Arc::strong_count(context) > 1 {
                return true;
            }
            let Ok(guard) = context.try_lock() else {
                return true;
            };
            let keep = now.saturating_duration_since(guard.touched_at()) <= max_idle;
            if !keep {
                debug!(chat_id = %chat, "evicting idle conversation context");
                evicted += 1;
            }
            keep
        });
        evicted
    }
}
