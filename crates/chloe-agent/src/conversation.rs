// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-chat rolling conversation window.
//!
//! A context keeps the greeting directive followed by prior question/answer
//! turns, oldest first. Each new question rebuilds the window: stale history is
//! discarded, then the newest turns are retained while their word count fits
//! the token budget.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use chloe_config::ChloeConfig;
use chloe_core::ChatId;
use chloe_core::types::PromptMessage;

/// Settings shared by every conversation, derived from configuration once.
#[derive(Debug, Clone)]
pub struct ConversationSettings {
    pub bot_name: String,
    /// System directive placed first in every prompt.
    pub greeting: String,
    pub model: String,
    /// Idle time after which the history is discarded on the next question.
    pub stale_after: Duration,
    /// Word-count ceiling for the question, greeting and retained history.
    pub token_budget: usize,
    /// Idle time after which the store may drop the whole context. `None` keeps contexts forever.
    pub idle_eviction: Option<Duration>,
}

impl ConversationSettings {
    pub fn from_config(config: &ChloeConfig) -> Self {
        let conversation = &config.conversation;
        Self {
            bot_name: config.agent.name.clone(),
            greeting: config.agent.greeting(),
            model: config.openai.model.clone(),
            stale_after: Duration::from_secs(conversation.context_timeout_secs),
            token_budget: conversation.token_budget,
            idle_eviction: (conversation.idle_eviction_secs > 0)
                .then(|| Duration::from_secs(conversation.idle_eviction_secs)),
        }
    }
}

/// Approximate token cost: the number of whitespace-separated words.
pub fn token_cost(text: &str) -> usize {
    text.split_whitespace().count()
}

/// One exchange of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Turn {
    pub question: String,
    /// Empty until a completion succeeds.
    pub answer: String,
    /// Set only on the leading greeting turn.
    pub directive: Option<String>,
}

impl Turn {
    fn greeting(text: &str) -> Self {
        Self {
            directive: Some(text.to_string()),
            ..Self::default()
        }
    }

    fn question(text: &str) -> Self {
        Self {
            question: text.to_string(),
            ..Self::default()
        }
    }

    pub fn is_directive(&self) -> bool {
        self.directive.is_some()
    }

    /// Cost of the question plus the answer.
    pub fn cost(&self) -> usize {
        token_cost(&self.question) + token_cost(&self.answer)
    }
}

/// Rolling dialogue state of one chat.
#[derive(Debug)]
pub struct ConversationContext {
    chat_id: ChatId,
    settings: Arc<ConversationSettings>,
    turns: Vec<Turn>,
    last_activity: Option<Instant>,
    touched_at: Instant,
}

impl ConversationContext {
    pub fn new(chat_id: ChatId, settings: Arc<ConversationSettings>, now: Instant) -> Self {
        let turns = vec![Turn::greeting(&settings.greeting)];
        Self {
            chat_id,
            settings,
            turns,
            last_activity: None,
            touched_at: now,
        }
    }

    pub fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Time of the last successful completion, if any.
    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    /// Time of the last question or completion, used for idle eviction.
    pub fn touched_at(&self) -> Instant {
        self.touched_at
    }

    /// A context that never completed an exchange counts as stale.
    pub fn is_stale(&self, now: Instant) -> bool {
        match self.last_activity {
            Some(last) => now > last + self.settings.stale_after,
            None => true,
        }
    }

    /// Rebuild the window for `question`: greeting, retained turns oldest
    /// first, then the new question with its answer still unset.
    pub fn prepare_turn(&mut self, question: &str, now: Instant) {
        self.touched_at = now;
        let stale = self.is_stale(now);
        let history = std::mem::take(&mut self.turns);

        let mut spent = token_cost(question) + token_cost(&self.settings.greeting);
        let mut retained = Vec::new();
        if !stale {
            for turn in history.into_iter().rev().filter(|t| !t.is_directive()) {
                let cost = turn.cost();
                if spent + cost > self.settings.token_budget {
                    break;
                }
                spent += cost;
                retained.push(turn);
            }
        }

        let mut turns = Vec::with_capacity(retained.len() + 2);
        turns.push(Turn::greeting(&self.settings.greeting));
        turns.extend(retained.into_iter().rev());
        turns.push(Turn::question(question));
        self.turns = turns;
    }

    /// Record the answer on the newest turn. Empty answers are ignored.
    pub fn attach_answer(&mut self, answer: &str) {
        if answer.is_empty() {
            return;
        }
        if let Some(turn) = self.turns.last_mut().filter(|t| !t.is_directive()) {
            turn.answer = answer.to_string();
        }
    }

    pub fn mark_active(&mut self, now: Instant) {
        self.last_activity = Some(now);
        self.touched_at = now;
    }

    /// Flatten the window into role-tagged prompt messages, system first.
    pub fn prompt_messages(&self) -> Vec<PromptMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() * 2);
        for turn in &self.turns {
            if let Some(directive) = &turn.directive {
                messages.push(PromptMessage::system(directive.as_str()));
                continue;
            }
            messages.push(PromptMessage::user(turn.question.as_str()));
            if !turn.answer.is_empty() {
                messages.push(PromptMessage::assistant(turn.answer.as_str()));
            }
        }
        messages
    }
}
