// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Allow-list gate deciding who may talk to the assistant.

use std::collections::HashSet;

use chloe_config::ALLOW_ALL;
use chloe_config::model::AccessConfig;
use chloe_core::{ChatId, UserId};

/// Why a message was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// The sender is individually allow-listed.
    User,
    /// Every user is allowed.
    AllUsers,
    /// The chat is individually allow-listed.
    Chat,
    /// Every chat is allowed.
    AllChats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed(AccessReason),
    Denied,
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// User-first, chat-second allow-list evaluation.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    users: HashSet<String>,
    chats: HashSet<String>,
    all_users: bool,
    all_chats: bool,
}

impl AccessGate {
    pub fn new(config: &AccessConfig) -> Self {
        let split = |ids: &[String]| -> (HashSet<String>, bool) {
            let wildcard = ids.iter().any(|id| id == ALLOW_ALL);
            let set = ids
                .iter()
                .filter(|id| id.as_str() != ALLOW_ALL)
                .cloned()
                .collect();
            (set, wildcard)
        };
        let (users, all_users) = split(&config.allowed_user_ids);
        let (chats, all_chats) = split(&config.allowed_chat_ids);
        Self {
            users,
            chats,
            all_users,
            all_chats,
        }
    }

    /// Evaluates the user lists before the chat lists.
    pub fn decide(&self, user: &UserId, chat: &ChatId) -> AccessDecision {
        if self.users.contains(user.as_str()) {
            AccessDecision::Allowed(AccessReason::User)
        } else if self.all_users {
            AccessDecision::Allowed(AccessReason::AllUsers)
        } else if self.chats.contains(chat.as_str()) {
            AccessDecision::Allowed(AccessReason::Chat)
        } else if self.all_chats {
            AccessDecision::Allowed(AccessReason::AllChats)
        } else {
            AccessDecision::Denied
        }
    }

    pub fn allow(&self, user: &UserId, chat: &ChatId) -> bool {
        self.decide(user, chat).is_allowed()
    }
}
