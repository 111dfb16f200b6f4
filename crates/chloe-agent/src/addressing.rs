// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draw-command parsing and group-chat mention detection.

use std::sync::LazyLock;

use regex::Regex;

use chloe_core::types::ImageSize;

static DRAW_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^/(draw|drawbig|drawsmall)\s+(.+)").expect("draw command pattern is valid")
});

/// Sentence punctuation ignored when looking for the bot's name.
const PUNCTUATION: &[char] = &[',', '.', '，', '。', '!', '?', '！', '？'];

/// Number of leading words searched for the bot's display name.
const NAME_WINDOW: usize = 3;

/// A parsed `/draw` family command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCommand {
    pub size: ImageSize,
    pub description: String,
}

/// Decides whether a message is a draw command and whether it is aimed at the bot.
#[derive(Debug, Clone)]
pub struct AddressingClassifier {
    bot_name: String,
}

impl AddressingClassifier {
    /// `bot_name` is the display name users call the bot by, e.g. "Chloe".
    pub fn new(bot_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
        }
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// Parses `/draw`, `/drawbig` and `/drawsmall` into a size and description.
    pub fn parse_command(&self, text: &str) -> Option<DrawCommand> {
        let captures = DRAW_COMMAND.captures(text)?;
        let size = match &captures[1] {
            "drawbig" => ImageSize::Large,
            "drawsmall" => ImageSize::Small,
            _ => ImageSize::Medium,
        };
        let description = captures[2].trim();
        if description.is_empty() {
            return None;
        }
        Some(DrawCommand {
            size,
            description: description.to_string(),
        })
    }

    /// Direct chats (two members or fewer) are always addressed. In groups the
    /// text must `@mention` the bot or start with its display name.
    pub fn is_addressed(&self, text: &str, member_count: usize, bot_username: &str) -> bool {
        if member_count <= 2 {
            return true;
        }
        self.mentions_username(text, bot_username) || self.leads_with_name(text)
    }

    fn mentions_username(&self, text: &str, bot_username: &str) -> bool {
        if bot_username.is_empty() {
            return false;
        }
        let handle = format!("@{bot_username}");
        text.split_whitespace()
            .any(|token| strip_punctuation(token) == handle)
    }

    fn leads_with_name(&self, text: &str) -> bool {
        if self.bot_name.is_empty() {
            return false;
        }
        text.split_whitespace()
            .flat_map(|token| token.split(PUNCTUATION))
            .take(NAME_WINDOW)
            .any(|fragment| fragment.to_lowercase() == self.bot_name.to_lowercase())
    }
}

fn strip_punctuation(token: &str) -> String {
    token.chars().filter(|c| !PUNCTUATION.contains(c)).collect()
}
