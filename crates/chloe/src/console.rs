// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local console source: stdin lines in, colored replies out.
//!
//! The console is a one-to-one chat, so every line is addressed to the bot.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::{info, warn};

use chloe_core::types::{AdapterType, HealthStatus, InboundMessage, UserProfile};
use chloe_core::{ChatHandle, ChatId, ChloeError, MessageId, MessageSource, PluginAdapter, UserId};

/// Chat id of the console conversation.
pub const CONSOLE_CHAT_ID: &str = "cli-local";

const CONSOLE_PREFIX: &str = "cli";
const SOURCE_NAME: &str = "console";

type Reader = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Prints replies to a terminal (or any writer).
pub struct ConsoleChat {
    id: ChatId,
    bot_name: String,
    out: std::sync::Mutex<Box<dyn Write + Send>>,
}

impl ConsoleChat {
    pub fn stdout(bot_name: &str) -> Arc<Self> {
        Self::with_writer(bot_name, Box::new(std::io::stdout()))
    }

    pub fn with_writer(bot_name: &str, out: Box<dyn Write + Send>) -> Arc<Self> {
        Arc::new(Self {
            id: ChatId::from(CONSOLE_CHAT_ID),
            bot_name: bot_name.to_string(),
            out: std::sync::Mutex::new(out),
        })
    }

    fn print(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush()) {
            warn!(error = %e, "console write failed");
        }
    }

    fn say(&self, text: &str) {
        self.print(&format!("{} {text}", format!("{}>", self.bot_name).green().bold()));
    }
}

#[async_trait]
impl ChatHandle for ConsoleChat {
    fn id(&self) -> &ChatId {
        &self.id
    }

    async fn member_count(&self) -> usize {
        2
    }

    fn bot_username(&self) -> &str {
        ""
    }

    async fn reply_message(&self, text: &str, _to: &MessageId) {
        self.say(text);
    }

    async fn reply_image(&self, path: &Path, _to: &MessageId) {
        self.say(&format!("[image] {}", path.display()).dimmed().to_string());
    }

    async fn reply_voice(&self, path: &Path, _to: &MessageId) {
        self.say(&format!("[voice] {}", path.display()).dimmed().to_string());
    }

    async fn quote_message(&self, text: &str, _to: &MessageId, quote: &str) {
        for line in quote.lines() {
            self.print(&format!("| {line}").dimmed().to_string());
        }
        self.say(text);
    }
}

/// Reads one message per non-blank line until end of input.
pub struct ConsoleSource {
    lines: Mutex<Option<Reader>>,
    open: AtomicBool,
    sender: UserProfile,
    chat: Arc<ConsoleChat>,
}

impl ConsoleSource {
    /// A source on the process's stdin.
    pub fn stdin(username: &str, chat: Arc<ConsoleChat>) -> Self {
        Self::with_reader(Box::new(BufReader::new(tokio::io::stdin())), username, chat)
    }

    pub fn with_reader(
        reader: Box<dyn AsyncBufRead + Send + Unpin>,
        username: &str,
        chat: Arc<ConsoleChat>,
    ) -> Self {
        Self {
            lines: Mutex::new(Some(reader.lines())),
            open: AtomicBool::new(true),
            sender: UserProfile::new(UserId::qualified(CONSOLE_PREFIX, username), username),
            chat,
        }
    }

    pub fn sender(&self) -> &UserProfile {
        &self.sender
    }
}

#[async_trait]
impl PluginAdapter for ConsoleSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, ChloeError> {
        if self.open.load(Ordering::SeqCst) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded("input closed".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), ChloeError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl MessageSource for ConsoleSource {
    async fn connect(&mut self) -> Result<(), ChloeError> {
        info!(user_id = %self.sender.id, "console source connected");
        self.chat.print(
            &"console ready: type a message and press Enter (Ctrl+D to quit)"
                .dimmed()
                .to_string(),
        );
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, ChloeError> {
        let mut guard = self.lines.lock().await;
        loop {
            let Some(lines) = guard.as_mut() else {
                return Err(ChloeError::SourceClosed {
                    name: SOURCE_NAME.into(),
                });
            };
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let text = line.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let chat: Arc<dyn ChatHandle> = self.chat.clone();
                    let id = MessageId::qualified(CONSOLE_PREFIX, uuid::Uuid::new_v4());
                    return Ok(InboundMessage::text(id, self.sender.clone(), chat, text));
                }
                Ok(None) => {
                    *guard = None;
                    self.open.store(false, Ordering::SeqCst);
                    info!("console input closed");
                }
                Err(e) => {
                    return Err(ChloeError::Source {
                        message: format!("failed to read console input: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            }
        }
    }
}
