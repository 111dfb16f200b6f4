// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the message sources, the engine, and the providers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::traits::ChatHandle;

macro_rules! qualified_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Builds a source-qualified identifier, e.g. `tg-12345`.
            pub fn qualified(prefix: &str, raw: impl fmt::Display) -> Self {
                Self(format!("{prefix}-{raw}"))
            }

            /// The source prefix of a qualified identifier, if any.
            pub fn source_tag(&self) -> Option<&str> {
                self.0.split_once('-').map(|(tag, _)| tag)
            }

            /// Returns `true` for the zero value.
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

qualified_id!(
    /// Platform-qualified identifier of a chat (direct or group).
    ChatId
);
qualified_id!(
    /// Platform-qualified identifier of a user.
    UserId
);
qualified_id!(
    /// Platform-qualified identifier of a single message.
    MessageId
);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Source,
    Provider,
    Media,
}

/// The sender of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
}

impl UserProfile {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            first_name: String::new(),
        }
    }
}

/// A file handed between the engine and a collaborator, released exactly once on drop.
///
/// Voice notes downloaded by a source, synthesised speech, and generated images
/// all travel as `MediaFile`s so the owner of the bytes decides how to clean up.
pub struct MediaFile {
    path: PathBuf,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl MediaFile {
    /// A file that needs no cleanup.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            release: None,
        }
    }

    /// A file with a custom release action.
    pub fn with_release(
        path: impl Into<PathBuf>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            release: Some(Box::new(release)),
        }
    }

    /// A temporary file that is removed from disk on drop.
    pub fn temporary(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doomed = path.clone();
        Self::with_release(path, move || {
            if let Err(e) = std::fs::remove_file(&doomed) {
                tracing::debug!(path = %doomed.display(), error = %e, "temporary media already gone");
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MediaFile {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("path", &self.path)
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

/// A message received from a [`MessageSource`](crate::MessageSource).
///
/// `sender` and `chat` are optional because some platform updates arrive
/// without them; the dispatcher drops such messages before queuing.
pub struct InboundMessage {
    pub id: MessageId,
    pub sender: Option<UserProfile>,
    pub chat: Option<Arc<dyn ChatHandle>>,
    pub text: String,
    pub voice: Option<MediaFile>,
    /// Name of the source that produced the message, stamped by the multiplexer.
    pub source: String,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

impl InboundMessage {
    /// A plain text message.
    pub fn text(
        id: MessageId,
        sender: UserProfile,
        chat: Arc<dyn ChatHandle>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            sender: Some(sender),
            chat: Some(chat),
            text: text.into(),
            voice: None,
            source: String::new(),
            received_at: chrono::Utc::now(),
        }
    }

    /// A voice message whose audio lives in `voice`.
    pub fn voice(
        id: MessageId,
        sender: UserProfile,
        chat: Arc<dyn ChatHandle>,
        voice: MediaFile,
    ) -> Self {
        Self {
            voice: Some(voice),
            ..Self::text(id, sender, chat, "")
        }
    }
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("id", &self.id)
            .field("sender", &self.sender)
            .field("chat", &self.chat.as_ref().map(|c| c.id().clone()))
            .field("text", &self.text)
            .field("voice", &self.voice)
            .field("source", &self.source)
            .finish()
    }
}

/// Role of a prompt message sent to the completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged entry of a completion prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A request to a completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub temperature: f32,
}

/// A completion provider's answer. Choices are ordered best-first.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub choices: Vec<String>,
}

/// Size variant requested by a draw command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ImageSize {
    Small,
    Medium,
    Large,
}
