// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Chloe integration tests.
//!
//! Mock collaborators for fast, deterministic tests without a chat platform
//! or a completion backend.
//!
//! - [`MockSource`] - message source with injection and explicit close
//! - [`MockChat`] - chat handle that captures replies
//! - [`ScriptedProvider`] - completion provider following a script of [`Step`]s
//! - [`MockTranscriber`], [`MockSynthesizer`], [`MockImageGenerator`] - media services

pub mod mock_chat;
pub mod mock_media;
pub mod mock_provider;
pub mod mock_source;

use std::sync::Arc;

use chloe_core::types::{InboundMessage, MediaFile, UserProfile};
use chloe_core::{ChatHandle, MessageId, UserId};

pub use mock_chat::{MockChat, Reply};
pub use mock_media::{MockImageGenerator, MockSynthesizer, MockTranscriber};
pub use mock_provider::{ScriptedProvider, Step};
pub use mock_source::MockSource;

/// A sender profile with the given qualified id and username.
pub fn user(id: &str, username: &str) -> UserProfile {
    UserProfile::new(UserId::from(id), username)
}

fn next_message_id() -> MessageId {
    MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4()))
}

/// A text message from `sender` in `chat` with a fresh message id.
pub fn text_message<C: ChatHandle + 'static>(
    chat: &Arc<C>,
    sender: &UserProfile,
    text: &str,
) -> InboundMessage {
    let chat: Arc<dyn ChatHandle> = chat.clone();
    InboundMessage::text(next_message_id(), sender.clone(), chat, text)
}

/// A voice message whose audio is a temporary file removed on drop.
pub fn voice_message<C: ChatHandle + 'static>(
    chat: &Arc<C>,
    sender: &UserProfile,
) -> InboundMessage {
    let path = tempfile::Builder::new()
        .suffix(".ogg")
        .tempfile()
        .expect("create voice fixture")
        .into_temp_path()
        .keep()
        .expect("persist voice fixture");
    let chat: Arc<dyn ChatHandle> = chat.clone();
    InboundMessage::voice(next_message_id(), sender.clone(), chat, MediaFile::temporary(path))
}
