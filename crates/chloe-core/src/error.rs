// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Chloe chat assistant.

use thiserror::Error;

/// The primary error type used across all Chloe collaborator traits and engine operations.
#[derive(Debug, Error)]
pub enum ChloeError {
    /// Configuration errors (missing credentials, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Message source errors (connection failure, malformed update).
    #[error("source error: {message}")]
    Source {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A message source has no more messages and will never produce any again.
    #[error("message source `{name}` closed")]
    SourceClosed { name: String },

    /// Completion provider errors (transport failure, rate limiting, bad response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Speech-to-text conversion failed.
    #[error("transcription failed: {message}")]
    Transcription { message: String },

    /// Text-to-speech conversion failed.
    #[error("speech synthesis failed: {message}")]
    Synthesis { message: String },

    /// Image generation failed. The message is relayed to the user verbatim.
    #[error("image generation failed: {message}")]
    ImageGeneration { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChloeError {
    /// Shorthand for a provider error without an underlying cause.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` if this error marks the end of a message source.
    pub fn is_source_closed(&self) -> bool {
        matches!(self, Self::SourceClosed { .. })
    }
}
