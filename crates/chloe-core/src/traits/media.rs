// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice and image collaborators.

use std::path::Path;

use async_trait::async_trait;

use crate::error::ChloeError;
use crate::types::{ImageSize, MediaFile};

/// Converts recorded speech into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String, ChloeError>;
}

/// Converts text into a playable audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<MediaFile, ChloeError>;
}

/// Renders an image from a textual description.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, description: &str, size: ImageSize)
    -> Result<MediaFile, ChloeError>;
}
