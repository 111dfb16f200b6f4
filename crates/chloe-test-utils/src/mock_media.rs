// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock voice and image collaborators.
//!
//! Produced media are real temporary files so tests can check they exist when
//! delivered and are removed afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chloe_core::types::{ImageSize, MediaFile};
use chloe_core::{ChloeError, ImageGenerator, SpeechSynthesizer, Transcriber};

fn scratch_file(contents: &[u8]) -> Result<PathBuf, ChloeError> {
    let mut file = tempfile::NamedTempFile::new()
        .map_err(|e| ChloeError::Internal(format!("scratch file: {e}")))?;
    std::io::Write::write_all(&mut file, contents)
        .map_err(|e| ChloeError::Internal(format!("scratch file: {e}")))?;
    file.into_temp_path()
        .keep()
        .map_err(|e| ChloeError::Internal(format!("scratch file: {e}")))
}

/// Returns a fixed transcript, or a fixed failure.
pub struct MockTranscriber {
    outcome: Result<String, String>,
    seen: Mutex<Vec<PathBuf>>,
}

impl MockTranscriber {
    pub fn returning(text: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(text.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Audio paths passed to `transcribe`.
    pub async fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<String, ChloeError> {
        self.seen.lock().await.push(audio.to_path_buf());
        self.outcome
            .clone()
            .map_err(|message| ChloeError::Transcription { message })
    }
}

/// Writes the text into a temporary "audio" file.
#[derive(Default)]
pub struct MockSynthesizer {
    fail: bool,
    produced: Mutex<Vec<PathBuf>>,
}

impl MockSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            produced: Mutex::new(Vec::new()),
        })
    }

    /// Paths of every file handed out so far.
    pub async fn produced(&self) -> Vec<PathBuf> {
        self.produced.lock().await.clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<MediaFile, ChloeError> {
        if self.fail {
            return Err(ChloeError::Synthesis {
                message: "mock synthesizer offline".into(),
            });
        }
        let path = scratch_file(text.as_bytes())?;
        self.produced.lock().await.push(path.clone());
        Ok(MediaFile::temporary(path))
    }
}

/// Records draw requests and returns a temporary "image" file.
pub struct MockImageGenerator {
    failure: Option<String>,
    requests: Mutex<Vec<(String, ImageSize)>>,
    produced: Mutex<Vec<PathBuf>>,
}

impl MockImageGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            failure: None,
            requests: Mutex::new(Vec::new()),
            produced: Mutex::new(Vec::new()),
        })
    }

    /// Every call fails with `message`.
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(message.to_string()),
            requests: Mutex::new(Vec::new()),
            produced: Mutex::new(Vec::new()),
        })
    }

    pub async fn requests(&self) -> Vec<(String, ImageSize)> {
        self.requests.lock().await.clone()
    }

    pub async fn produced(&self) -> Vec<PathBuf> {
        self.produced.lock().await.clone()
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate(
        &self,
        description: &str,
        size: ImageSize,
    ) -> Result<MediaFile, ChloeError> {
        self.requests
            .lock()
            .await
            .push((description.to_string(), size));
        if let Some(message) = &self.failure {
            return Err(ChloeError::ImageGeneration {
                message: message.clone(),
            });
        }
        let path = scratch_file(format!("{size}:{description}").as_bytes())?;
        self.produced.lock().await.push(path.clone());
        Ok(MediaFile::temporary(path))
    }
}
