// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted completion provider for deterministic testing.
//!
//! Each call to `complete()` consumes the next [`Step`]. When the script is
//! exhausted, the provider answers `"mock response"`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chloe_core::types::{AdapterType, CompletionRequest, CompletionResponse, HealthStatus};
use chloe_core::{ChloeError, CompletionProvider, PluginAdapter};

/// One scripted outcome of a completion call.
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer with a single choice.
    Reply(String),
    /// Answer with a single choice after a pause.
    Delayed(Duration, String),
    /// Fail with a provider error.
    Fail(String),
    /// Succeed with zero choices.
    Empty,
    /// Never return; only a caller deadline ends the call.
    Hang,
}

/// A completion provider that follows a script and records every request.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    steps: Arc<Mutex<VecDeque<Step>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    /// Answers each call with the next reply in `replies`.
    pub fn with_replies<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::with_steps(replies.into_iter().map(|r| Step::Reply(r.into())))
    }

    pub async fn push(&self, step: Step) {
        self.steps.lock().await.push_back(step);
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ChloeError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChloeError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ChloeError> {
        self.requests.lock().await.push(request);
        let step = self.steps.lock().await.pop_front();
        match step {
            Some(Step::Reply(text)) => Ok(CompletionResponse {
                choices: vec![text],
            }),
            Some(Step::Delayed(pause, text)) => {
                tokio::time::sleep(pause).await;
                Ok(CompletionResponse {
                    choices: vec![text],
                })
            }
            Some(Step::Fail(message)) => Err(ChloeError::provider(message)),
            Some(Step::Empty) => Ok(CompletionResponse::default()),
            Some(Step::Hang) => std::future::pending::<Result<CompletionResponse, ChloeError>>().await,
            None => Ok(CompletionResponse {
                choices: vec!["mock response".to_string()],
            }),
        }
    }
}
