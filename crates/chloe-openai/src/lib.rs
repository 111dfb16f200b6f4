// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat-completions provider for Chloe.
//!
//! Implements [`CompletionProvider`] with a single round trip per call. The
//! engine's gateway owns deadlines and retries.

pub mod client;
pub mod types;

use async_trait::async_trait;
use tracing::{debug, info};

use chloe_config::model::OpenAiConfig;
use chloe_core::types::{AdapterType, CompletionRequest, CompletionResponse, HealthStatus};
use chloe_core::{ChloeError, ClientCache, CompletionProvider, PluginAdapter};

use crate::client::OpenAiClient;
use crate::types::ChatRequest;

/// Environment variable consulted when the configuration carries no key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub struct OpenAiProvider {
    client: OpenAiClient,
}

impl OpenAiProvider {
    /// Creates a provider from the `[openai]` section.
    ///
    /// The key comes from `openai.api_key`, then `OPENAI_API_KEY`; with
    /// neither set this is a configuration error.
    pub fn new(
        config: &OpenAiConfig,
        cache: &ClientCache<reqwest::Client>,
    ) -> Result<Self, ChloeError> {
        let api_key =
            resolve_api_key(config.api_key.as_deref(), std::env::var(API_KEY_ENV).ok())?;
        let client = OpenAiClient::new(&api_key, &config.base_url, cache)?;
        info!(
            endpoint = client.endpoint(),
            model = config.model.as_str(),
            "OpenAI provider initialized"
        );
        Ok(Self { client })
    }
}

fn resolve_api_key(
    configured: Option<&str>,
    from_env: Option<String>,
) -> Result<String, ChloeError> {
    if let Some(key) = configured.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    from_env
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            ChloeError::Config(format!(
                "OpenAI API key not found. Set openai.api_key, CHLOE_OPENAI_API_KEY or {API_KEY_ENV}."
            ))
        })
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ChloeError> {
        // No probe request: it would spend tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChloeError> {
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ChloeError> {
        let response = self
            .client
            .chat(&ChatRequest {
                model: &request.model,
                messages: &request.messages,
                temperature: request.temperature,
            })
            .await?;

        let choices = response
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .collect();
        Ok(CompletionResponse { choices })
    }
}
