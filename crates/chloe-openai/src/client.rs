// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the chat-completions endpoint.
//!
//! Authentication lives in the underlying `reqwest::Client`'s default
//! headers, so one client per API key is built and shared through a
//! [`ClientCache`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;

use chloe_core::{ChloeError, ClientCache};

use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Arc<reqwest::Client>,
    endpoint: String,
}

impl OpenAiClient {
    /// Builds a client for `base_url`, reusing the cached HTTP client for `api_key`.
    pub fn new(
        api_key: &str,
        base_url: &str,
        cache: &ClientCache<reqwest::Client>,
    ) -> Result<Self, ChloeError> {
        let http = cache.get_or_create(api_key, || build_http_client(api_key))?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one request. Deadlines and retries are the caller's concern.
    pub async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, ChloeError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ChloeError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model = request.model, "completion response received");

        let body = response.text().await.map_err(|e| ChloeError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => match api_err.error.type_ {
                    Some(kind) => format!("OpenAI API error ({kind}): {}", api_err.error.message),
                    None => format!("OpenAI API error: {}", api_err.error.message),
                },
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(ChloeError::provider(message));
        }

        serde_json::from_str(&body).map_err(|e| ChloeError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

fn build_http_client(api_key: &str) -> Result<reqwest::Client, ChloeError> {
    let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|e| ChloeError::Config(format!("invalid API key header value: {e}")))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ChloeError::Provider {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}
