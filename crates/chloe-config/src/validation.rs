// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks ranges and non-empty strings that serde attributes cannot express.
//! Every problem is collected so a single run reports all of them.

use crate::diagnostic::ConfigError;
use crate::model::ChloeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &ChloeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.agent.name.trim().is_empty() {
        errors.push(ConfigError::invalid("agent.name", "must not be empty"));
    }
    if !LOG_LEVELS.contains(&config.agent.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::invalid(
            "agent.log_level",
            format!(
                "must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.agent.log_level
            ),
        ));
    }

    let openai = &config.openai;
    if openai.model.trim().is_empty() {
        errors.push(ConfigError::invalid("openai.model", "must not be empty"));
    }
    if !openai.base_url.starts_with("http://") && !openai.base_url.starts_with("https://") {
        errors.push(ConfigError::invalid(
            "openai.base_url",
            format!("must be an http(s) URL, got `{}`", openai.base_url),
        ));
    }
    if !(0.0..=2.0).contains(&openai.temperature) {
        errors.push(ConfigError::invalid(
            "openai.temperature",
            format!("must be between 0.0 and 2.0, got {}", openai.temperature),
        ));
    }
    if openai.completion_timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "openai.completion_timeout_secs",
            "must be positive",
        ));
    }
    if !(1..=MAX_ATTEMPTS_LIMIT).contains(&openai.max_attempts) {
        errors.push(ConfigError::invalid(
            "openai.max_attempts",
            format!(
                "must be between 1 and {MAX_ATTEMPTS_LIMIT}, got {}",
                openai.max_attempts
            ),
        ));
    }

    let conversation = &config.conversation;
    if conversation.context_timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "conversation.context_timeout_secs",
            "must be positive",
        ));
    }
    if conversation.token_budget == 0 {
        errors.push(ConfigError::invalid(
            "conversation.token_budget",
            "must be at least 1",
        ));
    }
    if conversation.eviction_sweep_secs == 0 {
        errors.push(ConfigError::invalid(
            "conversation.eviction_sweep_secs",
            "must be positive",
        ));
    }

    if config.pool.workers == 0 {
        errors.push(ConfigError::invalid("pool.workers", "must be at least 1"));
    }
    if config.pool.queue_depth == 0 {
        errors.push(ConfigError::invalid("pool.queue_depth", "must be at least 1"));
    }

    for (key, ids) in [
        ("access.allowed_user_ids", &config.access.allowed_user_ids),
        ("access.allowed_chat_ids", &config.access.allowed_chat_ids),
    ] {
        if ids.iter().any(|id| id.trim().is_empty()) {
            errors.push(ConfigError::invalid(key, "must not contain empty ids"));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
