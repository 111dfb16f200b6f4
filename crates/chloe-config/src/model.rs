// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Chloe chat assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a typo in `chloe.toml`
//! fails at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Wildcard entry in the access lists that admits every user or chat.
pub const ALLOW_ALL: &str = "allow_all";

/// Top-level Chloe configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChloeConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Completion backend settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Conversation window and staleness settings.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// User and chat allow-lists.
    #[serde(default)]
    pub access: AccessConfig,

    /// Per-user task pool sizing.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Local console message source.
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name the bot answers to in group chats.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System directive sent first in every prompt. `{name}` is replaced by
    /// the display name. Defaults to a short helpful-assistant greeting.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl AgentConfig {
    /// The system directive with the display name substituted.
    pub fn greeting(&self) -> String {
        match &self.system_prompt {
            Some(prompt) => prompt.replace("{name}", &self.name),
            None => format!("You are a helpful assistant. Your name is {}.", self.name),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
        }
    }
}

fn default_agent_name() -> String {
    "Chloe".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OpenAI-compatible completion backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` requires the `CHLOE_OPENAI_API_KEY` environment variable or `--api-key`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the chat-completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every completion request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Deadline for a single completion attempt, in seconds.
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,

    /// Total completion attempts before replying with an apology.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            completion_timeout_secs: default_completion_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.9
}

fn default_completion_timeout_secs() -> u64 {
    100
}

fn default_max_attempts() -> u32 {
    3
}

/// Conversation window configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationConfig {
    /// Idle seconds after which a chat's history is discarded on the next question.
    #[serde(default = "default_context_timeout_secs")]
    pub context_timeout_secs: u64,

    /// Approximate token budget (word count) for retained history.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Idle seconds after which a chat's context is evicted from memory. 0 disables eviction.
    #[serde(default = "default_idle_eviction_secs")]
    pub idle_eviction_secs: u64,

    /// Interval between eviction sweeps, in seconds.
    #[serde(default = "default_eviction_sweep_secs")]
    pub eviction_sweep_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            context_timeout_secs: default_context_timeout_secs(),
            token_budget: default_token_budget(),
            idle_eviction_secs: default_idle_eviction_secs(),
            eviction_sweep_secs: default_eviction_sweep_secs(),
        }
    }
}

fn default_context_timeout_secs() -> u64 {
    60
}

fn default_token_budget() -> usize {
    3000
}

fn default_idle_eviction_secs() -> u64 {
    86_400
}

fn default_eviction_sweep_secs() -> u64 {
    300
}

/// Allow-lists of qualified user and chat ids (e.g. `tg-12345`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Users allowed everywhere. `allow_all` admits every user.
    #[serde(default)]
    pub allowed_user_ids: Vec<String>,

    /// Chats whose members are all allowed. `allow_all` admits every chat.
    #[serde(default)]
    pub allowed_chat_ids: Vec<String>,
}

/// Task pool sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum number of messages processed concurrently across all users.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum number of queued messages per user before submission waits.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_depth: default_queue_depth(),
        }
    }
}

fn default_workers() -> usize {
    3
}

fn default_queue_depth() -> usize {
    16
}

/// Console (stdin/stdout) message source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Read messages from stdin when `chloe serve` runs.
    #[serde(default)]
    pub enabled: bool,

    /// Username reported for the local console user.
    #[serde(default = "default_console_username")]
    pub username: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            username: default_console_username(),
        }
    }
}

fn default_console_username() -> String {
    "local".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ChloeConfig::default();
        assert_eq!(config.agent.name, "Chloe");
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.openai.max_attempts, 3);
        assert_eq!(config.openai.completion_timeout_secs, 100);
        assert_eq!(config.conversation.context_timeout_secs, 60);
        assert_eq!(config.conversation.token_budget, 3000);
        assert_eq!(config.pool.workers, 3);
        assert!(config.access.allowed_user_ids.is_empty());
        assert!(!config.console.enabled);
    }

    #[test]
    fn default_greeting_names_the_bot() {
        let agent = AgentConfig {
            name: "Ada".into(),
            ..AgentConfig::default()
        };
        assert_eq!(agent.greeting(), "You are a helpful assistant. Your name is Ada.");
    }

    #[test]
    fn custom_greeting_substitutes_name() {
        let agent = AgentConfig {
            name: "Ada".into(),
            system_prompt: Some("You are {name}, a terse pirate.".into()),
            ..AgentConfig::default()
        };
        assert_eq!(agent.greeting(), "You are Ada, a terse pirate.");
    }

    #[test]
    fn access_section_deserializes() {
        let config: ChloeConfig = toml::from_str(
            r#"
[access]
allowed_user_ids = ["tg-1", "tg-2"]
allowed_chat_ids = ["allow_all"]
"#,
        )
        .unwrap();
        assert_eq!(config.access.allowed_user_ids, vec!["tg-1", "tg-2"]);
        assert_eq!(config.access.allowed_chat_ids, vec![ALLOW_ALL]);
    }

    #[test]
    fn unknown_pool_field_is_rejected() {
        let result = toml::from_str::<ChloeConfig>("[pool]\nworkerz = 4\n");
        assert!(result.is_err());
    }
}
