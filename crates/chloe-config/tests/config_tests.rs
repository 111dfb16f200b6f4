// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Chloe configuration system.

use std::io::Write;

use chloe_config::{ConfigError, load_and_validate_path, load_and_validate_str, load_config_from_str};

/// A file exercising every section deserializes.
#[test]
fn full_config_deserializes() {
    let toml = r#"
[agent]
name = "Ada"
log_level = "debug"

[openai]
api_key = "sk-test"
base_url = "http://localhost:8080/v1"
model = "gpt-4o-mini"
temperature = 0.2
completion_timeout_secs = 30
max_attempts = 5

[conversation]
context_timeout_secs = 120
token_budget = 1500
idle_eviction_secs = 0
eviction_sweep_secs = 60

[access]
allowed_user_ids = ["tg-1"]
allowed_chat_ids = ["tg-100", "allow_all"]

[pool]
workers = 8
queue_depth = 4

[console]
enabled = true
username = "me"
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.agent.name, "Ada");
    assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.openai.max_attempts, 5);
    assert_eq!(config.conversation.token_budget, 1500);
    assert_eq!(config.conversation.idle_eviction_secs, 0);
    assert_eq!(config.access.allowed_chat_ids.len(), 2);
    assert_eq!(config.pool.workers, 8);
    assert!(config.console.enabled);
}

/// Missing sections fall back to defaults.
#[test]
fn empty_config_uses_defaults() {
    let config = load_config_from_str("").expect("empty config");
    assert_eq!(config.agent.name, "Chloe");
    assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    assert_eq!(config.conversation.eviction_sweep_secs, 300);
}

/// A misspelled key produces an UnknownKey diagnostic with a suggestion.
#[test]
fn misspelled_key_gets_suggestion() {
    let toml = "[conversation]\ncontext_timout_secs = 10\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "context_timout_secs" && s == "context_timeout_secs"
        )
    });
    assert!(found, "expected a suggestion, got {errors:?}");
}

/// A string where a number belongs produces an InvalidType diagnostic.
#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[pool]\nworkers = \"many\"\n").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key == "pool.workers")),
        "got {errors:?}"
    );
}

/// Semantically invalid values are rejected after deserialization.
#[test]
fn out_of_range_values_fail_validation() {
    let errors = load_and_validate_str("[openai]\nmax_attempts = 0\n").unwrap_err();
    assert!(matches!(
        &errors[0],
        ConfigError::Validation { key, .. } if key == "openai.max_attempts"
    ));
}

/// An explicit path is loaded and validated.
#[test]
fn explicit_path_loads() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[agent]\nname = \"FromFile\"").unwrap();

    let config = load_and_validate_path(file.path()).expect("valid file");
    assert_eq!(config.agent.name, "FromFile");
}

/// A missing explicit path is an error instead of silently using defaults.
#[test]
fn missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let errors = load_and_validate_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(errors[0].to_string().contains("does not exist"));
}
