// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chloe check`: summary of the effective configuration.

use colored::Colorize;

use chloe_config::{ALLOW_ALL, ChloeConfig};

/// Shows only the last four characters of a key.
pub fn redact_key(key: Option<&str>) -> String {
    match key.map(str::trim).filter(|k| !k.is_empty()) {
        None => "<not set>".to_string(),
        Some(k) if k.chars().count() <= 8 => "****".to_string(),
        Some(k) => {
            let tail: String = k.chars().skip(k.chars().count() - 4).collect();
            format!("****{tail}")
        }
    }
}

fn describe_ids(ids: &[String]) -> String {
    if ids.iter().any(|id| id == ALLOW_ALL) {
        "everyone".to_string()
    } else if ids.is_empty() {
        "nobody".to_string()
    } else {
        ids.join(", ")
    }
}

/// Plain-text summary lines, one `key: value` per line.
pub fn summary(config: &ChloeConfig) -> Vec<(&'static str, String)> {
    vec![
        ("agent.name", config.agent.name.clone()),
        ("agent.log_level", config.agent.log_level.clone()),
        ("openai.base_url", config.openai.base_url.clone()),
        ("openai.model", config.openai.model.clone()),
        ("openai.api_key", redact_key(config.openai.api_key.as_deref())),
        (
            "openai.attempts",
            format!(
                "{} x {}s",
                config.openai.max_attempts, config.openai.completion_timeout_secs
            ),
        ),
        (
            "conversation.context_timeout",
            format!("{}s", config.conversation.context_timeout_secs),
        ),
        (
            "conversation.token_budget",
            config.conversation.token_budget.to_string(),
        ),
        (
            "conversation.idle_eviction",
            match config.conversation.idle_eviction_secs {
                0 => "disabled".to_string(),
                secs => format!("{secs}s"),
            },
        ),
        ("access.users", describe_ids(&config.access.allowed_user_ids)),
        ("access.chats", describe_ids(&config.access.allowed_chat_ids)),
        (
            "pool",
            format!(
                "{} workers, queue depth {}",
                config.pool.workers, config.pool.queue_depth
            ),
        ),
        (
            "console",
            if config.console.enabled {
                format!("enabled as {}", config.console.username)
            } else {
                "disabled".to_string()
            },
        ),
    ]
}

pub fn run_check(config: &ChloeConfig) {
    println!("{}", "configuration ok".bold().green());
    for (key, value) in summary(config) {
        println!("  {} {value}", format!("{key:<30}").dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_all_but_the_tail() {
        assert_eq!(redact_key(Some("sk-abcdefghijklmnop")), "****mnop");
        assert_eq!(redact_key(Some("short")), "****");
        assert_eq!(redact_key(Some("   ")), "<not set>");
        assert_eq!(redact_key(None), "<not set>");
    }

    #[test]
    fn summary_never_contains_the_key() {
        let mut config = ChloeConfig::default();
        config.openai.api_key = Some("sk-secret-value-1234".into());
        let lines = summary(&config);
        assert!(lines.iter().all(|(_, v)| !v.contains("secret")));
        assert!(lines.contains(&("openai.api_key", "****1234".to_string())));
    }

    #[test]
    fn access_lists_are_described() {
        assert_eq!(describe_ids(&[]), "nobody");
        assert_eq!(describe_ids(&[ALLOW_ALL.to_string()]), "everyone");
        assert_eq!(
            describe_ids(&["tg-1".to_string(), "tg-2".to_string()]),
            "tg-1, tg-2"
        );
    }
}
