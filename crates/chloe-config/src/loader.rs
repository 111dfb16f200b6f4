// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./chloe.toml` > `~/.config/chloe/chloe.toml` > `/etc/chloe/chloe.toml`,
//! with environment variable overrides via the `CHLOE_` prefix on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChloeConfig;

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chloe/chloe.toml`
/// 3. `~/.config/chloe/chloe.toml`
/// 4. `./chloe.toml`
/// 5. `CHLOE_*` environment variables
pub fn load_config() -> Result<ChloeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<ChloeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChloeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChloeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChloeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ChloeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join(USER_CONFIG_SUFFIX))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/chloe/chloe.toml";
pub(crate) const USER_CONFIG_SUFFIX: &str = "chloe/chloe.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "chloe.toml";

/// Environment provider mapping `CHLOE_SECTION_KEY` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `CHLOE_OPENAI_API_KEY` maps to `openai.api_key` and not `openai.api.key`.
fn env_provider() -> Env {
    const SECTIONS: &[&str] = &["agent", "openai", "conversation", "access", "pool", "console"];

    Env::prefixed("CHLOE_").map(|key| {
        let key_str = key.as_str();
        SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|field| format!("{section}.{field}"))
            })
            .unwrap_or_else(|| key_str.to_string())
            .into()
    })
}
