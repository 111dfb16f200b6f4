// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Chloe chat assistant.
//!
//! TOML parsing with strict unknown-key rejection, a system/user/local file
//! hierarchy, `CHLOE_*` environment overrides, and miette diagnostics.
//!
//! ```no_run
//! use chloe_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("answering as {}", config.agent.name);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, TomlSource, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{ALLOW_ALL, ChloeConfig};

/// Load configuration from the file hierarchy and validate it.
pub fn load_and_validate() -> Result<ChloeConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<ChloeConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![TomlSource::new(diagnostic::INLINE_SOURCE, toml_content)]
    })
}

/// Load configuration from an explicit file (plus environment) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<ChloeConfig, Vec<ConfigError>> {
    if !path.is_file() {
        return Err(vec![ConfigError::Other(format!(
            "config file `{}` does not exist",
            path.display()
        ))]);
    }
    finish(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

fn finish(
    loaded: Result<ChloeConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<TomlSource>,
) -> Result<ChloeConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Read every config file of the hierarchy that exists, for error span resolution.
fn collect_toml_sources() -> Vec<TomlSource> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG_PATH))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG_PATH.into());
    let user = dirs::config_dir().map(|d| d.join(loader::USER_CONFIG_SUFFIX));

    [Some(local), user, Some(loader::SYSTEM_CONFIG_PATH.into())]
        .into_iter()
        .flatten()
        .filter_map(|path| read_source(&path))
        .collect()
}

fn read_source(path: &Path) -> Option<TomlSource> {
    let content = std::fs::read_to_string(path).ok()?;
    let name = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    Some(TomlSource::new(name.display().to_string(), content))
}
