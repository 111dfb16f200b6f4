// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chloe - a chat assistant answering across message sources.
//!
//! This is the binary entry point.

mod check;
mod console;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use chloe_config::{ChloeConfig, ConfigError};

use crate::serve::ServeArgs;

/// Chloe - a chat assistant answering across message sources.
#[derive(Parser, Debug)]
#[command(name = "chloe", version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the assistant.
    Serve(ServeArgs),
    /// Validate the configuration and print a summary.
    Check,
}

fn load(path: Option<&PathBuf>) -> Result<ChloeConfig, Vec<ConfigError>> {
    match path {
        Some(path) => chloe_config::load_and_validate_path(path),
        None => chloe_config::load_and_validate(),
    }
}

fn config_or_exit(path: Option<&PathBuf>, overrides: Option<&ServeArgs>) -> ChloeConfig {
    let loaded = load(path).and_then(|mut config| {
        if let Some(args) = overrides {
            args.apply(&mut config);
            chloe_config::validation::validate_config(&config)?;
        }
        Ok(config)
    });
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            chloe_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = config_or_exit(cli.config.as_ref(), Some(&args));
            let code = match serve::run_serve(config).await {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            };
            // A pending stdin read would otherwise hold the runtime open.
            std::process::exit(code);
        }
        Commands::Check => {
            let config = config_or_exit(cli.config.as_ref(), None);
            check::run_check(&config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_parse() {
        let cli = Cli::parse_from([
            "chloe",
            "--config",
            "/tmp/chloe.toml",
            "serve",
            "--name",
            "Ava",
            "--context-timeout",
            "90",
            "--console",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/chloe.toml")));
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.name.as_deref(), Some("Ava"));
        assert_eq!(args.context_timeout, Some(90));
        assert!(args.console);
        assert!(args.model.is_none());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["chloe", "check", "--config", "other.toml"]);
        assert!(matches!(cli.command, Commands::Check));
        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
    }

    #[test]
    fn overrides_are_validated() {
        let mut config = ChloeConfig::default();
        ServeArgs {
            model: Some(String::new()),
            ..ServeArgs::default()
        }
        .apply(&mut config);
        let errors = chloe_config::validation::validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("openai.model")));
    }
}
