// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chloe serve`: wires the provider, engine and sources, then runs until
//! a shutdown signal arrives or every source closes.

use std::sync::Arc;

use tracing::info;

use chloe_agent::shutdown;
use chloe_agent::{Dispatcher, MediaServices, SourceMultiplexer};
use chloe_config::ChloeConfig;
use chloe_core::{ChloeError, ClientCache};
use chloe_openai::OpenAiProvider;

use crate::console::{CONSOLE_CHAT_ID, ConsoleChat, ConsoleSource};

/// Command-line overrides for `serve`.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Display name the bot answers to in group chats.
    #[arg(long)]
    pub name: Option<String>,

    /// Completion model.
    #[arg(long)]
    pub model: Option<String>,

    /// API key for the completion backend.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Seconds of inactivity after which a conversation starts fresh.
    #[arg(long, value_name = "SECS")]
    pub context_timeout: Option<u64>,

    /// Read messages from the terminal.
    #[arg(long)]
    pub console: bool,
}

impl ServeArgs {
    /// Apply the flags that were given on top of the loaded configuration.
    pub fn apply(&self, config: &mut ChloeConfig) {
        if let Some(name) = &self.name {
            config.agent.name = name.clone();
        }
        if let Some(model) = &self.model {
            config.openai.model = model.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.openai.api_key = Some(api_key.clone());
        }
        if let Some(secs) = self.context_timeout {
            config.conversation.context_timeout_secs = secs;
        }
        if self.console {
            config.console.enabled = true;
        }
    }
}

pub async fn run_serve(mut config: ChloeConfig) -> Result<(), ChloeError> {
    init_tracing(&config.agent.log_level);
    info!(agent_name = config.agent.name.as_str(), "starting chloe serve");

    let sources = build_sources(&mut config)?;

    let clients = ClientCache::new();
    let provider = Arc::new(OpenAiProvider::new(&config.openai, &clients)?);

    let dispatcher =
        Dispatcher::from_config(&config, sources, provider, MediaServices::default());
    let cancel = shutdown::install_signal_handler();
    dispatcher.run(cancel).await?;

    info!("chloe stopped");
    Ok(())
}

/// Registers every enabled source. The local console chat is always admitted.
fn build_sources(config: &mut ChloeConfig) -> Result<SourceMultiplexer, ChloeError> {
    let mut sources = SourceMultiplexer::new();

    if config.console.enabled {
        if !config.access.allowed_chat_ids.iter().any(|id| id == CONSOLE_CHAT_ID) {
            config.access.allowed_chat_ids.push(CONSOLE_CHAT_ID.to_string());
        }
        let chat = ConsoleChat::stdout(&config.agent.name);
        sources.add_source(
            "console",
            Box::new(ConsoleSource::stdin(&config.console.username, chat)),
        );
    }

    if sources.source_count() == 0 {
        return Err(ChloeError::Config(
            "no message source enabled; pass --console or set console.enabled".into(),
        ));
    }
    Ok(sources)
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chloe={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
