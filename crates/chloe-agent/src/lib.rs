// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch and conversation engine for the Chloe chat assistant.
//!
//! The [`Dispatcher`] is the central coordinator that:
//! - Receives messages from every connected source
//! - Drops malformed messages and decides access once per message
//! - Queues work on a per-user lane of the [`TaskPool`]
//! - Sweeps idle conversations from the [`ConversationStore`]
//! - Drains outstanding work on shutdown

pub mod access;
pub mod addressing;
pub mod conversation;
pub mod gateway;
pub mod handler;
pub mod pool;
pub mod shutdown;
pub mod source_mux;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use chloe_config::ChloeConfig;
use chloe_core::types::InboundMessage;
use chloe_core::{ChloeError, CompletionProvider, MessageSource, PluginAdapter, UserId};

pub use access::{AccessDecision, AccessGate, AccessReason};
pub use addressing::{AddressingClassifier, DrawCommand};
pub use conversation::{ConversationContext, ConversationSettings, Turn};
pub use gateway::{APOLOGY, CompletionGateway, GatewayPolicy};
pub use handler::{DENIED_CHAT, DENIED_DRAW, Incoming, MediaServices, MessageHandler};
pub use pool::{TaskOutcome, TaskPool};
pub use source_mux::SourceMultiplexer;
pub use store::{ConversationStore, SharedContext};

/// Time allowed for queued work to finish after the loop stops.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Pulls messages from the sources and hands them to per-user task lanes.
pub struct Dispatcher {
    sources: SourceMultiplexer,
    handler: Arc<MessageHandler>,
    pool: TaskPool<UserId>,
    sweep_every: Duration,
    drain_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        sources: SourceMultiplexer,
        handler: MessageHandler,
        pool: TaskPool<UserId>,
        sweep_every: Duration,
    ) -> Self {
        Self {
            sources,
            handler: Arc::new(handler),
            pool,
            sweep_every: sweep_every.max(Duration::from_millis(1)),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Wires the engine from configuration around an already built source set.
    pub fn from_config(
        config: &ChloeConfig,
        sources: SourceMultiplexer,
        provider: Arc<dyn CompletionProvider>,
        media: MediaServices,
    ) -> Self {
        info!(
            agent_name = config.agent.name.as_str(),
            model = config.openai.model.as_str(),
            workers = config.pool.workers,
            "dispatcher initialized"
        );
        Self::new(
            sources,
            MessageHandler::from_config(config, provider, media),
            TaskPool::new(config.pool.workers, config.pool.queue_depth),
            Duration::from_secs(config.conversation.eviction_sweep_secs),
        )
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Shared handle to the message handler, usable after `run` takes the dispatcher.
    pub fn handler(&self) -> Arc<MessageHandler> {
        Arc::clone(&self.handler)
    }

    /// Runs until `cancel` fires or every source has closed, then drains the
    /// pool and shuts the sources down.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ChloeError> {
        self.sources.connect().await?;
        info!(sources = self.sources.source_count(), "dispatcher running");

        let mut sweep =
            tokio::time::interval_at(Instant::now() + self.sweep_every, self.sweep_every);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping dispatcher");
                    break;
                }
                _ = sweep.tick() => {
                    let evicted = self.handler.store().evict_idle(Instant::now());
                    if evicted > 0 {
                        info!(
                            evicted,
                            remaining = self.handler.store().len(),
                            "evicted idle conversations"
                        );
                    }
                }
                received = self.sources.receive() => match received {
                    Ok(message) => self.dispatch(message).await,
                    Err(e) if e.is_source_closed() => {
                        info!("all sources closed, stopping dispatcher");
                        break;
                    }
                    Err(e) => error!(error = %e, "source receive error"),
                },
            }
        }

        if !self.pool.drain(self.drain_timeout).await {
            warn!(
                pending = self.pool.pending(),
                timeout_secs = self.drain_timeout.as_secs(),
                "drain timed out, abandoning queued work"
            );
        }
        self.sources.shutdown().await?;

        info!("dispatcher stopped");
        Ok(())
    }

    async fn dispatch(&self, message: InboundMessage) {
        let source = message.source.clone();
        let incoming = match Incoming::from_message(message) {
            Ok(incoming) => incoming,
            Err(reason) => {
                warn!(source = %source, reason, "dropping malformed message");
                return;
            }
        };

        let user_id = incoming.sender.id.clone();
        let decision = self.handler.access().decide(&user_id, incoming.chat.id());
        debug!(
            source = %source,
            user_id = %user_id,
            chat_id = %incoming.chat.id(),
            ?decision,
            "dispatching message"
        );

        let handler = Arc::clone(&self.handler);
        let allowed = decision.is_allowed();
        let queued = self
            .pool
            .run(user_id.clone(), async move {
                handler.handle(incoming, allowed).await;
                Ok(())
            })
            .await;
        if let Err(e) = queued {
            error!(user_id = %user_id, error = %e, "failed to queue message");
        }
    }
}
