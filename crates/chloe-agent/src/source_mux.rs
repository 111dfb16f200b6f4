// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source multiplexer that merges several message sources into one stream.
//!
//! On `connect()` every child source is connected and gets a forwarding task
//! that pushes its messages into a shared bounded channel, stamped with the
//! source name. The merged stream ends once every child has closed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chloe_core::types::{AdapterType, HealthStatus, InboundMessage};
use chloe_core::{ChloeError, MessageSource, PluginAdapter};

/// Capacity of the merged inbound channel.
const INBOUND_CAPACITY: usize = 512;

/// Name reported in `SourceClosed` once every child is gone.
const MUX_NAME: &str = "multiplexer";

/// Pause after a failed receive before asking the source again.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct SourceMultiplexer {
    /// Named child sources, stored before connect().
    pending: Vec<(String, Box<dyn MessageSource>)>,
    /// Connected child sources.
    connected: Vec<(String, Arc<dyn MessageSource>)>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    /// Dropped after connect() so the stream closes with the last forwarder.
    inbound_tx: Option<mpsc::Sender<InboundMessage>>,
    /// Stops the forwarding tasks when the multiplexer is dropped.
    forwarders: CancellationToken,
}

impl Default for SourceMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceMultiplexer {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        Self {
            pending: Vec::new(),
            connected: Vec::new(),
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx: Some(inbound_tx),
            forwarders: CancellationToken::new(),
        }
    }

    /// Register a source under `name`. Must be called before `connect()`.
    pub fn add_source(&mut self, name: impl Into<String>, source: Box<dyn MessageSource>) {
        self.pending.push((name.into(), source));
    }

    /// Number of sources registered (pending + connected).
    pub fn source_count(&self) -> usize {
        self.pending.len() + self.connected.len()
    }
}

impl Drop for SourceMultiplexer {
    fn drop(&mut self) {
        self.forwarders.cancel();
    }
}

async fn forward(
    name: String,
    source: Arc<dyn MessageSource>,
    tx: mpsc::Sender<InboundMessage>,
    stop: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            _ = stop.cancelled() => break,
            received = source.receive() => received,
        };
        match received {
            Ok(mut msg) => {
                msg.source = name.clone();
                if tx.send(msg).await.is_err() {
                    break;
                }
            }
            Err(e) if e.is_source_closed() => {
                info!(source = %name, "source closed, stopping forwarder");
                break;
            }
            Err(e) => {
                warn!(source = %name, error = %e, "source receive error");
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => {}
                }
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for SourceMultiplexer {
    fn name(&self) -> &str {
        MUX_NAME
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, ChloeError> {
        let mut reasons = Vec::new();
        for (name, source) in &self.connected {
            match source.health_check().await {
                Ok(HealthStatus::Healthy) => {}
                Ok(HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason)) => {
                    reasons.push(format!("{name}: {reason}"));
                }
                Err(e) => reasons.push(format!("{name}: {e}")),
            }
        }

        if reasons.is_empty() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(reasons.join("; ")))
        }
    }

    async fn shutdown(&self) -> Result<(), ChloeError> {
        self.forwarders.cancel();
        for (name, source) in &self.connected {
            if let Err(e) = source.shutdown().await {
                warn!(source = %name, error = %e, "source shutdown error");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSource for SourceMultiplexer {
    async fn connect(&mut self) -> Result<(), ChloeError> {
        let Some(tx) = self.inbound_tx.take() else {
            return Err(ChloeError::Internal("multiplexer already connected".into()));
        };

        for (name, mut source) in std::mem::take(&mut self.pending) {
            source.connect().await?;
            info!(source = %name, "source connected via multiplexer");

            let source: Arc<dyn MessageSource> = Arc::from(source);
            self.connected.push((name.clone(), Arc::clone(&source)));
            tokio::spawn(forward(name, source, tx.clone(), self.forwarders.clone()));
        }

        info!(sources = self.connected.len(), "source multiplexer connected");
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, ChloeError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| ChloeError::SourceClosed {
            name: MUX_NAME.to_string(),
        })
    }
}
