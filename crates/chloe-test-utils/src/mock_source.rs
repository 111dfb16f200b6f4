// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock message source for deterministic testing.
//!
//! `MockSource` is cheap to clone; one clone can be boxed into the dispatcher
//! while the test keeps another to inject messages and close the stream.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use chloe_core::types::{AdapterType, HealthStatus, InboundMessage};
use chloe_core::{ChloeError, MessageSource, PluginAdapter};

/// A mock message source backed by an in-memory queue.
#[derive(Clone)]
pub struct MockSource {
    name: String,
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    notify: Arc<Notify>,
    closed: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
}

impl MockSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            closed: Arc::new(AtomicBool::new(false)),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue a message; the next `receive()` returns it.
    pub async fn inject(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// End the stream once the queued messages are consumed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Whether `connect()` has been called on any clone.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub async fn pending(&self) -> usize {
        self.inbound.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, ChloeError> {
        if self.closed.load(Ordering::SeqCst) {
            Ok(HealthStatus::Degraded("closed".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), ChloeError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl MessageSource for MockSource {
    async fn connect(&mut self) -> Result<(), ChloeError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, ChloeError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(ChloeError::SourceClosed {
                    name: self.name.clone(),
                });
            }
            self.notify.notified().await;
        }
    }
}
