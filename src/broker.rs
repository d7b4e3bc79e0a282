//! Broker collaborator seams used by the publish loop.
//!
//! The controller only sees [`Connector`] and [`Publisher`]; the MQTT client
//! lives behind them in [`crate::mqtt`]. [`DryRunBroker`] stands in for it
//! when nothing should leave the process, and [`MemoryBroker`] records
//! publications for tests.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Fire-and-forget publication of one payload.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> Result<()>;
}

/// Opens one broker session per Running period.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn Publisher>>;
}

/// Connection state reported by a broker session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No session opened yet
    Idle,
    Connecting,
    Connected,
    /// Broker answered with a non-success return code
    Refused(String),
    /// Transport level failure
    Failed(String),
}

/// A payload captured by [`MemoryBroker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: String,
}

/// In-process broker that records every publication
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    messages: Arc<Mutex<Vec<PublishedMessage>>>,
    sessions: Arc<AtomicUsize>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Number of sessions opened through [`Connector::connect`].
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Publisher for MemoryBroker {
    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        debug!("memory broker: {} <- {}", topic, payload);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(PublishedMessage {
                topic: topic.to_string(),
                payload,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for MemoryBroker {
    async fn connect(&self) -> Result<Arc<dyn Publisher>> {
        self.sessions.fetch_add(1, Ordering::AcqRel);
        Ok(Arc::new(self.clone()))
    }
}

/// Broker that drops every payload, keeping only a count
#[derive(Debug, Clone, Default)]
pub struct DryRunBroker {
    published: Arc<AtomicU64>,
}

impl DryRunBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads discarded so far, across all sessions.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Publisher for DryRunBroker {
    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        debug!("dry run: {} <- {}", topic, payload);
        self.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl Connector for DryRunBroker {
    async fn connect(&self) -> Result<Arc<dyn Publisher>> {
        Ok(Arc::new(self.clone()))
    }
}
