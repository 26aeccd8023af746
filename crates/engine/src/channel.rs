//! `MessageChannel` — best-effort delivery of state-change notifications.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("message channel closed")]
    Closed,
}

/// Fire-and-forget transport for serialized `StateBundle`s.
///
/// Failures are reported so the caller can log them; nothing is retried.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send(&self, message: String) -> Result<(), ChannelError>;
}

/// Forwards messages into a tokio unbounded channel.
#[derive(Debug, Clone)]
pub struct MpscChannel {
    tx: UnboundedSender<String>,
}

impl MpscChannel {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl MessageChannel for MpscChannel {
    async fn send(&self, message: String) -> Result<(), ChannelError> {
        self.tx.send(message).map_err(|_| ChannelError::Closed)
    }
}
