use tokio::sync::broadcast;
use tracing::debug;

use super::{RpcEnvelope, RpcError};

/// Shared message channel between the two contexts.
///
/// Frames are JSON text. Every subscriber sees every frame, including its own.
#[derive(Clone)]
pub struct RpcBus {
    tx: broadcast::Sender<String>,
}

impl RpcBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Publishing with no listener is not an error: the caller's timeout covers it.
    pub fn publish(&self, envelope: &RpcEnvelope) -> Result<(), RpcError> {
        let frame =
            serde_json::to_string(envelope).map_err(|e| RpcError::Serialization(e.to_string()))?;
        if self.tx.send(frame).is_err() {
            debug!(request_type = %envelope.request_type, id = %envelope.id, "no listener on bus");
        }
        Ok(())
    }

    pub fn publish_raw(&self, frame: impl Into<String>) {
        let _ = self.tx.send(frame.into());
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
