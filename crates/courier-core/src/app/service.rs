//! DispatchService - privileged 側の実行コンテキスト
//!
//! ServiceBuilder::build() が返す。queue / store / gate / endpoint の寿命を
//! まとめて持ち、shutdown() で明示的に片付けます。

use std::sync::Arc;

use crate::queue::{CommandQueue, QueueStatus};
use crate::readiness::{ReadinessGate, Retrier, RetryState};
use crate::rpc::RpcEndpoint;
use crate::store::MessageStore;

pub struct DispatchService {
    endpoint: RpcEndpoint,
    queue: Arc<CommandQueue>,
    store: Arc<MessageStore>,
    gate: ReadinessGate,
    retrier: Arc<Retrier>,
}

impl DispatchService {
    pub(crate) fn new(
        endpoint: RpcEndpoint,
        queue: Arc<CommandQueue>,
        store: Arc<MessageStore>,
        gate: ReadinessGate,
        retrier: Arc<Retrier>,
    ) -> Self {
        Self {
            endpoint,
            queue,
            store,
            gate,
            retrier,
        }
    }

    /// The automation API binding calls `signal_ready()` on this.
    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn endpoint(&self) -> &RpcEndpoint {
        &self.endpoint
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub async fn status(&self) -> QueueStatus {
        self.queue.status().await
    }

    pub fn retry_state(&self) -> RetryState {
        self.retrier.state()
    }

    /// Stop the queue, wait for any in-flight send, then detach from the bus.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
        self.endpoint.shutdown().await;
    }
}
