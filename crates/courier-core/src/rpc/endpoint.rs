//! RpcEndpoint - 片側の context に一つ
//!
//! 送信側は correlation id ごとに oneshot を保留し、listener が response を
//! 突き合わせます。受信側は TypedRegistry から handler を引いて実行し、
//! 同じ id で response を返します（Notify には返しません）。
//!
//! 受信した request / notify は `type` ごとの lane で到着順に処理します。
//! 同じ type（SEND_MESSAGE や ADD_LOG）の順序は保たれ、別 type 同士は並行に進みます。
//!
//! handler が endpoint 自身の clone を保持する場合は循環参照になるので、
//! 後始末には `shutdown` を呼んでください。それ以外は最後の clone の drop で listener が止まります。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{ContextRole, EnvelopeKind, RpcBus, RpcEnvelope, RpcError};
use crate::domain::CorrelationId;
use crate::ports::IdGenerator;
use crate::typed::{DynHandler, Handler, Request, TypedRegistry};

/// Default window a caller waits for its response.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(15);

type PendingReply = oneshot::Sender<Result<Value, RpcError>>;

struct Inner {
    role: ContextRole,
    bus: RpcBus,
    ids: Arc<dyn IdGenerator>,
    timeout: Duration,
    pending: Mutex<HashMap<CorrelationId, PendingReply>>,
    handlers: RwLock<TypedRegistry>,
}

#[derive(Clone)]
pub struct RpcEndpoint {
    inner: Arc<Inner>,
    listener: Arc<Listener>,
}

/// Aborts the listener task once the last endpoint clone is gone.
struct Listener(JoinHandle<()>);

impl Drop for Listener {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl RpcEndpoint {
    /// Subscribe to `bus` and start listening. Must be called inside a tokio runtime.
    pub fn start(
        role: ContextRole,
        bus: RpcBus,
        ids: Arc<dyn IdGenerator>,
        timeout: Duration,
    ) -> Self {
        let rx = bus.subscribe();
        let inner = Arc::new(Inner {
            role,
            bus,
            ids,
            timeout,
            pending: Mutex::new(HashMap::new()),
            handlers: RwLock::new(TypedRegistry::new()),
        });
        let listener = tokio::spawn(listen(Arc::clone(&inner), rx));
        Self {
            inner,
            listener: Arc::new(Listener(listener)),
        }
    }

    /// Send a typed request and wait for the peer's typed response.
    pub async fn call<R: Request>(&self, request: R) -> Result<R::Response, RpcError> {
        let payload =
            serde_json::to_value(&request).map_err(|e| RpcError::Serialization(e.to_string()))?;
        let value = self.call_raw(R::TYPE, payload).await?;
        serde_json::from_value(value).map_err(|e| {
            RpcError::Serialization(format!("json decode {} response: {e}", R::TYPE))
        })
    }

    pub async fn call_raw(&self, request_type: &str, payload: Value) -> Result<Value, RpcError> {
        let id = self.inner.ids.generate_correlation_id();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(id, tx);

        let envelope = RpcEnvelope::request(request_type, id, self.inner.role, payload);
        if let Err(e) = self.inner.bus.publish(&envelope) {
            self.inner.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.inner.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcError::Closed),
            Err(_) => {
                // a late response for this id is discarded by the listener
                self.inner.pending.lock().await.remove(&id);
                warn!(request_type, %id, after = ?self.inner.timeout, "rpc call timed out");
                Err(RpcError::Timeout {
                    request_type: request_type.to_string(),
                    after: self.inner.timeout,
                })
            }
        }
    }

    /// Fire-and-forget.
    pub async fn notify<R: Request>(&self, request: R) -> Result<(), RpcError> {
        let payload =
            serde_json::to_value(&request).map_err(|e| RpcError::Serialization(e.to_string()))?;
        let id = self.inner.ids.generate_correlation_id();
        self.inner
            .bus
            .publish(&RpcEnvelope::notify(R::TYPE, id, self.inner.role, payload))
    }

    /// At most one handler per request type per endpoint.
    pub async fn add_handler<R: Request, H: Handler<R> + 'static>(
        &self,
        handler: H,
    ) -> Result<(), RpcError> {
        self.inner.handlers.write().await.register::<R, H>(handler)?;
        debug!(role = ?self.inner.role, request_type = R::TYPE, "handler registered");
        Ok(())
    }

    pub async fn handled_types(&self) -> Vec<String> {
        self.inner.handlers.read().await.registered_types()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    /// Stop listening, fail every pending call with `Closed`, drop all handlers.
    pub async fn shutdown(&self) {
        self.listener.0.abort();
        let drained: Vec<_> = self.inner.pending.lock().await.drain().collect();
        for (_, tx) in drained {
            let _ = tx.send(Err(RpcError::Closed));
        }
        self.inner.handlers.write().await.clear();
    }
}

async fn listen(inner: Arc<Inner>, mut rx: broadcast::Receiver<String>) {
    let mut lanes: HashMap<String, mpsc::UnboundedSender<Incoming>> = HashMap::new();

    loop {
        let frame = match rx.recv().await {
            Ok(frame) => frame,
            Err(RecvError::Lagged(skipped)) => {
                warn!(role = ?inner.role, skipped, "rpc listener lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let envelope: RpcEnvelope = match serde_json::from_str(&frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "ignoring malformed frame");
                continue;
            }
        };

        if envelope.origin == inner.role {
            continue;
        }

        match envelope.kind {
            EnvelopeKind::Response => resolve(&inner, envelope).await,
            EnvelopeKind::Request | EnvelopeKind::Notify => {
                dispatch(&inner, &mut lanes, envelope).await
            }
        }
    }
}

async fn resolve(inner: &Inner, envelope: RpcEnvelope) {
    let Some(tx) = inner.pending.lock().await.remove(&envelope.id) else {
        debug!(request_type = %envelope.request_type, id = %envelope.id, "discarding unmatched response");
        return;
    };
    let result = match envelope.error {
        Some(message) => Err(RpcError::Remote {
            request_type: envelope.request_type,
            message,
        }),
        None => Ok(envelope.payload.unwrap_or(Value::Null)),
    };
    let _ = tx.send(result);
}

struct Incoming {
    handler: Arc<dyn DynHandler>,
    envelope: RpcEnvelope,
}

/// Hand the frame to the lane for its type, spawning the lane on first use.
async fn dispatch(
    inner: &Arc<Inner>,
    lanes: &mut HashMap<String, mpsc::UnboundedSender<Incoming>>,
    envelope: RpcEnvelope,
) {
    let Some(handler) = inner.handlers.read().await.get(&envelope.request_type) else {
        debug!(role = ?inner.role, request_type = %envelope.request_type, "no handler, ignoring");
        return;
    };

    let lane = lanes.entry(envelope.request_type.clone()).or_insert_with(|| {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_lane(Arc::clone(inner), rx));
        tx
    });
    if lane.send(Incoming { handler, envelope }).is_err() {
        warn!(role = ?inner.role, "handler lane closed, frame dropped");
    }
}

// handlers may run long (SEND_MESSAGE waits for readiness); only their own lane waits
async fn run_lane(inner: Arc<Inner>, mut rx: mpsc::UnboundedReceiver<Incoming>) {
    while let Some(Incoming { handler, envelope }) = rx.recv().await {
        let payload = envelope.payload.clone().unwrap_or(Value::Null);
        let result = handler.handle_dyn(payload).await;
        if envelope.kind == EnvelopeKind::Notify {
            if let Err(message) = result {
                warn!(request_type = %envelope.request_type, %message, "notify handler failed");
            }
            continue;
        }
        let reply = RpcEnvelope::reply(&envelope, inner.role, result);
        if let Err(e) = inner.bus.publish(&reply) {
            warn!(request_type = %envelope.request_type, error = %e, "failed to publish response");
        }
    }
}
