//! DispatchClient - UI 側の型付き facade
//!
//! 制御系はすべて RPC call、ログは ADD_LOG notify を handler で受け取ります。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{DispatchError, GroupRecord, LogEvent, SendRequest};
use crate::ports::{SystemClock, UlidGenerator};
use crate::queue::QueueStatus;
use crate::rpc::{ContextRole, RpcBus, RpcEndpoint, RpcError};
use crate::typed::{
    AddLog, GetGroups, Handler, PauseQueue, QueueStatusRequest, ResumeQueue, SendMessage,
    StopQueue,
};

#[derive(Clone)]
pub struct DispatchClient {
    endpoint: RpcEndpoint,
}

struct LogForwarder<F>(F);

#[async_trait]
impl<F> Handler<AddLog> for LogForwarder<F>
where
    F: Fn(LogEvent) + Send + Sync + 'static,
{
    async fn handle(&self, request: AddLog) -> Result<(), DispatchError> {
        (self.0)(request.0);
        Ok(())
    }
}

impl DispatchClient {
    /// Attach a UI-side endpoint to `bus`.
    pub fn connect(bus: &RpcBus, timeout: Duration) -> Self {
        let endpoint = RpcEndpoint::start(
            ContextRole::Ui,
            bus.clone(),
            Arc::new(UlidGenerator::new(SystemClock)),
            timeout,
        );
        Self { endpoint }
    }

    /// `true` once the message is stored and queued. Delivery is reported via the log channel.
    pub async fn send_message(&self, request: SendRequest) -> Result<bool, RpcError> {
        self.endpoint.call(SendMessage(request)).await
    }

    pub async fn pause(&self) -> Result<bool, RpcError> {
        self.endpoint.call(PauseQueue).await
    }

    pub async fn resume(&self) -> Result<bool, RpcError> {
        self.endpoint.call(ResumeQueue).await
    }

    pub async fn stop(&self) -> Result<bool, RpcError> {
        self.endpoint.call(StopQueue).await
    }

    pub async fn status(&self) -> Result<QueueStatus, RpcError> {
        self.endpoint.call(QueueStatusRequest).await
    }

    pub async fn groups(&self) -> Result<Vec<GroupRecord>, RpcError> {
        self.endpoint.call(GetGroups).await
    }

    /// Register the log callback. Only one per client.
    pub async fn on_log<F>(&self, callback: F) -> Result<(), RpcError>
    where
        F: Fn(LogEvent) + Send + Sync + 'static,
    {
        self.endpoint
            .add_handler::<AddLog, _>(LogForwarder(callback))
            .await
    }

    /// `on_log` as a channel.
    pub async fn log_channel(&self) -> Result<mpsc::UnboundedReceiver<LogEvent>, RpcError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.on_log(move |event| {
            let _ = tx.send(event);
        })
        .await?;
        Ok(rx)
    }

    pub async fn shutdown(&self) {
        self.endpoint.shutdown().await;
    }
}
