//! LogSink 実装
//!
//! - **RpcLogSink**: 本番経路。ADD_LOG を UI 側へ notify する
//! - **RecordingLogSink**: テスト用に全イベントを保持する

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::LogEvent;
use crate::ports::LogSink;
use crate::rpc::RpcEndpoint;
use crate::typed::AddLog;

pub struct RpcLogSink {
    endpoint: RpcEndpoint,
}

impl RpcLogSink {
    pub fn new(endpoint: RpcEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl LogSink for RpcLogSink {
    async fn emit(&self, event: LogEvent) {
        if let Err(e) = self.endpoint.notify(AddLog(event)).await {
            warn!(error = %e, "failed to deliver ADD_LOG");
        }
    }
}

#[derive(Default)]
pub struct RecordingLogSink {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<LogEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl LogSink for RecordingLogSink {
    async fn emit(&self, event: LogEvent) {
        self.events.lock().await.push(event);
    }
}
