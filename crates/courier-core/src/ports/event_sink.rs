//! LogSink port - UI へのログ配送
//!
//! 本番では RPC の ADD_LOG（`impls::RpcLogSink`）、テストでは
//! `impls::RecordingLogSink` を使います。

use async_trait::async_trait;

use crate::domain::LogEvent;

/// 配送は一方向で、失敗しても呼び出し側には返さない。
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn emit(&self, event: LogEvent);
}
