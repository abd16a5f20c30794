//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryKvStore**: Message Store の下回り
//! - **ScriptedAutomation** / **InMemoryFetcher**: 台本どおりの automation API と添付 byte source
//! - **RpcLogSink**: ADD_LOG を UI 側へ送る本番用 LogSink
//! - **RecordingLogSink**: テスト用 LogSink
//!
//! # 本番用実装
//! 実際の automation API binding はこの crate の外に置き、
//! `AutomationApi` trait を実装して `ServiceBuilder` に渡します。

pub mod inmem_kv;
pub mod log_sink;
pub mod scripted;

pub use self::inmem_kv::InMemoryKvStore;
pub use self::log_sink::{RecordingLogSink, RpcLogSink};
pub use self::scripted::{InMemoryFetcher, ScriptedAutomation, SentMessage};
