//! Ports - 抽象化レイヤー
//!
//! engine が外部に依存する箇所はすべてここの trait を通します。
//!
//! - automation API（contact lookup, 送信, 認証, chat 一覧）
//! - 添付ファイルの byte source
//! - key-value 永続化（Message Store の下回り）
//! - UI へのログ配送
//! - 時刻と ID 生成

pub mod automation;
pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod kv_store;

pub use self::automation::{
    AckFuture, ApiError, AttachmentFetcher, AutomationApi, FileKind, FilePayload, SendAck,
};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::LogSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::kv_store::KeyValueStore;
