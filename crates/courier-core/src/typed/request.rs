//! Request trait - 型付き RPC リクエストの定義
//!
//! # 学習ポイント
//! - Associated Constants (`const TYPE`)
//! - Associated Types (`type Response`)

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Request は wire 上の `type` とペイロード型・レスポンス型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct PauseQueue;
///
/// impl Request for PauseQueue {
///     const TYPE: &'static str = "PAUSE_QUEUE";
///     type Response = bool;
/// }
/// ```
pub trait Request: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// envelope の `type` フィールド
    const TYPE: &'static str;

    /// Notify（一方向）で使う場合は `()`
    type Response: Serialize + DeserializeOwned + Send + 'static;
}
