//! App - アプリケーション層
//!
//! ports とエンジンの各コンポーネントを組み合わせて、二つの context を表します。
//!
//! # 主要コンポーネント
//! - **ServiceBuilder**: privileged 側の構築とワイヤリング（fail-fast）
//! - **DispatchService**: privileged 側。queue / store / gate / endpoint を保持
//! - **DispatchClient**: UI 側の型付き facade

pub mod builder;
pub mod client;
mod handlers;
pub mod service;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, ServiceBuilder};
pub use self::client::DispatchClient;
pub use self::service::DispatchService;
