//! courier-core
//!
//! Message-dispatch engine: a UI context issues send requests, a privileged
//! context performs them through an automation API.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, message, task, events, group, errors）
//! - **ports**: 抽象化レイヤー（AutomationApi, AttachmentFetcher, KeyValueStore, LogSink, Clock, IdGenerator）
//! - **store**: content-addressed Message Store
//! - **readiness**: Readiness Gate と bounded retry（RetryPolicy, Retrier）
//! - **rpc**: 二つの context をつなぐ correlated request/response チャネル
//! - **typed**: 型付き Request API（Request trait, Handler trait, TypedRegistry, control surface）
//! - **queue**: 単一 worker の Command Queue
//! - **executor**: 1 タスク分の送信ロジック（Send Executor）
//! - **app**: ServiceBuilder / DispatchService / DispatchClient
//! - **impls**: 実装（InMemoryKvStore, ScriptedAutomation など開発用）
//! - **config**: `COURIER_*` 環境変数からの設定

pub mod app;
pub mod config;
pub mod domain;
pub mod executor;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod readiness;
pub mod rpc;
pub mod store;
pub mod typed;

pub use config::Config;
