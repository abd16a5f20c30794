//! Handler trait - Request に応答する Handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (Handler<R>)
//! - Object-safe trait (DynHandler)
//! - Type erasure パターン (TypedHandler<R, H> → DynHandler)

use super::request::Request;
use crate::domain::DispatchError;
use async_trait::async_trait;
use std::marker::PhantomData;

/// Handler は Request を処理して Response を返す
///
/// - `Handler<PauseQueue>` は `PauseQueue` しか受け取れない
/// - エラーは envelope の `error` に文字列として載る
#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    async fn handle(&self, request: R) -> Result<R::Response, DispatchError>;
}

/// DynHandler は object-safe な Handler の抽象化
///
/// HashMap<String, Arc<dyn DynHandler>> に格納するための型消去層です。
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, payload: serde_json::Value) -> Result<serde_json::Value, String>;
    fn request_type(&self) -> &'static str;
}

pub struct TypedHandler<R: Request, H: Handler<R>> {
    handler: H,
    _marker: PhantomData<R>,
}

impl<R: Request, H: Handler<R>> TypedHandler<R, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Request, H: Handler<R>> DynHandler for TypedHandler<R, H> {
    async fn handle_dyn(&self, payload: serde_json::Value) -> Result<serde_json::Value, String> {
        let request: R = serde_json::from_value(payload)
            .map_err(|e| format!("json decode {}: {e}", R::TYPE))?;
        let response = self
            .handler
            .handle(request)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(response).map_err(|e| format!("json encode {}: {e}", R::TYPE))
    }

    fn request_type(&self) -> &'static str {
        R::TYPE
    }
}
