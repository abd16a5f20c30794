//! TypedRegistry - Handler の登録と管理
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Generic methods での登録と型安全性
//! - Arc による共有所有権

use super::handler::{DynHandler, Handler, TypedHandler};
use super::request::Request;
use std::collections::HashMap;
use std::sync::Arc;

/// TypedRegistry は request type ごとに一つだけ Handler を保持
///
/// - `register::<R, H>(handler)` で登録
/// - 内部的に TypedHandler でラップして DynHandler に変換
#[derive(Default)]
pub struct TypedRegistry {
    handlers: HashMap<String, Arc<dyn DynHandler>>,
}

/// RegistryError は TypedRegistry の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("a handler for request type '{0}' is already registered")]
    AlreadyRegistered(String),
}

impl TypedRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<R: Request, H: Handler<R> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        let request_type = R::TYPE.to_string();
        if self.handlers.contains_key(&request_type) {
            return Err(RegistryError::AlreadyRegistered(request_type));
        }
        self.handlers
            .insert(request_type, Arc::new(TypedHandler::new(handler)));
        Ok(())
    }

    pub fn get(&self, request_type: &str) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(request_type).cloned()
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}
