//! Typed - 型付き RPC API
//!
//! request `type` の typo を型で排除し、Handler との対応付けを静的に保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Request` trait, `Handler<R>` trait - 型安全
//! - **内部（Dyn）**: `DynHandler` trait - object-safe, type erasure

pub mod control;
pub mod handler;
pub mod registry;
pub mod request;

pub use self::control::{
    AddLog, GetGroups, PauseQueue, QueueStatusRequest, ResumeQueue, SendMessage, StopQueue,
};
pub use self::handler::{DynHandler, Handler, TypedHandler};
pub use self::registry::{RegistryError, TypedRegistry};
pub use self::request::Request;
