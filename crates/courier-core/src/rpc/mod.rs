//! RPC - 二つの execution context をつなぐ request/response チャネル
//!
//! - **RpcBus**: 全 frame を全 subscriber に配る broadcast bus
//! - **RpcEnvelope**: `{type, id, payload?, error?}` の wire 形式
//! - **RpcEndpoint**: correlation id による応答の突き合わせと handler 実行

pub mod bus;
pub mod endpoint;
pub mod envelope;
pub mod error;

pub use self::bus::RpcBus;
pub use self::endpoint::{DEFAULT_RPC_TIMEOUT, RpcEndpoint};
pub use self::envelope::{ContextRole, EnvelopeKind, RpcEnvelope};
pub use self::error::RpcError;
