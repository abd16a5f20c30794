//! AutomationApi port - 外部 automation API の能力インターフェース
//!
//! contact lookup / 送信 / 認証状態 / chat 一覧だけを抽象化します。
//! readiness の push 通知は `ReadinessGate::signal_ready` で受け取ります。

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Button, RawChat};

/// Lower-cased fragments that mark an error as "dependency not ready yet".
const NOT_READY_SIGNATURES: &[&str] = &[
    "not ready",
    "not initialized",
    "not loaded",
    "webpack",
    "is not defined",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("not ready: {0}")]
    NotReady(String),

    #[error("{0}")]
    Other(String),
}

impl ApiError {
    pub fn is_not_ready(&self) -> bool {
        match self {
            ApiError::NotReady(_) => true,
            ApiError::Other(message) => {
                let message = message.to_lowercase();
                NOT_READY_SIGNATURES.iter().any(|sig| message.contains(sig))
            }
        }
    }
}

/// Delivery acknowledgment, resolved after the send call returned.
pub type AckFuture = BoxFuture<'static, Result<SendAck, ApiError>>;

/// Raw result code of a delivery acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAck(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum AckShape {
    Wrapped {
        #[serde(rename = "messageSendResult")]
        message_send_result: String,
    },
    Code(String),
}

impl SendAck {
    /// Canonical success code of the automation API.
    pub const SUCCESS: &'static str = "OK";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn ok() -> Self {
        Self::new(Self::SUCCESS)
    }

    /// Accepts both the bare code and the `{ messageSendResult }` wrapper.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ApiError> {
        match serde_json::from_value::<AckShape>(value.clone()) {
            Ok(AckShape::Wrapped { message_send_result }) => Ok(Self(message_send_result)),
            Ok(AckShape::Code(code)) => Ok(Self(code)),
            Err(_) => Err(ApiError::Other(format!("unrecognized ack shape: {value}"))),
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_success(&self) -> bool {
        self.0 == Self::SUCCESS
    }
}

/// How the API should present a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Forced image rendering; required when buttons are attached.
    Image,
    AutoDetect,
}

/// Materialized attachment, built right before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    pub mime_type: String,
    pub last_modified: Option<i64>,
    pub kind: FileKind,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait AutomationApi: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool, ApiError>;

    /// Returns the canonical contact id when the destination exists.
    async fn query_exists(&self, contact: &str) -> Result<Option<String>, ApiError>;

    async fn send_text(
        &self,
        to: &str,
        text: &str,
        buttons: &[Button],
    ) -> Result<AckFuture, ApiError>;

    async fn send_file(
        &self,
        to: &str,
        file: FilePayload,
        caption: &str,
        buttons: &[Button],
    ) -> Result<AckFuture, ApiError>;

    async fn list_chats(&self) -> Result<Vec<RawChat>, ApiError>;
}

/// Resolves an attachment's byte source reference.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>, ApiError>;
}
