//! Errors - エラー型と分類
//!
//! `DispatchError` が engine 全体のエラー、`ErrorKind` がその運用分類です。

use std::time::Duration;

use thiserror::Error;

use super::ContentHash;
use crate::ports::ApiError;
use crate::rpc::RpcError;
use crate::store::StoreError;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（リトライ推奨）
/// - Permanent: 恒久的なエラー（リトライ無意味）
/// - Infrastructure: 整合性・基盤の障害
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("automation api is not ready: {0}")]
    DependencyNotReady(String),

    #[error("automation api did not signal readiness within {0:?}")]
    ReadyTimeout(Duration),

    #[error("gave up after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("contact not found: {0}")]
    ContactNotFound(String),

    #[error("delivery to {contact} failed with ack {ack}")]
    DeliveryFailed { contact: String, ack: String },

    #[error("message {0} missing from store")]
    StorageMiss(ContentHash),

    #[error("not authenticated, log in to the automation session first")]
    AuthenticationRequired,

    #[error("queue is stopped")]
    QueueStopped,

    #[error("automation api error: {0}")]
    Api(String),

    #[error("attachment fetch failed for {source_ref}: {reason}")]
    AttachmentFetch { source_ref: String, reason: String },

    #[error(transparent)]
    Store(StoreError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::DependencyNotReady(_) => ErrorKind::Transient,
            DispatchError::StorageMiss(_) | DispatchError::Store(_) => ErrorKind::Infrastructure,
            _ => ErrorKind::Permanent,
        }
    }

    /// Only this signature is eligible for the readiness retry loop.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, DispatchError::DependencyNotReady(_))
    }
}

impl From<ApiError> for DispatchError {
    fn from(e: ApiError) -> Self {
        if e.is_not_ready() {
            DispatchError::DependencyNotReady(e.to_string())
        } else {
            DispatchError::Api(e.to_string())
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(hash) => DispatchError::StorageMiss(hash),
            other => DispatchError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_are_classified_by_signature() {
        let not_ready: DispatchError = ApiError::Other("WPP is not ready yet".to_string()).into();
        assert!(not_ready.is_not_ready());
        assert_eq!(not_ready.kind(), ErrorKind::Transient);

        let other: DispatchError = ApiError::Other("invalid wid".to_string()).into();
        assert!(!other.is_not_ready());
        assert_eq!(other.kind(), ErrorKind::Permanent);
    }

    #[test]
    fn store_miss_is_infrastructure() {
        let hash = ContentHash::from_hex("ab");
        let err: DispatchError = StoreError::NotFound(hash.clone()).into();
        assert!(matches!(err, DispatchError::StorageMiss(ref h) if *h == hash));
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }
}
