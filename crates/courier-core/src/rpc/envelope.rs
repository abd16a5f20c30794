//! Wire envelope shared by both execution contexts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::CorrelationId;

/// Which side of the boundary produced an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextRole {
    /// The UI context issuing commands.
    Ui,
    /// The context with access to the automation API.
    Privileged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    Request,
    Response,
    /// One-way; never answered.
    Notify,
}

/// `{type, id, payload?, error?}` plus routing fields for self-filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcEnvelope {
    #[serde(rename = "type")]
    pub request_type: String,
    pub id: CorrelationId,
    pub origin: ContextRole,
    pub kind: EnvelopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcEnvelope {
    pub fn request(
        request_type: impl Into<String>,
        id: CorrelationId,
        origin: ContextRole,
        payload: Value,
    ) -> Self {
        Self {
            request_type: request_type.into(),
            id,
            origin,
            kind: EnvelopeKind::Request,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn notify(
        request_type: impl Into<String>,
        id: CorrelationId,
        origin: ContextRole,
        payload: Value,
    ) -> Self {
        Self {
            kind: EnvelopeKind::Notify,
            ..Self::request(request_type, id, origin, payload)
        }
    }

    /// Reply to `request`, keeping its type and correlation id.
    pub fn reply(request: &RpcEnvelope, origin: ContextRole, result: Result<Value, String>) -> Self {
        let (payload, error) = match result {
            Ok(value) => (Some(value), None),
            Err(message) => (None, Some(message)),
        };
        Self {
            request_type: request.request_type.clone(),
            id: request.id,
            origin,
            kind: EnvelopeKind::Response,
            payload,
            error,
        }
    }
}
