use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ContentHash, MessageContent, TaskId};

/// UI から届く送信依頼（SEND_MESSAGE の payload）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub contact: String,
    #[serde(flatten)]
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl SendRequest {
    pub fn new(contact: impl Into<String>, content: MessageContent) -> Self {
        Self {
            contact: contact.into(),
            content,
            delay_ms: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Some(delay.as_millis() as u64);
        self
    }
}

/// Queue 内の“運搬用”データ。本文は持たず ContentHash で参照する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTask {
    pub id: TaskId,
    pub destination: String,
    pub hash: ContentHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_delay_ms: Option<u64>,
    pub enqueued_at: DateTime<Utc>,
}

impl SendTask {
    pub fn min_delay(&self) -> Option<Duration> {
        self.min_delay_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
