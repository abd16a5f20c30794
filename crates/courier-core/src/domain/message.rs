//! Message content and its content-address.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Attachment descriptor. The bytes stay behind `source` until send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    /// Byte source reference (URL or path) resolved by an `AttachmentFetcher`.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

/// Interactive reply button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    pub text: String,
}

/// The semantic payload of a message: what gets hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
            buttons: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment.is_some()
    }

    /// Deterministic digest over text, attachment identity and buttons.
    ///
    /// `last_modified` and `created_at` are not part of the key.
    pub fn content_hash(&self) -> ContentHash {
        let key = HashKey {
            text: &self.text,
            attachment: self.attachment.as_ref().map(|a| AttachmentKey {
                name: &a.name,
                mime_type: &a.mime_type,
                size: a.size,
                source: &a.source,
            }),
            buttons: &self.buttons,
        };
        // struct field order is fixed, so the encoding is canonical
        let encoded = serde_json::to_vec(&key).unwrap_or_default();
        ContentHash(hex::encode(Sha256::digest(&encoded)))
    }
}

#[derive(Serialize)]
struct HashKey<'a> {
    text: &'a str,
    attachment: Option<AttachmentKey<'a>>,
    buttons: &'a [Button],
}

#[derive(Serialize)]
struct AttachmentKey<'a> {
    name: &'a str,
    mime_type: &'a str,
    size: u64,
    source: &'a str,
}

/// Hex SHA-256 key of a stored message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn from_hex(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A message body as held by the store. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(flatten)]
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
}
