//! Message Store: content-addressed message bodies.
//!
//! Queue entries and RPC envelopes carry only a `ContentHash`; the body and
//! the attachment descriptor cross the context boundary once, on SEND_MESSAGE.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::{ContentHash, MessageContent, StoredMessage};
use crate::ports::{Clock, KeyValueStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no stored message for hash {0}")]
    NotFound(ContentHash),

    #[error("stored message {hash} is corrupt: {reason}")]
    Corrupt { hash: ContentHash, reason: String },

    #[error("storage backend failed: {0}")]
    Backend(String),
}

pub struct MessageStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl MessageStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Store `content` under its content hash.
    ///
    /// Idempotent: an existing entry is left untouched, so the first
    /// `created_at` wins even when identical puts race.
    pub async fn put(&self, content: MessageContent) -> Result<ContentHash, StoreError> {
        let hash = content.content_hash();
        let stored = StoredMessage {
            content,
            created_at: self.clock.now(),
        };
        let value = serde_json::to_value(&stored).map_err(|e| StoreError::Corrupt {
            hash: hash.clone(),
            reason: e.to_string(),
        })?;
        if self.kv.put_if_absent(hash.as_str(), value).await? {
            debug!(hash = %hash, "message stored");
        } else {
            debug!(hash = %hash, "message already stored");
        }
        Ok(hash)
    }

    pub async fn get(&self, hash: &ContentHash) -> Result<StoredMessage, StoreError> {
        let value = self
            .kv
            .get(hash.as_str())
            .await?
            .ok_or_else(|| StoreError::NotFound(hash.clone()))?;
        serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
            hash: hash.clone(),
            reason: e.to_string(),
        })
    }

    /// Wipe every entry. Runs once per context start.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.kv.delete_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Attachment;
    use crate::impls::InMemoryKvStore;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    fn store_with(kv: Arc<InMemoryKvStore>) -> MessageStore {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
        MessageStore::new(kv, Arc::new(clock))
    }

    fn content() -> MessageContent {
        MessageContent::text("promo").with_attachment(Attachment {
            name: "a.png".to_string(),
            mime_type: "image/png".to_string(),
            size: 10,
            source: "blob:a".to_string(),
            last_modified: None,
        })
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let kv = Arc::new(InMemoryKvStore::new());
        let store = store_with(kv.clone());

        let h1 = store.put(content()).await.unwrap();
        let h2 = store.put(content()).await.unwrap();

        assert_eq!(h1, h2);
        assert_eq!(kv.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_identical_puts_keep_the_first_timestamp() {
        let kv = Arc::new(InMemoryKvStore::new());
        let first = Arc::new(store_with(kv.clone()));
        let later = Arc::new(MessageStore::new(
            kv.clone(),
            Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())),
        ));

        let a = tokio::spawn({
            let first = Arc::clone(&first);
            async move { first.put(content()).await }
        });
        let hash = a.await.unwrap().unwrap();
        let puts: Vec<_> = (0..8)
            .map(|_| {
                let later = Arc::clone(&later);
                tokio::spawn(async move { later.put(content()).await })
            })
            .collect();
        for put in puts {
            assert_eq!(put.await.unwrap().unwrap(), hash);
        }

        assert_eq!(kv.len().await, 1);
        assert_eq!(
            first.get(&hash).await.unwrap().created_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn get_returns_what_was_put() {
        let store = store_with(Arc::new(InMemoryKvStore::new()));
        let hash = store.put(content()).await.unwrap();

        let stored = store.get(&hash).await.unwrap();
        assert_eq!(stored.content, content());
        assert_eq!(
            stored.created_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = store_with(Arc::new(InMemoryKvStore::new()));
        let err = store
            .get(&ContentHash::from_hex("deadbeef"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn clear_wipes_everything() {
        let kv = Arc::new(InMemoryKvStore::new());
        let store = store_with(kv.clone());
        let hash = store.put(content()).await.unwrap();
        store.put(MessageContent::text("other")).await.unwrap();

        store.clear().await.unwrap();

        assert_eq!(kv.len().await, 0);
        assert!(matches!(
            store.get(&hash).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
