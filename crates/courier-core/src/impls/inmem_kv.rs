//! InMemoryKvStore - 開発用の key-value store
//!
//! Message Store の下回りとしてテストと CLI デモで使います。

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::ports::KeyValueStore;
use crate::store::StoreError;

#[derive(Default)]
pub struct InMemoryKvStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKvStore {
    async fn put_if_absent(&self, key: &str, value: Value) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value);
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.entries.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn first_write_wins_and_delete_all_clears() {
        let kv = InMemoryKvStore::new();
        assert!(kv.put_if_absent("k", json!(1)).await.unwrap());
        assert!(!kv.put_if_absent("k", json!(2)).await.unwrap());
        assert_eq!(kv.get("k").await.unwrap(), Some(json!(1)));
        assert_eq!(kv.len().await, 1);

        kv.delete_all().await.unwrap();
        assert!(kv.is_empty().await);
        assert_eq!(kv.get("k").await.unwrap(), None);
    }
}
