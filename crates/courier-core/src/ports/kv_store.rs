//! KeyValueStore port - 汎用 key-value 永続化
//!
//! Message Store の下回り。必要なのは put_if_absent / get / delete_all だけです。

use async_trait::async_trait;

use crate::store::StoreError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// key が未使用なら value を書き込んで `true`。既存値は残して `false`。
    ///
    /// 存在確認と書き込みは不可分でなければなりません。
    async fn put_if_absent(&self, key: &str, value: serde_json::Value)
    -> Result<bool, StoreError>;

    /// 存在しなければ `Ok(None)`
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    async fn delete_all(&self) -> Result<(), StoreError>;
}
