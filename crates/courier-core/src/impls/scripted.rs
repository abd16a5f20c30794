//! ScriptedAutomation - 台本どおりに振る舞う automation API
//!
//! テストと CLI デモ用。どの contact が存在するか、ack の結果コード、
//! 最初の何回を "not ready" で失敗させるか、を builder で指定します。

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Mutex;

use crate::domain::{Button, RawChat};
use crate::ports::{
    AckFuture, ApiError, AttachmentFetcher, AutomationApi, FilePayload, SendAck,
};

/// One recorded send call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub text: String,
    pub file: Option<FilePayload>,
    pub buttons: Vec<Button>,
}

struct Script {
    authenticated: bool,
    contacts: HashSet<String>,
    ack_code: String,
    ack_delay: Duration,
    not_ready_failures: u32,
    chats: Vec<RawChat>,
    queries: Vec<String>,
    sent: Vec<SentMessage>,
}

pub struct ScriptedAutomation {
    script: Mutex<Script>,
}

impl Default for ScriptedAutomation {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAutomation {
    /// Authenticated, no contacts, every ack succeeds.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                authenticated: true,
                contacts: HashSet::new(),
                ack_code: SendAck::SUCCESS.to_string(),
                ack_delay: Duration::ZERO,
                not_ready_failures: 0,
                chats: Vec::new(),
                queries: Vec::new(),
                sent: Vec::new(),
            }),
        }
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.script.get_mut().contacts.insert(contact.into());
        self
    }

    pub fn with_ack(mut self, code: impl Into<String>) -> Self {
        self.script.get_mut().ack_code = code.into();
        self
    }

    /// Resolve each ack only after `delay`.
    pub fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.script.get_mut().ack_delay = delay;
        self
    }

    /// The next `n` lookups fail with a not-ready error.
    pub fn failing_not_ready(mut self, n: u32) -> Self {
        self.script.get_mut().not_ready_failures = n;
        self
    }

    pub fn unauthenticated(mut self) -> Self {
        self.script.get_mut().authenticated = false;
        self
    }

    pub fn with_chats(mut self, chats: Vec<RawChat>) -> Self {
        self.script.get_mut().chats = chats;
        self
    }

    /// Every identifier passed to `query_exists`, in call order.
    pub async fn queries(&self) -> Vec<String> {
        self.script.lock().await.queries.clone()
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.script.lock().await.sent.clone()
    }

    fn consume_not_ready(script: &mut Script) -> Result<(), ApiError> {
        if script.not_ready_failures > 0 {
            script.not_ready_failures -= 1;
            return Err(ApiError::Other("WPP is not ready".to_string()));
        }
        Ok(())
    }

    fn ack(script: &Script) -> AckFuture {
        let code = script.ack_code.clone();
        let delay = script.ack_delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(SendAck::new(code))
        }
        .boxed()
    }
}

#[async_trait]
impl AutomationApi for ScriptedAutomation {
    async fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.script.lock().await.authenticated)
    }

    async fn query_exists(&self, contact: &str) -> Result<Option<String>, ApiError> {
        let mut script = self.script.lock().await;
        script.queries.push(contact.to_string());
        Self::consume_not_ready(&mut script)?;
        Ok(script.contacts.get(contact).cloned())
    }

    async fn send_text(
        &self,
        to: &str,
        text: &str,
        buttons: &[Button],
    ) -> Result<AckFuture, ApiError> {
        let mut script = self.script.lock().await;
        script.sent.push(SentMessage {
            to: to.to_string(),
            text: text.to_string(),
            file: None,
            buttons: buttons.to_vec(),
        });
        Ok(Self::ack(&script))
    }

    async fn send_file(
        &self,
        to: &str,
        file: FilePayload,
        caption: &str,
        buttons: &[Button],
    ) -> Result<AckFuture, ApiError> {
        let mut script = self.script.lock().await;
        script.sent.push(SentMessage {
            to: to.to_string(),
            text: caption.to_string(),
            file: Some(file),
            buttons: buttons.to_vec(),
        });
        Ok(Self::ack(&script))
    }

    async fn list_chats(&self) -> Result<Vec<RawChat>, ApiError> {
        let mut script = self.script.lock().await;
        Self::consume_not_ready(&mut script)?;
        Ok(script.chats.clone())
    }
}

/// Attachment bytes keyed by source reference.
#[derive(Default)]
pub struct InMemoryFetcher {
    sources: HashMap<String, Vec<u8>>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.sources.insert(source.into(), bytes.into());
        self
    }
}

#[async_trait]
impl AttachmentFetcher for InMemoryFetcher {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>, ApiError> {
        self.sources
            .get(source)
            .cloned()
            .ok_or_else(|| ApiError::Other(format!("no bytes behind {source}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn not_ready_failures_are_consumed_in_order() {
        let api = ScriptedAutomation::new()
            .with_contact("5511988887777")
            .failing_not_ready(1);

        let first = api.query_exists("5511988887777").await.unwrap_err();
        assert!(first.is_not_ready());
        assert_eq!(
            api.query_exists("5511988887777").await.unwrap(),
            Some("5511988887777".to_string())
        );
        assert_eq!(api.queries().await.len(), 2);
    }

    #[tokio::test]
    async fn ack_reports_scripted_code() {
        let api = ScriptedAutomation::new().with_ack("ERROR_UNKNOWN");
        let ack = api.send_text("1", "hi", &[]).await.unwrap().await.unwrap();
        assert_eq!(ack.code(), "ERROR_UNKNOWN");
        assert_eq!(api.sent().await[0].text, "hi");
    }

    #[tokio::test]
    async fn fetcher_misses_are_errors() {
        let fetcher = InMemoryFetcher::new().with_source("blob:a", b"png".to_vec());
        assert_eq!(fetcher.fetch("blob:a").await.unwrap(), b"png".to_vec());
        assert!(fetcher.fetch("blob:b").await.is_err());
    }
}
