//! Send Executor - 1 タスク分の送信ロジック
//!
//! # フロー
//! 1. 認証チェック（AuthenticationRequired）
//! 2. Message Store から本文を取得（StorageMiss）
//! 3. contact 解決（locale fallback は 1 回だけ）
//! 4. 送信モード選択、添付は送信直前に fetch
//! 5. ack を成功コードと比較（DeliveryFailed）
//!
//! 結果は成功・失敗とも LogEvent として LogSink に流します。

mod contact;
mod mode;

pub use contact::MobilePrefixRule;
pub use mode::TransmissionMode;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::{DispatchError, LogEvent, SendTask};
use crate::ports::{AttachmentFetcher, AutomationApi, FilePayload, LogSink};
use crate::queue::TaskExecutor;
use crate::readiness::Retrier;
use crate::store::MessageStore;

const SENT_MESSAGE: &str = "message sent successfully";

pub struct SendExecutor {
    api: Arc<dyn AutomationApi>,
    store: Arc<MessageStore>,
    fetcher: Arc<dyn AttachmentFetcher>,
    logs: Arc<dyn LogSink>,
    retrier: Arc<Retrier>,
    mobile_rule: MobilePrefixRule,
}

/// What the log event reports about a task, filled in as delivery progresses.
struct Report {
    contact: String,
    attachment: bool,
}

impl SendExecutor {
    pub fn new(
        api: Arc<dyn AutomationApi>,
        store: Arc<MessageStore>,
        fetcher: Arc<dyn AttachmentFetcher>,
        logs: Arc<dyn LogSink>,
        retrier: Arc<Retrier>,
    ) -> Self {
        Self {
            api,
            store,
            fetcher,
            logs,
            retrier,
            mobile_rule: MobilePrefixRule::default(),
        }
    }

    pub fn with_mobile_rule(mut self, rule: MobilePrefixRule) -> Self {
        self.mobile_rule = rule;
        self
    }

    async fn deliver(&self, task: &SendTask, report: &mut Report) -> Result<(), DispatchError> {
        let api = &self.api;
        let authenticated = self
            .retrier
            .run("is_authenticated", || async move {
                api.is_authenticated().await.map_err(DispatchError::from)
            })
            .await?;
        if !authenticated {
            return Err(DispatchError::AuthenticationRequired);
        }

        let stored = self.store.get(&task.hash).await?;
        let content = &stored.content;
        report.attachment = content.has_attachment();

        let contact = self.resolve_contact(&task.destination).await?;
        if contact != task.destination {
            let note = format!("contact {} not found, sending to {contact}", task.destination);
            self.logs
                .emit(LogEvent::warning(note, &task.destination, report.attachment))
                .await;
        }
        report.contact = contact.clone();

        let mode = TransmissionMode::select(content);
        debug!(task_id = %task.id, %contact, mode = mode.name(), "sending");

        let ack = match mode.attachment() {
            None => api.send_text(&contact, &content.text, &content.buttons).await?,
            Some(attachment) => {
                let bytes = self.fetcher.fetch(&attachment.source).await.map_err(|e| {
                    DispatchError::AttachmentFetch {
                        source_ref: attachment.source.clone(),
                        reason: e.to_string(),
                    }
                })?;
                let file = FilePayload {
                    name: attachment.name.clone(),
                    mime_type: attachment.mime_type.clone(),
                    last_modified: attachment.last_modified,
                    kind: mode.file_kind(),
                    bytes,
                };
                api.send_file(&contact, file, &content.text, &content.buttons)
                    .await?
            }
        }
        .await?;

        if !ack.is_success() {
            return Err(DispatchError::DeliveryFailed {
                contact,
                ack: ack.code().to_string(),
            });
        }
        Ok(())
    }

    /// Look the contact up as given, then at most once more with the rule's variant.
    async fn resolve_contact(&self, contact: &str) -> Result<String, DispatchError> {
        if let Some(found) = self.query_exists(contact).await? {
            return Ok(found);
        }

        let Some(variant) = self.mobile_rule.variant(contact) else {
            return Err(DispatchError::ContactNotFound(contact.to_string()));
        };
        debug!(contact, %variant, "contact not found, trying mobile-prefix variant");

        self.query_exists(&variant)
            .await?
            .ok_or_else(|| DispatchError::ContactNotFound(contact.to_string()))
    }

    async fn query_exists(&self, contact: &str) -> Result<Option<String>, DispatchError> {
        let api = &self.api;
        self.retrier
            .run("query_exists", || async move {
                api.query_exists(contact).await.map_err(DispatchError::from)
            })
            .await
    }
}

#[async_trait]
impl TaskExecutor for SendExecutor {
    async fn execute(&self, task: &SendTask) -> Result<(), DispatchError> {
        let mut report = Report {
            contact: task.destination.clone(),
            attachment: false,
        };
        let result = self.deliver(task, &mut report).await;

        let event = match &result {
            Ok(()) => {
                info!(task_id = %task.id, contact = %report.contact, "message delivered");
                LogEvent::success(SENT_MESSAGE, &report.contact, report.attachment)
            }
            Err(e) => LogEvent::error(e.to_string(), &report.contact, report.attachment),
        };
        self.logs.emit(event).await;
        result
    }

    async fn report_unexecuted(&self, task: &SendTask, error: &DispatchError) {
        let attachment = self
            .store
            .get(&task.hash)
            .await
            .map(|m| m.content.has_attachment())
            .unwrap_or(false);
        self.logs
            .emit(LogEvent::error(error.to_string(), &task.destination, attachment))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Attachment, Button, ContentHash, LogLevel, MessageContent, TaskId};
    use crate::impls::{InMemoryFetcher, InMemoryKvStore, RecordingLogSink, ScriptedAutomation};
    use crate::ports::{FileKind, SystemClock};
    use crate::readiness::{ReadinessGate, RetryPolicy};
    use chrono::Utc;
    use ulid::Ulid;

    struct Harness {
        api: Arc<ScriptedAutomation>,
        store: Arc<MessageStore>,
        logs: Arc<RecordingLogSink>,
        executor: SendExecutor,
    }

    fn harness(api: ScriptedAutomation) -> Harness {
        let api = Arc::new(api);
        let store = Arc::new(MessageStore::new(
            Arc::new(InMemoryKvStore::new()),
            Arc::new(SystemClock),
        ));
        let fetcher = Arc::new(InMemoryFetcher::new().with_source("blob:promo", b"png".to_vec()));
        let logs = Arc::new(RecordingLogSink::new());
        let retrier = Arc::new(Retrier::new(RetryPolicy::default(), ReadinessGate::new()));
        let executor = SendExecutor::new(
            api.clone(),
            store.clone(),
            fetcher,
            logs.clone(),
            retrier,
        );
        Harness {
            api,
            store,
            logs,
            executor,
        }
    }

    fn task(destination: &str, hash: ContentHash) -> SendTask {
        SendTask {
            id: TaskId::from_ulid(Ulid::new()),
            destination: destination.to_string(),
            hash,
            min_delay_ms: None,
            enqueued_at: Utc::now(),
        }
    }

    fn promo() -> MessageContent {
        MessageContent::text("promo")
            .with_attachment(Attachment {
                name: "promo.png".to_string(),
                mime_type: "image/png".to_string(),
                size: 3,
                source: "blob:promo".to_string(),
                last_modified: Some(1_700_000_000_000),
            })
            .with_button(Button {
                id: "yes".to_string(),
                text: "Yes".to_string(),
            })
    }

    #[tokio::test]
    async fn text_message_is_delivered_and_logged() {
        let h = harness(ScriptedAutomation::new().with_contact("5511988887777"));
        let hash = h.store.put(MessageContent::text("hi")).await.unwrap();

        h.executor
            .execute(&task("5511988887777", hash))
            .await
            .unwrap();

        let sent = h.api.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "hi");
        assert!(sent[0].file.is_none());

        let logs = h.logs.events().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Success);
        assert!(!logs[0].attachment);
    }

    #[tokio::test]
    async fn attachment_with_buttons_and_failed_ack_is_delivery_failure() {
        let h = harness(
            ScriptedAutomation::new()
                .with_contact("5511988887777")
                .with_ack("ERROR_UNKNOWN"),
        );
        let hash = h.store.put(promo()).await.unwrap();

        let err = h
            .executor
            .execute(&task("5511988887777", hash))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::DeliveryFailed { ref ack, .. } if ack == "ERROR_UNKNOWN"));

        let sent = h.api.sent().await;
        let file = sent[0].file.as_ref().unwrap();
        assert_eq!(file.kind, FileKind::Image);
        assert_eq!(file.bytes, b"png".to_vec());
        assert_eq!(sent[0].text, "promo");
        assert_eq!(sent[0].buttons.len(), 1);

        let logs = h.logs.events().await;
        assert_eq!(logs[0].level, LogLevel::Error);
        assert!(logs[0].attachment);
        assert!(logs[0].message.contains("ERROR_UNKNOWN"));
    }

    #[tokio::test]
    async fn twelve_digit_contact_falls_back_once_to_thirteen() {
        let h = harness(ScriptedAutomation::new().with_contact("5511988887777"));
        let hash = h.store.put(MessageContent::text("hi")).await.unwrap();

        h.executor
            .execute(&task("551188887777", hash))
            .await
            .unwrap();

        assert_eq!(h.api.queries().await, vec!["551188887777", "5511988887777"]);
        assert_eq!(h.api.sent().await[0].to, "5511988887777");

        let logs = h.logs.events().await;
        let levels: Vec<_> = logs.iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Warning, LogLevel::Success]);
        assert_eq!(logs[0].contact, "551188887777");
        assert!(logs[0].message.contains("5511988887777"));
        assert_eq!(logs[1].contact, "5511988887777");
    }

    #[tokio::test]
    async fn thirteen_digit_contact_falls_back_once_to_twelve() {
        let h = harness(ScriptedAutomation::new());
        let hash = h.store.put(MessageContent::text("hi")).await.unwrap();

        let err = h
            .executor
            .execute(&task("5511988887777", hash))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::ContactNotFound(ref c) if c == "5511988887777"));
        assert_eq!(h.api.queries().await, vec!["5511988887777", "551188887777"]);
        assert!(h.api.sent().await.is_empty());
        assert_eq!(h.logs.events().await[0].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn uncovered_identifier_gets_a_single_lookup() {
        let h = harness(ScriptedAutomation::new());
        let hash = h.store.put(MessageContent::text("hi")).await.unwrap();

        let err = h.executor.execute(&task("14155550100", hash)).await.unwrap_err();
        assert!(matches!(err, DispatchError::ContactNotFound(_)));
        assert_eq!(h.api.queries().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_hash_is_storage_miss() {
        let h = harness(ScriptedAutomation::new().with_contact("1"));
        let err = h
            .executor
            .execute(&task("1", ContentHash::from_hex("00ff")))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::StorageMiss(_)));
        assert_eq!(h.logs.events().await.len(), 1);
    }

    #[tokio::test]
    async fn unauthenticated_session_is_rejected_before_lookup() {
        let h = harness(ScriptedAutomation::new().with_contact("1").unauthenticated());
        let hash = h.store.put(MessageContent::text("hi")).await.unwrap();

        let err = h.executor.execute(&task("1", hash)).await.unwrap_err();
        assert!(matches!(err, DispatchError::AuthenticationRequired));
        assert!(h.api.queries().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_retries_while_api_is_not_ready() {
        let h = harness(
            ScriptedAutomation::new()
                .with_contact("5511988887777")
                .failing_not_ready(2),
        );
        let hash = h.store.put(MessageContent::text("hi")).await.unwrap();

        h.executor
            .execute(&task("5511988887777", hash))
            .await
            .unwrap();
        assert_eq!(h.api.queries().await.len(), 3);
    }

    #[tokio::test]
    async fn unexecuted_task_is_reported_with_attachment_flag() {
        let h = harness(ScriptedAutomation::new());
        let hash = h.store.put(promo()).await.unwrap();

        h.executor
            .report_unexecuted(
                &task("1", hash),
                &DispatchError::ReadyTimeout(std::time::Duration::from_secs(15)),
            )
            .await;

        let logs = h.logs.events().await;
        assert_eq!(logs[0].level, LogLevel::Error);
        assert!(logs[0].attachment);
        assert_eq!(logs[0].contact, "1");
    }
}
