//! ServiceBuilder - privileged 側サービスの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 必須の collaborator（bus, automation API, key-value store, attachment fetcher）が
//!   揃っていなければ build() が BuildError::Missing を返す
//! - build() は Message Store を clear してから handler を登録する

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use super::handlers::{Controls, ServiceContext};
use super::DispatchService;
use crate::config::Config;
use crate::executor::SendExecutor;
use crate::impls::RpcLogSink;
use crate::ports::{
    AttachmentFetcher, AutomationApi, Clock, IdGenerator, KeyValueStore, LogSink, SystemClock,
    UlidGenerator,
};
use crate::queue::{CommandQueue, TaskExecutor};
use crate::readiness::{ReadinessGate, Retrier};
use crate::rpc::{ContextRole, RpcBus, RpcEndpoint, RpcError};
use crate::store::{MessageStore, StoreError};
use crate::typed::{GetGroups, PauseQueue, QueueStatusRequest, ResumeQueue, SendMessage, StopQueue};

/// ServiceBuilder は DispatchService を構築
///
/// # 使用例
/// ```ignore
/// let service = ServiceBuilder::new(Config::from_env())
///     .bus(bus.clone())
///     .automation(api)
///     .kv_store(kv)
///     .fetcher(fetcher)
///     .build()
///     .await?;
/// service.gate().signal_ready();
/// ```
pub struct ServiceBuilder {
    config: Config,
    bus: Option<RpcBus>,
    api: Option<Arc<dyn AutomationApi>>,
    kv: Option<Arc<dyn KeyValueStore>>,
    fetcher: Option<Arc<dyn AttachmentFetcher>>,
    clock: Arc<dyn Clock>,
    gate: ReadinessGate,
}

/// BuildError はサービス構築時のエラー
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Missing collaborators: {0:?}. These must be provided before build().")]
    Missing(Vec<&'static str>),

    #[error("failed to register handlers: {0}")]
    Rpc(#[from] RpcError),

    #[error("failed to clear message store: {0}")]
    Store(#[from] StoreError),
}

impl ServiceBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            bus: None,
            api: None,
            kv: None,
            fetcher: None,
            clock: Arc::new(SystemClock),
            gate: ReadinessGate::new(),
        }
    }

    pub fn bus(mut self, bus: RpcBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn automation(mut self, api: Arc<dyn AutomationApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn kv_store(mut self, kv: Arc<dyn KeyValueStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn AttachmentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an existing gate, e.g. one already wired to the API's ready event.
    pub fn gate(mut self, gate: ReadinessGate) -> Self {
        self.gate = gate;
        self
    }

    /// Validate, clear the store, wire the components and register every handler.
    pub async fn build(self) -> Result<DispatchService, BuildError> {
        let mut missing = Vec::new();
        if self.bus.is_none() {
            missing.push("bus");
        }
        if self.api.is_none() {
            missing.push("automation");
        }
        if self.kv.is_none() {
            missing.push("kv_store");
        }
        if self.fetcher.is_none() {
            missing.push("fetcher");
        }
        let (Some(bus), Some(api), Some(kv), Some(fetcher)) =
            (self.bus, self.api, self.kv, self.fetcher)
        else {
            return Err(BuildError::Missing(missing));
        };

        let config = self.config;
        let clock = self.clock;
        let gate = self.gate;

        let store = Arc::new(MessageStore::new(kv, Arc::clone(&clock)));
        store.clear().await?;

        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        let endpoint = RpcEndpoint::start(
            ContextRole::Privileged,
            bus,
            Arc::clone(&ids),
            config.rpc_timeout,
        );

        let logs: Arc<dyn LogSink> = Arc::new(RpcLogSink::new(endpoint.clone()));
        let retrier = Arc::new(Retrier::new(config.retry.clone(), gate.clone()));
        let executor: Arc<dyn TaskExecutor> = Arc::new(
            SendExecutor::new(
                Arc::clone(&api),
                Arc::clone(&store),
                fetcher,
                Arc::clone(&logs),
                Arc::clone(&retrier),
            )
            .with_mobile_rule(config.mobile_rule()),
        );
        let queue = Arc::new(CommandQueue::start(
            executor,
            gate.clone(),
            config.ready_timeout,
        ));

        let controls = Controls::new(Arc::new(ServiceContext {
            queue: Arc::clone(&queue),
            store: Arc::clone(&store),
            gate: gate.clone(),
            retrier: Arc::clone(&retrier),
            api,
            logs,
            ids,
            clock,
            ready_timeout: config.ready_timeout,
        }));
        endpoint.add_handler::<PauseQueue, _>(controls.clone()).await?;
        endpoint.add_handler::<ResumeQueue, _>(controls.clone()).await?;
        endpoint.add_handler::<StopQueue, _>(controls.clone()).await?;
        endpoint.add_handler::<QueueStatusRequest, _>(controls.clone()).await?;
        endpoint.add_handler::<SendMessage, _>(controls.clone()).await?;
        endpoint.add_handler::<GetGroups, _>(controls).await?;

        info!(
            rpc_timeout = ?config.rpc_timeout,
            ready_timeout = ?config.ready_timeout,
            max_retries = config.retry.max_retries,
            "dispatch service started"
        );

        Ok(DispatchService::new(endpoint, queue, store, gate, retrier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryFetcher, InMemoryKvStore, ScriptedAutomation};

    #[tokio::test]
    async fn test_build_missing_collaborators() {
        let result = ServiceBuilder::new(Config::default())
            .bus(RpcBus::new(16))
            .fetcher(Arc::new(InMemoryFetcher::new()))
            .build()
            .await;
        assert!(matches!(
            result,
            Err(BuildError::Missing(missing)) if missing == vec!["automation", "kv_store"]
        ));
    }

    #[tokio::test]
    async fn test_build_clears_store_and_registers_handlers() {
        let kv = Arc::new(InMemoryKvStore::new());
        kv.put_if_absent("stale", serde_json::json!({"text": "old"})).await.unwrap();

        let service = ServiceBuilder::new(Config::default())
            .bus(RpcBus::new(16))
            .automation(Arc::new(ScriptedAutomation::new()))
            .kv_store(kv.clone())
            .fetcher(Arc::new(InMemoryFetcher::new()))
            .build()
            .await
            .unwrap();

        assert!(kv.is_empty().await);
        let mut types = service.endpoint().handled_types().await;
        types.sort();
        assert_eq!(
            types,
            vec![
                "GET_GROUPS",
                "PAUSE_QUEUE",
                "QUEUE_STATUS",
                "RESUME_QUEUE",
                "SEND_MESSAGE",
                "STOP_QUEUE"
            ]
        );
        service.shutdown().await;
    }
}
