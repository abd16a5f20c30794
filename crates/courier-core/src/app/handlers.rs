//! Privileged-side handlers for the control surface.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::{DispatchError, GroupRecord, LogEvent, SendRequest, SendTask};
use crate::ports::{AutomationApi, Clock, IdGenerator, LogSink};
use crate::queue::{CommandQueue, QueueStatus};
use crate::readiness::{ReadinessGate, Retrier};
use crate::store::MessageStore;
use crate::typed::{
    GetGroups, Handler, PauseQueue, QueueStatusRequest, ResumeQueue, SendMessage, StopQueue,
};

pub(crate) struct ServiceContext {
    pub queue: Arc<CommandQueue>,
    pub store: Arc<MessageStore>,
    pub gate: ReadinessGate,
    pub retrier: Arc<Retrier>,
    pub api: Arc<dyn AutomationApi>,
    pub logs: Arc<dyn LogSink>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
    pub ready_timeout: Duration,
}

impl ServiceContext {
    async fn wait_until_ready(&self) -> Result<(), DispatchError> {
        if self.gate.is_ready() {
            return Ok(());
        }
        info!("automation api not ready yet, waiting");
        self.gate.await_ready(self.ready_timeout).await
    }

    /// Store the content once, then enqueue a task that references it by hash.
    async fn accept(&self, request: SendRequest) -> Result<(), DispatchError> {
        self.wait_until_ready().await?;
        let hash = self.store.put(request.content).await?;
        let task = SendTask {
            id: self.ids.generate_task_id(),
            destination: request.contact,
            hash,
            min_delay_ms: request.delay_ms,
            enqueued_at: self.clock.now(),
        };
        self.queue.enqueue(task).await
    }

    async fn groups(&self) -> Result<Vec<GroupRecord>, DispatchError> {
        self.wait_until_ready().await?;

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

        let chats = self
            .retrier
            .run("list_chats", || async move {
                api.list_chats().await.map_err(DispatchError::from)
            })
            .await?;
        let groups = GroupRecord::reconcile_all(&chats);
        info!(chats = chats.len(), groups = groups.len(), "groups listed");
        Ok(groups)
    }
}

/// One handler value serving every control request.
#[derive(Clone)]
pub(crate) struct Controls {
    ctx: Arc<ServiceContext>,
}

impl Controls {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler<PauseQueue> for Controls {
    async fn handle(&self, _request: PauseQueue) -> Result<bool, DispatchError> {
        Ok(self.ctx.queue.pause().await.is_ok())
    }
}

#[async_trait]
impl Handler<ResumeQueue> for Controls {
    async fn handle(&self, _request: ResumeQueue) -> Result<bool, DispatchError> {
        Ok(self.ctx.queue.resume().await.is_ok())
    }
}

#[async_trait]
impl Handler<StopQueue> for Controls {
    async fn handle(&self, _request: StopQueue) -> Result<bool, DispatchError> {
        self.ctx.queue.stop().await;
        Ok(true)
    }
}

#[async_trait]
impl Handler<QueueStatusRequest> for Controls {
    async fn handle(&self, _request: QueueStatusRequest) -> Result<QueueStatus, DispatchError> {
        Ok(self.ctx.queue.status().await)
    }
}

#[async_trait]
impl Handler<SendMessage> for Controls {
    async fn handle(&self, request: SendMessage) -> Result<bool, DispatchError> {
        let SendMessage(request) = request;
        let contact = request.contact.clone();
        let attachment = request.content.has_attachment();

        match self.ctx.accept(request).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(%contact, error = %e, "send request rejected");
                self.ctx
                    .logs
                    .emit(LogEvent::error(e.to_string(), contact, attachment))
                    .await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Handler<GetGroups> for Controls {
    async fn handle(&self, _request: GetGroups) -> Result<Vec<GroupRecord>, DispatchError> {
        self.ctx.groups().await
    }
}
