//! Queue module: serialized send-task scheduling.

mod command;
mod state;

pub use command::CommandQueue;
pub use state::{QueueState, QueueStatus};

use async_trait::async_trait;

use crate::domain::{DispatchError, SendTask};

/// Executes one dequeued task.
///
/// The queue only records the result; reporting to the UI is the executor's job.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &SendTask) -> Result<(), DispatchError>;

    /// A dequeued task failed before `execute` (e.g. readiness timeout).
    async fn report_unexecuted(&self, _task: &SendTask, _error: &DispatchError) {}
}
