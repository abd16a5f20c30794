//! Queue state machine and status snapshot.

use serde::{Deserialize, Serialize};

use crate::domain::SendTask;

/// Queue state.
///
/// State transitions:
/// - Idle -> Running (on enqueue or resume with work pending)
/// - Running -> Idle (pending drained)
/// - Idle | Running -> Paused -> Running (on resume)
/// - any -> Stopped (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Nothing pending; the worker is parked.
    Idle,

    /// Dequeuing and executing tasks.
    Running,

    /// The in-flight task may finish; no new task starts.
    Paused,

    /// Pending tasks discarded. No further transitions.
    Stopped,
}

impl QueueState {
    pub fn is_terminal(self) -> bool {
        matches!(self, QueueState::Stopped)
    }

    /// May the worker start the next task?
    pub fn accepts_work(self) -> bool {
        matches!(self, QueueState::Idle | QueueState::Running)
    }
}

/// Non-blocking snapshot returned by QUEUE_STATUS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub state: QueueState,
    pub pending: usize,
    pub current: Option<SendTask>,
    pub succeeded: u64,
    pub failed: u64,
}
