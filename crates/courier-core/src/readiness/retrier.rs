//! Bounded retry against a not-yet-ready dependency.
//!
//! State machine (observable, no UI coupling):
//! - Idle -> Waiting (not-ready failure, backoff scheduled)
//! - Waiting -> Waiting (another not-ready failure)
//! - Waiting/Idle -> Ready (operation succeeded, attempt reset to 0)
//! - * -> Failed (retry ceiling reached, or a non-retryable error)

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{ReadinessGate, RetryPolicy};
use crate::domain::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    Idle,
    Waiting,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub phase: RetryPhase,
    /// Retries made so far in the current run.
    pub attempt: u32,
    pub next_delay: Option<Duration>,
    pub ceiling: u32,
}

pub struct Retrier {
    policy: RetryPolicy,
    gate: ReadinessGate,
    state: watch::Sender<RetryState>,
}

impl Retrier {
    pub fn new(policy: RetryPolicy, gate: ReadinessGate) -> Self {
        let (state, _) = watch::channel(RetryState {
            phase: RetryPhase::Idle,
            attempt: 0,
            next_delay: None,
            ceiling: policy.max_retries,
        });
        Self {
            policy,
            gate,
            state,
        }
    }

    /// Latest state. Concurrent runs share it; the last transition wins.
    pub fn state(&self) -> RetryState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RetryState> {
        self.state.subscribe()
    }

    /// Run `op`, retrying only `DependencyNotReady` failures.
    ///
    /// At most `max_retries` retries follow the first call. A readiness
    /// signal during a backoff wait retries at once and resets the count.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T, DispatchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DispatchError>>,
    {
        let mut signals = self.gate.subscribe();
        let mut attempt: u32 = 0;
        let mut calls: u32 = 0;

        loop {
            calls += 1;
            let err = match op().await {
                Ok(value) => {
                    if calls > 1 {
                        info!(op = op_name, calls, "succeeded after retry");
                    }
                    self.publish(RetryPhase::Ready, 0, None);
                    return Ok(value);
                }
                Err(err) if !err.is_not_ready() => {
                    self.publish(RetryPhase::Failed, attempt, None);
                    return Err(err);
                }
                Err(err) => err,
            };

            if attempt >= self.policy.max_retries {
                warn!(op = op_name, calls, error = %err, "retry ceiling reached");
                self.publish(RetryPhase::Failed, attempt, None);
                return Err(DispatchError::RetryExhausted {
                    attempts: calls,
                    last_error: err.to_string(),
                });
            }

            attempt += 1;
            let delay = self.policy.next_delay(attempt);
            self.publish(RetryPhase::Waiting, attempt, Some(delay));
            debug!(op = op_name, attempt, ?delay, error = %err, "dependency not ready, backing off");

            let seen = signals.borrow_and_update().signals;
            let signalled = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                res = signals.wait_for(|r| r.signals > seen) => res.is_ok(),
            };
            if signalled {
                info!(op = op_name, "readiness signalled, retrying now");
                attempt = 0;
                self.publish(RetryPhase::Waiting, 0, None);
            }
        }
    }

    fn publish(&self, phase: RetryPhase, attempt: u32, next_delay: Option<Duration>) {
        self.state.send_modify(|s| {
            s.phase = phase;
            s.attempt = attempt;
            s.next_delay = next_delay;
        });
    }
}
