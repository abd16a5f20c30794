//! Readiness gate for the automation API.
//!
//! The API finishes initializing on its own schedule and pushes a readiness
//! signal. The gate turns that push into something callers can await with a
//! deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::DispatchError;

/// Snapshot published on the gate's watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub ready: bool,
    /// Number of readiness signals seen so far. Retry loops use it to detect
    /// a fresh signal even when `ready` was already true.
    pub signals: u64,
}

#[derive(Clone)]
pub struct ReadinessGate {
    tx: Arc<watch::Sender<Readiness>>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Readiness::default());
        Self { tx: Arc::new(tx) }
    }

    /// Push-based readiness signal from the automation API.
    pub fn signal_ready(&self) {
        self.tx.send_modify(|r| {
            r.ready = true;
            r.signals += 1;
        });
        info!(signals = self.tx.borrow().signals, "automation api ready");
    }

    /// Drop back to not-ready, e.g. when the page context reloads.
    pub fn mark_not_ready(&self) {
        self.tx.send_modify(|r| r.ready = false);
        debug!("automation api marked not ready");
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().ready
    }

    pub fn subscribe(&self) -> watch::Receiver<Readiness> {
        self.tx.subscribe()
    }

    /// Waiters currently registered on the gate.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Resolve once the API is ready, or fail with `ReadyTimeout`.
    ///
    /// The deadline runs from the call; the waiter is released on both paths.
    pub async fn await_ready(&self, timeout: Duration) -> Result<(), DispatchError> {
        let mut rx = self.tx.subscribe();
        let waited = tokio::time::timeout(timeout, async {
            rx.wait_for(|r| r.ready).await.map(|_| ())
        })
        .await;

        match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) | Err(_) => {
                warn!(?timeout, "automation api readiness timed out");
                Err(DispatchError::ReadyTimeout(timeout))
            }
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn resolves_immediately_when_already_ready() {
        let gate = ReadinessGate::new();
        gate.signal_ready();
        gate.await_ready(Duration::from_secs(1)).await.unwrap();
        assert_eq!(gate.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_when_signal_arrives_later() {
        let gate = ReadinessGate::new();
        let signaller = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            signaller.signal_ready();
        });

        let start = tokio::time::Instant::now();
        gate.await_ready(Duration::from_secs(15)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(start.elapsed() < Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_and_leaves_no_listener() {
        let gate = ReadinessGate::new();
        let start = tokio::time::Instant::now();

        let err = gate.await_ready(Duration::from_secs(15)).await.unwrap_err();

        assert!(matches!(err, DispatchError::ReadyTimeout(d) if d == Duration::from_secs(15)));
        assert!(start.elapsed() >= Duration::from_secs(15));
        assert_eq!(gate.listener_count(), 0);
    }

    #[tokio::test]
    async fn mark_not_ready_keeps_signal_count() {
        let gate = ReadinessGate::new();
        gate.signal_ready();
        gate.mark_not_ready();
        assert!(!gate.is_ready());
        assert_eq!(gate.subscribe().borrow().signals, 1);
    }
}
