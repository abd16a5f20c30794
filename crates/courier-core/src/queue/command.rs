//! CommandQueue - 単一 worker による直列 FIFO 実行
//!
//! # 不変条件
//! - 同時に実行されるタスクは最大 1 つ
//! - pause / stop はタスク境界でのみ効く（送信中のタスクは中断しない）
//! - min_delay / readiness 待ちのタスクは送信前なので、pause で先頭へ戻り stop で破棄される
//! - 失敗したタスクは記録されるだけで再投入されない

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{QueueState, QueueStatus, TaskExecutor};
use crate::domain::{DispatchError, SendTask};
use crate::readiness::ReadinessGate;

struct QueueInner {
    state: QueueState,
    pending: VecDeque<SendTask>,
    current: Option<SendTask>,
    succeeded: u64,
    failed: u64,
}

struct Shared {
    inner: Mutex<QueueInner>,
    wake: Notify,
    stop_tx: watch::Sender<bool>,
    paused_tx: watch::Sender<bool>,
}

pub struct CommandQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CommandQueue {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn start(
        executor: Arc<dyn TaskExecutor>,
        gate: ReadinessGate,
        ready_timeout: Duration,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        let (paused_tx, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            inner: Mutex::new(QueueInner {
                state: QueueState::Idle,
                pending: VecDeque::new(),
                current: None,
                succeeded: 0,
                failed: 0,
            }),
            wake: Notify::new(),
            stop_tx,
            paused_tx,
        });

        let worker = tokio::spawn(worker_loop(
            Arc::clone(&shared),
            executor,
            gate,
            ready_timeout,
        ));

        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Append to the tail and wake the worker if it is parked.
    pub async fn enqueue(&self, task: SendTask) -> Result<(), DispatchError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.is_terminal() {
            return Err(DispatchError::QueueStopped);
        }
        debug!(task_id = %task.id, destination = %task.destination, "task enqueued");
        inner.pending.push_back(task);
        if inner.state == QueueState::Idle {
            inner.state = QueueState::Running;
        }
        drop(inner);

        self.shared.wake.notify_one();
        Ok(())
    }

    pub async fn pause(&self) -> Result<(), DispatchError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.is_terminal() {
            return Err(DispatchError::QueueStopped);
        }
        inner.state = QueueState::Paused;
        self.shared.paused_tx.send_replace(true);
        info!(pending = inner.pending.len(), "queue paused");
        Ok(())
    }

    /// Continue from the head of the pending list.
    pub async fn resume(&self) -> Result<(), DispatchError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.is_terminal() {
            return Err(DispatchError::QueueStopped);
        }
        if inner.state == QueueState::Paused {
            inner.state = if inner.pending.is_empty() && inner.current.is_none() {
                QueueState::Idle
            } else {
                QueueState::Running
            };
            self.shared.paused_tx.send_replace(false);
            info!(pending = inner.pending.len(), "queue resumed");
        }
        drop(inner);

        self.shared.wake.notify_one();
        Ok(())
    }

    /// Discard every task that has not started sending. Idempotent.
    pub async fn stop(&self) {
        let mut inner = self.shared.inner.lock().await;
        let discarded = inner.pending.len();
        inner.pending.clear();
        inner.state = QueueState::Stopped;
        drop(inner);

        self.shared.stop_tx.send_replace(true);
        self.shared.wake.notify_one();
        info!(discarded, "queue stopped");
    }

    pub async fn status(&self) -> QueueStatus {
        let inner = self.shared.inner.lock().await;
        QueueStatus {
            state: inner.state,
            pending: inner.pending.len(),
            current: inner.current.clone(),
            succeeded: inner.succeeded,
            failed: inner.failed,
        }
    }

    /// Stop and wait for the worker to exit (after any in-flight send).
    pub async fn shutdown(&self) {
        self.stop().await;
        if let Some(worker) = self.worker.lock().await.take()
            && let Err(e) = worker.await
        {
            error!(error = %e, "queue worker terminated abnormally");
        }
    }
}

async fn worker_loop(
    shared: Arc<Shared>,
    executor: Arc<dyn TaskExecutor>,
    gate: ReadinessGate,
    ready_timeout: Duration,
) {
    let mut stop_rx = shared.stop_tx.subscribe();
    let mut paused_rx = shared.paused_tx.subscribe();

    loop {
        let next = {
            let mut inner = shared.inner.lock().await;
            if inner.state.is_terminal() {
                break;
            }
            if inner.state.accepts_work() {
                match inner.pending.pop_front() {
                    Some(task) => {
                        inner.state = QueueState::Running;
                        inner.current = Some(task.clone());
                        Some(task)
                    }
                    None => {
                        inner.state = QueueState::Idle;
                        None
                    }
                }
            } else {
                None
            }
        };

        let Some(task) = next else {
            shared.wake.notified().await;
            continue;
        };

        // min_delay と readiness 待ちの間はまだ送信前なので stop / pause が効く
        let prepared = tokio::select! {
            biased;
            _ = async { let _ = stop_rx.wait_for(|stopped| *stopped).await; } => Prepared::Stopped,
            _ = async { let _ = paused_rx.wait_for(|paused| *paused).await; } => Prepared::Paused,
            ready = prepare(&task, &gate, ready_timeout) => Prepared::Ready(ready),
        };

        let result = match prepared {
            Prepared::Stopped => {
                debug!(task_id = %task.id, "queue stopped before send, task discarded");
                shared.inner.lock().await.current = None;
                continue;
            }
            Prepared::Paused => {
                let mut inner = shared.inner.lock().await;
                inner.current = None;
                if !inner.state.is_terminal() {
                    debug!(task_id = %task.id, "queue paused before send, task returned to head");
                    inner.pending.push_front(task);
                }
                continue;
            }
            Prepared::Ready(Err(e)) => {
                executor.report_unexecuted(&task, &e).await;
                Err(e)
            }
            Prepared::Ready(Ok(())) => executor.execute(&task).await,
        };

        let mut inner = shared.inner.lock().await;
        inner.current = None;
        match result {
            Ok(()) => {
                inner.succeeded += 1;
                info!(task_id = %task.id, destination = %task.destination, "task succeeded");
            }
            Err(e) => {
                inner.failed += 1;
                error!(
                    task_id = %task.id,
                    destination = %task.destination,
                    kind = ?e.kind(),
                    error = %e,
                    "task failed"
                );
            }
        }
    }

    debug!("queue worker exited");
}

enum Prepared {
    Stopped,
    Paused,
    Ready(Result<(), DispatchError>),
}

async fn prepare(
    task: &SendTask,
    gate: &ReadinessGate,
    ready_timeout: Duration,
) -> Result<(), DispatchError> {
    if let Some(delay) = task.min_delay() {
        tokio::time::sleep(delay).await;
    }
    gate.await_ready(ready_timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentHash, TaskId};
    use async_trait::async_trait;
    use chrono::Utc;
    use ulid::Ulid;

    #[derive(Default)]
    struct Recorder {
        work: Duration,
        fail_on: Option<&'static str>,
        started: Mutex<Vec<String>>,
        finished: Mutex<Vec<String>>,
        unexecuted: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn with_work(work: Duration) -> Self {
            Self {
                work,
                ..Default::default()
            }
        }

        async fn finished(&self) -> Vec<String> {
            self.finished.lock().await.clone()
        }
    }

    #[async_trait]
    impl TaskExecutor for Recorder {
        async fn execute(&self, task: &SendTask) -> Result<(), DispatchError> {
            self.started.lock().await.push(task.destination.clone());
            tokio::time::sleep(self.work).await;
            self.finished.lock().await.push(task.destination.clone());
            if self.fail_on == Some(task.destination.as_str()) {
                return Err(DispatchError::ContactNotFound(task.destination.clone()));
            }
            Ok(())
        }

        async fn report_unexecuted(&self, task: &SendTask, _error: &DispatchError) {
            self.unexecuted.lock().await.push(task.destination.clone());
        }
    }

    fn task(destination: &str) -> SendTask {
        SendTask {
            id: TaskId::from_ulid(Ulid::new()),
            destination: destination.to_string(),
            hash: ContentHash::from_hex("aa"),
            min_delay_ms: None,
            enqueued_at: Utc::now(),
        }
    }

    fn ready_gate() -> ReadinessGate {
        let gate = ReadinessGate::new();
        gate.signal_ready();
        gate
    }

    fn start(recorder: &Arc<Recorder>, gate: ReadinessGate) -> CommandQueue {
        CommandQueue::start(
            Arc::clone(recorder) as Arc<dyn TaskExecutor>,
            gate,
            Duration::from_secs(1),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_run_in_fifo_order() {
        let recorder = Arc::new(Recorder::with_work(Duration::from_millis(50)));
        let queue = start(&recorder, ready_gate());

        queue.enqueue(task("A")).await.unwrap();
        queue.enqueue(task("B")).await.unwrap();
        queue.enqueue(task("C")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(recorder.finished().await, vec!["A", "B", "C"]);
        let status = queue.status().await;
        assert_eq!(status.state, QueueState::Idle);
        assert_eq!(status.succeeded, 3);
        assert_eq!(status.pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_lets_current_finish_and_resume_continues_from_head() {
        let recorder = Arc::new(Recorder::with_work(Duration::from_millis(100)));
        let queue = start(&recorder, ready_gate());

        queue.enqueue(task("A")).await.unwrap();
        queue.enqueue(task("B")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.pause().await.unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(recorder.finished().await, vec!["A"]);
        let status = queue.status().await;
        assert_eq!(status.state, QueueState::Paused);
        assert_eq!(status.pending, 1);
        assert_eq!(status.current, None);

        queue.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(recorder.finished().await, vec!["A", "B"]);
        assert_eq!(*recorder.started.lock().await, vec!["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_does_not_halt_the_queue() {
        let recorder = Arc::new(Recorder {
            fail_on: Some("bad"),
            ..Default::default()
        });
        let queue = start(&recorder, ready_gate());

        queue.enqueue(task("bad")).await.unwrap();
        queue.enqueue(task("good")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(recorder.finished().await, vec!["bad", "good"]);
        let status = queue.status().await;
        assert_eq!((status.succeeded, status.failed), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_pending_but_lets_in_flight_send_finish() {
        let recorder = Arc::new(Recorder::with_work(Duration::from_millis(100)));
        let queue = start(&recorder, ready_gate());

        for name in ["A", "B", "C"] {
            queue.enqueue(task(name)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.stop().await;

        let status = queue.status().await;
        assert_eq!(status.state, QueueState::Stopped);
        assert_eq!(status.pending, 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(recorder.finished().await, vec!["A"]);
        assert!(matches!(
            queue.enqueue(task("D")).await,
            Err(DispatchError::QueueStopped)
        ));
        assert!(matches!(queue.resume().await, Err(DispatchError::QueueStopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_min_delay_discards_the_task() {
        let recorder = Arc::new(Recorder::default());
        let queue = start(&recorder, ready_gate());

        let mut delayed = task("A");
        delayed.min_delay_ms = Some(5_000);
        queue.enqueue(delayed).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(queue.status().await.current.is_some());

        queue.shutdown().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(recorder.started.lock().await.is_empty());
        assert_eq!(queue.status().await.current, None);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_during_min_delay_returns_the_task_to_the_head() {
        let recorder = Arc::new(Recorder::default());
        let queue = start(&recorder, ready_gate());

        let mut delayed = task("A");
        delayed.min_delay_ms = Some(5_000);
        queue.enqueue(delayed).await.unwrap();
        queue.enqueue(task("B")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.pause().await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(recorder.started.lock().await.is_empty());
        let status = queue.status().await;
        assert_eq!(status.state, QueueState::Paused);
        assert_eq!(status.pending, 2);
        assert_eq!(status.current, None);

        queue.resume().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(recorder.finished().await, vec!["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_while_waiting_for_readiness_holds_the_task() {
        let recorder = Arc::new(Recorder::default());
        let gate = ReadinessGate::new();
        let queue = CommandQueue::start(
            Arc::clone(&recorder) as Arc<dyn TaskExecutor>,
            gate.clone(),
            Duration::from_secs(60),
        );

        queue.enqueue(task("A")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.pause().await.unwrap();
        gate.signal_ready();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(recorder.started.lock().await.is_empty());
        assert_eq!(queue.status().await.pending, 1);

        queue.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(recorder.finished().await, vec!["A"]);
    }

    struct Panicking;

    #[async_trait]
    impl TaskExecutor for Panicking {
        async fn execute(&self, _task: &SendTask) -> Result<(), DispatchError> {
            panic!("executor blew up");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_returns_after_the_worker_panicked() {
        let queue = CommandQueue::start(Arc::new(Panicking), ready_gate(), Duration::from_secs(1));
        queue.enqueue(task("A")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        queue.shutdown().await;
        assert_eq!(queue.status().await.state, QueueState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn min_delay_is_honored_before_execution() {
        let recorder = Arc::new(Recorder::default());
        let queue = start(&recorder, ready_gate());

        let mut delayed = task("A");
        delayed.min_delay_ms = Some(2_000);
        queue.enqueue(delayed).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_900)).await;
        assert!(recorder.started.lock().await.is_empty());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(recorder.finished().await, vec!["A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_timeout_fails_only_that_task() {
        let recorder = Arc::new(Recorder::default());
        let gate = ReadinessGate::new();
        let queue = start(&recorder, gate.clone());

        queue.enqueue(task("A")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(*recorder.unexecuted.lock().await, vec!["A"]);
        assert_eq!(queue.status().await.failed, 1);

        gate.signal_ready();
        queue.enqueue(task("B")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(recorder.finished().await, vec!["B"]);
    }
}
