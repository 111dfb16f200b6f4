// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed task pool: strict FIFO per key, bounded parallelism across keys.
//!
//! Every key gets a lane, a bounded queue drained by one lane task, so two
//! tasks with the same key never overlap and run in submission order. Lanes
//! run concurrently but each execution holds a permit of a pool-wide
//! semaphore, capping the number of tasks running at once. A task that fails
//! or panics is logged and the lane moves on to the next one.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{Notify, Semaphore, mpsc};
use tracing::{Instrument, debug, error, info_span, warn};

use chloe_core::ChloeError;

type Job = Pin<Box<dyn Future<Output = Result<(), ChloeError>> + Send + 'static>>;

/// Idle time after which an empty, unreferenced lane is retired.
pub const DEFAULT_LANE_IDLE: Duration = Duration::from_secs(30);

/// How a single task ended.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed,
    Failed(ChloeError),
    Panicked(String),
}

impl TaskOutcome {
    fn from_result(result: std::thread::Result<Result<(), ChloeError>>) -> Self {
        match result {
            Ok(Ok(())) => Self::Completed,
            Ok(Err(e)) => Self::Failed(e),
            Err(payload) => Self::Panicked(panic_message(payload.as_ref())),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct Lane {
    tx: mpsc::Sender<Job>,
}

enum IdleCheck {
    /// A submitter still holds the lane; keep waiting.
    Held,
    /// A job arrived just before the check.
    Job(Job),
    /// The lane was removed from the pool.
    Retired,
}

struct PoolInner<K> {
    lanes: Mutex<HashMap<K, Arc<Lane>>>,
    permits: Semaphore,
    queue_depth: usize,
    lane_idle: Duration,
    in_flight: AtomicUsize,
    drained: Notify,
}

impl<K> PoolInner<K>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
{
    fn lanes(&self) -> MutexGuard<'_, HashMap<K, Arc<Lane>>> {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn idle_check(&self, key: &K, rx: &mut mpsc::Receiver<Job>) -> IdleCheck {
        let mut lanes = self.lanes();
        if lanes.get(key).is_some_and(|lane| Arc::strong_count(lane) > 1) {
            return IdleCheck::Held;
        }
        match rx.try_recv() {
            Ok(job) => IdleCheck::Job(job),
            Err(_) => {
                lanes.remove(key);
                IdleCheck::Retired
            }
        }
    }

    async fn execute(&self, key: &K, job: Job) {
        let outcome = match self.permits.acquire().await {
            Ok(_permit) => TaskOutcome::from_result(AssertUnwindSafe(job).catch_unwind().await),
            Err(_) => TaskOutcome::Failed(ChloeError::Internal("task pool closed".into())),
        };
        match &outcome {
            TaskOutcome::Completed => debug!(key = %key, "task completed"),
            TaskOutcome::Failed(e) => warn!(key = %key, error = %e, "task failed"),
            TaskOutcome::Panicked(msg) => error!(key = %key, panic = %msg, "task panicked"),
        }
        self.finish_one();
    }

    fn finish_one(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    async fn drive_lane(self: Arc<Self>, key: K, mut rx: mpsc::Receiver<Job>) {
        loop {
            let job = match tokio::time::timeout(self.lane_idle, rx.recv()).await {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(_) => match self.idle_check(&key, &mut rx) {
                    IdleCheck::Held => continue,
                    IdleCheck::Job(job) => job,
                    IdleCheck::Retired => {
                        debug!(key = %key, "retiring idle task lane");
                        break;
                    }
                },
            };
            self.execute(&key, job).await;
        }
    }
}

/// A pool of per-key FIFO lanes sharing a bounded number of workers.
pub struct TaskPool<K> {
    inner: Arc<PoolInner<K>>,
}

impl<K> Clone for TaskPool<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> TaskPool<K>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
{
    /// `workers` caps concurrently running tasks; `queue_depth` caps the
    /// backlog of a single key before `run` waits for room.
    pub fn new(workers: usize, queue_depth: usize) -> Self {
        Self::with_lane_idle(workers, queue_depth, DEFAULT_LANE_IDLE)
    }

    pub fn with_lane_idle(workers: usize, queue_depth: usize, lane_idle: Duration) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                lanes: Mutex::new(HashMap::new()),
                permits: Semaphore::new(workers.max(1)),
                queue_depth: queue_depth.max(1),
                lane_idle,
                in_flight: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    /// Queue `task` behind earlier tasks with the same key.
    ///
    /// Returns once the task is queued, not when it has run. Must be called
    /// from within a tokio runtime.
    pub async fn run<F>(&self, key: K, task: F) -> Result<(), ChloeError>
    where
        F: Future<Output = Result<(), ChloeError>> + Send + 'static,
    {
        let lane = self.lane(&key);
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        if lane.tx.send(Box::pin(task)).await.is_err() {
            self.inner.finish_one();
            return Err(ChloeError::Internal(format!("task lane `{key}` is closed")));
        }
        Ok(())
    }

    fn lane(&self, key: &K) -> Arc<Lane> {
        let mut lanes = self.inner.lanes();
        if let Some(lane) = lanes.get(key) {
            return Arc::clone(lane);
        }
        let (tx, rx) = mpsc::channel(self.inner.queue_depth);
        let lane = Arc::new(Lane { tx });
        lanes.insert(key.clone(), Arc::clone(&lane));
        let span = info_span!("task_lane", key = %key);
        tokio::spawn(
            Arc::clone(&self.inner)
                .drive_lane(key.clone(), rx)
                .instrument(span),
        );
        lane
    }

    /// Tasks submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Number of live lanes.
    pub fn lane_count(&self) -> usize {
        self.inner.lanes().len()
    }

    /// Wait until every submitted task has finished, or `timeout` elapses.
    /// Returns `true` if the pool drained.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let drained = self.inner.drained.notified();
                if self.pending() == 0 {
                    return;
                }
                drained.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Mutex as AsyncMutex;
    use tracing_test::traced_test;

    async fn explode() -> Result<(), ChloeError> {
        panic!("boom")
    }

    #[tokio::test]
    async fn same_key_runs_in_submission_order() {
        let pool: TaskPool<String> = TaskPool::new(4, 16);
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        for i in 0..10u64 {
            let log = Arc::clone(&log);
            pool.run("user-1".into(), async move {
                // Later tasks sleep less; order must still hold.
                tokio::time::sleep(Duration::from_millis(10 - i)).await;
                log.lock().await.push(i);
                Ok(())
            })
            .await
            .unwrap();
        }

        assert!(pool.drain(Duration::from_secs(5)).await);
        assert_eq!(*log.lock().await, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn order_holds_per_submitter_when_submitting_concurrently() {
        let pool: TaskPool<String> = TaskPool::new(3, 4);
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        let submitters: Vec<_> = ["alice", "bob"]
            .into_iter()
            .map(|name| {
                let pool = pool.clone();
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    for i in 0..20u64 {
                        // Own lane, plus a lane both submitters share.
                        for key in [name.to_string(), "shared".to_string()] {
                            let log = Arc::clone(&log);
                            let lane = key.clone();
                            pool.run(key, async move {
                                tokio::time::sleep(Duration::from_millis(i % 3)).await;
                                log.lock().await.push((lane, name, i));
                                Ok(())
                            })
                            .await
                            .unwrap();
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for submitter in submitters {
            submitter.await.unwrap();
        }

        assert!(pool.drain(Duration::from_secs(10)).await);
        let log = log.lock().await;
        for name in ["alice", "bob"] {
            for lane in [name, "shared"] {
                let seen: Vec<u64> = log
                    .iter()
                    .filter(|(l, n, _)| l == lane && *n == name)
                    .map(|(_, _, i)| *i)
                    .collect();
                assert_eq!(seen, (0..20).collect::<Vec<_>>(), "{name} on {lane}");
            }
        }
    }

    #[tokio::test]
    async fn same_key_never_overlaps() {
        let pool: TaskPool<&'static str> = TaskPool::new(4, 16);
        let busy = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));

        for _ in 0..5 {
            let busy = Arc::clone(&busy);
            let overlapped = Arc::clone(&overlapped);
            pool.run("u", async move {
                if busy.swap(true, Ordering::SeqCst) {
                    overlapped.store(true, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                busy.store(false, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        }

        assert!(pool.drain(Duration::from_secs(5)).await);
        assert!(!overlapped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn different_keys_run_concurrently() {
        let pool: TaskPool<u32> = TaskPool::new(2, 4);
        let gate = Arc::new(tokio::sync::Barrier::new(2));

        for key in [1, 2] {
            let gate = Arc::clone(&gate);
            pool.run(key, async move {
                // Both tasks must be running at once to pass the barrier.
                gate.wait().await;
                Ok(())
            })
            .await
            .unwrap();
        }

        assert!(pool.drain(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn worker_cap_limits_parallelism() {
        let pool: TaskPool<u32> = TaskPool::new(2, 4);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for key in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.run(key, async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        }

        assert!(pool.drain(Duration::from_secs(5)).await);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    #[traced_test]
    async fn panic_does_not_block_the_lane() {
        let pool: TaskPool<&'static str> = TaskPool::new(1, 4);
        let ran = Arc::new(AtomicBool::new(false));

        pool.run("u", explode()).await.unwrap();
        let flag = Arc::clone(&ran);
        pool.run("u", async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

        assert!(pool.drain(Duration::from_secs(5)).await);
        assert!(ran.load(Ordering::SeqCst));
        assert!(logs_contain("task panicked"));
        assert!(logs_contain("boom"));
    }

    #[tokio::test]
    #[traced_test]
    async fn failure_is_logged_and_swallowed() {
        let pool: TaskPool<&'static str> = TaskPool::new(1, 4);
        pool.run("u", async { Err(ChloeError::Internal("nope".into())) })
            .await
            .unwrap();

        assert!(pool.drain(Duration::from_secs(5)).await);
        assert!(logs_contain("task failed"));
        assert_eq!(pool.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_lane_retires() {
        let pool: TaskPool<&'static str> =
            TaskPool::with_lane_idle(1, 4, Duration::from_secs(30));
        pool.run("u", async { Ok(()) }).await.unwrap();
        assert!(pool.drain(Duration::from_secs(1)).await);
        assert_eq!(pool.lane_count(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(pool.lane_count(), 0);

        // A new submission recreates the lane.
        pool.run("u", async { Ok(()) }).await.unwrap();
        assert!(pool.drain(Duration::from_secs(1)).await);
        assert_eq!(pool.lane_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_times_out_on_stuck_task() {
        let pool: TaskPool<&'static str> = TaskPool::new(1, 4);
        pool.run("u", std::future::pending()).await.unwrap();
        assert!(!pool.drain(Duration::from_secs(1)).await);
        assert_eq!(pool.pending(), 1);
    }

    #[test]
    fn panic_message_extracts_text() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
