//! Tracked task group for mirror calls.
//!
//! Mirror calls are fire-and-forget from the handler's point of view, but
//! every task is counted while it runs. Failures and panics are logged and
//! counted, and shutdown can wait for the group to go idle.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

use crate::error::DuplicateError;
use crate::stats::DuplicatorStats;

struct TasksInner {
    in_flight: AtomicUsize,
    idle: Notify,
    limit: Option<Arc<Semaphore>>,
    stats: DuplicatorStats,
}

/// Decrements the in-flight count when a task finishes, panicked or not.
struct InFlightGuard {
    inner: Arc<TasksInner>,
}

impl InFlightGuard {
    fn enter(inner: Arc<TasksInner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::AcqRel);
        Self { inner }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Spawns and tracks mirror calls. Cheap to clone (Arc).
#[derive(Clone)]
pub struct MirrorTasks {
    inner: Arc<TasksInner>,
}

impl MirrorTasks {
    /// `max_in_flight` of `None` leaves the group unbounded.
    pub fn new(max_in_flight: Option<usize>, stats: DuplicatorStats) -> Self {
        Self {
            inner: Arc::new(TasksInner {
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
                limit: max_in_flight.map(|n| Arc::new(Semaphore::new(n))),
                stats,
            }),
        }
    }

    /// Number of mirror tasks currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Spawn `call` for the mirror at `target` without waiting for it.
    ///
    /// Returns `false` if the group is at its in-flight bound, in which case
    /// the call is dropped and counted as skipped.
    pub fn spawn<F>(&self, target: &str, call: F) -> bool
    where
        F: Future<Output = Result<(), DuplicateError>> + Send + 'static,
    {
        let permit = match self.try_acquire() {
            Ok(permit) => permit,
            Err(()) => {
                tracing::warn!(mirror = %target, "Mirror task limit reached, skipping request");
                self.inner.stats.inc_mirrors_skipped();
                return false;
            }
        };

        self.inner.stats.inc_mirrors_dispatched();
        let guard = InFlightGuard::enter(self.inner.clone());
        let stats = self.inner.stats.clone();
        let target = target.to_string();

        let task = tokio::spawn(call);
        tokio::spawn(async move {
            let _guard = guard;
            let _permit = permit;
            match task.await {
                Ok(Ok(())) => stats.inc_mirrors_succeeded(),
                Ok(Err(e)) => {
                    stats.inc_mirrors_failed();
                    tracing::warn!(mirror = %target, error = %e, kind = e.kind(), "Mirror request failed");
                }
                Err(e) if e.is_panic() => {
                    stats.inc_mirrors_panicked();
                    tracing::error!(mirror = %target, "Mirror task panicked");
                }
                Err(e) => {
                    stats.inc_mirrors_failed();
                    tracing::warn!(mirror = %target, error = %e, "Mirror task cancelled");
                }
            }
        });
        true
    }

    fn try_acquire(&self) -> Result<Option<OwnedSemaphorePermit>, ()> {
        match &self.inner.limit {
            Some(semaphore) => semaphore.clone().try_acquire_owned().map(Some).map_err(|_| ()),
            None => Ok(None),
        }
    }

    /// Wait until no mirror task is running, or until `timeout` passes.
    ///
    /// Returns `true` if the group went idle in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let idle = async {
            loop {
                let notified = self.inner.idle.notified();
                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, idle).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    const MIRROR: &str = "mirror:80";

    #[tokio::test]
    async fn test_outcomes_are_counted() {
        let stats = DuplicatorStats::new();
        let tasks = MirrorTasks::new(None, stats.clone());

        assert!(tasks.spawn(MIRROR, async { Ok(()) }));
        assert!(tasks.spawn(MIRROR, async {
            Err(DuplicateError::TransportTimeout {
                destination: "mirror:80".to_string(),
            })
        }));
        assert!(tasks.spawn(MIRROR, async {
            if true {
                panic!("mirror blew up");
            }
            Ok(())
        }));

        assert!(tasks.drain(Duration::from_secs(5)).await);
        let snap = stats.snapshot();
        assert_eq!(snap.mirrors_dispatched, 3);
        assert_eq!(snap.mirrors_succeeded, 1);
        assert_eq!(snap.mirrors_failed, 1);
        assert_eq!(snap.mirrors_panicked, 1);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_bound_skips_excess_calls() {
        let stats = DuplicatorStats::new();
        let tasks = MirrorTasks::new(Some(1), stats.clone());
        let (release, wait) = oneshot::channel::<()>();

        assert!(tasks.spawn(MIRROR, async move {
            let _ = wait.await;
            Ok(())
        }));
        assert!(!tasks.spawn(MIRROR, async { Ok(()) }));
        assert_eq!(stats.snapshot().mirrors_skipped, 1);

        release.send(()).unwrap();
        assert!(tasks.drain(Duration::from_secs(5)).await);

        // The permit is back once the first call finished.
        assert!(tasks.spawn(MIRROR, async { Ok(()) }));
        assert!(tasks.drain(Duration::from_secs(5)).await);
        assert_eq!(stats.snapshot().mirrors_succeeded, 2);
    }

    #[tokio::test]
    async fn test_drain_times_out_on_hanging_call() {
        let tasks = MirrorTasks::new(None, DuplicatorStats::new());
        tasks.spawn(MIRROR, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        assert_eq!(tasks.in_flight(), 1);
        assert!(!tasks.drain(Duration::from_millis(50)).await);
        assert_eq!(tasks.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_drain_on_idle_group_returns_immediately() {
        let tasks = MirrorTasks::new(None, DuplicatorStats::new());
        assert!(tasks.drain(Duration::from_millis(1)).await);
    }
}
