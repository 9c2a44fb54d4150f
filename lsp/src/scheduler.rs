//! Per-key debouncing of validation work.
//!
//! Each key has at most one pending job. Scheduling again before the quiet
//! period elapses replaces the pending work and restarts the timer, so a
//! burst of changes runs only the newest work, once. Timers for different
//! keys are independent.
//!
//! Once a timer fires, the job is claimed and leaves the pending map; it
//! runs to completion even if the key is scheduled or cancelled again.
//! Callers that need to ignore a superseded job's result compare generations
//! themselves.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Deferred work for one key.
pub type Work = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Receives failures of fired work. Called on the timer task.
pub type ErrorSink<K> = Arc<dyn Fn(&K, anyhow::Error) + Send + Sync>;

struct PendingJob {
    ticket: u64,
    work: Work,
    timer: JoinHandle<()>,
}

type PendingMap<K> = Arc<Mutex<HashMap<K, PendingJob>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DebounceScheduler<K> {
    delay: Duration,
    pending: PendingMap<K>,
    next_ticket: u64,
    on_error: ErrorSink<K>,
}

impl<K> DebounceScheduler<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    pub fn new(delay: Duration, on_error: ErrorSink<K>) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: 0,
            on_error,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Applies to jobs scheduled from now on.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Record `work` for `key` and (re)start its quiet-period timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, key: K, work: Work) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;

        // Held across spawn so the timer cannot claim before its entry exists.
        let mut pending = lock(&self.pending);
        let timer = tokio::spawn(fire(
            Arc::clone(&self.pending),
            key.clone(),
            ticket,
            self.delay,
            Arc::clone(&self.on_error),
        ));
        if let Some(previous) = pending.insert(
            key.clone(),
            PendingJob {
                ticket,
                work,
                timer,
            },
        ) {
            tracing::trace!(key = ?key, "Superseding pending job");
            previous.timer.abort();
        }
    }

    /// Discard the pending job for `key` without running it.
    ///
    /// Returns whether a job was pending.
    pub fn cancel(&mut self, key: &K) -> bool {
        match lock(&self.pending).remove(key) {
            Some(job) => {
                job.timer.abort();
                true
            }
            None => false,
        }
    }

    /// Claim the pending work for `key` so the caller can run it now.
    pub fn take_pending(&mut self, key: &K) -> Option<Work> {
        lock(&self.pending).remove(key).map(|job| {
            job.timer.abort();
            job.work
        })
    }

    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.pending).contains_key(key)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl<K> Drop for DebounceScheduler<K> {
    fn drop(&mut self) {
        for (_, job) in lock(&self.pending).drain() {
            job.timer.abort();
        }
    }
}

async fn fire<K>(
    pending: PendingMap<K>,
    key: K,
    ticket: u64,
    delay: Duration,
    on_error: ErrorSink<K>,
) where
    K: Eq + Hash + Debug,
{
    tokio::time::sleep(delay).await;

    let work = {
        let mut pending = lock(&pending);
        let current = pending.get(&key).is_some_and(|job| job.ticket == ticket);
        if current {
            pending.remove(&key).map(|job| job.work)
        } else {
            None
        }
    };
    let Some(work) = work else {
        return;
    };

    if let Err(err) = work.await {
        tracing::warn!(key = ?key, "Scheduled work failed: {err:#}");
        on_error(&key, err);
    }
}
