//! Single-slot memoization for expensive asynchronous lookups.
//!
//! The cache remembers one key and the (possibly still running) resolution
//! for it. A request for the same key shares that resolution; a request for
//! any other key replaces the slot. The in-flight future is stored before it
//! completes, so concurrent callers coalesce onto one underlying call.
//!
//! Failures are cached like successes. Nothing retries automatically: the
//! next resolution happens only after [`ScopeCache::flush`] or a request for
//! a different key.
//!
//! Every miss starts a numbered resolution attempt. Callers that share a
//! cached or in-flight resolution see the same attempt number.

use std::fmt::Debug;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures_util::future::{FutureExt, Shared};

/// A boxed resolution future, as produced by the caller's resolver.
pub type Resolution<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

struct Slot<K, T, E> {
    key: K,
    value: Shared<Resolution<T, E>>,
    attempt: u64,
    requested_at: Instant,
}

pub struct ScopeCache<K, T, E> {
    name: &'static str,
    slot: Mutex<Option<Slot<K, T, E>>>,
    attempts: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, T, E> ScopeCache<K, T, E>
where
    K: PartialEq + Clone + Debug,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// `name` labels trace output ("settings", "lint-config").
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(None),
            attempts: AtomicU64::new(0),
        }
    }

    /// Return the value for `key`, resolving it with `resolve` on a miss.
    pub async fn get<F>(&self, key: &K, resolve: F) -> Result<T, E>
    where
        F: FnOnce(&K) -> Resolution<T, E>,
    {
        self.lookup(key, resolve).await.1
    }

    /// Like [`get`](Self::get), paired with the number of the resolution
    /// attempt the value came from.
    pub async fn lookup<F>(&self, key: &K, resolve: F) -> (u64, Result<T, E>)
    where
        F: FnOnce(&K) -> Resolution<T, E>,
    {
        let (attempt, pending) = {
            let mut slot = lock(&self.slot);
            let hit = slot
                .as_ref()
                .filter(|s| s.key == *key)
                .map(|s| (s.attempt, s.value.clone(), s.requested_at));
            if let Some((attempt, value, requested_at)) = hit {
                tracing::trace!(
                    cache = self.name,
                    key = ?key,
                    attempt,
                    age = ?requested_at.elapsed(),
                    "Scope cache hit"
                );
                (attempt, value)
            } else {
                let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::trace!(cache = self.name, key = ?key, attempt, "Scope cache miss");
                let value = resolve(key).shared();
                *slot = Some(Slot {
                    key: key.clone(),
                    value: value.clone(),
                    attempt,
                    requested_at: Instant::now(),
                });
                (attempt, value)
            }
        };
        (attempt, pending.await)
    }

    /// Forget the slot. The next `get` always resolves again.
    pub fn flush(&self) {
        if lock(&self.slot).take().is_some() {
            tracing::trace!(cache = self.name, "Scope cache flushed");
        }
    }

    /// The key currently held, if any.
    #[must_use]
    pub fn cached_key(&self) -> Option<K> {
        lock(&self.slot).as_ref().map(|s| s.key.clone())
    }
}
