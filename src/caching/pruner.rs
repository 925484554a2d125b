//! Periodic pruning of caches whose scopes have died.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A cache that can drop (and deactivate) entries whose scope is no longer alive.
pub trait Pruneable: Send + Sync {
    /// Removes dead entries and returns how many were removed.
    fn prune(&self) -> usize;
}

/// Schedules pruning of registered caches.
///
/// Pruners hold their caches weakly; a cache that was dropped is skipped
/// and forgotten.
pub trait CachePruner: Send + Sync {
    /// Starts pruning `cache` (alongside anything registered earlier).
    fn start(&self, cache: Weak<dyn Pruneable>);

    /// Stops pruning. Idempotent; blocks until an in-flight pass finishes.
    fn stop(&self);
}

/// Pruner that never prunes. Dead scopes are still evicted when another
/// scope reuses their address or when a scope is cleared explicitly.
#[derive(Debug, Default)]
pub struct NoopCachePruner;

impl CachePruner for NoopCachePruner {
    fn start(&self, _cache: Weak<dyn Pruneable>) {}

    fn stop(&self) {}
}

#[derive(Default)]
struct PrunerState {
    caches: Vec<Weak<dyn Pruneable>>,
    stopped: bool,
}

struct Shared {
    state: Mutex<PrunerState>,
    wake: Condvar,
}

struct Worker {
    handle: JoinHandle<()>,
    thread: ThreadId,
}

/// Prunes registered caches from a background thread at a fixed interval.
///
/// The thread is spawned on the first [`start`](CachePruner::start) and
/// exits on [`stop`](CachePruner::stop) or when the pruner is dropped.
pub struct IntervalCachePruner {
    interval: Duration,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl IntervalCachePruner {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            shared: Arc::new(Shared {
                state: Mutex::new(PrunerState::default()),
                wake: Condvar::new(),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the background thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    fn spawn(&self) -> Option<Worker> {
        let shared = self.shared.clone();
        let interval = self.interval;
        let spawned = thread::Builder::new()
            .name("ferrous-kernel-pruner".into())
            .spawn(move || run(&shared, interval));
        match spawned {
            Ok(handle) => Some(Worker {
                thread: handle.thread().id(),
                handle,
            }),
            Err(error) => {
                tracing::warn!(
                    target: "ferrous_kernel",
                    error = %error,
                    "Failed to spawn cache pruner thread; dead scopes are pruned on reuse only"
                );
                None
            }
        }
    }
}

impl CachePruner for IntervalCachePruner {
    fn start(&self, cache: Weak<dyn Pruneable>) {
        {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return;
            }
            state.caches.push(cache);
        }

        let mut worker = self.worker.lock();
        if worker.is_none() {
            *worker = self.spawn();
            tracing::debug!(
                target: "ferrous_kernel",
                interval_ms = self.interval.as_millis() as u64,
                "Started cache pruner"
            );
        }
    }

    fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            state.caches.clear();
        }
        self.shared.wake.notify_all();

        if let Some(worker) = self.worker.lock().take() {
            // A deactivation hook running on the pruner thread may drop the last kernel handle.
            if worker.thread != thread::current().id() && worker.handle.join().is_err() {
                tracing::warn!(target: "ferrous_kernel", "Cache pruner thread panicked");
            }
        }
        tracing::debug!(target: "ferrous_kernel", "Stopped cache pruner");
    }
}

impl Drop for IntervalCachePruner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: &Shared, interval: Duration) {
    loop {
        let caches: Vec<Arc<dyn Pruneable>> = {
            let mut state = shared.state.lock();
            if !state.stopped {
                shared.wake.wait_for(&mut state, interval);
            }
            if state.stopped {
                return;
            }
            state.caches.retain(|cache| cache.strong_count() > 0);
            state.caches.iter().filter_map(Weak::upgrade).collect()
        };

        for cache in caches {
            let pruned = cache.prune();
            if pruned > 0 {
                tracing::trace!(target: "ferrous_kernel", pruned, "Pruned dead cache entries");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct Counter(AtomicUsize);

    impl Pruneable for Counter {
        fn prune(&self) -> usize {
            self.0.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    #[test]
    fn prunes_periodically_until_stopped() {
        let pruner = IntervalCachePruner::new(Duration::from_millis(5));
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let weak: Weak<dyn Pruneable> = Arc::downgrade(&counter) as Weak<dyn Pruneable>;
        pruner.start(weak);
        assert!(pruner.is_running());

        let deadline = Instant::now() + Duration::from_secs(5);
        while counter.0.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(counter.0.load(Ordering::SeqCst) >= 2);

        pruner.stop();
        assert!(!pruner.is_running());
        let after_stop = counter.0.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.0.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn stop_is_idempotent_and_blocks_restart() {
        let pruner = IntervalCachePruner::new(Duration::from_secs(60));
        pruner.stop();
        pruner.stop();

        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        pruner.start(Arc::downgrade(&counter) as Weak<dyn Pruneable>);
        assert!(!pruner.is_running());
    }
}
