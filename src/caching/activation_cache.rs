//! Weak bookkeeping of which instances went through the pipeline.

use std::any::Any;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::activation::InstanceReference;
use crate::caching::Pruneable;
use crate::internal::FastMap;

type Ledger = FastMap<usize, Weak<dyn Any + Send + Sync>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running(ThreadId),
    Activated,
    Failed,
}

/// Activation state of one instance, shared between the owning thread and
/// every thread waiting for it to settle.
struct Progress {
    phase: Mutex<Phase>,
    settled: Condvar,
}

impl Progress {
    fn running() -> Self {
        Self {
            phase: Mutex::new(Phase::Running(thread::current().id())),
            settled: Condvar::new(),
        }
    }

    fn settle(&self, phase: Phase) {
        *self.phase.lock() = phase;
        self.settled.notify_all();
    }

    /// Blocks until the owner settles. The owning thread itself never
    /// waits: re-entering its own activation sees it as running.
    fn wait(&self) -> Phase {
        let mut phase = self.phase.lock();
        while let Phase::Running(owner) = *phase {
            if owner == thread::current().id() {
                break;
            }
            self.settled.wait(&mut phase);
        }
        *phase
    }
}

struct Activation {
    instance: Weak<dyn Any + Send + Sync>,
    progress: Arc<Progress>,
}

impl Activation {
    fn is_alive(&self) -> bool {
        self.instance.strong_count() > 0
    }

    fn is_settled_activated(&self) -> bool {
        self.is_alive() && *self.progress.phase.lock() == Phase::Activated
    }
}

/// Outcome of [`ActivationCache::claim_activation`].
pub enum ActivationClaim<'a> {
    /// The caller must run the activation and then
    /// [`complete`](ActivationTicket::complete) the ticket.
    Granted(ActivationTicket<'a>),
    /// The instance is already activated.
    Settled,
}

/// Exclusive right to activate one instance.
///
/// Dropping the ticket without completing it (a strategy failed, or
/// panicked) withdraws the claim, so the next caller activates the instance
/// again.
#[must_use = "an uncompleted ticket withdraws the activation claim"]
pub struct ActivationTicket<'a> {
    owner: Option<(&'a ActivationCache, usize, Arc<Progress>)>,
}

impl ActivationTicket<'_> {
    pub fn complete(mut self) {
        if let Some((_, _, progress)) = self.owner.take() {
            progress.settle(Phase::Activated);
        }
    }
}

impl Drop for ActivationTicket<'_> {
    fn drop(&mut self) {
        if let Some((cache, identity, progress)) = self.owner.take() {
            cache.unclaim_activation(identity, &progress);
            progress.settle(Phase::Failed);
        }
    }
}

/// Records activated and deactivated instances so that each instance is
/// activated once and deactivated at most once.
///
/// Entries are keyed on instance identity and hold only weak references: a
/// dead entry is treated as absent, and pruning drops it. An activation
/// claim stays pending until its ticket completes; other threads claiming
/// the same instance meanwhile block until it settles, so no caller sees an
/// instance whose activation is still running on another thread. A failed
/// activation is withdrawn and one of the waiters takes it over.
///
/// When disabled every claim is granted and nothing is recorded.
pub struct ActivationCache {
    enabled: bool,
    activated: Mutex<FastMap<usize, Activation>>,
    deactivated: Mutex<Ledger>,
}

impl ActivationCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            activated: Mutex::new(FastMap::default()),
            deactivated: Mutex::new(FastMap::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Claims the activation of `reference`, waiting for a claim another
    /// thread holds to settle first.
    pub fn claim_activation(&self, reference: &InstanceReference) -> ActivationClaim<'_> {
        if !self.enabled {
            return ActivationClaim::Granted(ActivationTicket { owner: None });
        }
        let identity = reference.identity();
        loop {
            let progress = {
                let mut ledger = self.activated.lock();
                match ledger.get(&identity) {
                    Some(entry) if entry.is_alive() => entry.progress.clone(),
                    _ => {
                        let progress = Arc::new(Progress::running());
                        ledger.insert(
                            identity,
                            Activation {
                                instance: Arc::downgrade(reference.instance()),
                                progress: progress.clone(),
                            },
                        );
                        return ActivationClaim::Granted(ActivationTicket {
                            owner: Some((self, identity, progress)),
                        });
                    }
                }
            };
            match progress.wait() {
                Phase::Failed => continue,
                Phase::Activated | Phase::Running(_) => return ActivationClaim::Settled,
            }
        }
    }

    /// Records `reference` as deactivated; `false` if it already was.
    pub fn claim_deactivation(&self, reference: &InstanceReference) -> bool {
        if !self.enabled {
            return true;
        }
        let mut ledger = self.deactivated.lock();
        if let Some(existing) = ledger.get(&reference.identity()) {
            if existing.strong_count() > 0 {
                return false;
            }
        }
        ledger.insert(reference.identity(), Arc::downgrade(reference.instance()));
        true
    }

    pub fn is_activated(&self, reference: &InstanceReference) -> bool {
        self.activated
            .lock()
            .get(&reference.identity())
            .map_or(false, Activation::is_settled_activated)
    }

    pub fn is_deactivated(&self, reference: &InstanceReference) -> bool {
        self.deactivated
            .lock()
            .get(&reference.identity())
            .map_or(false, |instance| instance.strong_count() > 0)
    }

    pub fn activated_count(&self) -> usize {
        self.activated
            .lock()
            .values()
            .filter(|entry| entry.is_settled_activated())
            .count()
    }

    pub fn deactivated_count(&self) -> usize {
        self.deactivated
            .lock()
            .values()
            .filter(|instance| instance.strong_count() > 0)
            .count()
    }

    pub fn clear(&self) {
        self.activated.lock().clear();
        self.deactivated.lock().clear();
    }

    fn unclaim_activation(&self, identity: usize, progress: &Arc<Progress>) {
        let mut ledger = self.activated.lock();
        if ledger
            .get(&identity)
            .map_or(false, |entry| Arc::ptr_eq(&entry.progress, progress))
        {
            ledger.remove(&identity);
        }
    }
}

impl Pruneable for ActivationCache {
    fn prune(&self) -> usize {
        let mut pruned = 0;
        {
            let mut ledger = self.activated.lock();
            let before = ledger.len();
            ledger.retain(|_, entry| entry.is_alive());
            pruned += before - ledger.len();
        }
        {
            let mut ledger = self.deactivated.lock();
            let before = ledger.len();
            ledger.retain(|_, instance| instance.strong_count() > 0);
            pruned += before - ledger.len();
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn granted(claim: ActivationClaim<'_>) -> ActivationTicket<'_> {
        match claim {
            ActivationClaim::Granted(ticket) => ticket,
            ActivationClaim::Settled => panic!("expected the claim to be granted"),
        }
    }

    #[test]
    fn completed_claim_settles_later_claims() {
        let cache = ActivationCache::new(true);
        let reference = InstanceReference::new(Arc::new(5u32));

        let ticket = granted(cache.claim_activation(&reference));
        assert!(!cache.is_activated(&reference));
        ticket.complete();

        assert!(cache.is_activated(&reference));
        assert!(matches!(cache.claim_activation(&reference), ActivationClaim::Settled));

        assert!(cache.claim_deactivation(&reference));
        assert!(!cache.claim_deactivation(&reference));
    }

    #[test]
    fn dropped_ticket_withdraws_claim() {
        let cache = ActivationCache::new(true);
        let reference = InstanceReference::new(Arc::new(5u32));

        drop(granted(cache.claim_activation(&reference)));
        assert!(!cache.is_activated(&reference));

        granted(cache.claim_activation(&reference)).complete();
        assert_eq!(cache.activated_count(), 1);
    }

    #[test]
    fn waiters_block_until_activation_completes() {
        let cache = ActivationCache::new(true);
        let reference = InstanceReference::new(Arc::new(5u32));
        let finished = AtomicBool::new(false);

        let ticket = granted(cache.claim_activation(&reference));
        std::thread::scope(|scope| {
            let waiter = scope.spawn(|| {
                let settled = matches!(cache.claim_activation(&reference), ActivationClaim::Settled);
                (settled, finished.load(Ordering::SeqCst))
            });
            std::thread::sleep(Duration::from_millis(50));
            finished.store(true, Ordering::SeqCst);
            ticket.complete();

            assert_eq!(waiter.join().unwrap(), (true, true));
        });
    }

    #[test]
    fn waiter_takes_over_failed_activation() {
        let cache = ActivationCache::new(true);
        let reference = InstanceReference::new(Arc::new(5u32));

        let ticket = granted(cache.claim_activation(&reference));
        std::thread::scope(|scope| {
            let waiter = scope.spawn(|| match cache.claim_activation(&reference) {
                ActivationClaim::Granted(ticket) => {
                    ticket.complete();
                    true
                }
                ActivationClaim::Settled => false,
            });
            std::thread::sleep(Duration::from_millis(50));
            drop(ticket);

            assert!(waiter.join().unwrap());
        });
        assert!(cache.is_activated(&reference));
    }

    #[test]
    fn owner_thread_does_not_wait_on_itself() {
        let cache = ActivationCache::new(true);
        let reference = InstanceReference::new(Arc::new(5u32));

        let ticket = granted(cache.claim_activation(&reference));
        assert!(matches!(cache.claim_activation(&reference), ActivationClaim::Settled));
        ticket.complete();
    }

    #[test]
    fn dead_instances_are_forgotten() {
        let cache = ActivationCache::new(true);
        let reference = InstanceReference::new(Arc::new(String::from("gone")));
        granted(cache.claim_activation(&reference)).complete();
        drop(reference);

        assert_eq!(cache.activated_count(), 0);
        assert_eq!(cache.prune(), 1);
    }

    #[test]
    fn disabled_cache_always_claims() {
        let cache = ActivationCache::new(false);
        let reference = InstanceReference::new(Arc::new(1u8));
        granted(cache.claim_activation(&reference)).complete();
        granted(cache.claim_activation(&reference)).complete();
        assert!(!cache.is_activated(&reference));
    }
}
