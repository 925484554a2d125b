//! Scoped instance cache.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::activation::{Context, InstanceReference, Pipeline};
use crate::caching::{Pruneable, ScopeKey};
use crate::internal::FastMap;

/// An instance remembered for a binding in a scope, with the context that
/// activated it (needed again for deactivation).
#[derive(Clone)]
pub struct CacheEntry {
    context: Arc<Context>,
    reference: InstanceReference,
    sequence: u64,
}

impl CacheEntry {
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn reference(&self) -> &InstanceReference {
        &self.reference
    }
}

struct ScopeEntries {
    scope: ScopeKey,
    by_binding: FastMap<usize, Vec<CacheEntry>>,
}

impl ScopeEntries {
    fn new(scope: ScopeKey) -> Self {
        Self {
            scope,
            by_binding: FastMap::default(),
        }
    }

    fn len(&self) -> usize {
        self.by_binding.values().map(Vec::len).sum()
    }

    fn into_entries(self) -> Vec<CacheEntry> {
        self.by_binding.into_values().flatten().collect()
    }
}

#[derive(Default)]
struct CacheState {
    scopes: FastMap<usize, ScopeEntries>,
    next_sequence: u64,
}

/// Remembers activated instances per scope object and binding.
///
/// The cache holds scopes weakly: it never keeps a scope alive, and entries
/// of a dead scope are deactivated on the next prune (or as soon as another
/// scope reuses the dead scope's address). Deactivation always runs outside
/// the cache lock, in the order the instances were remembered.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Kernel, Resolver, ScopeKey, TypeInfo};
/// use std::sync::Arc;
///
/// struct Session;
/// struct Repository;
///
/// let kernel = Kernel::new();
/// kernel.catalog().register(TypeInfo::of::<Repository>().constructor([], |_| Ok(Repository)));
///
/// let session = Arc::new(Session);
/// let key = ScopeKey::of(&session);
/// kernel.bind::<Repository>(move |b| b.to_self().in_scope(move |_| Some(key.clone())));
///
/// let first = kernel.get::<Repository>().unwrap();
/// assert!(Arc::ptr_eq(&first, &kernel.get::<Repository>().unwrap()));
/// assert_eq!(kernel.cache().count_in_scope(&ScopeKey::of(&session)), 1);
///
/// kernel.cache().clear(&ScopeKey::of(&session));
/// assert_eq!(kernel.cache().count(), 0);
/// ```
pub struct Cache {
    pipeline: Arc<Pipeline>,
    state: Mutex<CacheState>,
}

impl Cache {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Looks up the instance cached for the context's binding in the
    /// context's scope. Transient contexts never hit.
    pub fn try_get(&self, context: &Context) -> Option<InstanceReference> {
        let scope = context.scope()?;
        self.try_get_in_scope(context, &scope)
    }

    /// Looks up the instance cached for the context's binding in `scope`.
    ///
    /// When several entries match, the most recently remembered one wins.
    /// For open generic bindings an entry matches only if it was activated
    /// with the same generic arguments.
    pub fn try_get_in_scope(&self, context: &Context, scope: &ScopeKey) -> Option<InstanceReference> {
        let state = self.state.lock();
        let entries = state.scopes.get(&scope.address())?;
        if !entries.scope.same_scope(scope) {
            return None;
        }
        entries
            .by_binding
            .get(&context.binding().configuration_id())?
            .iter()
            .rev()
            .find(|entry| {
                !context.has_inferred_generic_arguments()
                    || entry.context.generic_arguments() == context.generic_arguments()
            })
            .map(|entry| entry.reference.clone())
    }

    /// Remembers `reference` under the context's scope; no-op for transient contexts.
    pub fn remember(&self, context: &Arc<Context>, reference: InstanceReference) {
        match context.scope() {
            Some(scope) => self.remember_in_scope(context, &scope, reference),
            None => tracing::trace!(
                target: "ferrous_kernel",
                binding = %context.binding(),
                "Transient instance not cached"
            ),
        }
    }

    pub fn remember_in_scope(&self, context: &Arc<Context>, scope: &ScopeKey, reference: InstanceReference) {
        let stale = {
            let mut state = self.state.lock();
            let sequence = state.next_sequence;
            state.next_sequence += 1;

            let mut stale = Vec::new();
            let slot = state
                .scopes
                .entry(scope.address())
                .or_insert_with(|| ScopeEntries::new(scope.clone()));
            if !slot.scope.same_scope(scope) {
                let dead = std::mem::replace(slot, ScopeEntries::new(scope.clone()));
                stale = dead.into_entries();
            }
            slot.by_binding
                .entry(context.binding().configuration_id())
                .or_default()
                .push(CacheEntry {
                    context: context.clone(),
                    reference,
                    sequence,
                });
            stale
        };

        tracing::trace!(
            target: "ferrous_kernel",
            binding = %context.binding(),
            scope = scope.address(),
            "Remembered instance"
        );
        self.deactivate_all(stale);
    }

    /// Forgets every entry holding the instance with `identity` and
    /// deactivates it. Returns whether anything was released.
    pub fn release(&self, identity: usize) -> bool {
        let released = {
            let mut state = self.state.lock();
            let mut released = Vec::new();
            for entries in state.scopes.values_mut() {
                for bucket in entries.by_binding.values_mut() {
                    let (matching, rest): (Vec<_>, Vec<_>) =
                        bucket.drain(..).partition(|entry| entry.reference.identity() == identity);
                    *bucket = rest;
                    released.extend(matching);
                }
                entries.by_binding.retain(|_, bucket| !bucket.is_empty());
            }
            state.scopes.retain(|_, entries| !entries.by_binding.is_empty());
            released
        };

        let found = !released.is_empty();
        self.deactivate_all(released);
        found
    }

    /// Forgets and deactivates everything cached under `scope`.
    pub fn clear(&self, scope: &ScopeKey) {
        let cleared = {
            let mut state = self.state.lock();
            let owned = state
                .scopes
                .get(&scope.address())
                .map_or(false, |entries| entries.scope.same_scope(scope));
            if owned {
                state
                    .scopes
                    .remove(&scope.address())
                    .map(ScopeEntries::into_entries)
                    .unwrap_or_default()
            } else {
                Vec::new()
            }
        };
        tracing::debug!(
            target: "ferrous_kernel",
            scope = scope.address(),
            entries = cleared.len(),
            "Cleared scope"
        );
        self.deactivate_all(cleared);
    }

    /// Forgets and deactivates everything in every scope.
    pub fn clear_all(&self) {
        let cleared: Vec<CacheEntry> = {
            let mut state = self.state.lock();
            state.scopes.drain().flat_map(|(_, entries)| entries.into_entries()).collect()
        };
        tracing::debug!(target: "ferrous_kernel", entries = cleared.len(), "Cleared cache");
        self.deactivate_all(cleared);
    }

    /// Forgets the entry for `reference` without deactivating it.
    pub(crate) fn discard(&self, context: &Context, reference: &InstanceReference) {
        let mut state = self.state.lock();
        for entries in state.scopes.values_mut() {
            if let Some(bucket) = entries.by_binding.get_mut(&context.binding().configuration_id()) {
                bucket.retain(|entry| !entry.reference.is_same_instance(reference));
            }
            entries.by_binding.retain(|_, bucket| !bucket.is_empty());
        }
        state.scopes.retain(|_, entries| !entries.by_binding.is_empty());
    }

    /// Number of cached entries across all scopes.
    pub fn count(&self) -> usize {
        self.state.lock().scopes.values().map(ScopeEntries::len).sum()
    }

    pub fn count_in_scope(&self, scope: &ScopeKey) -> usize {
        self.state
            .lock()
            .scopes
            .get(&scope.address())
            .filter(|entries| entries.scope.same_scope(scope))
            .map_or(0, ScopeEntries::len)
    }

    fn deactivate_all(&self, mut entries: Vec<CacheEntry>) {
        entries.sort_by_key(|entry| entry.sequence);
        for entry in entries {
            if let Err(error) = self.pipeline.deactivate(&entry.context, &entry.reference) {
                tracing::warn!(
                    target: "ferrous_kernel",
                    binding = %entry.context.binding(),
                    error = %error,
                    "Deactivation failed"
                );
            }
        }
    }
}

impl Pruneable for Cache {
    fn prune(&self) -> usize {
        let dead: Vec<CacheEntry> = {
            let mut state = self.state.lock();
            let dead_scopes: Vec<usize> = state
                .scopes
                .iter()
                .filter(|(_, entries)| !entries.scope.is_alive())
                .map(|(address, _)| *address)
                .collect();
            dead_scopes
                .into_iter()
                .filter_map(|address| state.scopes.remove(&address))
                .flat_map(ScopeEntries::into_entries)
                .collect()
        };
        let pruned = dead.len();
        if pruned > 0 {
            tracing::debug!(target: "ferrous_kernel", entries = pruned, "Pruned dead scopes");
        }
        self.deactivate_all(dead);
        pruned
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Cache")
            .field("scopes", &state.scopes.len())
            .field("entries", &state.scopes.values().map(ScopeEntries::len).sum::<usize>())
            .finish()
    }
}
