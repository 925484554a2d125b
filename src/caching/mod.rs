//! Instance caching: the scoped cache, activation bookkeeping and pruning.

mod activation_cache;
mod cache;
mod pruner;
mod scope;

pub use activation_cache::{ActivationCache, ActivationClaim, ActivationTicket};
pub use cache::{Cache, CacheEntry};
pub use pruner::{CachePruner, IntervalCachePruner, NoopCachePruner, Pruneable};
pub use scope::{current_thread_scope, ScopeKey, SingletonScope, ThreadScope};
