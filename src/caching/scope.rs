//! Scope objects and the weak keys the cache stores them under.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::activation::instance::address_of;

/// Weak handle to a scope object.
///
/// Any `Arc` can act as a scope. The cache never keeps a scope alive: once
/// the last strong reference is gone the key reports itself dead and the
/// next prune deactivates everything cached under it.
#[derive(Clone)]
pub struct ScopeKey {
    address: usize,
    scope: Weak<dyn Any + Send + Sync>,
}

impl ScopeKey {
    /// Key for the scope object behind `scope`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_kernel::ScopeKey;
    /// use std::sync::Arc;
    ///
    /// struct Request;
    ///
    /// let request = Arc::new(Request);
    /// let key = ScopeKey::of(&request);
    /// assert!(key.is_alive());
    /// drop(request);
    /// assert!(!key.is_alive());
    /// ```
    pub fn of<T: Any + Send + Sync>(scope: &Arc<T>) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = scope.clone();
        Self::from_any(&erased)
    }

    pub fn from_any(scope: &Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            address: address_of(scope),
            scope: Arc::downgrade(scope),
        }
    }

    /// Address of the scope object; stable for as long as it is alive.
    pub fn address(&self) -> usize {
        self.address
    }

    pub fn is_alive(&self) -> bool {
        self.scope.strong_count() > 0
    }

    /// Whether both keys were taken from the same live scope object.
    ///
    /// A dead key matches nothing, so a new scope that reuses a dead scope's
    /// address is a different scope.
    pub fn same_scope(&self, other: &ScopeKey) -> bool {
        self.address == other.address && self.is_alive() && other.is_alive()
    }
}

impl fmt::Debug for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeKey")
            .field("address", &format_args!("{:#x}", self.address))
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Scope object owned by a kernel; singleton instances are cached under it.
#[derive(Debug, Default)]
pub struct SingletonScope;

/// Scope object owned by a thread through thread-local storage.
#[derive(Debug, Default)]
pub struct ThreadScope;

thread_local! {
    static THREAD_SCOPE: Arc<ThreadScope> = Arc::new(ThreadScope);
}

/// Key of the calling thread's scope object.
pub fn current_thread_scope() -> ScopeKey {
    THREAD_SCOPE.with(ScopeKey::of)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_of_the_same_scope_match() {
        let scope = Arc::new(SingletonScope);
        assert!(ScopeKey::of(&scope).same_scope(&ScopeKey::of(&scope)));
        assert!(!ScopeKey::of(&scope).same_scope(&ScopeKey::of(&Arc::new(SingletonScope))));
    }

    #[test]
    fn thread_scopes_differ_per_thread() {
        let here = current_thread_scope();
        assert!(here.same_scope(&current_thread_scope()));

        let there = std::thread::spawn(current_thread_scope).join().unwrap();
        assert!(!here.same_scope(&there));
        assert!(!there.is_alive());
    }
}
