//! Activation blocks: short-lived resolution roots with deterministic cleanup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::activation::{Request, Resolution};
use crate::caching::ScopeKey;
use crate::error::{ActivationError, ActivationResult};
use crate::kernel::Kernel;
use crate::traits::{Resolver, ResolverCore};

/// Scope object owned by an [`ActivationBlock`].
#[derive(Debug, Default)]
pub struct BlockScope;

/// A resolution root that scopes transient bindings to itself.
///
/// Every request made through the block, and every dependency resolved
/// below it, carries the block as its scope. Bindings without a scope of
/// their own are therefore cached in the block: resolving the same service
/// twice through one block yields one instance. Bindings with their own
/// scope (singletons, thread or custom scopes) keep it.
///
/// Disposing (or dropping) the block deactivates everything it cached.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Kernel, Resolver, TypeInfo};
/// use std::sync::Arc;
///
/// struct UnitOfWork;
///
/// let kernel = Kernel::new();
/// kernel.catalog().register(TypeInfo::of::<UnitOfWork>().constructor([], |_| Ok(UnitOfWork)));
///
/// let block = kernel.begin_block();
/// let a = block.get::<UnitOfWork>().unwrap();
/// let b = block.get::<UnitOfWork>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let outside = kernel.get::<UnitOfWork>().unwrap();
/// assert!(!Arc::ptr_eq(&a, &outside));
/// block.dispose();
/// ```
pub struct ActivationBlock {
    kernel: Kernel,
    scope: Arc<BlockScope>,
    disposed: AtomicBool,
}

impl ActivationBlock {
    pub(crate) fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            scope: Arc::new(BlockScope),
            disposed: AtomicBool::new(false),
        }
    }

    /// The kernel the block resolves through.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Key of the block's scope object.
    pub fn scope(&self) -> ScopeKey {
        ScopeKey::of(&self.scope)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Deactivates every instance cached in the block. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.kernel.cache().clear(&self.scope());
        tracing::debug!(target: "ferrous_kernel", "Disposed activation block");
    }
}

impl ResolverCore for ActivationBlock {
    fn resolve(&self, request: Request) -> ActivationResult<Resolution> {
        if self.is_disposed() {
            return Err(ActivationError::Disposed);
        }
        self.kernel.resolve(request.with_scope(self.scope()))
    }

    fn can_resolve(&self, request: &Request) -> bool {
        !self.is_disposed() && self.kernel.can_resolve(request)
    }
}

impl Resolver for ActivationBlock {}

impl Drop for ActivationBlock {
    fn drop(&mut self) {
        self.dispose();
    }
}
