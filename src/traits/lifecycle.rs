//! Lifecycle traits invoked by the standard activation strategies.
//!
//! The kernel cannot discover trait implementations at runtime, so a type
//! opts in through its catalog entry (see [`TypeInfo`](crate::TypeInfo)):
//! `initializable()`, `startable()` and `disposable()` wire these traits into
//! the pipeline.

/// Called once, right after construction and member injection.
///
/// # Examples
///
/// ```
/// use ferrous_kernel::{Initializable, Kernel, Resolver, TypeInfo};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Cache {
///     warmed: AtomicBool,
/// }
///
/// impl Initializable for Cache {
///     fn initialize(&self) {
///         self.warmed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let kernel = Kernel::new();
/// kernel.catalog().register(
///     TypeInfo::of::<Cache>()
///         .constructor([], |_| Ok(Cache::default()))
///         .initializable(),
/// );
/// kernel.bind::<Cache>(|b| b.to_self().in_singleton_scope());
///
/// let cache = kernel.get::<Cache>().unwrap();
/// assert!(cache.warmed.load(Ordering::SeqCst));
/// ```
pub trait Initializable: Send + Sync + 'static {
    /// Perform post-construction initialization.
    fn initialize(&self);
}

/// Started on activation and stopped on deactivation.
pub trait Startable: Send + Sync + 'static {
    /// Begin whatever work the service performs.
    fn start(&self);
    /// Stop the work started by [`start`](Self::start).
    fn stop(&self);
}

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (e.g., flushing caches,
/// closing connections). Disposal runs when the instance is deactivated: when its scope is
/// cleared, when it is released, or when the kernel is disposed.
///
/// # Examples
///
/// ```
/// use ferrous_kernel::{Dispose, Kernel, Resolver, TypeInfo};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// static DISPOSED: AtomicUsize = AtomicUsize::new(0);
///
/// struct Connection;
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         DISPOSED.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let kernel = Kernel::new();
/// kernel.catalog().register(
///     TypeInfo::of::<Connection>()
///         .constructor([], |_| Ok(Connection))
///         .disposable(),
/// );
/// kernel.bind::<Connection>(|b| b.to_self().in_singleton_scope());
///
/// let connection = kernel.get::<Connection>().unwrap();
/// assert!(kernel.release(&connection));
/// assert_eq!(DISPOSED.load(Ordering::SeqCst), 1);
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
