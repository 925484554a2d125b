//! Binding lifetime definitions.

/// Binding lifetimes controlling which scope caches an activated instance
///
/// A lifetime decides the scope object a binding's instances are cached in.
/// Instances live in the cache as long as that scope object is alive; once
/// the scope is dropped (or cleared explicitly) every instance cached for it
/// is deactivated.
///
/// # Lifetime Characteristics
///
/// - **Singleton**: cached in the kernel itself, deactivated on kernel disposal
/// - **Thread**: cached per OS thread, deactivated once the thread exits and the cache is pruned
/// - **Custom**: cached in whatever object the binding's scope callback returns
/// - **Transient**: never cached, a new instance per resolution
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Kernel, Lifetime, Resolver, TypeInfo};
/// use std::sync::Arc;
///
/// struct Database;
/// struct RequestModel;
///
/// let kernel = Kernel::new();
/// kernel.catalog().register(TypeInfo::of::<Database>().constructor([], |_| Ok(Database)));
/// kernel.catalog().register(TypeInfo::of::<RequestModel>().constructor([], |_| Ok(RequestModel)));
///
/// let db = kernel.bind::<Database>(|b| b.to_self().in_singleton_scope());
/// assert_eq!(db.lifetime(), Lifetime::Singleton);
/// kernel.bind::<RequestModel>(|b| b.to_self());
///
/// let db1 = kernel.get::<Database>().unwrap();
/// let db2 = kernel.get::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// let model1 = kernel.get::<RequestModel>().unwrap();
/// let model2 = kernel.get::<RequestModel>().unwrap();
/// assert!(!Arc::ptr_eq(&model1, &model2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum Lifetime {
    /// New instance per resolution, never cached
    #[default]
    Transient,
    /// One instance per kernel
    ///
    /// The kernel owns the singleton scope object, so singleton instances
    /// are deactivated when the kernel is disposed or dropped.
    Singleton,
    /// One instance per OS thread
    ///
    /// Each thread owns a scope object in thread-local storage. When the
    /// thread exits the scope dies and the next cache prune deactivates the
    /// thread's instances.
    Thread,
    /// One instance per object returned by the binding's scope callback
    ///
    /// The callback is evaluated for every activation; returning `None`
    /// behaves like [`Lifetime::Transient`] for that activation.
    Custom,
}

impl Lifetime {
    /// Whether instances of this lifetime are ever cached.
    pub fn is_scoped(&self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::Thread => "thread",
            Lifetime::Custom => "custom",
        };
        f.write_str(name)
    }
}
