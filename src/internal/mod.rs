//! Internal implementation details.

pub(crate) mod circular;

pub(crate) use circular::ActiveBindingGuard;

/// Hash map used for the kernel's internal lookup tables.
#[cfg(feature = "ahash")]
pub type FastMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

#[cfg(not(feature = "ahash"))]
pub type FastMap<K, V> = std::collections::HashMap<K, V>;
