//! Handles to activated instances.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::types::ServiceType;

/// Type-erased shared instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// A handle to an activated instance.
///
/// Carries the raw instance, the concrete implementation type it was built
/// as, and an identity derived from the instance's address. Two references
/// are the same instance iff their identities are equal; the cache, the
/// activation cache and [`Kernel::release`](crate::Kernel::release) all key
/// on it.
///
/// Trait objects bound as constants are stored wrapped (`Arc<Arc<dyn S>>`);
/// their identity is the address of the inner trait object so releasing
/// through any clone of the `Arc<dyn S>` finds the same entry.
#[derive(Clone)]
pub struct InstanceReference {
    instance: AnyArc,
    identity: usize,
    implementation: ServiceType,
}

impl InstanceReference {
    /// Wraps a concrete instance.
    pub fn new<T: Any + Send + Sync>(instance: Arc<T>) -> Self {
        let identity = address_of(&instance);
        Self {
            instance,
            identity,
            implementation: ServiceType::of::<T>(),
        }
    }

    /// Wraps a type-erased instance built as `implementation`.
    pub fn from_any(instance: AnyArc, implementation: ServiceType) -> Self {
        let identity = address_of(&instance);
        Self {
            instance,
            identity,
            implementation,
        }
    }

    /// Wraps a trait object; the view handed out for `S` is the trait object itself.
    pub fn from_trait<S: ?Sized + Send + Sync + 'static>(instance: Arc<S>) -> Self {
        let identity = address_of(&instance);
        Self {
            instance: Arc::new(instance),
            identity,
            implementation: ServiceType::of::<S>(),
        }
    }

    pub fn instance(&self) -> &AnyArc {
        &self.instance
    }

    pub fn identity(&self) -> usize {
        self.identity
    }

    pub fn implementation(&self) -> &ServiceType {
        &self.implementation
    }

    /// The instance as a concrete `T`, if that is what it is.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }

    /// Borrows the instance as a concrete `T`, if that is what it is.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    pub fn is_same_instance(&self, other: &InstanceReference) -> bool {
        self.identity == other.identity
    }
}

impl fmt::Debug for InstanceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceReference")
            .field("implementation", &self.implementation)
            .field("identity", &format_args!("{:#x}", self.identity))
            .finish()
    }
}

/// Thin address of the value behind an `Arc`, ignoring any vtable.
pub(crate) fn address_of<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as *const () as usize
}
