//! Binding descriptors for introspection and diagnostics.

use crate::binding::{Binding, BindingTarget};
use crate::lifetime::Lifetime;
use crate::types::ServiceType;

/// Binding descriptor for introspection and diagnostics
///
/// A snapshot of one registered binding: what it is registered for, what
/// it resolves to and how long its instances live.
///
/// # Use Cases
///
/// - **Debugging**: Inspect what is bound and with which lifetime
/// - **Validation**: Check at startup that the expected services are bound
/// - **Diagnostics**: Spot implicit self bindings created on first request
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Kernel, Lifetime, Resolver, TypeInfo};
///
/// struct Database;
/// struct Clock;
///
/// let kernel = Kernel::new();
/// kernel.catalog().register(TypeInfo::of::<Clock>().constructor([], |_| Ok(Clock)));
/// kernel.bind::<Database>(|b| b.to_constant(Database).named("primary"));
/// kernel.get::<Clock>().unwrap();
///
/// let descriptors = kernel.get_binding_descriptors();
/// let database = descriptors.iter()
///     .find(|d| d.type_name().contains("Database"))
///     .unwrap();
/// assert_eq!(database.lifetime, Lifetime::Singleton);
/// assert_eq!(database.name.as_deref(), Some("primary"));
///
/// let clock = descriptors.iter()
///     .find(|d| d.type_name().contains("Clock"))
///     .unwrap();
/// assert!(clock.implicit);
/// assert_eq!(clock.lifetime, Lifetime::Transient);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
    /// The service the binding is registered for
    pub service: ServiceType,
    /// Lifetime of the instances it produces
    pub lifetime: Lifetime,
    /// What the binding resolves to
    pub target: BindingTarget,
    /// Implementation type, when the binding builds a known type
    pub implementation: Option<ServiceType>,
    /// Binding name, if any
    pub name: Option<String>,
    /// Whether the binding has a condition
    pub conditional: bool,
    /// Whether the binding was created on first request
    pub implicit: bool,
}

impl BindingDescriptor {
    pub fn from_binding(binding: &Binding) -> Self {
        let implementation = match binding.target() {
            BindingTarget::SelfType => Some(binding.service().clone()),
            BindingTarget::Type(implementation) => Some(implementation.clone()),
            _ => None,
        };
        Self {
            service: binding.service().clone(),
            lifetime: binding.lifetime(),
            target: binding.target().clone(),
            implementation,
            name: binding.metadata().name().map(str::to_string),
            conditional: binding.is_conditional(),
            implicit: binding.is_implicit(),
        }
    }

    /// Display name of the service type.
    pub fn type_name(&self) -> &str {
        self.service.name()
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

impl From<&Binding> for BindingDescriptor {
    fn from(binding: &Binding) -> Self {
        Self::from_binding(binding)
    }
}
