//! Providers: the objects that actually produce instances for a binding.

use std::fmt;
use std::sync::Arc;

use crate::activation::{Context, InstanceReference};
use crate::error::{ActivationError, ActivationResult, BoxError};
use crate::parameters::ParameterKind;
use crate::planning::ConstructorInjectionDirective;
use crate::types::ServiceType;

/// Creates instances for a binding.
///
/// Providers only build: caching, cycle detection and the activation
/// pipeline are handled by the caller around [`create`](Provider::create).
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{ActivationResult, Context, InstanceReference, Kernel, Provider, Resolver};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// struct Ticket(u32);
///
/// struct TicketProvider {
///     next: AtomicU32,
/// }
///
/// impl Provider for TicketProvider {
///     fn create(&self, _context: &Context) -> ActivationResult<InstanceReference> {
///         let number = self.next.fetch_add(1, Ordering::SeqCst);
///         Ok(InstanceReference::new(Arc::new(Ticket(number))))
///     }
/// }
///
/// let kernel = Kernel::new();
/// kernel.bind::<Ticket>(|b| b.to_provider(Arc::new(TicketProvider { next: AtomicU32::new(1) })));
///
/// assert_eq!(kernel.get::<Ticket>().unwrap().0, 1);
/// assert_eq!(kernel.get::<Ticket>().unwrap().0, 2);
/// ```
pub trait Provider: Send + Sync {
    /// The type this provider builds, when it is known up front.
    fn implementation(&self) -> Option<&ServiceType> {
        None
    }

    fn create(&self, context: &Context) -> ActivationResult<InstanceReference>;
}

/// Builds instances through the planner: resolves the selected
/// constructor's targets and invokes it.
///
/// The prototype may be an open generic definition; it is closed with the
/// generic arguments of the requested service.
#[derive(Debug, Clone)]
pub struct StandardProvider {
    prototype: ServiceType,
}

impl StandardProvider {
    pub fn new(prototype: ServiceType) -> Self {
        Self { prototype }
    }

    /// The concrete type to build for `context`.
    pub fn implementation_for(&self, context: &Context) -> ActivationResult<ServiceType> {
        self.prototype.close(context.generic_arguments())
    }
}

impl Provider for StandardProvider {
    fn implementation(&self) -> Option<&ServiceType> {
        Some(&self.prototype)
    }

    fn create(&self, context: &Context) -> ActivationResult<InstanceReference> {
        let implementation = self.implementation_for(context)?;
        let kernel = context.kernel()?;
        let plan = kernel.planner().get_plan(&implementation);
        context.set_plan(plan.clone());

        let directive = plan
            .get_one::<ConstructorInjectionDirective>()?
            .ok_or_else(|| ActivationError::NoConstructor {
                implementation: implementation.to_string(),
                path: context.request().format_activation_path(),
            })?;

        let arguments = context.resolve_arguments(directive.targets(), Some(ParameterKind::ConstructorArgument))?;
        let instance = directive
            .constructor
            .invoke(&arguments)
            .map_err(ActivationError::from_fault)?;
        Ok(InstanceReference::from_any(instance, implementation))
    }
}

/// Returns the same instance every time.
#[derive(Debug, Clone)]
pub struct ConstantProvider {
    value: InstanceReference,
}

impl ConstantProvider {
    pub fn new(value: InstanceReference) -> Self {
        Self { value }
    }
}

impl Provider for ConstantProvider {
    fn implementation(&self) -> Option<&ServiceType> {
        Some(self.value.implementation())
    }

    fn create(&self, _context: &Context) -> ActivationResult<InstanceReference> {
        Ok(self.value.clone())
    }
}

type Callback = Arc<dyn Fn(&Context) -> Result<InstanceReference, BoxError> + Send + Sync>;

/// Builds instances by calling a user callback.
#[derive(Clone)]
pub struct CallbackProvider {
    callback: Callback,
}

impl CallbackProvider {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Context) -> Result<InstanceReference, BoxError> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl Provider for CallbackProvider {
    fn create(&self, context: &Context) -> ActivationResult<InstanceReference> {
        (self.callback)(context).map_err(ActivationError::from_fault)
    }
}

impl fmt::Debug for CallbackProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackProvider").finish_non_exhaustive()
    }
}
