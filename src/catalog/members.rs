//! Injectable members: targets, constructors, properties and methods.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::activation::{AnyArc, InstanceReference};
use crate::binding::BindingMetadata;
use crate::error::{ActivationError, ActivationResult, BoxError};
use crate::types::ServiceType;

/// Predicate over binding metadata, attached to a [`Target`] to restrict
/// which bindings may satisfy it.
pub type Constraint = Arc<dyn Fn(&BindingMetadata) -> bool + Send + Sync>;

/// Invokes a constructor with resolved arguments.
pub type ConstructorInjector = Arc<dyn Fn(&Arguments) -> Result<AnyArc, BoxError> + Send + Sync>;

/// Injects resolved values into an existing instance (property setter or method call).
pub type MemberInjector = Arc<dyn Fn(&AnyArc, &Arguments) -> Result<(), BoxError> + Send + Sync>;

/// The kind of member a [`Target`] belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSite {
    /// Not yet attached to a member.
    Detached,
    /// A constructor parameter of `declaring_type`.
    ConstructorParameter { declaring_type: ServiceType },
    /// A property of `declaring_type`.
    Property { declaring_type: ServiceType },
    /// A parameter of `method` on `declaring_type`.
    MethodParameter {
        declaring_type: ServiceType,
        method: Arc<str>,
    },
}

/// A site that receives an injected value: a constructor parameter, a
/// property or a method parameter.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{ServiceType, Target};
///
/// trait Weapon: Send + Sync {}
///
/// let target = Target::of::<dyn Weapon>("weapon").optional();
/// assert_eq!(target.name(), "weapon");
/// assert_eq!(target.service(), &ServiceType::of::<dyn Weapon>());
/// assert!(target.is_optional());
/// ```
#[derive(Clone)]
pub struct Target {
    name: Arc<str>,
    service: ServiceType,
    optional: bool,
    constraint: Option<Constraint>,
    site: TargetSite,
}

impl Target {
    /// Target named `name` of the given service type.
    pub fn new(name: impl Into<Arc<str>>, service: ServiceType) -> Self {
        Self {
            name: name.into(),
            service,
            optional: false,
            constraint: None,
            site: TargetSite::Detached,
        }
    }

    /// Target named `name` of the Rust type `T`.
    pub fn of<T: ?Sized + 'static>(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ServiceType::of::<T>())
    }

    /// Resolve to no value instead of failing when nothing matches.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Only bindings carrying this name may satisfy the target.
    pub fn named(self, binding_name: impl Into<String>) -> Self {
        let binding_name = binding_name.into();
        self.with_constraint(move |metadata| metadata.name() == Some(binding_name.as_str()))
    }

    /// Only bindings whose metadata satisfies `constraint` may satisfy the target.
    pub fn with_constraint<F>(mut self, constraint: F) -> Self
    where
        F: Fn(&BindingMetadata) -> bool + Send + Sync + 'static,
    {
        self.constraint = Some(Arc::new(constraint));
        self
    }

    pub(crate) fn attached(mut self, site: TargetSite) -> Self {
        self.site = site;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    pub fn site(&self) -> &TargetSite {
        &self.site
    }

    /// The type declaring the member this target belongs to.
    pub fn declaring_type(&self) -> Option<&ServiceType> {
        match &self.site {
            TargetSite::Detached => None,
            TargetSite::ConstructorParameter { declaring_type }
            | TargetSite::Property { declaring_type }
            | TargetSite::MethodParameter { declaring_type, .. } => Some(declaring_type),
        }
    }

    /// Human-readable description used in activation paths.
    pub fn describe(&self) -> String {
        match &self.site {
            TargetSite::Detached => format!("target {}", self.name),
            TargetSite::ConstructorParameter { declaring_type } => {
                format!("parameter {} of constructor of type {}", self.name, declaring_type)
            }
            TargetSite::Property { declaring_type } => {
                format!("property {} of type {}", self.name, declaring_type)
            }
            TargetSite::MethodParameter {
                declaring_type,
                method,
            } => format!("parameter {} of method {} of type {}", self.name, method, declaring_type),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("service", &self.service)
            .field("optional", &self.optional)
            .field("constrained", &self.constraint.is_some())
            .field("site", &self.site)
            .finish()
    }
}

/// Resolved values handed to an injector, positionally matching its targets.
///
/// Trait-typed values are stored as `Arc<Arc<dyn Trait>>`; use
/// [`get_trait`](Self::get_trait) to read them.
#[derive(Default)]
pub struct Arguments {
    values: Vec<Option<AnyArc>>,
}

impl Arguments {
    pub fn new(values: Vec<Option<AnyArc>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The raw value at `index`, if one was resolved.
    pub fn raw(&self, index: usize) -> Option<&AnyArc> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Required concrete value at `index`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> ActivationResult<Arc<T>> {
        self.optional(index)?.ok_or_else(|| missing_argument::<T>(index))
    }

    /// Concrete value at `index`, `None` if an optional target had no binding.
    pub fn optional<T: Any + Send + Sync>(&self, index: usize) -> ActivationResult<Option<Arc<T>>> {
        self.raw(index).map(|value| downcast_view::<T>(value.clone())).transpose()
    }

    /// Required trait object at `index`.
    pub fn get_trait<S: ?Sized + Send + Sync + 'static>(&self, index: usize) -> ActivationResult<Arc<S>> {
        self.optional_trait(index)?.ok_or_else(|| missing_argument::<S>(index))
    }

    /// Trait object at `index`, `None` if an optional target had no binding.
    pub fn optional_trait<S: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> ActivationResult<Option<Arc<S>>> {
        self.raw(index).map(|value| downcast_trait_view::<S>(value.clone())).transpose()
    }
}

fn missing_argument<T: ?Sized>(index: usize) -> ActivationError {
    ActivationError::InvalidArgument {
        argument: "index",
        reason: format!("no value of {} at position {}", std::any::type_name::<T>(), index),
    }
}

/// Downcasts a service view to a concrete type.
pub(crate) fn downcast_view<T: Any + Send + Sync>(value: AnyArc) -> ActivationResult<Arc<T>> {
    value.downcast::<T>().map_err(|_| ActivationError::type_mismatch::<T>())
}

/// Unwraps a trait-typed service view (`Arc<Arc<dyn Trait>>`).
pub(crate) fn downcast_trait_view<S: ?Sized + Send + Sync + 'static>(value: AnyArc) -> ActivationResult<Arc<S>> {
    value
        .downcast::<Arc<S>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| ActivationError::type_mismatch::<S>())
}

/// A constructor that can be selected for constructor injection.
#[derive(Clone)]
pub struct ConstructorInfo {
    pub(crate) targets: Arc<[Target]>,
    pub(crate) injector: ConstructorInjector,
    pub(crate) marked: bool,
}

impl ConstructorInfo {
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Whether the constructor was explicitly marked for injection.
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Invokes the constructor; the result carries no implementation type yet.
    pub fn invoke(&self, arguments: &Arguments) -> Result<AnyArc, BoxError> {
        (self.injector)(arguments)
    }
}

/// A property that receives an injected value after construction.
#[derive(Clone)]
pub struct PropertyInfo {
    pub(crate) target: Target,
    pub(crate) injector: MemberInjector,
}

impl PropertyInfo {
    pub fn name(&self) -> &str {
        self.target.name()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn invoke(&self, instance: &InstanceReference, value: Option<AnyArc>) -> Result<(), BoxError> {
        (self.injector)(instance.instance(), &Arguments::new(vec![value]))
    }
}

/// A method invoked with injected arguments after construction.
#[derive(Clone)]
pub struct MethodInfo {
    pub(crate) name: Arc<str>,
    pub(crate) targets: Arc<[Target]>,
    pub(crate) injector: MemberInjector,
}

impl MethodInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn invoke(&self, instance: &InstanceReference, arguments: &Arguments) -> Result<(), BoxError> {
        (self.injector)(instance.instance(), arguments)
    }
}
