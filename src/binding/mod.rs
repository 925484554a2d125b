//! Bindings: the registrations that map a service type to a way of
//! producing instances.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::activation::{
    CallbackProvider, ConstantProvider, Context, InstanceReference, Provider, Request, StandardProvider,
};
use crate::caching::{current_thread_scope, ScopeKey};
use crate::error::BoxError;
use crate::lifetime::Lifetime;
use crate::parameters::Parameter;
use crate::types::ServiceType;

pub mod resolvers;

pub use resolvers::{
    BindingMap, BindingResolver, MissingBindingResolver, OpenGenericBindingResolver, SelfBindingResolver,
    StandardBindingResolver,
};

/// Produces the provider that builds instances for an activation.
pub type ProviderCallback = Arc<dyn Fn(&Context) -> Arc<dyn Provider> + Send + Sync>;

/// Returns the scope object to cache an activation in, `None` for transient.
pub type ScopeCallback = Arc<dyn Fn(&Context) -> Option<ScopeKey> + Send + Sync>;

/// Decides whether a binding may satisfy a request.
pub type Condition = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Runs against an instance on activation or deactivation.
pub type ActivationAction = Arc<dyn Fn(&Context, &InstanceReference) + Send + Sync>;

/// What a binding resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingTarget {
    /// The service type itself, built from its catalog entry.
    SelfType,
    /// Another type, built from its catalog entry.
    Type(ServiceType),
    /// A fixed instance.
    Constant,
    /// A callback producing instances.
    Method,
    /// A custom [`Provider`].
    Provider,
}

impl fmt::Display for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingTarget::SelfType => f.write_str("self"),
            BindingTarget::Type(ty) => write!(f, "{}", ty),
            BindingTarget::Constant => f.write_str("constant"),
            BindingTarget::Method => f.write_str("method"),
            BindingTarget::Provider => f.write_str("provider"),
        }
    }
}

/// Name and free-form key/value data attached to a binding, inspected by
/// request and target constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingMetadata {
    name: Option<String>,
    values: HashMap<String, String>,
}

impl BindingMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

/// Everything about a binding except the service it answers; shared by all
/// services bound together.
pub struct BindingConfiguration {
    target: BindingTarget,
    provider: ProviderCallback,
    lifetime: Lifetime,
    scope_callback: Option<ScopeCallback>,
    condition: Option<Condition>,
    metadata: BindingMetadata,
    parameters: Vec<Parameter>,
    activation_actions: Vec<ActivationAction>,
    deactivation_actions: Vec<ActivationAction>,
    is_implicit: bool,
    lock: ReentrantMutex<()>,
}

impl BindingConfiguration {
    pub fn target(&self) -> &BindingTarget {
        &self.target
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn metadata(&self) -> &BindingMetadata {
        &self.metadata
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn activation_actions(&self) -> &[ActivationAction] {
        &self.activation_actions
    }

    pub fn deactivation_actions(&self) -> &[ActivationAction] {
        &self.deactivation_actions
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    pub fn is_implicit(&self) -> bool {
        self.is_implicit
    }

    /// Serializes construction of scoped instances for this binding.
    ///
    /// Reentrant: the owning thread may re-enter while activating the
    /// instance (property and method injection cycles hit the cache).
    pub(crate) fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.lock.lock()
    }
}

impl fmt::Debug for BindingConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingConfiguration")
            .field("target", &self.target)
            .field("lifetime", &self.lifetime)
            .field("conditional", &self.is_conditional())
            .field("metadata", &self.metadata)
            .field("parameters", &self.parameters)
            .field("implicit", &self.is_implicit)
            .finish()
    }
}

/// A registration mapping one service type to a shared [`BindingConfiguration`].
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Binding, Lifetime, ServiceType};
///
/// struct Clock;
///
/// let bindings = Binding::builder(ServiceType::of::<Clock>())
///     .to_constant(Clock)
///     .named("system")
///     .build();
///
/// assert_eq!(bindings.len(), 1);
/// assert_eq!(bindings[0].lifetime(), Lifetime::Singleton);
/// assert_eq!(bindings[0].metadata().name(), Some("system"));
/// ```
#[derive(Clone)]
pub struct Binding {
    service: ServiceType,
    configuration: Arc<BindingConfiguration>,
}

impl Binding {
    /// Starts a binding for `service` with a transient default lifetime.
    pub fn builder(service: ServiceType) -> BindingBuilder {
        BindingBuilder::new(service, Lifetime::Transient)
    }

    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    pub fn configuration(&self) -> &Arc<BindingConfiguration> {
        &self.configuration
    }

    /// Identity of the shared configuration; bindings created together share it.
    pub fn configuration_id(&self) -> usize {
        Arc::as_ptr(&self.configuration) as usize
    }

    pub fn target(&self) -> &BindingTarget {
        &self.configuration.target
    }

    pub fn lifetime(&self) -> Lifetime {
        self.configuration.lifetime
    }

    pub fn metadata(&self) -> &BindingMetadata {
        &self.configuration.metadata
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.configuration.parameters
    }

    pub fn is_conditional(&self) -> bool {
        self.configuration.is_conditional()
    }

    pub fn is_implicit(&self) -> bool {
        self.configuration.is_implicit
    }

    /// Whether the binding's condition admits `request`.
    pub fn matches(&self, request: &Request) -> bool {
        self.configuration.condition.as_ref().map_or(true, |condition| condition(request))
    }

    /// The scope an activation through this binding is cached in.
    pub fn scope(&self, context: &Context) -> Option<ScopeKey> {
        match self.configuration.lifetime {
            Lifetime::Transient => None,
            Lifetime::Singleton => context.singleton_scope(),
            Lifetime::Thread => Some(current_thread_scope()),
            Lifetime::Custom => self.configuration.scope_callback.as_ref().and_then(|callback| callback(context)),
        }
    }

    /// The provider that builds instances for `context`.
    pub fn provider(&self, context: &Context) -> Arc<dyn Provider> {
        (self.configuration.provider)(context)
    }

    pub(crate) fn is_same(&self, other: &Binding) -> bool {
        self.service == other.service && Arc::ptr_eq(&self.configuration, &other.configuration)
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({}", self.service, self.configuration.target, self.configuration.lifetime)?;
        if let Some(name) = self.metadata().name() {
            write!(f, ", named {}", name)?;
        }
        if self.is_conditional() {
            f.write_str(", conditional")?;
        }
        if self.is_implicit() {
            f.write_str(", implicit")?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("service", &self.service)
            .field("configuration", &self.configuration)
            .finish()
    }
}

/// Fluent builder for [`Binding`]s.
///
/// Every call returns the builder, so bindings read as one expression:
///
/// ```rust
/// use ferrous_kernel::{Kernel, Resolver, TypeInfo};
/// use std::sync::Arc;
///
/// trait Weapon: Send + Sync {}
/// struct Sword;
/// impl Weapon for Sword {}
/// struct Shuriken;
/// impl Weapon for Shuriken {}
///
/// let kernel = Kernel::new();
/// kernel.catalog().register(
///     TypeInfo::of::<Sword>()
///         .constructor([], |_| Ok(Sword))
///         .provides::<dyn Weapon, _>(|s| s as Arc<dyn Weapon>),
/// );
/// kernel.bind::<dyn Weapon>(|b| b.to_type::<Sword>().in_singleton_scope());
/// kernel.bind::<dyn Weapon>(|b| b.to_trait_constant(Arc::new(Shuriken) as Arc<dyn Weapon>).named("thrown"));
///
/// assert!(kernel.get_trait_named::<dyn Weapon>("thrown").is_ok());
/// assert_eq!(kernel.get_all_trait::<dyn Weapon>().unwrap().len(), 2);
/// ```
pub struct BindingBuilder {
    services: Vec<ServiceType>,
    target: BindingTarget,
    provider: Option<ProviderCallback>,
    lifetime: Lifetime,
    scope_callback: Option<ScopeCallback>,
    condition: Option<Condition>,
    metadata: BindingMetadata,
    parameters: Vec<Parameter>,
    activation_actions: Vec<ActivationAction>,
    deactivation_actions: Vec<ActivationAction>,
    is_implicit: bool,
}

impl BindingBuilder {
    pub(crate) fn new(service: ServiceType, default_lifetime: Lifetime) -> Self {
        Self {
            services: vec![service],
            target: BindingTarget::SelfType,
            provider: None,
            lifetime: default_lifetime,
            scope_callback: None,
            condition: None,
            metadata: BindingMetadata::default(),
            parameters: Vec::new(),
            activation_actions: Vec::new(),
            deactivation_actions: Vec::new(),
            is_implicit: false,
        }
    }

    /// Also answers `service` with the same configuration (and the same
    /// cached instances).
    pub fn also_for(mut self, service: ServiceType) -> Self {
        self.services.push(service);
        self
    }

    /// Also answers the Rust type `S`.
    pub fn also_for_type<S: ?Sized + 'static>(self) -> Self {
        self.also_for(ServiceType::of::<S>())
    }

    /// Builds the service type itself.
    pub fn to_self(mut self) -> Self {
        self.target = BindingTarget::SelfType;
        self.provider = None;
        self
    }

    /// Builds `implementation`, which may be an open generic definition
    /// closed with the requested service's arguments.
    pub fn to(mut self, implementation: ServiceType) -> Self {
        let prototype = implementation.clone();
        self.target = BindingTarget::Type(implementation);
        self.provider = Some(standard_provider(prototype));
        self
    }

    /// Builds the Rust type `T`.
    pub fn to_type<T: Any + Send + Sync>(self) -> Self {
        self.to(ServiceType::of::<T>())
    }

    /// Always returns `value`. Constants default to singleton scope.
    pub fn to_constant<T: Any + Send + Sync>(self, value: T) -> Self {
        self.to_constant_arc(Arc::new(value))
    }

    /// Always returns the shared `value`. Constants default to singleton scope.
    pub fn to_constant_arc<T: Any + Send + Sync>(self, value: Arc<T>) -> Self {
        self.constant(InstanceReference::new(value))
    }

    /// Always returns the trait object `value`. Constants default to singleton scope.
    pub fn to_trait_constant<S: ?Sized + Send + Sync + 'static>(self, value: Arc<S>) -> Self {
        self.constant(InstanceReference::from_trait(value))
    }

    fn constant(mut self, reference: InstanceReference) -> Self {
        let provider: Arc<dyn Provider> = Arc::new(ConstantProvider::new(reference));
        self.target = BindingTarget::Constant;
        self.provider = Some(Arc::new(move |_: &Context| provider.clone()));
        self.lifetime = Lifetime::Singleton;
        self
    }

    /// Builds instances by calling `method`.
    pub fn to_method<T, F>(self, method: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Context) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.callback(move |context| method(context).map(|value| InstanceReference::new(Arc::new(value))))
    }

    /// Builds trait objects by calling `method`.
    pub fn to_trait_method<S, F>(self, method: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Context) -> Result<Arc<S>, BoxError> + Send + Sync + 'static,
    {
        self.callback(move |context| method(context).map(InstanceReference::from_trait))
    }

    fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Context) -> Result<InstanceReference, BoxError> + Send + Sync + 'static,
    {
        let provider: Arc<dyn Provider> = Arc::new(CallbackProvider::new(callback));
        self.target = BindingTarget::Method;
        self.provider = Some(Arc::new(move |_: &Context| provider.clone()));
        self
    }

    /// Builds instances with a custom provider.
    pub fn to_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.target = BindingTarget::Provider;
        self.provider = Some(Arc::new(move |_: &Context| provider.clone()));
        self
    }

    /// Picks the provider per activation.
    pub fn to_provider_with<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Context) -> Arc<dyn Provider> + Send + Sync + 'static,
    {
        self.target = BindingTarget::Provider;
        self.provider = Some(Arc::new(factory));
        self
    }

    pub fn in_transient_scope(mut self) -> Self {
        self.lifetime = Lifetime::Transient;
        self.scope_callback = None;
        self
    }

    pub fn in_singleton_scope(mut self) -> Self {
        self.lifetime = Lifetime::Singleton;
        self.scope_callback = None;
        self
    }

    pub fn in_thread_scope(mut self) -> Self {
        self.lifetime = Lifetime::Thread;
        self.scope_callback = None;
        self
    }

    /// Caches instances in the scope object returned by `scope`.
    pub fn in_scope<F>(mut self, scope: F) -> Self
    where
        F: Fn(&Context) -> Option<ScopeKey> + Send + Sync + 'static,
    {
        self.lifetime = Lifetime::Custom;
        self.scope_callback = Some(Arc::new(scope));
        self
    }

    /// Restricts the binding to requests satisfying `condition`.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Restricts the binding to injection into members declared by `parent`.
    pub fn when_injected_into(self, parent: ServiceType) -> Self {
        self.when(move |request| {
            request
                .target()
                .and_then(|target| target.declaring_type())
                .map_or(false, |declaring| declaring == &parent)
        })
    }

    /// Restricts the binding to injection into members declared by `T`.
    pub fn when_injected_into_type<T: ?Sized + 'static>(self) -> Self {
        self.when_injected_into(ServiceType::of::<T>())
    }

    /// Restricts the binding to requests for the target named `name`.
    pub fn when_target_named(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.when(move |request| request.target().map_or(false, |target| target.name() == name))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.set(key, value);
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_constructor_argument<T: Any + Send + Sync>(self, name: &str, value: T) -> Self {
        self.with_parameter(Parameter::constructor_argument(name, value))
    }

    pub fn with_property_value<T: Any + Send + Sync>(self, name: &str, value: T) -> Self {
        self.with_parameter(Parameter::property_value(name, value))
    }

    /// Runs `action` after the pipeline's other activation steps.
    pub fn on_activation<F>(mut self, action: F) -> Self
    where
        F: Fn(&Context, &InstanceReference) + Send + Sync + 'static,
    {
        self.activation_actions.push(Arc::new(action));
        self
    }

    /// Runs `action` on activated instances of the concrete type `T`.
    pub fn on_activation_of<T, F>(self, action: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_activation(move |_, reference| {
            if let Some(instance) = reference.downcast_ref::<T>() {
                action(instance);
            }
        })
    }

    /// Runs `action` after the pipeline's other deactivation steps.
    pub fn on_deactivation<F>(mut self, action: F) -> Self
    where
        F: Fn(&Context, &InstanceReference) + Send + Sync + 'static,
    {
        self.deactivation_actions.push(Arc::new(action));
        self
    }

    /// Runs `action` on deactivated instances of the concrete type `T`.
    pub fn on_deactivation_of<T, F>(self, action: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_deactivation(move |_, reference| {
            if let Some(instance) = reference.downcast_ref::<T>() {
                action(instance);
            }
        })
    }

    pub(crate) fn implicit(mut self) -> Self {
        self.is_implicit = true;
        self
    }

    /// One binding per service, all sharing the configuration.
    pub fn build(self) -> Vec<Binding> {
        let services = self.services;
        let provider = match self.provider {
            Some(provider) => provider,
            // Self bindings build the primary service.
            None => standard_provider(services[0].clone()),
        };
        let configuration = Arc::new(BindingConfiguration {
            target: self.target,
            provider,
            lifetime: self.lifetime,
            scope_callback: self.scope_callback,
            condition: self.condition,
            metadata: self.metadata,
            parameters: self.parameters,
            activation_actions: self.activation_actions,
            deactivation_actions: self.deactivation_actions,
            is_implicit: self.is_implicit,
            lock: ReentrantMutex::new(()),
        });
        services
            .into_iter()
            .map(|service| Binding {
                service,
                configuration: configuration.clone(),
            })
            .collect()
    }
}

fn standard_provider(prototype: ServiceType) -> ProviderCallback {
    let provider: Arc<dyn Provider> = Arc::new(StandardProvider::new(prototype));
    Arc::new(move |_: &Context| provider.clone())
}
