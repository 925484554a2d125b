//! The kernel: binding registry, resolution root and owner of the caches.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::activation::{
    ActivationBlock, ActivationStrategy, AnyArc, BindingActionStrategy, Context, DisposableStrategy,
    InitializableStrategy, InstanceReference, MethodInjectionStrategy, Pipeline, PropertyInjectionStrategy, Request,
    StartableStrategy,
};
use crate::activation::instance::address_of;
use crate::binding::{
    Binding, BindingBuilder, BindingMap, BindingResolver, MissingBindingResolver, OpenGenericBindingResolver,
    SelfBindingResolver, StandardBindingResolver,
};
use crate::caching::{
    ActivationCache, Cache, CachePruner, IntervalCachePruner, NoopCachePruner, Pruneable, ScopeKey, SingletonScope,
};
use crate::catalog::{Selector, StandardSelector, TypeCatalog};
use crate::descriptors::BindingDescriptor;
use crate::error::{ActivationError, ActivationResult};
use crate::planning::{
    ConstructorReflectionStrategy, MethodReflectionStrategy, Planner, PlanningStrategy, PropertyReflectionStrategy,
};
use crate::settings::KernelSettings;
use crate::traits::{Resolver, ResolverCore};
use crate::types::ServiceType;

/// The resolution root.
///
/// A kernel holds the bindings, the type catalog, the planner, the
/// activation pipeline and the scope cache. It is a cheap handle: clones
/// share the same state. When the last handle is dropped the kernel is
/// disposed, which deactivates every cached instance.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Kernel, Resolver, Target, TypeInfo};
/// use std::sync::Arc;
///
/// trait Weapon: Send + Sync {
///     fn hit(&self, target: &str) -> String;
/// }
///
/// struct Sword;
/// impl Weapon for Sword {
///     fn hit(&self, target: &str) -> String {
///         format!("Chopped {} clean in half", target)
///     }
/// }
///
/// struct Samurai {
///     weapon: Arc<dyn Weapon>,
/// }
///
/// let kernel = Kernel::new();
/// kernel.catalog()
///     .register(TypeInfo::of::<Sword>()
///         .constructor([], |_| Ok(Sword))
///         .provides::<dyn Weapon, _>(|s| s as Arc<dyn Weapon>))
///     .register(TypeInfo::of::<Samurai>()
///         .constructor([Target::of::<dyn Weapon>("weapon")], |args| {
///             Ok(Samurai { weapon: args.get_trait::<dyn Weapon>(0)? })
///         }));
///
/// kernel.bind::<dyn Weapon>(|b| b.to_type::<Sword>());
/// kernel.bind::<Samurai>(|b| b.to_self().in_singleton_scope());
///
/// let samurai = kernel.get::<Samurai>().unwrap();
/// assert_eq!(samurai.weapon.hit("the evildoers"), "Chopped the evildoers clean in half");
/// assert!(Arc::ptr_eq(&samurai, &kernel.get::<Samurai>().unwrap()));
/// ```
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

pub(crate) struct KernelInner {
    settings: KernelSettings,
    bindings: RwLock<BindingMap>,
    catalog: Arc<TypeCatalog>,
    planner: Arc<Planner>,
    pipeline: Arc<Pipeline>,
    cache: Arc<Cache>,
    pruner: Arc<dyn CachePruner>,
    binding_resolvers: Vec<Arc<dyn BindingResolver>>,
    missing_binding_resolvers: Vec<Arc<dyn MissingBindingResolver>>,
    singleton_scope: Arc<SingletonScope>,
    disposed: AtomicBool,
}

impl Kernel {
    /// Creates a kernel with default settings and the standard components.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_settings(settings: KernelSettings) -> Self {
        Self::builder().with_settings(settings).build()
    }

    /// Starts configuring a kernel with custom components.
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    pub(crate) fn downgrade(&self) -> Weak<KernelInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(inner: &Weak<KernelInner>) -> Option<Kernel> {
        inner.upgrade().map(|inner| Kernel { inner })
    }

    pub fn settings(&self) -> &KernelSettings {
        &self.inner.settings
    }

    /// Registry of the types the kernel can construct and inject.
    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.inner.catalog
    }

    pub fn planner(&self) -> &Arc<Planner> {
        &self.inner.planner
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.inner.pipeline
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.inner.cache
    }

    pub fn activation_cache(&self) -> &Arc<ActivationCache> {
        self.inner.pipeline.activation_cache()
    }

    /// Key of the scope singleton instances are cached in.
    pub fn singleton_scope(&self) -> ScopeKey {
        ScopeKey::of(&self.inner.singleton_scope)
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Binds the service `S` (sized or `dyn Trait`) and returns the binding
    /// registered for it. Services added with `also_for` are registered
    /// too, sharing the configuration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_kernel::{Kernel, Lifetime, Resolver};
    ///
    /// let kernel = Kernel::new();
    /// let binding = kernel.bind::<u64>(|b| b.to_method(|_| Ok(7u64)).in_thread_scope());
    /// assert_eq!(binding.lifetime(), Lifetime::Thread);
    /// assert_eq!(*kernel.get::<u64>().unwrap(), 7);
    /// ```
    pub fn bind<S: ?Sized + 'static>(
        &self,
        configure: impl FnOnce(BindingBuilder) -> BindingBuilder,
    ) -> Arc<Binding> {
        self.bind_service(ServiceType::of::<S>(), configure)
    }

    /// Binds a service described at runtime, such as an open generic definition.
    pub fn bind_service(
        &self,
        service: ServiceType,
        configure: impl FnOnce(BindingBuilder) -> BindingBuilder,
    ) -> Arc<Binding> {
        let builder = configure(BindingBuilder::new(service, self.inner.settings.default_lifetime));
        let mut added: Vec<Arc<Binding>> = builder
            .build()
            .into_iter()
            .map(|binding| self.add_binding(binding))
            .collect();
        // The primary service always comes first.
        added.swap_remove(0)
    }

    pub fn add_binding(&self, binding: Binding) -> Arc<Binding> {
        let binding = Arc::new(binding);
        tracing::debug!(target: "ferrous_kernel", binding = %binding, "Added binding");
        self.inner
            .bindings
            .write()
            .entry(binding.service().clone())
            .or_default()
            .push(binding.clone());
        binding
    }

    /// Removes one binding. Instances it already produced stay cached.
    pub fn remove_binding(&self, binding: &Binding) -> bool {
        let mut bindings = self.inner.bindings.write();
        let Some(registered) = bindings.get_mut(binding.service()) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|candidate| !candidate.is_same(binding));
        let removed = registered.len() != before;
        if registered.is_empty() {
            bindings.remove(binding.service());
        }
        if removed {
            tracing::debug!(target: "ferrous_kernel", binding = %binding, "Removed binding");
        }
        removed
    }

    /// Removes every binding of `S`. Returns how many were removed.
    pub fn unbind<S: ?Sized + 'static>(&self) -> usize {
        self.unbind_service(&ServiceType::of::<S>())
    }

    pub fn unbind_service(&self, service: &ServiceType) -> usize {
        let removed = self.inner.bindings.write().remove(service).map_or(0, |bindings| bindings.len());
        tracing::debug!(target: "ferrous_kernel", service = %service, removed, "Unbound service");
        removed
    }

    /// Replaces every binding of `S` with a new one.
    pub fn rebind<S: ?Sized + 'static>(
        &self,
        configure: impl FnOnce(BindingBuilder) -> BindingBuilder,
    ) -> Arc<Binding> {
        self.unbind::<S>();
        self.bind::<S>(configure)
    }

    /// Bindings registered for exactly `service`, in registration order.
    pub fn get_bindings(&self, service: &ServiceType) -> Vec<Arc<Binding>> {
        self.inner.bindings.read().get(service).cloned().unwrap_or_default()
    }

    /// Descriptors of every registered binding.
    pub fn get_binding_descriptors(&self) -> Vec<BindingDescriptor> {
        self.inner
            .bindings
            .read()
            .values()
            .flatten()
            .map(|binding| BindingDescriptor::from_binding(binding))
            .collect()
    }

    /// Runs property injection, method injection and the rest of the
    /// activation pipeline on an instance created elsewhere. Its type should
    /// be registered in the catalog for injection to find any members.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_kernel::{Kernel, Target, TypeInfo};
    /// use parking_lot::Mutex;
    /// use std::sync::Arc;
    ///
    /// #[derive(Default)]
    /// struct Handler {
    ///     greeting: Mutex<Option<Arc<String>>>,
    /// }
    ///
    /// let kernel = Kernel::new();
    /// kernel.bind::<String>(|b| b.to_constant("hello".to_string()));
    /// kernel.catalog().register(TypeInfo::of::<Handler>().property(
    ///     Target::of::<String>("greeting"),
    ///     |handler: &Handler, args| {
    ///         *handler.greeting.lock() = Some(args.get::<String>(0)?);
    ///         Ok(())
    ///     },
    /// ));
    ///
    /// let handler = Arc::new(Handler::default());
    /// kernel.inject(&handler).unwrap();
    /// assert_eq!(handler.greeting.lock().as_deref().map(String::as_str), Some("hello"));
    /// ```
    pub fn inject<T: Any + Send + Sync>(&self, instance: &Arc<T>) -> ActivationResult<()> {
        self.ensure_alive()?;
        let service = ServiceType::of::<T>();
        let binding = Binding::builder(service.clone())
            .to_constant_arc(instance.clone())
            .build()
            .into_iter()
            .next()
            .map(Arc::new)
            .ok_or_else(|| ActivationError::InvalidArgument {
                argument: "instance",
                reason: "no binding could be built for the instance".to_string(),
            })?;
        let context = Context::new(self, Arc::new(Request::new(service.clone())), binding);
        context.set_plan(self.inner.planner.get_plan(&service));
        self.inner.pipeline.activate(&context, &InstanceReference::new(instance.clone()))
    }

    /// Deactivates and forgets a cached instance. Works for any view of the
    /// instance (`Arc<Concrete>` or `Arc<dyn Trait>`).
    ///
    /// Returns `false` if the instance is not in any scope.
    pub fn release<T: ?Sized>(&self, instance: &Arc<T>) -> bool {
        self.inner.cache.release(address_of(instance))
    }

    /// Opens an [`ActivationBlock`].
    pub fn begin_block(&self) -> ActivationBlock {
        ActivationBlock::new(self.clone())
    }

    /// Stops the pruner, deactivates every cached instance (singletons
    /// included) and rejects further resolution. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    fn ensure_alive(&self) -> ActivationResult<()> {
        if self.is_disposed() {
            Err(ActivationError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Candidates for `request` in the top precedence group, creating
    /// implicit bindings when nothing registered matches.
    fn select_bindings(&self, request: &Request) -> ActivationResult<Vec<Arc<Binding>>> {
        let mut candidates = {
            let bindings = self.inner.bindings.read();
            self.candidates(&bindings, request)
        };
        if candidates.is_empty() {
            candidates = self.create_missing_bindings(request);
        }

        if candidates.is_empty() {
            if request.is_optional() {
                return Ok(candidates);
            }
            return Err(ActivationError::MissingBinding {
                service: request.service().to_string(),
                path: request.format_activation_path(),
            });
        }
        if request.is_unique() && candidates.len() > 1 {
            return Err(ActivationError::AmbiguousBinding {
                service: request.service().to_string(),
                candidates: candidates.iter().map(ToString::to_string).collect(),
                path: request.format_activation_path(),
            });
        }
        Ok(candidates)
    }

    fn candidates(&self, bindings: &BindingMap, request: &Request) -> Vec<Arc<Binding>> {
        let mut matching: Vec<Arc<Binding>> = self
            .inner
            .binding_resolvers
            .iter()
            .flat_map(|resolver| resolver.resolve(bindings, request.service()))
            .filter(|binding| request.matches(binding))
            .collect();

        let Some(top) = matching.iter().map(|binding| precedence(binding)).min() else {
            return matching;
        };
        matching.retain(|binding| precedence(binding) == top);
        matching
    }

    fn create_missing_bindings(&self, request: &Request) -> Vec<Arc<Binding>> {
        if self.inner.missing_binding_resolvers.is_empty() {
            return Vec::new();
        }

        let mut bindings = self.inner.bindings.write();
        // Another thread may have created them while we waited.
        let existing = self.candidates(&bindings, request);
        if !existing.is_empty() {
            return existing;
        }

        let created = self
            .inner
            .missing_binding_resolvers
            .iter()
            .map(|resolver| resolver.resolve(request, &self.inner.catalog))
            .find(|created| !created.is_empty())
            .unwrap_or_default();

        let mut matching = Vec::new();
        for binding in created {
            let binding = Arc::new(binding);
            tracing::debug!(target: "ferrous_kernel", binding = %binding, "Created implicit binding");
            bindings
                .entry(binding.service().clone())
                .or_default()
                .push(binding.clone());
            if request.matches(&binding) {
                matching.push(binding);
            }
        }
        matching
    }
}

/// Lower sorts first: conditional, then explicit, then implicit.
fn precedence(binding: &Binding) -> (bool, bool) {
    (!binding.is_conditional(), binding.is_implicit())
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverCore for Kernel {
    fn resolve(&self, request: Request) -> ActivationResult<Resolution> {
        self.ensure_alive()?;
        let bindings = self.select_bindings(&request)?;
        tracing::trace!(
            target: "ferrous_kernel",
            service = %request.service(),
            candidates = bindings.len(),
            depth = request.depth(),
            "Resolving request"
        );
        Ok(Resolution {
            kernel: self.clone(),
            request: Arc::new(request),
            bindings: bindings.into_iter(),
        })
    }

    fn can_resolve(&self, request: &Request) -> bool {
        if self.is_disposed() {
            return false;
        }
        let registered = !self.candidates(&self.inner.bindings.read(), request).is_empty();
        registered
            || self
                .inner
                .missing_binding_resolvers
                .iter()
                .any(|resolver| !resolver.resolve(request, &self.inner.catalog).is_empty())
    }
}

impl Resolver for Kernel {}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("settings", &self.inner.settings)
            .field("bindings", &self.inner.bindings.read().values().map(Vec::len).sum::<usize>())
            .field("cached", &self.inner.cache.count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl KernelInner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.pruner.stop();
        self.cache.clear_all();
        self.pipeline.activation_cache().clear();
        tracing::debug!(target: "ferrous_kernel", "Disposed kernel");
    }
}

impl Drop for KernelInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Lazily activated instances for one request, one per selected binding.
///
/// Items are the views of the instances for the requested service: the raw
/// `Arc<T>` for concrete services, a boxed `Arc<dyn Trait>` for trait
/// services. The typed methods of [`Resolver`] unwrap them.
pub struct Resolution {
    kernel: Kernel,
    request: Arc<Request>,
    bindings: std::vec::IntoIter<Arc<Binding>>,
}

impl Resolution {
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    fn activate(&self, binding: Arc<Binding>) -> ActivationResult<AnyArc> {
        let context = Arc::new(Context::new(&self.kernel, self.request.clone(), binding));
        let reference = context.resolve()?;
        self.kernel.inner.catalog.view(&reference, self.request.service())
    }
}

impl Iterator for Resolution {
    type Item = ActivationResult<AnyArc>;

    fn next(&mut self) -> Option<Self::Item> {
        let binding = self.bindings.next()?;
        Some(self.activate(binding))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.bindings.size_hint()
    }
}

impl ExactSizeIterator for Resolution {}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("service", self.request.service())
            .field("remaining", &self.bindings.len())
            .finish()
    }
}

/// Configures the components of a [`Kernel`].
///
/// The standard components are used for anything not replaced: the
/// catalog-backed selector, constructor/property/method planning, the
/// activation strategies (property injection, method injection,
/// initialize, start, dispose, binding actions) and an interval pruner
/// when the settings ask for one.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Kernel, KernelSettings, NoopCachePruner};
/// use std::sync::Arc;
///
/// let kernel = Kernel::builder()
///     .with_settings(KernelSettings::default().with_implicit_self_binding(false))
///     .with_pruner(Arc::new(NoopCachePruner))
///     .build();
/// assert!(!kernel.settings().allow_implicit_self_binding);
/// ```
pub struct KernelBuilder {
    settings: KernelSettings,
    catalog: Option<Arc<TypeCatalog>>,
    selector: Option<Arc<dyn Selector>>,
    planning_strategies: Vec<Arc<dyn PlanningStrategy>>,
    activation_strategies: Vec<Arc<dyn ActivationStrategy>>,
    binding_resolvers: Vec<Arc<dyn BindingResolver>>,
    missing_binding_resolvers: Vec<Arc<dyn MissingBindingResolver>>,
    pruner: Option<Arc<dyn CachePruner>>,
}

impl KernelBuilder {
    pub fn new() -> Self {
        Self {
            settings: KernelSettings::default(),
            catalog: None,
            selector: None,
            planning_strategies: Vec::new(),
            activation_strategies: Vec::new(),
            binding_resolvers: Vec::new(),
            missing_binding_resolvers: Vec::new(),
            pruner: None,
        }
    }

    pub fn with_settings(mut self, settings: KernelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Shares an existing catalog instead of starting an empty one.
    pub fn with_catalog(mut self, catalog: Arc<TypeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_selector(mut self, selector: Arc<dyn Selector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Appends a planning strategy after the standard ones.
    pub fn with_planning_strategy(mut self, strategy: Arc<dyn PlanningStrategy>) -> Self {
        self.planning_strategies.push(strategy);
        self
    }

    /// Appends an activation strategy after the standard ones.
    pub fn with_activation_strategy(mut self, strategy: Arc<dyn ActivationStrategy>) -> Self {
        self.activation_strategies.push(strategy);
        self
    }

    /// Appends a binding resolver after the standard and open-generic ones.
    pub fn with_binding_resolver(mut self, resolver: Arc<dyn BindingResolver>) -> Self {
        self.binding_resolvers.push(resolver);
        self
    }

    /// Appends a missing-binding resolver, consulted after the implicit
    /// self binding resolver (if enabled).
    pub fn with_missing_binding_resolver(mut self, resolver: Arc<dyn MissingBindingResolver>) -> Self {
        self.missing_binding_resolvers.push(resolver);
        self
    }

    pub fn with_pruner(mut self, pruner: Arc<dyn CachePruner>) -> Self {
        self.pruner = Some(pruner);
        self
    }

    pub fn build(self) -> Kernel {
        let settings = self.settings;
        let catalog = self.catalog.unwrap_or_default();
        let selector = self
            .selector
            .unwrap_or_else(|| Arc::new(StandardSelector::new(catalog.clone())));

        let mut planning_strategies: Vec<Arc<dyn PlanningStrategy>> = vec![
            Arc::new(ConstructorReflectionStrategy::new(selector.clone())),
            Arc::new(PropertyReflectionStrategy::new(selector.clone())),
            Arc::new(MethodReflectionStrategy::new(selector)),
        ];
        planning_strategies.extend(self.planning_strategies);

        let mut activation_strategies: Vec<Arc<dyn ActivationStrategy>> = vec![
            Arc::new(PropertyInjectionStrategy),
            Arc::new(MethodInjectionStrategy),
            Arc::new(InitializableStrategy::new(catalog.clone())),
            Arc::new(StartableStrategy::new(catalog.clone())),
            Arc::new(DisposableStrategy::new(catalog.clone())),
            Arc::new(BindingActionStrategy),
        ];
        activation_strategies.extend(self.activation_strategies);

        let mut binding_resolvers: Vec<Arc<dyn BindingResolver>> =
            vec![Arc::new(StandardBindingResolver), Arc::new(OpenGenericBindingResolver)];
        binding_resolvers.extend(self.binding_resolvers);

        let mut missing_binding_resolvers: Vec<Arc<dyn MissingBindingResolver>> = Vec::new();
        if settings.allow_implicit_self_binding {
            missing_binding_resolvers.push(Arc::new(SelfBindingResolver::new(settings.default_lifetime)));
        }
        missing_binding_resolvers.extend(self.missing_binding_resolvers);

        let activation_cache = Arc::new(ActivationCache::new(!settings.activation_cache_disabled));
        let pipeline = Arc::new(Pipeline::new(activation_strategies, activation_cache.clone()));
        let cache = Arc::new(Cache::new(pipeline.clone()));

        let pruner: Arc<dyn CachePruner> = match (self.pruner, settings.cache_pruning_interval) {
            (Some(pruner), _) => pruner,
            (None, Some(interval)) => Arc::new(IntervalCachePruner::new(interval)),
            (None, None) => Arc::new(NoopCachePruner),
        };
        let cache_weak: Weak<dyn Pruneable> = Arc::downgrade(&cache) as Weak<Cache>;
        let activation_cache_weak: Weak<dyn Pruneable> = Arc::downgrade(&activation_cache) as Weak<ActivationCache>;
        pruner.start(cache_weak);
        pruner.start(activation_cache_weak);

        tracing::debug!(
            target: "ferrous_kernel",
            settings = ?settings,
            "Created kernel"
        );

        Kernel {
            inner: Arc::new(KernelInner {
                settings,
                bindings: RwLock::new(BindingMap::default()),
                catalog,
                planner: Arc::new(Planner::new(planning_strategies)),
                pipeline,
                cache,
                pruner,
                binding_resolvers,
                missing_binding_resolvers,
                singleton_scope: Arc::new(SingletonScope),
                disposed: AtomicBool::new(false),
            }),
        }
    }
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
