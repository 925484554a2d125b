//! Runtime type table: constructors, injectable members, lifecycle hooks and
//! service casts for every type the kernel can build.
//!
//! Rust has no runtime reflection. Instead each implementation type is
//! described once through [`TypeInfo::of`], which turns typed closures into
//! the type-erased injectors the planner and providers work with.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::activation::{AnyArc, InstanceReference};
use crate::error::{ActivationError, ActivationResult, BoxError};
use crate::internal::FastMap;
use crate::traits::{Dispose, Initializable, Startable};
use crate::types::ServiceType;

pub mod members;
pub mod selector;

pub use members::{
    Arguments, Constraint, ConstructorInfo, ConstructorInjector, MemberInjector, MethodInfo, PropertyInfo, Target,
    TargetSite,
};
pub use selector::{Selector, StandardSelector};

/// Lifecycle callback invoked with the raw instance.
pub type LifecycleHook = Arc<dyn Fn(&AnyArc) + Send + Sync>;

/// Converts a raw instance into the view stored for another service type.
pub type Caster = Arc<dyn Fn(&AnyArc) -> Option<AnyArc> + Send + Sync>;

/// Lifecycle hooks a type opted into.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    pub initialize: Option<LifecycleHook>,
    pub start: Option<LifecycleHook>,
    pub stop: Option<LifecycleHook>,
    pub dispose: Option<LifecycleHook>,
}

/// Everything the kernel knows about one implementation type.
#[derive(Clone)]
pub struct TypeInfo {
    service_type: ServiceType,
    constructors: Vec<ConstructorInfo>,
    properties: Vec<PropertyInfo>,
    methods: Vec<MethodInfo>,
    lifecycle: LifecycleHooks,
    casts: Vec<(ServiceType, Caster)>,
}

impl TypeInfo {
    /// Starts describing the Rust type `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_kernel::{Kernel, Resolver, Target, TypeInfo};
    /// use std::sync::Arc;
    ///
    /// trait Weapon: Send + Sync {
    ///     fn hit(&self) -> &'static str;
    /// }
    ///
    /// struct Sword;
    /// impl Weapon for Sword {
    ///     fn hit(&self) -> &'static str { "chop" }
    /// }
    ///
    /// struct Samurai {
    ///     weapon: Arc<dyn Weapon>,
    /// }
    ///
    /// let kernel = Kernel::new();
    /// kernel.catalog().register(
    ///     TypeInfo::of::<Sword>()
    ///         .constructor([], |_| Ok(Sword))
    ///         .provides::<dyn Weapon, _>(|s| s as Arc<dyn Weapon>),
    /// );
    /// kernel.catalog().register(
    ///     TypeInfo::of::<Samurai>().constructor([Target::of::<dyn Weapon>("weapon")], |args| {
    ///         Ok(Samurai { weapon: args.get_trait::<dyn Weapon>(0)? })
    ///     }),
    /// );
    /// kernel.bind::<dyn Weapon>(|b| b.to_type::<Sword>());
    ///
    /// let samurai = kernel.get::<Samurai>().unwrap();
    /// assert_eq!(samurai.weapon.hit(), "chop");
    /// ```
    pub fn of<T: Any + Send + Sync>() -> TypeInfoBuilder<T> {
        TypeInfoBuilder {
            info: TypeInfo {
                service_type: ServiceType::of::<T>(),
                constructors: Vec::new(),
                properties: Vec::new(),
                methods: Vec::new(),
                lifecycle: LifecycleHooks::default(),
                casts: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn lifecycle(&self) -> &LifecycleHooks {
        &self.lifecycle
    }

    /// The caster producing the view of this type as `service`, if declared.
    pub fn caster(&self, service: &ServiceType) -> Option<&Caster> {
        self.casts.iter().find(|(ty, _)| ty == service).map(|(_, caster)| caster)
    }
}

/// Typed builder for [`TypeInfo`].
pub struct TypeInfoBuilder<T> {
    info: TypeInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> TypeInfoBuilder<T> {
    /// Registers `T` under a structured descriptor, e.g. a generic
    /// instantiation built with [`ServiceType::with_arguments`].
    pub fn as_type(mut self, service_type: ServiceType) -> Self {
        let declaring_type = service_type.clone();
        self.info.service_type = service_type;
        for constructor in &mut self.info.constructors {
            constructor.targets = reattach(&constructor.targets, || TargetSite::ConstructorParameter {
                declaring_type: declaring_type.clone(),
            });
        }
        for property in &mut self.info.properties {
            property.target = property.target.clone().attached(TargetSite::Property {
                declaring_type: declaring_type.clone(),
            });
        }
        for method in &mut self.info.methods {
            let name = method.name.clone();
            method.targets = reattach(&method.targets, || TargetSite::MethodParameter {
                declaring_type: declaring_type.clone(),
                method: name.clone(),
            });
        }
        self
    }

    /// Declares a constructor taking values for `targets`, in order.
    pub fn constructor<I, F>(self, targets: I, constructor: F) -> Self
    where
        I: IntoIterator<Item = Target>,
        F: Fn(&Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_constructor(targets, constructor, false)
    }

    /// Declares a constructor that the selector prefers over all unmarked ones.
    pub fn inject_constructor<I, F>(self, targets: I, constructor: F) -> Self
    where
        I: IntoIterator<Item = Target>,
        F: Fn(&Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_constructor(targets, constructor, true)
    }

    fn add_constructor<I, F>(mut self, targets: I, constructor: F, marked: bool) -> Self
    where
        I: IntoIterator<Item = Target>,
        F: Fn(&Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let declaring_type = self.info.service_type.clone();
        let targets: Arc<[Target]> = targets
            .into_iter()
            .map(|target| {
                target.attached(TargetSite::ConstructorParameter {
                    declaring_type: declaring_type.clone(),
                })
            })
            .collect();
        self.info.constructors.push(ConstructorInfo {
            targets,
            injector: Arc::new(move |arguments: &Arguments| {
                let value = constructor(arguments)?;
                Ok(Arc::new(value) as AnyArc)
            }),
            marked,
        });
        self
    }

    /// Declares a property; `setter` receives the resolved value at index 0.
    pub fn property<F>(mut self, target: Target, setter: F) -> Self
    where
        F: Fn(&T, &Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let target = target.attached(TargetSite::Property {
            declaring_type: self.info.service_type.clone(),
        });
        self.info.properties.push(PropertyInfo {
            target,
            injector: member_injector::<T, F>(setter),
        });
        self
    }

    /// Declares a method called with values for `targets` after construction.
    pub fn method<I, F>(mut self, name: &str, targets: I, method: F) -> Self
    where
        I: IntoIterator<Item = Target>,
        F: Fn(&T, &Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name: Arc<str> = Arc::from(name);
        let declaring_type = self.info.service_type.clone();
        let targets: Arc<[Target]> = targets
            .into_iter()
            .map(|target| {
                target.attached(TargetSite::MethodParameter {
                    declaring_type: declaring_type.clone(),
                    method: name.clone(),
                })
            })
            .collect();
        self.info.methods.push(MethodInfo {
            name,
            targets,
            injector: member_injector::<T, F>(method),
        });
        self
    }

    /// Declares that `T` can be viewed as the trait object `S`.
    pub fn provides<S, F>(mut self, cast: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<S> + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |raw: &AnyArc| {
            let concrete = raw.clone().downcast::<T>().ok()?;
            Some(Arc::new(cast(concrete)) as AnyArc)
        });
        self.info.casts.push((ServiceType::of::<S>(), caster));
        self
    }

    /// Declares that `T` is served unchanged as `service` (a runtime-named
    /// service type, typically a generic interface instantiation).
    pub fn provides_as(mut self, service: ServiceType) -> Self {
        let caster: Caster = Arc::new(|raw: &AnyArc| raw.clone().downcast::<T>().ok().map(|t| t as AnyArc));
        self.info.casts.push((service, caster));
        self
    }

    pub fn build(self) -> TypeInfo {
        self.info
    }
}

impl<T: Initializable> TypeInfoBuilder<T> {
    /// Calls [`Initializable::initialize`] during activation.
    pub fn initializable(mut self) -> Self {
        self.info.lifecycle.initialize = Some(hook::<T>(|t| t.initialize()));
        self
    }
}

impl<T: Startable> TypeInfoBuilder<T> {
    /// Calls [`Startable::start`] on activation and [`Startable::stop`] on deactivation.
    pub fn startable(mut self) -> Self {
        self.info.lifecycle.start = Some(hook::<T>(|t| t.start()));
        self.info.lifecycle.stop = Some(hook::<T>(|t| t.stop()));
        self
    }
}

impl<T: Dispose> TypeInfoBuilder<T> {
    /// Calls [`Dispose::dispose`] during deactivation.
    pub fn disposable(mut self) -> Self {
        self.info.lifecycle.dispose = Some(hook::<T>(|t| t.dispose()));
        self
    }
}

impl<T: Any + Send + Sync> From<TypeInfoBuilder<T>> for TypeInfo {
    fn from(builder: TypeInfoBuilder<T>) -> Self {
        builder.build()
    }
}

fn reattach(targets: &[Target], site: impl Fn() -> TargetSite) -> Arc<[Target]> {
    targets.iter().map(|target| target.clone().attached(site())).collect()
}

fn hook<T: Any + Send + Sync>(f: fn(&T)) -> LifecycleHook {
    Arc::new(move |raw: &AnyArc| {
        if let Some(instance) = raw.downcast_ref::<T>() {
            f(instance);
        }
    })
}

fn member_injector<T, F>(f: F) -> MemberInjector
where
    T: Any + Send + Sync,
    F: Fn(&T, &Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(move |raw: &AnyArc, arguments: &Arguments| {
        let instance = raw
            .downcast_ref::<T>()
            .ok_or_else(|| Box::new(ActivationError::type_mismatch::<T>()) as BoxError)?;
        f(instance, arguments)
    })
}

/// Registry of [`TypeInfo`] records keyed by their [`ServiceType`].
///
/// Registering a type after the planner has built its plan does not change
/// the plan: a type's shape is assumed fixed once it is first activated.
#[derive(Default)]
pub struct TypeCatalog {
    types: RwLock<FastMap<ServiceType, Arc<TypeInfo>>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the description of a type.
    pub fn register(&self, info: impl Into<TypeInfo>) -> &Self {
        let info = info.into();
        tracing::debug!(
            target: "ferrous_kernel",
            service_type = %info.service_type,
            constructors = info.constructors.len(),
            properties = info.properties.len(),
            methods = info.methods.len(),
            "Registered type"
        );
        self.types.write().insert(info.service_type.clone(), Arc::new(info));
        self
    }

    pub fn get(&self, service_type: &ServiceType) -> Option<Arc<TypeInfo>> {
        self.types.read().get(service_type).cloned()
    }

    pub fn contains(&self, service_type: &ServiceType) -> bool {
        self.types.read().contains_key(service_type)
    }

    /// Whether the type is known and declares at least one constructor.
    pub fn is_constructible(&self, service_type: &ServiceType) -> bool {
        self.get(service_type).map_or(false, |info| !info.constructors.is_empty())
    }

    /// Lifecycle hooks of the implementation type, empty if unknown.
    pub fn lifecycle(&self, implementation: &ServiceType) -> LifecycleHooks {
        self.get(implementation).map(|info| info.lifecycle.clone()).unwrap_or_default()
    }

    /// Produces the view of `reference` to hand out for `service`.
    ///
    /// The raw instance is returned when the implementation is the service
    /// itself or when no cast is declared; a declared cast that does not
    /// apply to the instance is a type mismatch.
    pub fn view(&self, reference: &InstanceReference, service: &ServiceType) -> ActivationResult<AnyArc> {
        if reference.implementation() == service {
            return Ok(reference.instance().clone());
        }
        let info = match self.get(reference.implementation()) {
            Some(info) => info,
            None => return Ok(reference.instance().clone()),
        };
        match info.caster(service) {
            Some(caster) => caster(reference.instance()).ok_or_else(|| ActivationError::TypeMismatch {
                expected: service.to_string(),
            }),
            None => Ok(reference.instance().clone()),
        }
    }
}
