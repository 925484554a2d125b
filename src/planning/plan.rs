//! Plans and the directives they hold.

use crate::catalog::{ConstructorInfo, MethodInfo, PropertyInfo, Target};
use crate::error::{ActivationError, ActivationResult};
use crate::types::ServiceType;

/// Inject values into the constructor and invoke it.
#[derive(Clone)]
pub struct ConstructorInjectionDirective {
    pub constructor: ConstructorInfo,
}

impl ConstructorInjectionDirective {
    pub fn targets(&self) -> &[Target] {
        self.constructor.targets()
    }
}

/// Inject a value into a property after construction.
#[derive(Clone)]
pub struct PropertyInjectionDirective {
    pub property: PropertyInfo,
}

impl PropertyInjectionDirective {
    pub fn target(&self) -> &Target {
        self.property.target()
    }
}

/// Invoke a method with injected values after construction.
#[derive(Clone)]
pub struct MethodInjectionDirective {
    pub method: MethodInfo,
}

impl MethodInjectionDirective {
    pub fn targets(&self) -> &[Target] {
        self.method.targets()
    }
}

/// One step of a [`Plan`].
#[derive(Clone)]
pub enum Directive {
    Constructor(ConstructorInjectionDirective),
    Property(PropertyInjectionDirective),
    Method(MethodInjectionDirective),
}

/// Typed access to one kind of [`Directive`], used by the generic plan queries.
pub trait DirectiveKind: Sized {
    /// Name used in diagnostics.
    const NAME: &'static str;

    fn from_directive(directive: &Directive) -> Option<&Self>;
}

impl DirectiveKind for ConstructorInjectionDirective {
    const NAME: &'static str = "constructor injection";

    fn from_directive(directive: &Directive) -> Option<&Self> {
        match directive {
            Directive::Constructor(d) => Some(d),
            _ => None,
        }
    }
}

impl DirectiveKind for PropertyInjectionDirective {
    const NAME: &'static str = "property injection";

    fn from_directive(directive: &Directive) -> Option<&Self> {
        match directive {
            Directive::Property(d) => Some(d),
            _ => None,
        }
    }
}

impl DirectiveKind for MethodInjectionDirective {
    const NAME: &'static str = "method injection";

    fn from_directive(directive: &Directive) -> Option<&Self> {
        match directive {
            Directive::Method(d) => Some(d),
            _ => None,
        }
    }
}

/// Describes how to construct and wire one concrete type.
///
/// A plan is filled once by the planner's strategies and is immutable after
/// that; the planner hands it out behind an `Arc`.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Kernel, Target, TypeInfo, ServiceType};
/// use ferrous_kernel::planning::{ConstructorInjectionDirective, PropertyInjectionDirective};
///
/// struct Engine;
///
/// let kernel = Kernel::new();
/// kernel.catalog().register(TypeInfo::of::<Engine>().constructor([], |_| Ok(Engine)));
///
/// let plan = kernel.planner().get_plan(&ServiceType::of::<Engine>());
/// assert!(plan.has::<ConstructorInjectionDirective>());
/// assert!(plan.get_one::<ConstructorInjectionDirective>().unwrap().is_some());
/// assert_eq!(plan.get_all::<PropertyInjectionDirective>().count(), 0);
/// ```
pub struct Plan {
    service_type: ServiceType,
    directives: Vec<Directive>,
}

impl Plan {
    pub fn new(service_type: ServiceType) -> Self {
        Self {
            service_type,
            directives: Vec::new(),
        }
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub fn add(&mut self, directive: Directive) {
        self.directives.push(directive);
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Whether the plan holds at least one directive of kind `K`.
    pub fn has<K: DirectiveKind>(&self) -> bool {
        self.get_all::<K>().next().is_some()
    }

    /// The single directive of kind `K`; `None` if there is none, an error if
    /// there are several.
    pub fn get_one<K: DirectiveKind>(&self) -> ActivationResult<Option<&K>> {
        let mut all = self.get_all::<K>();
        let first = all.next();
        let rest = all.count();
        if rest > 0 {
            return Err(ActivationError::MultipleDirectives {
                plan_type: self.service_type.to_string(),
                directive: K::NAME,
                count: rest + 1,
            });
        }
        Ok(first)
    }

    /// Every directive of kind `K`, in insertion order.
    pub fn get_all<'a, K: DirectiveKind + 'a>(&'a self) -> impl Iterator<Item = &'a K> + 'a {
        self.directives.iter().filter_map(K::from_directive)
    }
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("service_type", &self.service_type)
            .field("constructors", &self.get_all::<ConstructorInjectionDirective>().count())
            .field("properties", &self.get_all::<PropertyInjectionDirective>().count())
            .field("methods", &self.get_all::<MethodInjectionDirective>().count())
            .finish()
    }
}
