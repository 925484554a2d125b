//! Parameters that override or supplement injected values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::activation::{AnyArc, Context};
use crate::catalog::Target;

/// Where a [`Parameter`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// Supplies the constructor argument with the parameter's name.
    ConstructorArgument,
    /// Supplies the injected property with the parameter's name.
    PropertyValue,
    /// Not consumed by the kernel; read by custom providers and actions.
    Custom,
}

/// Computes a parameter value for a given activation and target.
pub type ParameterValueFactory = Arc<dyn Fn(&Context, &Target) -> AnyArc + Send + Sync>;

#[derive(Clone)]
enum ParameterValue {
    Fixed(AnyArc),
    Factory(ParameterValueFactory),
}

/// A named value attached to a binding or a request.
///
/// Constructor arguments and property values take precedence over binding
/// resolution for the target with the same name. Inherited parameters are
/// copied onto every child request created while activating the instance.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Kernel, Parameter, Resolver, Target, TypeInfo};
///
/// struct Connection {
///     url: String,
/// }
///
/// let kernel = Kernel::new();
/// kernel.catalog().register(TypeInfo::of::<Connection>().constructor(
///     [Target::of::<String>("url")],
///     |args| Ok(Connection { url: args.get::<String>(0)?.as_ref().clone() }),
/// ));
/// kernel.bind::<Connection>(|b| {
///     b.to_self()
///         .with_parameter(Parameter::constructor_argument("url", "postgres://localhost".to_string()))
/// });
///
/// assert_eq!(kernel.get::<Connection>().unwrap().url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Parameter {
    name: Arc<str>,
    kind: ParameterKind,
    value: ParameterValue,
    should_inherit: bool,
}

impl Parameter {
    /// A fixed constructor argument.
    pub fn constructor_argument<T: Any + Send + Sync>(name: impl Into<Arc<str>>, value: T) -> Self {
        Self::fixed(name, ParameterKind::ConstructorArgument, Arc::new(value))
    }

    /// A constructor argument computed per activation.
    pub fn constructor_argument_with<F>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        F: Fn(&Context, &Target) -> AnyArc + Send + Sync + 'static,
    {
        Self::computed(name, ParameterKind::ConstructorArgument, factory)
    }

    /// A fixed property value.
    pub fn property_value<T: Any + Send + Sync>(name: impl Into<Arc<str>>, value: T) -> Self {
        Self::fixed(name, ParameterKind::PropertyValue, Arc::new(value))
    }

    /// A property value computed per activation.
    pub fn property_value_with<F>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        F: Fn(&Context, &Target) -> AnyArc + Send + Sync + 'static,
    {
        Self::computed(name, ParameterKind::PropertyValue, factory)
    }

    /// A value of the given kind that is already type-erased (e.g. a trait
    /// object view `Arc<Arc<dyn S>>`).
    pub fn fixed(name: impl Into<Arc<str>>, kind: ParameterKind, value: AnyArc) -> Self {
        Self {
            name: name.into(),
            kind,
            value: ParameterValue::Fixed(value),
            should_inherit: false,
        }
    }

    /// A value of the given kind computed per activation.
    pub fn computed<F>(name: impl Into<Arc<str>>, kind: ParameterKind, factory: F) -> Self
    where
        F: Fn(&Context, &Target) -> AnyArc + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            value: ParameterValue::Factory(Arc::new(factory)),
            should_inherit: false,
        }
    }

    /// A custom parameter for providers and activation actions.
    pub fn custom<T: Any + Send + Sync>(name: impl Into<Arc<str>>, value: T) -> Self {
        Self::fixed(name, ParameterKind::Custom, Arc::new(value))
    }

    /// Copies the parameter onto child requests.
    pub fn inherited(mut self) -> Self {
        self.should_inherit = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn should_inherit(&self) -> bool {
        self.should_inherit
    }

    /// Whether this parameter supplies `target` for injection of `kind`.
    pub fn applies_to(&self, kind: ParameterKind, target: &Target) -> bool {
        self.kind == kind && &*self.name == target.name()
    }

    /// The value for `target` in `context`.
    pub fn value(&self, context: &Context, target: &Target) -> AnyArc {
        match &self.value {
            ParameterValue::Fixed(value) => value.clone(),
            ParameterValue::Factory(factory) => factory(context, target),
        }
    }

    /// The fixed value, if the parameter is not computed.
    pub fn fixed_value(&self) -> Option<&AnyArc> {
        match &self.value {
            ParameterValue::Fixed(value) => Some(value),
            ParameterValue::Factory(_) => None,
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("computed", &matches!(self.value, ParameterValue::Factory(_)))
            .field("should_inherit", &self.should_inherit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_by_kind_and_name() {
        let parameter = Parameter::constructor_argument("port", 8080u16);
        assert!(parameter.applies_to(ParameterKind::ConstructorArgument, &Target::of::<u16>("port")));
        assert!(!parameter.applies_to(ParameterKind::PropertyValue, &Target::of::<u16>("port")));
        assert!(!parameter.applies_to(ParameterKind::ConstructorArgument, &Target::of::<u16>("host")));
    }

    #[test]
    fn inheritance_is_opt_in() {
        let parameter = Parameter::custom("tenant", "acme");
        assert!(!parameter.should_inherit());
        assert!(parameter.inherited().should_inherit());
    }

    #[test]
    fn fixed_value_is_exposed() {
        let parameter = Parameter::property_value("retries", 3u8);
        let value = parameter.fixed_value().unwrap();
        assert_eq!(value.downcast_ref::<u8>(), Some(&3));
    }
}
