//! Runtime type descriptors.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{ActivationError, ActivationResult};

/// Identity of a [`ServiceType`] without its generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Identity {
    /// A Rust type known through `TypeId`.
    Rust(TypeId),
    /// A runtime-defined nominal type, usually a generic definition.
    Named(Arc<str>),
    /// An unbound generic parameter, identified by position.
    Parameter(usize),
}

#[derive(Debug)]
struct Repr {
    identity: Identity,
    name: Arc<str>,
    arguments: Box<[ServiceType]>,
}

/// Runtime description of a service or implementation type.
///
/// Rust has no runtime reflection, so the activation engine identifies types
/// through this descriptor. A descriptor is either a Rust type
/// ([`ServiceType::of`]), a runtime-defined nominal type
/// ([`ServiceType::named`]) or an unbound generic parameter
/// ([`ServiceType::parameter`]), optionally with generic arguments.
///
/// Equality and hashing are structural: identity plus arguments.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::ServiceType;
///
/// let open = ServiceType::named("Repository").with_arguments([ServiceType::parameter(0)]);
/// assert!(open.is_open());
///
/// let closed = open.close(&[ServiceType::of::<u32>()]).unwrap();
/// assert!(!closed.is_open());
/// assert_eq!(closed.to_string(), "Repository<u32>");
/// assert_eq!(closed.open_definition(), open);
/// ```
#[derive(Clone)]
pub struct ServiceType(Arc<Repr>);

impl ServiceType {
    /// Descriptor for a Rust type, sized or not (`dyn Trait` works).
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::from_parts(
            Identity::Rust(TypeId::of::<T>()),
            Arc::from(std::any::type_name::<T>()),
            Box::new([]),
        )
    }

    /// Descriptor for a runtime-defined nominal type.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        Self::from_parts(Identity::Named(name.clone()), name, Box::new([]))
    }

    /// An unbound generic parameter at `index`.
    pub fn parameter(index: usize) -> Self {
        Self::from_parts(
            Identity::Parameter(index),
            Arc::from(format!("T{}", index)),
            Box::new([]),
        )
    }

    fn from_parts(identity: Identity, name: Arc<str>, arguments: Box<[ServiceType]>) -> Self {
        ServiceType(Arc::new(Repr {
            identity,
            name,
            arguments,
        }))
    }

    /// Returns the same type definition with the given generic arguments.
    pub fn with_arguments<I>(&self, arguments: I) -> Self
    where
        I: IntoIterator<Item = ServiceType>,
    {
        Self::from_parts(
            self.0.identity.clone(),
            self.0.name.clone(),
            arguments.into_iter().collect(),
        )
    }

    /// Name of the type definition, without arguments.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Generic arguments, in declaration order.
    pub fn arguments(&self) -> &[ServiceType] {
        &self.0.arguments
    }

    /// Whether this is a bare generic parameter.
    pub fn is_parameter(&self) -> bool {
        matches!(self.0.identity, Identity::Parameter(_))
    }

    /// Whether this type is a generic instantiation (open or closed).
    pub fn is_generic(&self) -> bool {
        !self.0.arguments.is_empty()
    }

    /// Whether any argument, at any depth, is an unbound parameter.
    pub fn is_open(&self) -> bool {
        self.is_parameter() || self.0.arguments.iter().any(ServiceType::is_open)
    }

    /// Whether this descriptor refers to the Rust type `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.0.identity == Identity::Rust(TypeId::of::<T>())
    }

    /// The generic definition: same identity, every argument replaced by
    /// the parameter at its position.
    pub fn open_definition(&self) -> Self {
        let arguments: Vec<_> = (0..self.0.arguments.len()).map(ServiceType::parameter).collect();
        self.with_arguments(arguments)
    }

    /// Substitutes unbound parameters with `arguments`, by index.
    ///
    /// Closed types are returned unchanged.
    pub fn close(&self, arguments: &[ServiceType]) -> ActivationResult<Self> {
        if !self.is_open() {
            return Ok(self.clone());
        }
        if let Identity::Parameter(index) = self.0.identity {
            return arguments.get(index).cloned().ok_or_else(|| ActivationError::InvalidArgument {
                argument: "arguments",
                reason: format!(
                    "{} generic arguments supplied, parameter T{} is unbound",
                    arguments.len(),
                    index
                ),
            });
        }
        let closed = self
            .0
            .arguments
            .iter()
            .map(|argument| argument.close(arguments))
            .collect::<ActivationResult<Vec<_>>>()?;
        Ok(self.with_arguments(closed))
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.identity == other.0.identity && self.0.arguments == other.0.arguments)
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.identity.hash(state);
        self.0.arguments.hash(state);
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)?;
        if let Some((first, rest)) = self.0.arguments.split_first() {
            write!(f, "<{}", first)?;
            for argument in rest {
                write!(f, ", {}", argument)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceType({})", self)
    }
}
