//! Error types for the activation engine.

use thiserror::Error;

/// Error type produced by constructor, property and method injectors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Activation errors
///
/// Every failure that can occur while resolving a service. Variants that
/// happen inside a resolution tree carry the rendered activation path
/// (depth-numbered, root to leaf) so the failing branch can be located.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{ActivationError, Kernel, Resolver};
///
/// let kernel = Kernel::new();
/// match kernel.get::<String>() {
///     Err(ActivationError::MissingBinding { service, .. }) => {
///         assert!(service.contains("String"));
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Error)]
pub enum ActivationError {
    /// No binding matched the request.
    #[error("No matching bindings are available for {service}\nActivation path:\n{path}")]
    MissingBinding { service: String, path: String },

    /// More than one binding matched a request that demands a unique result.
    #[error("More than one matching binding is available for {service}: {}\nActivation path:\n{path}", .candidates.join(", "))]
    AmbiguousBinding {
        service: String,
        candidates: Vec<String>,
        path: String,
    },

    /// The implementation type has no constructor that can be invoked.
    #[error("No usable constructor is available for {implementation}\nActivation path:\n{path}")]
    NoConstructor { implementation: String, path: String },

    /// A binding reappeared in its own ancestor chain.
    #[error("Cyclical dependency detected\nActivation path:\n{path}")]
    CyclicalDependency { path: String },

    /// The resolution tree grew deeper than the configured limit.
    #[error("Maximum resolution depth {depth} exceeded\nActivation path:\n{path}")]
    DepthExceeded { depth: usize, path: String },

    /// A constructor, property or method injector failed. The original error
    /// is kept as the source and displayed verbatim.
    #[error("{source}")]
    Fault {
        #[source]
        source: BoxError,
    },

    /// A plan holds more than one directive of a kind queried as singular.
    #[error("Plan for {plan_type} contains {count} {directive} directives where at most one was expected")]
    MultipleDirectives {
        plan_type: String,
        directive: &'static str,
        count: usize,
    },

    /// An instance could not be viewed as the requested type.
    #[error("Type mismatch: expected {expected}")]
    TypeMismatch { expected: String },

    /// A public API was called with an unusable argument.
    #[error("Invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    /// The kernel was disposed.
    #[error("The kernel has been disposed")]
    Disposed,
}

impl ActivationError {
    /// Wraps an injector error, passing activation errors through unchanged.
    pub fn from_fault(source: BoxError) -> Self {
        match source.downcast::<ActivationError>() {
            Ok(error) => *error,
            Err(source) => ActivationError::Fault { source },
        }
    }

    /// Returns the rendered activation path, if the error has one.
    pub fn activation_path(&self) -> Option<&str> {
        match self {
            ActivationError::MissingBinding { path, .. }
            | ActivationError::AmbiguousBinding { path, .. }
            | ActivationError::NoConstructor { path, .. }
            | ActivationError::CyclicalDependency { path }
            | ActivationError::DepthExceeded { path, .. } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn type_mismatch<T: ?Sized>() -> Self {
        ActivationError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
        }
    }
}

/// Result type for activation operations
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{ActivationResult, ActivationError};
///
/// fn check(port: u16) -> ActivationResult<u16> {
///     if port == 0 {
///         return Err(ActivationError::InvalidArgument {
///             argument: "port",
///             reason: "must be non-zero".to_string(),
///         });
///     }
///     Ok(port)
/// }
///
/// assert!(check(0).is_err());
/// ```
pub type ActivationResult<T> = Result<T, ActivationError>;
