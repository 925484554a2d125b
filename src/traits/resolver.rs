//! Resolver traits for service resolution.

use std::any::Any;
use std::sync::Arc;

use crate::activation::{AnyArc, Request, Resolution};
use crate::catalog::members::{downcast_trait_view, downcast_view};
use crate::error::{ActivationError, ActivationResult};
use crate::parameters::Parameter;
use crate::types::ServiceType;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by the [`Kernel`](crate::Kernel) and by
/// [`ActivationBlock`](crate::ActivationBlock). Most users call the typed
/// methods of [`Resolver`] instead.
pub trait ResolverCore: Send + Sync {
    /// Selects the bindings for `request` and returns a lazy sequence of
    /// their instances.
    ///
    /// Binding selection happens here, so a missing or ambiguous binding is
    /// reported immediately; each instance is activated only when the
    /// sequence is advanced to it.
    ///
    /// # Returns
    ///
    /// * `Ok(Resolution)` - One item per selected binding, in precedence order
    /// * `Err(ActivationError)` - No binding matched a required request, more
    ///   than one matched a unique request, or the kernel was disposed
    fn resolve(&self, request: Request) -> ActivationResult<Resolution>;

    /// Whether at least one binding (explicit, or implicit if allowed) would
    /// answer `request`. Activates nothing.
    fn can_resolve(&self, request: &Request) -> bool;
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// Concrete services come back as `Arc<T>`, trait services as `Arc<dyn Trait>`.
///
/// # Examples
///
/// ```
/// use ferrous_kernel::{Kernel, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let kernel = Kernel::new();
/// kernel.bind::<usize>(|b| b.to_constant(42usize));
/// kernel.bind::<dyn Logger>(|b| b.to_trait_constant(Arc::new(ConsoleLogger) as Arc<dyn Logger>));
///
/// assert_eq!(*kernel.get::<usize>().unwrap(), 42);
/// assert_eq!(kernel.get_trait::<dyn Logger>().unwrap().log("ready"), "LOG: ready");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a unique instance for `request`; `None` if the request is
    /// optional and nothing matched.
    fn get_one(&self, request: Request) -> ActivationResult<Option<AnyArc>> {
        self.resolve(request.unique())?.next().transpose()
    }

    /// Resolves a concrete service type.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_kernel::{Kernel, Resolver};
    ///
    /// let kernel = Kernel::new();
    /// kernel.bind::<String>(|b| b.to_constant("configuration".to_string()));
    ///
    /// let config = kernel.get::<String>().unwrap();
    /// assert_eq!(&*config, "configuration");
    /// ```
    fn get<T: Any + Send + Sync>(&self) -> ActivationResult<Arc<T>> {
        self.get_request(Request::for_type::<T>())
    }

    /// Resolves a concrete service type, `None` when nothing is bound.
    fn try_get<T: Any + Send + Sync>(&self) -> ActivationResult<Option<Arc<T>>> {
        self.get_one(Request::for_type::<T>().optional())?
            .map(downcast_view::<T>)
            .transpose()
    }

    /// Resolves the binding of `T` named `name`.
    fn get_named<T: Any + Send + Sync>(&self, name: &str) -> ActivationResult<Arc<T>> {
        self.get_request(Request::for_type::<T>().named(name))
    }

    /// Resolves `T` with extra parameters for this activation.
    fn get_with<T: Any + Send + Sync>(
        &self,
        parameters: impl IntoIterator<Item = Parameter>,
    ) -> ActivationResult<Arc<T>> {
        self.get_request(Request::for_type::<T>().with_parameters(parameters))
    }

    /// Resolves a service described at runtime (e.g. a generic
    /// instantiation) and downcasts it to `T`.
    fn get_as<T: Any + Send + Sync>(&self, service: ServiceType) -> ActivationResult<Arc<T>> {
        self.get_request(Request::new(service))
    }

    /// Resolves `request` as a unique concrete `T`.
    fn get_request<T: Any + Send + Sync>(&self, request: Request) -> ActivationResult<Arc<T>> {
        let service = request.service().to_string();
        let value = self.get_one(request)?.ok_or_else(|| ActivationError::MissingBinding {
            service,
            path: String::new(),
        })?;
        downcast_view::<T>(value)
    }

    /// Resolves a trait service.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_kernel::{Kernel, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Database: Send + Sync {
    ///     fn connect(&self) -> &str;
    /// }
    ///
    /// struct PostgresDb;
    /// impl Database for PostgresDb {
    ///     fn connect(&self) -> &str { "postgres://..." }
    /// }
    ///
    /// let kernel = Kernel::new();
    /// kernel.bind::<dyn Database>(|b| b.to_trait_constant(Arc::new(PostgresDb) as Arc<dyn Database>));
    ///
    /// let db = kernel.get_trait::<dyn Database>().unwrap();
    /// assert_eq!(db.connect(), "postgres://...");
    /// ```
    fn get_trait<S: ?Sized + Send + Sync + 'static>(&self) -> ActivationResult<Arc<S>> {
        self.get_trait_request(Request::for_type::<S>())
    }

    /// Resolves a trait service, `None` when nothing is bound.
    fn try_get_trait<S: ?Sized + Send + Sync + 'static>(&self) -> ActivationResult<Option<Arc<S>>> {
        self.get_one(Request::for_type::<S>().optional())?
            .map(downcast_trait_view::<S>)
            .transpose()
    }

    /// Resolves the binding of the trait `S` named `name`.
    fn get_trait_named<S: ?Sized + Send + Sync + 'static>(&self, name: &str) -> ActivationResult<Arc<S>> {
        self.get_trait_request(Request::for_type::<S>().named(name))
    }

    /// Resolves `request` as a unique trait object `S`.
    fn get_trait_request<S: ?Sized + Send + Sync + 'static>(&self, request: Request) -> ActivationResult<Arc<S>> {
        let service = request.service().to_string();
        let value = self.get_one(request)?.ok_or_else(|| ActivationError::MissingBinding {
            service,
            path: String::new(),
        })?;
        downcast_trait_view::<S>(value)
    }

    /// Resolves every binding of `T`, in precedence order. Empty when
    /// nothing is bound.
    fn get_all<T: Any + Send + Sync>(&self) -> ActivationResult<Vec<Arc<T>>> {
        self.resolve(Request::for_type::<T>().optional())?
            .map(|value| value.and_then(downcast_view::<T>))
            .collect()
    }

    /// Resolves every binding of the trait `S`, in precedence order.
    fn get_all_trait<S: ?Sized + Send + Sync + 'static>(&self) -> ActivationResult<Vec<Arc<S>>> {
        self.resolve(Request::for_type::<S>().optional())?
            .map(|value| value.and_then(downcast_trait_view::<S>))
            .collect()
    }

    /// Whether `T` can be resolved.
    fn can_resolve_type<T: ?Sized + 'static>(&self) -> bool {
        self.can_resolve(&Request::for_type::<T>())
    }
}
