//! Requests for service instances.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::activation::Context;
use crate::binding::{Binding, BindingMetadata};
use crate::caching::ScopeKey;
use crate::catalog::{Constraint, Target};
use crate::parameters::Parameter;
use crate::types::ServiceType;

/// A request to resolve instances of a service.
///
/// Root requests come from the caller; child requests are created while
/// activating an instance, one per injected target. Each request knows the
/// chain of requests above it, which is rendered as the activation path in
/// errors, and the bindings currently being constructed along that chain,
/// which is how cycles are detected.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Request, ServiceType};
///
/// struct Mailer;
///
/// let request = Request::for_type::<Mailer>().named("smtp").optional();
/// assert_eq!(request.service(), &ServiceType::of::<Mailer>());
/// assert!(request.is_optional());
/// assert!(request.is_root());
/// assert!(request.format_activation_path().contains("Request for"));
/// ```
pub struct Request {
    service: ServiceType,
    parent: Option<Arc<Request>>,
    target: Option<Target>,
    constraint: Option<Constraint>,
    parameters: Vec<Parameter>,
    scope: Option<ScopeKey>,
    optional: bool,
    unique: bool,
    depth: usize,
    active_bindings: Mutex<Vec<Arc<Binding>>>,
}

impl Request {
    /// A root request for `service`.
    pub fn new(service: ServiceType) -> Self {
        Self {
            service,
            parent: None,
            target: None,
            constraint: None,
            parameters: Vec::new(),
            scope: None,
            optional: false,
            unique: false,
            depth: 0,
            active_bindings: Mutex::new(Vec::new()),
        }
    }

    /// A root request for the Rust type `T`.
    pub fn for_type<T: ?Sized + 'static>() -> Self {
        Self::new(ServiceType::of::<T>())
    }

    /// Only bindings whose metadata satisfies `constraint` may answer.
    pub fn with_constraint<F>(mut self, constraint: F) -> Self
    where
        F: Fn(&BindingMetadata) -> bool + Send + Sync + 'static,
    {
        self.constraint = Some(Arc::new(constraint));
        self
    }

    /// Only bindings named `name` may answer.
    pub fn named(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.with_constraint(move |metadata| metadata.name() == Some(name.as_str()))
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_parameters<I: IntoIterator<Item = Parameter>>(mut self, parameters: I) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Resolve to nothing instead of failing when no binding matches.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Fail when more than one binding matches.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Caches instances of transient bindings in `scope` for this request
    /// and every request below it.
    pub fn with_scope(mut self, scope: ScopeKey) -> Self {
        self.scope = Some(scope);
        self
    }

    /// The request for a dependency of the instance `parent` is activating.
    pub fn create_child(self: &Arc<Self>, service: ServiceType, parent: &Context, target: Target) -> Request {
        Request {
            service,
            parent: Some(self.clone()),
            constraint: target.constraint().cloned(),
            optional: target.is_optional(),
            target: Some(target),
            parameters: parent
                .parameters()
                .iter()
                .filter(|parameter| parameter.should_inherit())
                .cloned()
                .collect(),
            scope: self.scope.clone(),
            unique: true,
            depth: self.depth + 1,
            active_bindings: Mutex::new(self.active_bindings.lock().clone()),
        }
    }

    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    pub fn parent(&self) -> Option<&Arc<Request>> {
        self.parent.as_ref()
    }

    /// The target being injected; `None` for root requests.
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn scope(&self) -> Option<&ScopeKey> {
        self.scope.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of requests above this one.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether `binding` passes the binding's condition and this request's constraint.
    pub fn matches(&self, binding: &Binding) -> bool {
        binding.matches(self) && self.constraint.as_ref().map_or(true, |constraint| constraint(binding.metadata()))
    }

    /// Bindings under construction along the chain ending at this request.
    pub fn active_bindings(&self) -> Vec<Arc<Binding>> {
        self.active_bindings.lock().clone()
    }

    pub(crate) fn is_active(&self, binding: &Binding) -> bool {
        self.active_bindings.lock().iter().any(|active| active.is_same(binding))
    }

    pub(crate) fn push_active(&self, binding: Arc<Binding>) {
        self.active_bindings.lock().push(binding);
    }

    pub(crate) fn pop_active(&self) -> Option<Arc<Binding>> {
        self.active_bindings.lock().pop()
    }

    /// One line per request from the root down to this one, numbered by depth.
    pub fn format_activation_path(&self) -> String {
        let mut chain = Vec::with_capacity(self.depth + 1);
        let mut current = Some(self);
        while let Some(request) = current {
            chain.push(request);
            current = request.parent.as_deref();
        }

        chain
            .iter()
            .rev()
            .enumerate()
            .map(|(index, request)| format!("{:>3}) {}", index + 1, request.describe()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn describe(&self) -> String {
        match &self.target {
            None => format!("Request for {}", self.service),
            Some(target) => format!("Injection of dependency {} into {}", self.service, target.describe()),
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("service", &self.service)
            .field("target", &self.target)
            .field("optional", &self.optional)
            .field("unique", &self.unique)
            .field("depth", &self.depth)
            .finish()
    }
}
