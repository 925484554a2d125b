//! Activation contexts and the per-binding resolve algorithm.

use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::activation::{AnyArc, InstanceReference, Provider, Request};
use crate::binding::Binding;
use crate::caching::ScopeKey;
use crate::catalog::{Arguments, Target};
use crate::error::{ActivationError, ActivationResult};
use crate::internal::ActiveBindingGuard;
use crate::kernel::{Kernel, KernelInner};
use crate::parameters::{Parameter, ParameterKind};
use crate::planning::Plan;
use crate::traits::ResolverCore;
use crate::types::ServiceType;

/// Everything known about one activation: the request being answered, the
/// binding answering it, the parameters in effect and, once built, the plan
/// of the implementation type.
///
/// Contexts of scoped instances are kept by the cache and handed back to the
/// pipeline on deactivation. They reference the kernel weakly.
pub struct Context {
    kernel: Weak<KernelInner>,
    singleton_scope: ScopeKey,
    request: Arc<Request>,
    binding: Arc<Binding>,
    parameters: Vec<Parameter>,
    generic_arguments: Vec<ServiceType>,
    plan: OnceCell<Arc<Plan>>,
}

impl Context {
    pub(crate) fn new(kernel: &Kernel, request: Arc<Request>, binding: Arc<Binding>) -> Self {
        let parameters = request
            .parameters()
            .iter()
            .chain(binding.parameters())
            .cloned()
            .collect();
        let generic_arguments = if binding.service().is_open() {
            request.service().arguments().to_vec()
        } else {
            Vec::new()
        };
        Self {
            kernel: kernel.downgrade(),
            singleton_scope: kernel.singleton_scope(),
            request,
            binding,
            parameters,
            generic_arguments,
            plan: OnceCell::new(),
        }
    }

    /// The kernel this activation runs in.
    pub fn kernel(&self) -> ActivationResult<Kernel> {
        Kernel::upgrade(&self.kernel).ok_or(ActivationError::Disposed)
    }

    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    pub fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    /// Request parameters followed by binding parameters; the first match wins.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// First parameter named `name` of the given kind.
    pub fn parameter(&self, kind: ParameterKind, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|parameter| parameter.kind() == kind && parameter.name() == name)
    }

    /// Arguments of the requested service when the binding is an open generic definition.
    pub fn generic_arguments(&self) -> &[ServiceType] {
        &self.generic_arguments
    }

    pub fn has_inferred_generic_arguments(&self) -> bool {
        !self.generic_arguments.is_empty()
    }

    /// The plan of the implementation type, once known.
    pub fn plan(&self) -> Option<&Arc<Plan>> {
        self.plan.get()
    }

    /// Sets the plan if none was set yet.
    pub fn set_plan(&self, plan: Arc<Plan>) {
        let _ = self.plan.set(plan);
    }

    /// The kernel's singleton scope, `None` once the kernel is gone.
    pub fn singleton_scope(&self) -> Option<ScopeKey> {
        Some(self.singleton_scope.clone()).filter(ScopeKey::is_alive)
    }

    /// The scope this activation is cached in: the binding's own scope, or
    /// for bindings without one the scope carried by the request.
    pub fn scope(&self) -> Option<ScopeKey> {
        self.binding.scope(self).or_else(|| self.request.scope().cloned())
    }

    pub fn provider(&self) -> Arc<dyn Provider> {
        self.binding.provider(self)
    }

    /// Value for `target`: a matching parameter of `kind` if one is in
    /// effect, otherwise the result of a child request.
    pub fn resolve_target(&self, target: &Target, kind: ParameterKind) -> ActivationResult<Option<AnyArc>> {
        if let Some(parameter) = self.parameters.iter().find(|parameter| parameter.applies_to(kind, target)) {
            return Ok(Some(parameter.value(self, target)));
        }
        self.resolve_dependency(target)
    }

    /// Resolves `target` through a child request. `None` only for optional
    /// targets nothing could satisfy.
    pub fn resolve_dependency(&self, target: &Target) -> ActivationResult<Option<AnyArc>> {
        let kernel = self.kernel()?;
        let request = self.request.create_child(target.service().clone(), self, target.clone());
        kernel.resolve(request)?.next().transpose()
    }

    /// Values for `targets`, in order. Parameters of `kind` take precedence
    /// when given.
    pub fn resolve_arguments(&self, targets: &[Target], kind: Option<ParameterKind>) -> ActivationResult<Arguments> {
        let values = targets
            .iter()
            .map(|target| match kind {
                Some(kind) => self.resolve_target(target, kind),
                None => self.resolve_dependency(target),
            })
            .collect::<ActivationResult<Vec<_>>>()?;
        Ok(Arguments::new(values))
    }

    /// Produces the instance for this activation.
    ///
    /// Scoped bindings take the binding's lock, return a cached instance if
    /// one exists, and otherwise build, remember and activate the instance
    /// before releasing the lock. The cycle check runs first so that a
    /// binding re-entering itself fails instead of waiting on itself.
    pub(crate) fn resolve(self: &Arc<Self>) -> ActivationResult<InstanceReference> {
        let kernel = self.kernel()?;

        if self.request.is_active(&self.binding) {
            return Err(ActivationError::CyclicalDependency {
                path: self.request.format_activation_path(),
            });
        }
        let max_depth = kernel.settings().max_resolution_depth;
        if self.request.depth() > max_depth {
            return Err(ActivationError::DepthExceeded {
                depth: max_depth,
                path: self.request.format_activation_path(),
            });
        }

        let scope = self.scope();
        let _lock = scope.as_ref().map(|_| self.binding.configuration().lock());

        if let Some(scope) = &scope {
            if let Some(cached) = kernel.cache().try_get_in_scope(self, scope) {
                tracing::trace!(target: "ferrous_kernel", binding = %self.binding, "Cache hit");
                return Ok(cached);
            }
        }

        let reference = {
            let _active = ActiveBindingGuard::push(&self.request, self.binding.clone());
            self.provider().create(self)?
        };

        if let Some(scope) = &scope {
            kernel.cache().remember_in_scope(self, scope, reference.clone());
        }
        if self.plan.get().is_none() {
            self.set_plan(kernel.planner().get_plan(reference.implementation()));
        }

        if let Err(error) = kernel.pipeline().activate(self, &reference) {
            if scope.is_some() {
                kernel.cache().discard(self, &reference);
            }
            return Err(error);
        }

        tracing::debug!(
            target: "ferrous_kernel",
            service = %self.request.service(),
            implementation = %reference.implementation(),
            depth = self.request.depth(),
            "Activated instance"
        );
        Ok(reference)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.request)
            .field("binding", &self.binding)
            .field("generic_arguments", &self.generic_arguments)
            .field("planned", &self.plan.get().is_some())
            .finish()
    }
}
