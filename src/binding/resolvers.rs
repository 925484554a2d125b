//! Strategies for finding the bindings registered for a service.

use std::sync::Arc;

use crate::activation::Request;
use crate::binding::{Binding, BindingBuilder};
use crate::catalog::TypeCatalog;
use crate::internal::FastMap;
use crate::lifetime::Lifetime;
use crate::types::ServiceType;

/// Registered bindings keyed by service type, in registration order.
pub type BindingMap = FastMap<ServiceType, Vec<Arc<Binding>>>;

/// Finds candidate bindings for a service among the registered ones.
pub trait BindingResolver: Send + Sync {
    fn resolve(&self, bindings: &BindingMap, service: &ServiceType) -> Vec<Arc<Binding>>;
}

/// Bindings registered for exactly the requested service.
#[derive(Debug, Default)]
pub struct StandardBindingResolver;

impl BindingResolver for StandardBindingResolver {
    fn resolve(&self, bindings: &BindingMap, service: &ServiceType) -> Vec<Arc<Binding>> {
        bindings.get(service).cloned().unwrap_or_default()
    }
}

/// Bindings registered for the generic definition of a closed generic service.
#[derive(Debug, Default)]
pub struct OpenGenericBindingResolver;

impl BindingResolver for OpenGenericBindingResolver {
    fn resolve(&self, bindings: &BindingMap, service: &ServiceType) -> Vec<Arc<Binding>> {
        if !service.is_generic() || service.is_open() {
            return Vec::new();
        }
        bindings.get(&service.open_definition()).cloned().unwrap_or_default()
    }
}

/// Creates bindings on the fly when no registered binding matches a request.
pub trait MissingBindingResolver: Send + Sync {
    fn resolve(&self, request: &Request, catalog: &TypeCatalog) -> Vec<Binding>;
}

/// Binds constructible concrete types to themselves.
///
/// The created binding is implicit: it loses to any explicit binding added
/// later and uses the kernel's default lifetime.
#[derive(Debug)]
pub struct SelfBindingResolver {
    default_lifetime: Lifetime,
}

impl SelfBindingResolver {
    pub fn new(default_lifetime: Lifetime) -> Self {
        Self { default_lifetime }
    }
}

impl MissingBindingResolver for SelfBindingResolver {
    fn resolve(&self, request: &Request, catalog: &TypeCatalog) -> Vec<Binding> {
        let service = request.service();
        if service.is_open() || !catalog.is_constructible(service) {
            return Vec::new();
        }
        BindingBuilder::new(service.clone(), self.default_lifetime)
            .to_self()
            .implicit()
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeInfo;

    struct Repository;

    fn repository_of(argument: ServiceType) -> ServiceType {
        ServiceType::named("Repository").with_arguments([argument])
    }

    #[test]
    fn open_generic_resolver_matches_definition() {
        let open = repository_of(ServiceType::parameter(0));
        let mut bindings = BindingMap::default();
        bindings.insert(
            open.clone(),
            Binding::builder(open).build().into_iter().map(Arc::new).collect(),
        );

        let closed = repository_of(ServiceType::of::<u32>());
        assert!(StandardBindingResolver.resolve(&bindings, &closed).is_empty());
        assert_eq!(OpenGenericBindingResolver.resolve(&bindings, &closed).len(), 1);
        assert!(OpenGenericBindingResolver
            .resolve(&bindings, &ServiceType::of::<u32>())
            .is_empty());
    }

    #[test]
    fn self_binding_requires_a_constructor() {
        let catalog = TypeCatalog::new();
        let resolver = SelfBindingResolver::new(Lifetime::Singleton);
        let request = Request::new(ServiceType::of::<Repository>());
        assert!(resolver.resolve(&request, &catalog).is_empty());

        catalog.register(TypeInfo::of::<Repository>().constructor([], |_| Ok(Repository)));
        let created = resolver.resolve(&request, &catalog);
        assert_eq!(created.len(), 1);
        assert!(created[0].is_implicit());
        assert_eq!(created[0].lifetime(), Lifetime::Singleton);
    }
}
