//! Selection of the members that take part in injection.

use std::sync::Arc;

use crate::catalog::{ConstructorInfo, MethodInfo, PropertyInfo, TypeCatalog};
use crate::types::ServiceType;

/// Chooses which members of a type the planner turns into directives.
///
/// Implementations are pure functions of the type: the planner calls them
/// once per type and memoizes the outcome.
pub trait Selector: Send + Sync {
    /// The constructor to use, or `None` if the type cannot be built reflectively.
    fn select_constructor(&self, service_type: &ServiceType) -> Option<ConstructorInfo>;

    /// Properties to inject after construction, in injection order.
    fn select_properties_for_injection(&self, service_type: &ServiceType) -> Vec<PropertyInfo>;

    /// Methods to invoke after construction, in invocation order.
    fn select_methods_for_injection(&self, service_type: &ServiceType) -> Vec<MethodInfo>;
}

/// Selector backed by the [`TypeCatalog`].
///
/// A constructor declared with `inject_constructor` wins (the first one if
/// several are marked); otherwise the constructor with the most targets,
/// keeping declaration order on ties. Every declared property and method is
/// injected.
pub struct StandardSelector {
    catalog: Arc<TypeCatalog>,
}

impl StandardSelector {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self { catalog }
    }
}

impl Selector for StandardSelector {
    fn select_constructor(&self, service_type: &ServiceType) -> Option<ConstructorInfo> {
        let info = self.catalog.get(service_type)?;
        let constructors = info.constructors();

        if let Some(marked) = constructors.iter().find(|c| c.is_marked()) {
            return Some(marked.clone());
        }

        // max_by_key keeps the last maximum; fold to keep the first.
        constructors
            .iter()
            .fold(None::<&ConstructorInfo>, |best, candidate| match best {
                Some(best) if best.targets().len() >= candidate.targets().len() => Some(best),
                _ => Some(candidate),
            })
            .cloned()
    }

    fn select_properties_for_injection(&self, service_type: &ServiceType) -> Vec<PropertyInfo> {
        self.catalog
            .get(service_type)
            .map(|info| info.properties().to_vec())
            .unwrap_or_default()
    }

    fn select_methods_for_injection(&self, service_type: &ServiceType) -> Vec<MethodInfo> {
        self.catalog
            .get(service_type)
            .map(|info| info.methods().to_vec())
            .unwrap_or_default()
    }
}
