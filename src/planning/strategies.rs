//! Planning strategies: each contributes one kind of directive.

use std::sync::Arc;

use crate::catalog::Selector;
use crate::planning::{
    ConstructorInjectionDirective, Directive, MethodInjectionDirective, Plan, PropertyInjectionDirective,
};

/// Adds directives to a plan. Strategies run once per type, in the order the
/// planner was given.
pub trait PlanningStrategy: Send + Sync {
    fn execute(&self, plan: &mut Plan);
}

/// Adds the constructor injection directive chosen by the selector.
pub struct ConstructorReflectionStrategy {
    selector: Arc<dyn Selector>,
}

impl ConstructorReflectionStrategy {
    pub fn new(selector: Arc<dyn Selector>) -> Self {
        Self { selector }
    }
}

impl PlanningStrategy for ConstructorReflectionStrategy {
    fn execute(&self, plan: &mut Plan) {
        if let Some(constructor) = self.selector.select_constructor(plan.service_type()) {
            plan.add(Directive::Constructor(ConstructorInjectionDirective { constructor }));
        }
    }
}

/// Adds a property injection directive per selected property.
pub struct PropertyReflectionStrategy {
    selector: Arc<dyn Selector>,
}

impl PropertyReflectionStrategy {
    pub fn new(selector: Arc<dyn Selector>) -> Self {
        Self { selector }
    }
}

impl PlanningStrategy for PropertyReflectionStrategy {
    fn execute(&self, plan: &mut Plan) {
        for property in self.selector.select_properties_for_injection(plan.service_type()) {
            plan.add(Directive::Property(PropertyInjectionDirective { property }));
        }
    }
}

/// Adds a method injection directive per selected method.
pub struct MethodReflectionStrategy {
    selector: Arc<dyn Selector>,
}

impl MethodReflectionStrategy {
    pub fn new(selector: Arc<dyn Selector>) -> Self {
        Self { selector }
    }
}

impl PlanningStrategy for MethodReflectionStrategy {
    fn execute(&self, plan: &mut Plan) {
        for method in self.selector.select_methods_for_injection(plan.service_type()) {
            plan.add(Directive::Method(MethodInjectionDirective { method }));
        }
    }
}
