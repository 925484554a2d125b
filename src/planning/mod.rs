//! Construction plans: how to build and wire one concrete type.

mod plan;
mod planner;
mod strategies;

pub use plan::{
    ConstructorInjectionDirective, Directive, DirectiveKind, MethodInjectionDirective, Plan,
    PropertyInjectionDirective,
};
pub use planner::Planner;
pub use strategies::{
    ConstructorReflectionStrategy, MethodReflectionStrategy, PlanningStrategy, PropertyReflectionStrategy,
};
