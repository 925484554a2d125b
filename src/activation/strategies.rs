//! Standard activation strategies.

use std::sync::Arc;

use crate::activation::{ActivationStrategy, Context, InstanceReference};
use crate::catalog::{LifecycleHook, TypeCatalog};
use crate::error::{ActivationError, ActivationResult};
use crate::parameters::ParameterKind;
use crate::planning::{MethodInjectionDirective, PropertyInjectionDirective};

/// Injects the plan's properties.
#[derive(Debug, Default)]
pub struct PropertyInjectionStrategy;

impl ActivationStrategy for PropertyInjectionStrategy {
    fn activate(&self, context: &Context, reference: &InstanceReference) -> ActivationResult<()> {
        let Some(plan) = context.plan() else {
            return Ok(());
        };
        for directive in plan.get_all::<PropertyInjectionDirective>() {
            let value = context.resolve_target(directive.target(), ParameterKind::PropertyValue)?;
            directive
                .property
                .invoke(reference, value)
                .map_err(ActivationError::from_fault)?;
        }
        Ok(())
    }
}

/// Invokes the plan's injection methods.
#[derive(Debug, Default)]
pub struct MethodInjectionStrategy;

impl ActivationStrategy for MethodInjectionStrategy {
    fn activate(&self, context: &Context, reference: &InstanceReference) -> ActivationResult<()> {
        let Some(plan) = context.plan() else {
            return Ok(());
        };
        for directive in plan.get_all::<MethodInjectionDirective>() {
            let arguments = context.resolve_arguments(directive.targets(), None)?;
            directive
                .method
                .invoke(reference, &arguments)
                .map_err(ActivationError::from_fault)?;
        }
        Ok(())
    }
}

fn run(hook: Option<&LifecycleHook>, reference: &InstanceReference) {
    if let Some(hook) = hook {
        hook(reference.instance());
    }
}

/// Calls `initialize` on types registered as initializable.
pub struct InitializableStrategy {
    catalog: Arc<TypeCatalog>,
}

impl InitializableStrategy {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self { catalog }
    }
}

impl ActivationStrategy for InitializableStrategy {
    fn activate(&self, _context: &Context, reference: &InstanceReference) -> ActivationResult<()> {
        run(self.catalog.lifecycle(reference.implementation()).initialize.as_ref(), reference);
        Ok(())
    }
}

/// Calls `start` on activation and `stop` on deactivation for types
/// registered as startable.
pub struct StartableStrategy {
    catalog: Arc<TypeCatalog>,
}

impl StartableStrategy {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self { catalog }
    }
}

impl ActivationStrategy for StartableStrategy {
    fn activate(&self, _context: &Context, reference: &InstanceReference) -> ActivationResult<()> {
        run(self.catalog.lifecycle(reference.implementation()).start.as_ref(), reference);
        Ok(())
    }

    fn deactivate(&self, _context: &Context, reference: &InstanceReference) -> ActivationResult<()> {
        run(self.catalog.lifecycle(reference.implementation()).stop.as_ref(), reference);
        Ok(())
    }
}

/// Calls `dispose` on deactivation for types registered as disposable.
pub struct DisposableStrategy {
    catalog: Arc<TypeCatalog>,
}

impl DisposableStrategy {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self { catalog }
    }
}

impl ActivationStrategy for DisposableStrategy {
    fn deactivate(&self, _context: &Context, reference: &InstanceReference) -> ActivationResult<()> {
        run(self.catalog.lifecycle(reference.implementation()).dispose.as_ref(), reference);
        Ok(())
    }
}

/// Runs the binding's own activation and deactivation actions.
#[derive(Debug, Default)]
pub struct BindingActionStrategy;

impl ActivationStrategy for BindingActionStrategy {
    fn activate(&self, context: &Context, reference: &InstanceReference) -> ActivationResult<()> {
        for action in context.binding().configuration().activation_actions() {
            action(context, reference);
        }
        Ok(())
    }

    fn deactivate(&self, context: &Context, reference: &InstanceReference) -> ActivationResult<()> {
        for action in context.binding().configuration().deactivation_actions() {
            action(context, reference);
        }
        Ok(())
    }
}
