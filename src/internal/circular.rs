//! Cycle detection along a request chain.

use std::sync::Arc;

use crate::activation::Request;
use crate::binding::Binding;

/// Marks a binding as under construction for the lifetime of the guard.
///
/// Child requests snapshot the active bindings of their parent when they are
/// created, so a binding pushed here is visible to every dependency resolved
/// while the guard lives. Dropping the guard (also on error) pops it.
pub(crate) struct ActiveBindingGuard<'a> {
    request: &'a Request,
}

impl<'a> ActiveBindingGuard<'a> {
    pub(crate) fn push(request: &'a Request, binding: Arc<Binding>) -> Self {
        request.push_active(binding);
        Self { request }
    }
}

impl Drop for ActiveBindingGuard<'_> {
    fn drop(&mut self) {
        let popped = self.request.pop_active();
        debug_assert!(popped.is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServiceType;

    struct Engine;

    #[test]
    fn guard_pops_on_drop() {
        let request = Request::for_type::<Engine>();
        let binding = Arc::new(Binding::builder(ServiceType::of::<Engine>()).build().remove(0));
        {
            let _guard = ActiveBindingGuard::push(&request, binding.clone());
            assert!(request.is_active(&binding));
        }
        assert!(!request.is_active(&binding));
        assert!(request.active_bindings().is_empty());
    }
}
