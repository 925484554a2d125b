//! Memoizing planner.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::internal::FastMap;
use crate::planning::{Plan, PlanningStrategy};
use crate::types::ServiceType;

/// Builds a [`Plan`] for a type on first request and keeps it for the
/// planner's lifetime.
///
/// # Concurrency
///
/// Each type owns a `OnceCell`; concurrent first requests for the same type
/// block on that cell, so the strategies run exactly once per type. Lookups
/// of already-planned types take a read lock only.
pub struct Planner {
    strategies: Vec<Arc<dyn PlanningStrategy>>,
    plans: RwLock<FastMap<ServiceType, Arc<OnceCell<Arc<Plan>>>>>,
}

impl Planner {
    /// Creates a planner running `strategies` in the given order.
    pub fn new(strategies: Vec<Arc<dyn PlanningStrategy>>) -> Self {
        Self {
            strategies,
            plans: RwLock::new(FastMap::default()),
        }
    }

    pub fn strategies(&self) -> &[Arc<dyn PlanningStrategy>] {
        &self.strategies
    }

    /// Returns the plan for `service_type`, building it on first request.
    pub fn get_plan(&self, service_type: &ServiceType) -> Arc<Plan> {
        let cell = self.cell_for(service_type);
        cell.get_or_init(|| self.create_plan(service_type)).clone()
    }

    /// Returns the plan only if it was already built.
    pub fn try_get_plan(&self, service_type: &ServiceType) -> Option<Arc<Plan>> {
        self.plans.read().get(service_type).and_then(|cell| cell.get().cloned())
    }

    /// Number of types with a completed plan.
    pub fn plan_count(&self) -> usize {
        self.plans.read().values().filter(|cell| cell.get().is_some()).count()
    }

    fn cell_for(&self, service_type: &ServiceType) -> Arc<OnceCell<Arc<Plan>>> {
        if let Some(cell) = self.plans.read().get(service_type) {
            return cell.clone();
        }
        self.plans
            .write()
            .entry(service_type.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn create_plan(&self, service_type: &ServiceType) -> Arc<Plan> {
        let mut plan = Plan::new(service_type.clone());
        for strategy in &self.strategies {
            strategy.execute(&mut plan);
        }
        tracing::debug!(
            target: "ferrous_kernel",
            service_type = %service_type,
            directives = plan.directives().len(),
            "Created plan"
        );
        Arc::new(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    struct CountingStrategy(AtomicUsize);

    impl PlanningStrategy for CountingStrategy {
        fn execute(&self, _plan: &mut Plan) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn plans_are_memoized_per_type() {
        let counter = Arc::new(CountingStrategy(AtomicUsize::new(0)));
        let planner = Planner::new(vec![counter.clone() as Arc<dyn PlanningStrategy>]);

        let first = planner.get_plan(&ServiceType::of::<u32>());
        let second = planner.get_plan(&ServiceType::of::<u32>());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        planner.get_plan(&ServiceType::of::<u64>());
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert_eq!(planner.plan_count(), 2);
    }

    #[test]
    fn concurrent_first_requests_plan_once() {
        let counter = Arc::new(CountingStrategy(AtomicUsize::new(0)));
        let planner = Arc::new(Planner::new(vec![counter.clone() as Arc<dyn PlanningStrategy>]));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let planner = planner.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    planner.get_plan(&ServiceType::named("Shared"))
                })
            })
            .collect();

        let plans: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(plans.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
