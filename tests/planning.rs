use ferrous_kernel::planning::{
    ConstructorInjectionDirective, MethodInjectionDirective, PlanningStrategy, PropertyInjectionDirective,
};
use ferrous_kernel::{Kernel, KernelSettings, Plan, Resolver, ServiceType, Target, TypeInfo};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

// ===== Test Services =====

struct Engine;
struct Wheel;

struct Car {
    built_with: &'static str,
    radio: Mutex<Option<Arc<Engine>>>,
    tuned: Mutex<Vec<&'static str>>,
}

impl Car {
    fn new(built_with: &'static str) -> Self {
        Self {
            built_with,
            radio: Mutex::new(None),
            tuned: Mutex::new(Vec::new()),
        }
    }
}

fn kernel() -> Kernel {
    let kernel = Kernel::with_settings(KernelSettings::default().with_cache_pruning_interval(None));
    kernel
        .catalog()
        .register(TypeInfo::of::<Engine>().constructor([], |_| Ok(Engine)))
        .register(TypeInfo::of::<Wheel>().constructor([], |_| Ok(Wheel)));
    kernel
}

// ===== Constructor selection =====

#[test]
fn test_most_targets_constructor_wins() {
    let kernel = kernel();
    kernel.catalog().register(
        TypeInfo::of::<Car>()
            .constructor([], |_| Ok(Car::new("default")))
            .constructor([Target::of::<Engine>("engine"), Target::of::<Wheel>("wheel")], |_| {
                Ok(Car::new("engine and wheel"))
            })
            .constructor([Target::of::<Engine>("engine")], |_| Ok(Car::new("engine"))),
    );

    assert_eq!(kernel.get::<Car>().unwrap().built_with, "engine and wheel");
}

#[test]
fn test_marked_constructor_wins() {
    let kernel = kernel();
    kernel.catalog().register(
        TypeInfo::of::<Car>()
            .constructor([Target::of::<Engine>("engine"), Target::of::<Wheel>("wheel")], |_| {
                Ok(Car::new("engine and wheel"))
            })
            .inject_constructor([], |_| Ok(Car::new("marked"))),
    );

    assert_eq!(kernel.get::<Car>().unwrap().built_with, "marked");
}

// ===== Plans =====

#[test]
fn test_plan_contains_directives_per_member() {
    let kernel = kernel();
    kernel.catalog().register(
        TypeInfo::of::<Car>()
            .constructor([], |_| Ok(Car::new("default")))
            .property(Target::of::<Engine>("radio"), |car: &Car, args| {
                *car.radio.lock() = Some(args.get(0)?);
                Ok(())
            })
            .method("tune", [Target::of::<Wheel>("wheel")], |car: &Car, _| {
                car.tuned.lock().push("tune");
                Ok(())
            }),
    );

    let plan = kernel.planner().get_plan(&ServiceType::of::<Car>());
    assert!(plan.has::<ConstructorInjectionDirective>());
    assert_eq!(plan.get_all::<PropertyInjectionDirective>().count(), 1);
    assert_eq!(plan.get_all::<MethodInjectionDirective>().count(), 1);

    let car = kernel.get::<Car>().unwrap();
    assert!(car.radio.lock().is_some());
    assert_eq!(*car.tuned.lock(), vec!["tune"]);
}

#[test]
fn test_plans_are_memoized() {
    let kernel = kernel();
    let service = ServiceType::of::<Engine>();
    assert!(kernel.planner().try_get_plan(&service).is_none());

    kernel.get::<Engine>().unwrap();
    let first = kernel.planner().try_get_plan(&service).unwrap();
    kernel.get::<Engine>().unwrap();
    let second = kernel.planner().get_plan(&service);
    assert!(Arc::ptr_eq(&first, &second));
}

struct CountingStrategy {
    runs: Arc<AtomicUsize>,
}

impl PlanningStrategy for CountingStrategy {
    fn execute(&self, _plan: &mut Plan) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_planning_runs_once_per_type_under_contention() {
    let runs = Arc::new(AtomicUsize::new(0));
    let kernel = Kernel::builder()
        .with_settings(KernelSettings::default().with_cache_pruning_interval(None))
        .with_planning_strategy(Arc::new(CountingStrategy { runs: runs.clone() }))
        .build();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let kernel = kernel.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                kernel.planner().get_plan(&ServiceType::of::<Wheel>())
            })
        })
        .collect();
    let plans: Vec<Arc<Plan>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(plans.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}
