//! Concurrent access tests
//!
//! These tests verify that the kernel behaves correctly when shared between
//! threads: singletons are built exactly once, thread scopes stay isolated
//! and activation completes before an instance becomes visible.

use ferrous_kernel::{Initializable, Kernel, KernelSettings, Resolver, Target, TypeInfo};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

// ===== Test Services =====

struct SlowSingleton {
    initialized: AtomicBool,
}

impl Initializable for SlowSingleton {
    fn initialize(&self) {
        thread::sleep(Duration::from_millis(20));
        self.initialized.store(true, Ordering::SeqCst);
    }
}

struct Consumer {
    singleton: Arc<SlowSingleton>,
}

fn kernel_with_counter(constructed: Arc<AtomicU32>) -> Kernel {
    let kernel = Kernel::with_settings(KernelSettings::default().with_cache_pruning_interval(None));
    kernel
        .catalog()
        .register(
            TypeInfo::of::<SlowSingleton>()
                .constructor([], move |_| {
                    constructed.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                    Ok(SlowSingleton {
                        initialized: AtomicBool::new(false),
                    })
                })
                .initializable(),
        )
        .register(
            TypeInfo::of::<Consumer>().constructor([Target::of::<SlowSingleton>("singleton")], |args| {
                Ok(Consumer {
                    singleton: args.get(0)?,
                })
            }),
        );
    kernel.bind::<SlowSingleton>(|b| b.to_self().in_singleton_scope());
    kernel
}

// ===== Tests =====

#[test]
fn test_singleton_constructed_once_under_contention() {
    const THREADS: usize = 16;
    let constructed = Arc::new(AtomicU32::new(0));
    let kernel = kernel_with_counter(constructed.clone());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let kernel = kernel.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let singleton = kernel.get::<SlowSingleton>().unwrap();
                // Other threads only ever see a fully activated instance.
                assert!(singleton.initialized.load(Ordering::SeqCst));
                Arc::as_ptr(&singleton) as usize
            })
        })
        .collect();

    let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_transient_consumers_share_singleton_across_scoped_threads() {
    let constructed = Arc::new(AtomicU32::new(0));
    let kernel = kernel_with_counter(constructed.clone());

    let consumers: Vec<Arc<Consumer>> = crossbeam_utils::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|_| kernel.get::<Consumer>().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    for pair in consumers.windows(2) {
        assert!(!Arc::ptr_eq(&pair[0], &pair[1]));
        assert!(Arc::ptr_eq(&pair[0].singleton, &pair[1].singleton));
    }
}

#[test]
fn test_thread_scope_isolated_between_threads() {
    struct PerThread;

    let kernel = Kernel::with_settings(KernelSettings::default().with_cache_pruning_interval(None));
    kernel
        .catalog()
        .register(TypeInfo::of::<PerThread>().constructor([], |_| Ok(PerThread)));
    kernel.bind::<PerThread>(|b| b.to_self().in_thread_scope());

    let addresses: Vec<usize> = crossbeam_utils::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|_| {
                    let first = kernel.get::<PerThread>().unwrap();
                    let second = kernel.get::<PerThread>().unwrap();
                    assert!(Arc::ptr_eq(&first, &second));
                    // Keep the instance alive until every thread has resolved.
                    (Arc::as_ptr(&first) as usize, first)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    })
    .unwrap()
    .into_iter()
    .map(|(address, _instance)| address)
    .collect();

    for (i, a) in addresses.iter().enumerate() {
        for b in &addresses[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn test_concurrent_implicit_binding_creation() {
    struct Implicit;

    let kernel = Kernel::with_settings(KernelSettings::default().with_cache_pruning_interval(None));
    kernel
        .catalog()
        .register(TypeInfo::of::<Implicit>().constructor([], |_| Ok(Implicit)));
    let barrier = Barrier::new(8);

    crossbeam_utils::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|_| {
                barrier.wait();
                kernel.get::<Implicit>().unwrap();
            });
        }
    })
    .unwrap();

    let bindings = kernel.get_bindings(&ferrous_kernel::ServiceType::of::<Implicit>());
    assert_eq!(bindings.len(), 1);
}
