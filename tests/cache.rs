use ferrous_kernel::{
    CachePruner, Dispose, IntervalCachePruner, Kernel, KernelSettings, Pruneable, Resolver, ScopeKey, TypeInfo,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

// ===== Test Services =====

trait Resource: Send + Sync {}

struct Connection {
    disposed: Arc<AtomicUsize>,
}

impl Resource for Connection {}

impl Dispose for Connection {
    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

struct Session;

fn kernel(disposed: Arc<AtomicUsize>) -> Kernel {
    let kernel = Kernel::with_settings(KernelSettings::default().with_cache_pruning_interval(None));
    kernel.catalog().register(
        TypeInfo::of::<Connection>()
            .constructor([], move |_| {
                Ok(Connection {
                    disposed: disposed.clone(),
                })
            })
            .disposable()
            .provides::<dyn Resource, _>(|c| c as Arc<dyn Resource>),
    );
    kernel
}

// ===== Release =====

#[test]
fn test_release_deactivates_once() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let kernel = kernel(disposed.clone());
    kernel.bind::<Connection>(|b| b.to_self().in_singleton_scope());

    let connection = kernel.get::<Connection>().unwrap();
    assert!(kernel.release(&connection));
    assert!(!kernel.release(&connection));
    assert_eq!(disposed.load(Ordering::SeqCst), 1);

    // A released singleton is rebuilt on the next request.
    let rebuilt = kernel.get::<Connection>().unwrap();
    assert!(!Arc::ptr_eq(&connection, &rebuilt));
}

#[test]
fn test_release_through_trait_view() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let kernel = kernel(disposed.clone());
    kernel.bind::<dyn Resource>(|b| b.to_type::<Connection>().in_singleton_scope());

    let resource = kernel.get_trait::<dyn Resource>().unwrap();
    assert!(kernel.release(&resource));
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_release_of_transient_is_noop() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let kernel = kernel(disposed.clone());

    let connection = kernel.get::<Connection>().unwrap();
    assert!(!kernel.release(&connection));
    assert_eq!(disposed.load(Ordering::SeqCst), 0);
}

// ===== Clear =====

#[test]
fn test_clear_scope_deactivates_its_instances() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let kernel = kernel(disposed.clone());
    let session = Arc::new(Session);
    let key = ScopeKey::of(&session);
    kernel.bind::<Connection>(move |b| b.to_self().in_scope(move |_| Some(key.clone())));

    kernel.get::<Connection>().unwrap();
    assert_eq!(kernel.cache().count_in_scope(&ScopeKey::of(&session)), 1);

    kernel.cache().clear(&ScopeKey::of(&session));
    assert_eq!(kernel.cache().count(), 0);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_kernel_dispose_clears_singletons() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let kernel = kernel(disposed.clone());
    kernel.bind::<Connection>(|b| b.to_self().in_singleton_scope());
    kernel.get::<Connection>().unwrap();

    kernel.dispose();
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    assert_eq!(kernel.cache().count(), 0);
}

#[test]
fn test_dropping_last_kernel_handle_disposes() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let kernel = kernel(disposed.clone());
    kernel.bind::<Connection>(|b| b.to_self().in_singleton_scope());
    let connection = kernel.get::<Connection>().unwrap();

    let clone = kernel.clone();
    drop(kernel);
    assert_eq!(disposed.load(Ordering::SeqCst), 0);
    drop(clone);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    drop(connection);
}

// ===== Pruning =====

#[test]
fn test_prune_removes_dead_scopes_only() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let kernel = kernel(disposed.clone());
    let current = Arc::new(parking_lot::Mutex::new(None::<ScopeKey>));
    let source = current.clone();
    kernel.bind::<Connection>(move |b| b.to_self().in_scope(move |_| source.lock().clone()));

    let live = Arc::new(Session);
    *current.lock() = Some(ScopeKey::of(&live));
    kernel.get::<Connection>().unwrap();

    let dying = Arc::new(Session);
    *current.lock() = Some(ScopeKey::of(&dying));
    kernel.get::<Connection>().unwrap();
    *current.lock() = None;

    drop(dying);
    assert_eq!(kernel.cache().prune(), 1);
    assert_eq!(kernel.cache().count(), 1);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    assert_eq!(kernel.cache().prune(), 0);
}

#[test]
fn test_interval_pruner_runs_in_background() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let kernel = kernel(disposed.clone());
    let session = Arc::new(Session);
    let key = ScopeKey::of(&session);
    kernel.bind::<Connection>(move |b| b.to_self().in_scope(move |_| Some(key.clone())));
    kernel.get::<Connection>().unwrap();

    let pruner = IntervalCachePruner::new(Duration::from_millis(10));
    let cache: Weak<dyn Pruneable> = Arc::downgrade(kernel.cache()) as Weak<dyn Pruneable>;
    pruner.start(cache);
    assert!(pruner.is_running());

    drop(session);
    let deadline = Instant::now() + Duration::from_secs(5);
    while disposed.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(disposed.load(Ordering::SeqCst), 1);

    pruner.stop();
    pruner.stop();
    assert!(!pruner.is_running());
}

#[test]
fn test_activation_cache_prunes_dropped_instances() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let kernel = kernel(disposed);

    let connection = kernel.get::<Connection>().unwrap();
    assert_eq!(kernel.activation_cache().activated_count(), 1);

    drop(connection);
    assert_eq!(kernel.activation_cache().prune(), 1);
    assert_eq!(kernel.activation_cache().activated_count(), 0);
}
