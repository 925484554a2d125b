use ferrous_kernel::{ActivationError, Kernel, KernelSettings, Resolver, ServiceType, TypeInfo};
use std::marker::PhantomData;
use std::sync::Arc;

// ===== Test Services =====

struct SqlRepository<T> {
    _entity: PhantomData<fn() -> T>,
}

impl<T> SqlRepository<T> {
    fn new() -> Self {
        Self { _entity: PhantomData }
    }
}

struct User;
struct Order;

fn repository_of(argument: ServiceType) -> ServiceType {
    ServiceType::named("IRepository").with_arguments([argument])
}

fn sql_repository_of(argument: ServiceType) -> ServiceType {
    ServiceType::named("SqlRepository").with_arguments([argument])
}

fn register_repository<T: 'static>(kernel: &Kernel) {
    let argument = ServiceType::of::<T>();
    kernel.catalog().register(
        TypeInfo::of::<SqlRepository<T>>()
            .constructor([], |_| Ok(SqlRepository::<T>::new()))
            .as_type(sql_repository_of(argument.clone()))
            .provides_as(repository_of(argument)),
    );
}

fn kernel() -> Kernel {
    let kernel = Kernel::with_settings(KernelSettings::default().with_cache_pruning_interval(None));
    register_repository::<User>(&kernel);
    register_repository::<Order>(&kernel);
    kernel
}

// ===== Open generic bindings =====

#[test]
fn test_open_binding_serves_every_instantiation() {
    let kernel = kernel();
    kernel.bind_service(repository_of(ServiceType::parameter(0)), |b| {
        b.to(sql_repository_of(ServiceType::parameter(0)))
    });

    let users = kernel.get_as::<SqlRepository<User>>(repository_of(ServiceType::of::<User>()));
    let orders = kernel.get_as::<SqlRepository<Order>>(repository_of(ServiceType::of::<Order>()));
    assert!(users.is_ok());
    assert!(orders.is_ok());
}

#[test]
fn test_open_singleton_is_cached_per_instantiation() {
    let kernel = kernel();
    kernel.bind_service(repository_of(ServiceType::parameter(0)), |b| {
        b.to(sql_repository_of(ServiceType::parameter(0))).in_singleton_scope()
    });

    let users = repository_of(ServiceType::of::<User>());
    let orders = repository_of(ServiceType::of::<Order>());
    let first = kernel.get_as::<SqlRepository<User>>(users.clone()).unwrap();
    let second = kernel.get_as::<SqlRepository<User>>(users).unwrap();
    let other = kernel.get_as::<SqlRepository<Order>>(orders).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(kernel.cache().count(), 2);
    drop(other);
}

#[test]
fn test_closed_and_open_bindings_are_both_candidates() {
    let kernel = kernel();
    kernel.bind_service(repository_of(ServiceType::parameter(0)), |b| {
        b.to(sql_repository_of(ServiceType::parameter(0)))
    });
    let special = Arc::new(SqlRepository::<User>::new());
    kernel.bind_service(repository_of(ServiceType::of::<User>()), |b| b.to_constant_arc(special.clone()));

    // Both are explicit and unconditional, so a unique request sees two candidates.
    assert!(matches!(
        kernel.get_as::<SqlRepository<User>>(repository_of(ServiceType::of::<User>())),
        Err(ActivationError::AmbiguousBinding { .. })
    ));
}

#[test]
fn test_unregistered_instantiation_has_no_constructor() {
    struct Invoice;

    let kernel = kernel();
    kernel.bind_service(repository_of(ServiceType::parameter(0)), |b| {
        b.to(sql_repository_of(ServiceType::parameter(0)))
    });

    assert!(matches!(
        kernel.get_as::<SqlRepository<Invoice>>(repository_of(ServiceType::of::<Invoice>())),
        Err(ActivationError::NoConstructor { .. })
    ));
}
