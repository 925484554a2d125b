use ferrous_kernel::{ActivationError, Kernel, KernelSettings, Resolver, Target, TypeInfo};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

// ===== Test Services =====

trait Weapon: Send + Sync {}

struct Samurai {
    _weapon: Arc<dyn Weapon>,
}

struct Katana {
    _wielder: Arc<Samurai>,
}
impl Weapon for Katana {}

fn kernel() -> Kernel {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Kernel::with_settings(KernelSettings::default().with_cache_pruning_interval(None))
}

fn assert_cyclical(result: Result<impl Sized, ActivationError>) -> String {
    match result {
        Err(ActivationError::CyclicalDependency { path }) => path,
        Err(other) => panic!("expected a cyclical dependency, got {}", other),
        Ok(_) => panic!("expected a cyclical dependency, got an instance"),
    }
}

// ===== Constructor cycles =====

#[test]
fn test_constructor_cycle_renders_activation_path() {
    let kernel = kernel();
    kernel
        .catalog()
        .register(
            TypeInfo::of::<Samurai>().constructor([Target::of::<dyn Weapon>("weapon")], |args| {
                Ok(Samurai {
                    _weapon: args.get_trait::<dyn Weapon>(0)?,
                })
            }),
        )
        .register(
            TypeInfo::of::<Katana>()
                .constructor([Target::of::<Samurai>("wielder")], |args| {
                    Ok(Katana {
                        _wielder: args.get(0)?,
                    })
                })
                .provides::<dyn Weapon, _>(|k| k as Arc<dyn Weapon>),
        );
    kernel.bind::<dyn Weapon>(|b| b.to_type::<Katana>());

    let path = assert_cyclical(kernel.get::<Samurai>());
    let lines: Vec<&str> = path.lines().collect();
    assert_eq!(lines.len(), 3, "unexpected path:\n{}", path);
    assert!(lines[0].starts_with("  1) Request for") && lines[0].contains("Samurai"));
    assert!(lines[1].starts_with("  2) Injection of dependency"));
    assert!(lines[1].contains("Weapon") && lines[1].contains("parameter weapon of constructor of type"));
    assert!(lines[2].starts_with("  3) Injection of dependency"));
    assert!(lines[2].contains("parameter wielder of constructor of type") && lines[2].contains("Katana"));
}

#[test]
fn test_self_cycle() {
    struct Recursive {
        _inner: Arc<Recursive>,
    }

    let kernel = kernel();
    kernel.catalog().register(
        TypeInfo::of::<Recursive>().constructor([Target::of::<Recursive>("inner")], |args| {
            Ok(Recursive { _inner: args.get(0)? })
        }),
    );

    let path = assert_cyclical(kernel.get::<Recursive>());
    assert_eq!(path.lines().count(), 2);
}

#[test]
fn test_cycle_on_singletons_does_not_deadlock() {
    struct A {
        _b: Arc<B>,
    }
    struct B {
        _a: Arc<A>,
    }

    let kernel = kernel();
    kernel
        .catalog()
        .register(TypeInfo::of::<A>().constructor([Target::of::<B>("b")], |args| Ok(A { _b: args.get(0)? })))
        .register(TypeInfo::of::<B>().constructor([Target::of::<A>("a")], |args| Ok(B { _a: args.get(0)? })));
    kernel.bind::<A>(|b| b.to_self().in_singleton_scope());
    kernel.bind::<B>(|b| b.to_self().in_singleton_scope());

    assert_cyclical(kernel.get::<A>());
    assert_eq!(kernel.cache().count(), 0);
}

#[test]
fn test_diamond_is_not_a_cycle() {
    struct Leaf;
    struct Left {
        _leaf: Arc<Leaf>,
    }
    struct Right {
        _leaf: Arc<Leaf>,
    }
    struct Root {
        _left: Arc<Left>,
        _right: Arc<Right>,
    }

    let kernel = kernel();
    kernel
        .catalog()
        .register(TypeInfo::of::<Leaf>().constructor([], |_| Ok(Leaf)))
        .register(TypeInfo::of::<Left>().constructor([Target::of::<Leaf>("leaf")], |args| {
            Ok(Left { _leaf: args.get(0)? })
        }))
        .register(TypeInfo::of::<Right>().constructor([Target::of::<Leaf>("leaf")], |args| {
            Ok(Right { _leaf: args.get(0)? })
        }))
        .register(TypeInfo::of::<Root>().constructor(
            [Target::of::<Left>("left"), Target::of::<Right>("right")],
            |args| {
                Ok(Root {
                    _left: args.get(0)?,
                    _right: args.get(1)?,
                })
            },
        ));

    assert!(kernel.get::<Root>().is_ok());
}

// ===== Property cycles =====

#[derive(Default)]
struct Parent {
    child: Mutex<Option<Arc<Child>>>,
}

#[derive(Default)]
struct Child {
    parent: Mutex<Option<Weak<Parent>>>,
}

fn register_property_cycle(kernel: &Kernel) {
    kernel
        .catalog()
        .register(
            TypeInfo::of::<Parent>()
                .constructor([], |_| Ok(Parent::default()))
                .property(Target::of::<Child>("child"), |parent: &Parent, args| {
                    *parent.child.lock() = Some(args.get(0)?);
                    Ok(())
                }),
        )
        .register(
            TypeInfo::of::<Child>()
                .constructor([], |_| Ok(Child::default()))
                .property(Target::of::<Parent>("parent"), |child: &Child, args| {
                    *child.parent.lock() = Some(Arc::downgrade(&args.get::<Parent>(0)?));
                    Ok(())
                }),
        );
}

#[test]
fn test_property_cycle_between_singletons_resolves() {
    let kernel = kernel();
    register_property_cycle(&kernel);
    kernel.bind::<Parent>(|b| b.to_self().in_singleton_scope());
    kernel.bind::<Child>(|b| b.to_self().in_singleton_scope());

    let parent = kernel.get::<Parent>().unwrap();
    let child = parent.child.lock().clone().unwrap();
    let back = child.parent.lock().as_ref().and_then(Weak::upgrade).unwrap();
    assert!(Arc::ptr_eq(&parent, &back));
}

#[test]
fn test_transient_property_cycle_hits_depth_limit() {
    let kernel = Kernel::with_settings(
        KernelSettings::default()
            .with_cache_pruning_interval(None)
            .with_max_resolution_depth(16),
    );
    register_property_cycle(&kernel);

    match kernel.get::<Parent>() {
        Err(ActivationError::DepthExceeded { depth, path }) => {
            assert_eq!(depth, 16);
            assert_eq!(path.lines().count(), 18);
            assert!(path.contains("property child of type"));
        }
        other => panic!("expected the depth limit, got {:?}", other.err()),
    }
}
