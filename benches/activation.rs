use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use ferrous_kernel::*;
use std::sync::Arc;

// ===== Services =====

struct Leaf;

struct Branch {
    _left: Arc<Leaf>,
    _right: Arc<Leaf>,
}

struct Root {
    _branches: [Arc<Branch>; 2],
}

fn kernel() -> Kernel {
    let kernel = Kernel::with_settings(KernelSettings::default().with_cache_pruning_interval(None));
    kernel
        .catalog()
        .register(TypeInfo::of::<Leaf>().constructor([], |_| Ok(Leaf)))
        .register(TypeInfo::of::<Branch>().constructor(
            [Target::of::<Leaf>("left"), Target::of::<Leaf>("right")],
            |args| {
                Ok(Branch {
                    _left: args.get(0)?,
                    _right: args.get(1)?,
                })
            },
        ))
        .register(TypeInfo::of::<Root>().constructor(
            [Target::of::<Branch>("first"), Target::of::<Branch>("second")],
            |args| {
                Ok(Root {
                    _branches: [args.get(0)?, args.get(1)?],
                })
            },
        ));
    kernel
}

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let kernel = kernel();
    kernel.bind::<Leaf>(|b| b.to_self().in_singleton_scope());
    let _ = kernel.get::<Leaf>().unwrap();

    c.bench_function("singleton_hit", |b| {
        b.iter(|| black_box(kernel.get::<Leaf>().unwrap()))
    });
}

fn bench_constant(c: &mut Criterion) {
    let kernel = kernel();
    kernel.bind::<u64>(|b| b.to_constant(42u64));

    c.bench_function("constant_binding", |b| {
        b.iter(|| black_box(kernel.get::<u64>().unwrap()))
    });
}

fn bench_plan_cache(c: &mut Criterion) {
    let kernel = kernel();
    let service = ServiceType::of::<Root>();
    let _ = kernel.planner().get_plan(&service);

    c.bench_function("plan_cache_hit", |b| {
        b.iter(|| black_box(kernel.planner().get_plan(&service)))
    });
}

// ===== Graph Benchmarks =====

fn bench_transient_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("transient_graph");

    let transient = kernel();
    group.bench_function(BenchmarkId::new("root", "transient"), |b| {
        b.iter(|| black_box(transient.get::<Root>().unwrap()))
    });

    let shared = kernel();
    shared.bind::<Leaf>(|b| b.to_self().in_singleton_scope());
    group.bench_function(BenchmarkId::new("root", "singleton_leaves"), |b| {
        b.iter(|| black_box(shared.get::<Root>().unwrap()))
    });

    group.finish();
}

fn bench_block(c: &mut Criterion) {
    let kernel = kernel();

    c.bench_function("activation_block", |b| {
        b.iter_batched(
            || kernel.begin_block(),
            |block| {
                black_box(block.get::<Root>().unwrap());
                block.dispose();
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_cold_kernel(c: &mut Criterion) {
    c.bench_function("cold_kernel_root", |b| {
        b.iter_batched(kernel, |kernel| black_box(kernel.get::<Root>().unwrap()), BatchSize::SmallInput)
    });
}

criterion_group!(micro_benches, bench_singleton_hit, bench_constant, bench_plan_cache);
criterion_group!(graph_benches, bench_transient_graph, bench_block, bench_cold_kernel);
criterion_main!(micro_benches, graph_benches);
