use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_scopes::*;
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_single_instance_hit(c: &mut Criterion) {
    let mut builder = ContainerBuilder::new();
    builder.register(|_, _| Ok(Arc::new(42u64))).single_instance();
    let container = builder.build();

    // Prime the shared instance
    let _ = container.resolve::<u64>().unwrap();

    c.bench_function("single_instance_hit_u64", |b| {
        b.iter(|| {
            let v = container.resolve::<u64>().unwrap();
            black_box(v);
        })
    });
}

fn bench_scoped_vs_transient(c: &mut Criterion) {
    struct Payload {
        data: [u8; 64],
    }

    let mut group = c.benchmark_group("scoped_vs_transient");

    let mut scoped = ContainerBuilder::new();
    scoped
        .register(|_, _| Ok(Arc::new(Payload { data: [0; 64] })))
        .instance_per_lifetime_scope();
    let scoped = scoped.build();
    let scope = scoped.begin_lifetime_scope();

    group.bench_function("scoped", |b| {
        b.iter(|| {
            let v = scope.resolve::<Payload>().unwrap();
            black_box(v.data[0]);
        })
    });

    let mut transient = ContainerBuilder::new();
    transient.register(|_, _| Ok(Arc::new(Payload { data: [0; 64] })));
    let transient = transient.build();

    group.bench_function("transient", |b| {
        b.iter(|| {
            let v = transient.resolve::<Payload>().unwrap();
            black_box(v.data[0]);
        })
    });

    group.finish();
}

fn bench_decorator_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("decorators");

    for &count in &[0usize, 1, 4, 8] {
        let mut builder = ContainerBuilder::new();
        builder.register(|_, _| Ok(Arc::new(1u64)));
        for _ in 0..count {
            builder.register_decorator::<u64, _>(|_, inner, _| Ok(Arc::new(*inner + 1)));
        }
        let container = builder.build();

        group.bench_with_input(BenchmarkId::new("transient_decorated", count), &count, |b, _| {
            b.iter(|| {
                let v = container.resolve::<u64>().unwrap();
                black_box(*v);
            })
        });
    }

    group.finish();
}

fn bench_scope_lifecycle(c: &mut Criterion) {
    struct Tracked;
    impl Dispose for Tracked {
        fn dispose(&self) {}
    }

    let mut builder = ContainerBuilder::new();
    builder
        .register(|_, _| Ok(Arc::new(Tracked)))
        .instance_per_lifetime_scope()
        .disposable();
    let container = builder.build();

    let mut group = c.benchmark_group("scope_lifecycle");

    group.bench_function("begin_dispose_empty", |b| {
        b.iter(|| {
            let scope = container.begin_lifetime_scope();
            scope.dispose();
        })
    });

    group.bench_function("begin_resolve_dispose", |b| {
        b.iter(|| {
            let scope = container.begin_lifetime_scope();
            black_box(scope.resolve::<Tracked>().unwrap());
            scope.dispose();
        })
    });

    group.finish();
}

fn bench_dependency_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependency_chain");

    struct Service1;
    struct Service2 { _s1: Arc<Service1> }
    struct Service3 { _s2: Arc<Service2> }
    struct Service4 { _s3: Arc<Service3> }
    struct Service5 { _s4: Arc<Service4> }
    struct Service6 { _s5: Arc<Service5> }
    struct Service7 { _s6: Arc<Service6> }
    struct Service8 { _s7: Arc<Service7> }

    let mut builder = ContainerBuilder::new();
    builder.register(|_, _| Ok(Arc::new(Service1)));
    builder.register(|ctx, _| Ok(Arc::new(Service2 { _s1: ctx.resolve()? })));
    builder.register(|ctx, _| Ok(Arc::new(Service3 { _s2: ctx.resolve()? })));
    builder.register(|ctx, _| Ok(Arc::new(Service4 { _s3: ctx.resolve()? })));
    builder.register(|ctx, _| Ok(Arc::new(Service5 { _s4: ctx.resolve()? })));
    builder.register(|ctx, _| Ok(Arc::new(Service6 { _s5: ctx.resolve()? })));
    builder.register(|ctx, _| Ok(Arc::new(Service7 { _s6: ctx.resolve()? })));
    builder.register(|ctx, _| Ok(Arc::new(Service8 { _s7: ctx.resolve()? })));
    let transient = builder.build();

    group.bench_function("transient_depth_8", |b| {
        b.iter(|| {
            let service = transient.resolve::<Service8>().unwrap();
            black_box(&service);
        })
    });

    let unchecked = {
        let mut builder = ContainerBuilder::new();
        builder.with_options(
            ContainerOptions::default().with_circular_dependency_check(CircularDependencyCheck::Disabled),
        );
        builder.register(|_, _| Ok(Arc::new(Service1)));
        builder.register(|ctx, _| Ok(Arc::new(Service2 { _s1: ctx.resolve()? })));
        builder.build()
    };

    group.bench_function("unchecked_depth_2", |b| {
        b.iter(|| {
            let service = unchecked.resolve::<Service2>().unwrap();
            black_box(&service);
        })
    });

    group.finish();
}

fn bench_resolve_all_scaling(c: &mut Criterion) {
    trait Plugin: Send + Sync {
        fn id(&self) -> usize;
    }
    struct Numbered(usize);
    impl Plugin for Numbered {
        fn id(&self) -> usize {
            self.0
        }
    }

    let mut group = c.benchmark_group("resolve_all");

    for &count in &[1usize, 8, 32] {
        let mut builder = ContainerBuilder::new();
        for index in 0..count {
            builder
                .register(move |_, _| Ok(Arc::new(Numbered(index)) as Arc<dyn Plugin>))
                .single_instance();
        }
        let container = builder.build();

        group.bench_with_input(BenchmarkId::new("resolve_all", count), &count, |b, _| {
            b.iter(|| {
                let all = container.resolve_all::<dyn Plugin>().unwrap();
                black_box(all.iter().map(|p| p.id()).sum::<usize>());
            })
        });
    }

    group.finish();
}

criterion_group!(
    micro_benches,
    bench_single_instance_hit,
    bench_scoped_vs_transient,
    bench_decorator_chain,
    bench_scope_lifecycle,
    bench_dependency_chain,
    bench_resolve_all_scaling
);

criterion_main!(micro_benches);
