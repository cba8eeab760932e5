use ferrous_scopes::{
    CircularDependencyCheck, ContainerBuilder, ContainerOptions, DiError, Resolver,
};
use std::sync::Arc;

#[allow(dead_code)]
struct A {
    b: Arc<B>,
}

#[allow(dead_code)]
struct B {
    a: Arc<A>,
}

#[allow(dead_code)]
struct C {
    a: Arc<A>,
}

fn cyclic_builder() -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();
    builder.register(|ctx, _| Ok(Arc::new(A { b: ctx.resolve()? })));
    builder.register(|ctx, _| Ok(Arc::new(B { a: ctx.resolve()? })));
    builder.register(|ctx, _| Ok(Arc::new(C { a: ctx.resolve()? })));
    builder
}

#[test]
fn test_two_level_cycle_reports_graph_in_chain_order() {
    let container = cyclic_builder().build();

    match container.resolve::<A>() {
        Err(DiError::CircularDependency { graph }) => {
            assert_eq!(graph, "A -> B");
            assert_eq!(graph.matches('A').count(), 1);
            assert_eq!(graph.matches('B').count(), 1);
        }
        Err(other) => panic!("expected a circular dependency, got: {other}"),
        Ok(_) => panic!("expected a circular dependency"),
    }
}

#[test]
fn test_cycle_graph_starts_at_the_reentered_component() {
    let container = cyclic_builder().build();

    match container.resolve::<C>() {
        Err(DiError::CircularDependency { graph }) => assert_eq!(graph, "A -> B"),
        Err(other) => panic!("expected a circular dependency, got: {other}"),
        Ok(_) => panic!("expected a circular dependency"),
    }
}

#[test]
fn test_self_reference_is_detected() {
    struct SelfReferencing;

    let mut builder = ContainerBuilder::new();
    builder
        .register(|ctx, _| {
            ctx.resolve::<SelfReferencing>()?;
            Ok(Arc::new(SelfReferencing))
        })
        .named("SelfReferencing");
    let container = builder.build();

    match container.resolve::<SelfReferencing>() {
        Err(DiError::CircularDependency { graph }) => assert_eq!(graph, "SelfReferencing"),
        Err(other) => panic!("expected a circular dependency, got: {other}"),
        Ok(_) => panic!("expected a circular dependency"),
    }
}

#[test]
fn test_cycle_through_container_handle_is_detected() {
    // Resolving from a captured scope instead of the activation context still
    // joins the running operation.
    struct Loop;

    let mut builder = ContainerBuilder::new();
    builder.register(|ctx, _| {
        let root = ctx.scope().root_scope();
        root.resolve::<Loop>()?;
        Ok(Arc::new(Loop))
    });
    let container = builder.build();

    assert!(matches!(
        container.resolve::<Loop>(),
        Err(DiError::CircularDependency { .. })
    ));
}

#[test]
fn test_cycle_through_shared_instances_is_detected() {
    let mut builder = ContainerBuilder::new();
    builder.register(|ctx, _| Ok(Arc::new(A { b: ctx.resolve()? }))).single_instance();
    builder.register(|ctx, _| Ok(Arc::new(B { a: ctx.resolve()? }))).single_instance();
    let container = builder.build();

    assert!(matches!(container.resolve::<A>(), Err(DiError::CircularDependency { .. })));
    // The failed creation leaves nothing cached; the next attempt fails the same way.
    assert!(matches!(container.resolve::<B>(), Err(DiError::CircularDependency { .. })));
}

#[test]
fn test_depth_guard_stops_unbounded_chains() {
    // Each level resolves a deeper keyed registration, so no registration
    // repeats and only the depth limit can stop it.
    let mut builder = ContainerBuilder::new();
    for level in 0..20usize {
        builder
            .register(move |ctx, _| {
                let next: Arc<usize> = ctx.resolve_keyed(&(level + 1).to_string())?;
                Ok(Arc::new(*next + 1))
            })
            .keyed(level.to_string());
    }
    builder.with_options(ContainerOptions::default().with_max_resolve_depth(5));
    let container = builder.build();

    match container.resolve_keyed::<usize>("0") {
        Err(DiError::MaxDepthExceeded(depth)) => assert_eq!(depth, 5),
        Err(other) => panic!("expected max depth, got: {other}"),
        Ok(_) => panic!("expected max depth"),
    }
}

#[test]
fn test_depth_limit_allows_chains_within_bounds() {
    let mut builder = ContainerBuilder::new();
    for level in 0..3usize {
        builder
            .register(move |ctx, _| {
                let next: Arc<usize> = ctx.resolve_keyed(&(level + 1).to_string())?;
                Ok(Arc::new(*next + 1))
            })
            .keyed(level.to_string());
    }
    builder.register_instance(Arc::new(0usize)).keyed("3");
    builder.with_options(ContainerOptions::default().with_max_resolve_depth(4));
    let container = builder.build();

    assert_eq!(*container.resolve_keyed::<usize>("0").unwrap(), 3);
}

#[test]
fn test_disabled_check_still_resolves_acyclic_graphs() {
    struct Leaf;
    struct Branch {
        leaf: Arc<Leaf>,
    }

    let mut builder = ContainerBuilder::new();
    builder.with_options(
        ContainerOptions::default().with_circular_dependency_check(CircularDependencyCheck::Disabled),
    );
    builder.register(|_, _| Ok(Arc::new(Leaf)));
    builder.register(|ctx, _| Ok(Arc::new(Branch { leaf: ctx.resolve()? })));
    let container = builder.build();

    let branch = container.resolve::<Branch>().unwrap();
    let _ = &branch.leaf;

    let registration = container
        .registry()
        .registration_for(&ferrous_scopes::Service::typed::<Branch>())
        .unwrap();
    let phases: Vec<_> = registration
        .pipeline(container.options())
        .describe()
        .into_iter()
        .map(|(phase, _)| phase)
        .collect();
    assert!(!phases.contains(&ferrous_scopes::PipelinePhase::RequestStart));
}

#[test]
fn test_operation_recovers_after_cycle() {
    struct Ok1;

    let mut builder = cyclic_builder();
    builder.register(|_, _| Ok(Arc::new(Ok1)));
    let container = builder.build();

    assert!(container.resolve::<A>().is_err());
    // The request stack of the failed operation does not leak into the next one.
    assert!(container.resolve::<Ok1>().is_ok());
}
