use ferrous_scopes::{ContainerBuilder, DiError, ErrorKind, Resolver};
use std::error::Error as _;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
struct Database;
#[derive(Debug)]
struct Repository;
#[derive(Debug)]
struct Service;

#[derive(Debug)]
struct ConnectionRefused;

impl fmt::Display for ConnectionRefused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection refused")
    }
}

impl std::error::Error for ConnectionRefused {}

fn layered_builder() -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();
    builder.register::<Database, _>(|_, _| Err(DiError::factory(ConnectionRefused)));
    builder.register(|ctx, _| {
        ctx.resolve::<Database>()?;
        Ok(Arc::new(Repository))
    });
    builder.register(|ctx, _| {
        ctx.resolve::<Repository>()?;
        Ok(Arc::new(Service))
    });
    builder
}

#[test]
fn test_activation_chain_lists_outer_to_inner() {
    let container = layered_builder().build();

    match container.resolve::<Service>() {
        Err(DiError::ActivationFailed { chain, source }) => {
            assert_eq!(chain, ["Service", "Repository", "Database"]);
            assert_eq!(source.kind(), ErrorKind::Factory);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a failure"),
    }
}

#[test]
fn test_activation_error_message_and_source() {
    let container = layered_builder().build();
    let err = container.resolve::<Repository>().unwrap_err();

    assert_eq!(
        err.to_string(),
        "an error occurred while activating Repository -> Database: connection refused"
    );
    let source = err.source().unwrap();
    assert_eq!(source.to_string(), "connection refused");
}

#[test]
fn test_root_cause_reaches_the_user_error() {
    let container = layered_builder().build();
    let err = container.resolve::<Service>().unwrap_err();

    match err.root_cause() {
        DiError::Factory(inner) => {
            assert!(inner.inner().downcast_ref::<ConnectionRefused>().is_some());
        }
        other => panic!("unexpected root cause: {other}"),
    }
}

#[test]
fn test_missing_dependency_inside_activator_is_wrapped() {
    let mut builder = ContainerBuilder::new();
    builder.register(|ctx, _| {
        ctx.resolve::<Database>()?;
        Ok(Arc::new(Repository))
    });
    let container = builder.build();

    let err = container.resolve::<Repository>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ActivationFailed);
    assert!(matches!(err.root_cause(), DiError::ServiceNotRegistered(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn test_missing_top_level_service_is_recoverable() {
    let container = ContainerBuilder::new().build();
    let err = container.resolve::<Database>().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ServiceNotRegistered);
    assert!(err.is_recoverable());
    assert!(err.to_string().contains("Database"));
}

#[test]
fn test_activating_handler_failure_is_wrapped() {
    let mut builder = ContainerBuilder::new();
    builder
        .register(|_, _| Ok(Arc::new(Database)))
        .named("Db")
        .on_activating(|_, _| Err(DiError::factory_message("validation failed")));
    let container = builder.build();

    match container.resolve::<Database>() {
        Err(DiError::ActivationFailed { chain, source }) => {
            assert_eq!(chain, ["Db"]);
            assert_eq!(source.to_string(), "validation failed");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a failure"),
    }
}

#[test]
fn test_scope_errors_are_not_wrapped() {
    let mut builder = ContainerBuilder::new();
    builder.register(|ctx, _| {
        ctx.scope().dispose();
        ctx.resolve::<Database>()?;
        Ok(Arc::new(Repository))
    });
    builder.register(|_, _| Ok(Arc::new(Database)));
    let container = builder.build();

    let scope = container.begin_lifetime_scope();
    assert_eq!(
        scope.resolve::<Repository>().unwrap_err().kind(),
        ErrorKind::DisposedScopeAccessed
    );
}

#[test]
fn test_error_kinds_are_stable() {
    let cases = [
        (DiError::ServiceNotRegistered("x".into()), ErrorKind::ServiceNotRegistered),
        (DiError::CircularDependency { graph: "A -> B".into() }, ErrorKind::CircularDependency),
        (DiError::MaxDepthExceeded(3), ErrorKind::MaxDepthExceeded),
        (
            DiError::LifetimeScopeNotFound {
                tags: "request".into(),
                service: "x".into(),
            },
            ErrorKind::LifetimeScopeNotFound,
        ),
        (DiError::DisposedScopeAccessed { scope: "root".into() }, ErrorKind::DisposedScopeAccessed),
        (DiError::TypeMismatch("u8"), ErrorKind::TypeMismatch),
        (DiError::InvariantViolated("broken"), ErrorKind::InvariantViolated),
    ];
    for (error, kind) in cases {
        assert_eq!(error.kind(), kind);
        assert!(!error.to_string().is_empty());
    }
}
