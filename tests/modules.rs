/// Tests for container modules and registration sources

use ferrous_scopes::{
    ContainerBuilder, ContainerBuilderModuleExt, ContainerModule, DiError, DiResult, RegistrationSource, Resolver,
    Service, ServiceType, SourceRegistrations,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ===== Modules =====

struct Settings {
    url: String,
}

struct Pool {
    url: String,
}

struct StorageModule {
    url: &'static str,
}

impl ContainerModule for StorageModule {
    fn load(self, builder: &mut ContainerBuilder) -> DiResult<()> {
        let url = self.url;
        builder.register_instance(Arc::new(Settings { url: url.to_string() }));
        builder
            .register(|ctx, _| {
                let settings = ctx.resolve::<Settings>()?;
                Ok(Arc::new(Pool {
                    url: settings.url.clone(),
                }))
            })
            .single_instance();
        Ok(())
    }
}

#[test]
fn test_struct_module_registers_its_services() {
    let mut builder = ContainerBuilder::new();
    builder
        .register_module(StorageModule { url: "postgres://db" })
        .unwrap();
    let container = builder.build();

    let pool = container.resolve::<Pool>().unwrap();
    assert_eq!(pool.url, "postgres://db");
    assert!(Arc::ptr_eq(&pool, &container.resolve::<Pool>().unwrap()));
}

#[test]
fn test_modules_chain_and_later_modules_override() {
    let mut builder = ContainerBuilder::new();
    builder
        .register_module(StorageModule { url: "first" })
        .unwrap()
        .register_module(|builder: &mut ContainerBuilder| -> DiResult<()> {
            builder.register_instance(Arc::new(Settings { url: "second".into() }));
            Ok(())
        })
        .unwrap();
    let container = builder.build();

    assert_eq!(container.resolve::<Pool>().unwrap().url, "second");
    assert_eq!(container.resolve_all::<Settings>().unwrap().len(), 2);
}

#[test]
fn test_failing_module_reports_its_error() {
    let mut builder = ContainerBuilder::new();
    let result = builder.register_module(|_: &mut ContainerBuilder| -> DiResult<()> {
        Err(DiError::Configuration {
            key: "storage.url".into(),
            message: "missing".into(),
        })
    });

    match result {
        Err(DiError::Configuration { key, .. }) => assert_eq!(key, "storage.url"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected the module to fail"),
    }
}

// ===== Registration sources =====

/// Supplies a default `Vec<u32>`.
struct Defaults {
    consulted: Arc<AtomicUsize>,
    external: bool,
}

impl RegistrationSource for Defaults {
    fn registrations_for(&self, service: &Service, registrations: &mut SourceRegistrations) {
        self.consulted.fetch_add(1, Ordering::SeqCst);
        if service.service_type() == ServiceType::of::<Vec<u32>>() {
            registrations.register(|_, _| Ok(Arc::new(vec![1u32, 2, 3]))).single_instance();
        }
    }

    fn is_external(&self) -> bool {
        self.external
    }
}

fn with_defaults(external: bool) -> (ContainerBuilder, Arc<AtomicUsize>) {
    let consulted = Arc::new(AtomicUsize::new(0));
    let mut builder = ContainerBuilder::new();
    builder.register_source(Defaults {
        consulted: consulted.clone(),
        external,
    });
    (builder, consulted)
}

#[test]
fn test_source_supplies_unregistered_services() {
    let (builder, _) = with_defaults(false);
    let container = builder.build();

    assert_eq!(*container.resolve::<Vec<u32>>().unwrap(), [1, 2, 3]);
    assert!(container.is_registered::<Vec<u32>>());
    assert!(!container.is_registered::<Vec<u64>>());
    assert!(matches!(
        container.resolve::<Vec<u64>>(),
        Err(DiError::ServiceNotRegistered(_))
    ));
}

#[test]
fn test_source_answers_are_cached_per_service() {
    let (builder, consulted) = with_defaults(false);
    let container = builder.build();

    let first = container.resolve::<Vec<u32>>().unwrap();
    let second = container.resolve::<Vec<u32>>().unwrap();
    container.is_registered::<Vec<u32>>();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(consulted.load(Ordering::SeqCst), 1);
}

#[test]
fn test_explicit_registrations_win_over_sources() {
    let (mut builder, consulted) = with_defaults(false);
    builder.register_instance(Arc::new(vec![9u32]));
    let container = builder.build();

    assert_eq!(*container.resolve::<Vec<u32>>().unwrap(), [9]);
    assert_eq!(consulted.load(Ordering::SeqCst), 0);
}

#[test]
fn test_sourced_registrations_are_decorated_unless_external() {
    fn decorated(external: bool) -> Vec<u32> {
        let (mut builder, _) = with_defaults(external);
        builder.register_decorator::<Vec<u32>, _>(|_, inner, _| {
            let mut doubled = (*inner).clone();
            doubled.iter_mut().for_each(|n| *n *= 2);
            Ok(Arc::new(doubled))
        });
        let container = builder.build();
        let resolved = container.resolve::<Vec<u32>>().unwrap();
        (*resolved).clone()
    }

    assert_eq!(decorated(false), [2, 4, 6]);
    assert_eq!(decorated(true), [1, 2, 3]);
}
