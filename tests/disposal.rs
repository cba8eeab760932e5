use async_trait::async_trait;
use ferrous_scopes::{AsyncDispose, ContainerBuilder, DiError, Dispose, Resolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

struct Tracked {
    name: String,
    log: Log,
}

impl Dispose for Tracked {
    fn dispose(&self) {
        self.log.lock().unwrap().push(self.name.clone());
    }
}

struct AsyncTracked {
    name: String,
    log: Log,
}

#[async_trait]
impl AsyncDispose for AsyncTracked {
    async fn dispose(&self) {
        tokio::task::yield_now().await;
        self.log.lock().unwrap().push(format!("async:{}", self.name));
    }
}

struct Both {
    log: Log,
}

impl Dispose for Both {
    fn dispose(&self) {
        self.log.lock().unwrap().push("both:sync".into());
    }
}

#[async_trait]
impl AsyncDispose for Both {
    async fn dispose(&self) {
        self.log.lock().unwrap().push("both:async".into());
    }
}

fn register_tracked(builder: &mut ContainerBuilder, key: &str, log: &Log) {
    let (name, log) = (key.to_string(), log.clone());
    builder
        .register(move |_, _| {
            Ok(Arc::new(Tracked {
                name: name.clone(),
                log: log.clone(),
            }))
        })
        .keyed(key.to_string())
        .instance_per_lifetime_scope()
        .disposable();
}

#[test]
fn test_disposal_runs_in_reverse_creation_order() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    for key in ["first", "second", "third"] {
        register_tracked(&mut builder, key, &log);
    }
    let container = builder.build();

    let scope = container.begin_lifetime_scope();
    // Creation order differs from registration order.
    scope.resolve_keyed::<Tracked>("second").unwrap();
    scope.resolve_keyed::<Tracked>("third").unwrap();
    scope.resolve_keyed::<Tracked>("first").unwrap();

    scope.dispose();
    assert_eq!(*log.lock().unwrap(), ["first", "third", "second"]);
}

#[test]
fn test_dependencies_are_disposed_after_their_dependents() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    register_tracked(&mut builder, "dependency", &log);
    let dependent_log = log.clone();
    builder
        .register(move |ctx, _| {
            ctx.resolve_keyed::<Tracked>("dependency")?;
            Ok(Arc::new(Tracked {
                name: "dependent".into(),
                log: dependent_log.clone(),
            }))
        })
        .instance_per_lifetime_scope()
        .disposable();
    let container = builder.build();

    let scope = container.begin_lifetime_scope();
    scope.resolve::<Tracked>().unwrap();
    scope.dispose();

    assert_eq!(*log.lock().unwrap(), ["dependent", "dependency"]);
}

#[test]
fn test_children_are_disposed_before_parent() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    register_tracked(&mut builder, "item", &log);
    let container = builder.build();

    let parent = container.begin_lifetime_scope();
    parent.resolve_keyed::<Tracked>("item").unwrap();
    let child = parent.begin_lifetime_scope();
    child.resolve_keyed::<Tracked>("item").unwrap();

    log.lock().unwrap().clear();
    parent.dispose();
    assert_eq!(log.lock().unwrap().len(), 2);
    assert!(child.is_disposed());
}

#[test]
fn test_children_dispose_most_recent_first() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    let scope_log = log.clone();
    builder
        .register(move |ctx, _| {
            Ok(Arc::new(Tracked {
                name: ctx.scope().tag().map(|t| t.to_string()).unwrap_or_default(),
                log: scope_log.clone(),
            }))
        })
        .instance_per_lifetime_scope()
        .disposable();
    let container = builder.build();

    let scopes: Vec<_> = ["one", "two", "three"]
        .into_iter()
        .map(|tag| container.begin_tagged_lifetime_scope(tag))
        .collect();
    for scope in &scopes {
        scope.resolve::<Tracked>().unwrap();
    }
    container.dispose();
    assert_eq!(*log.lock().unwrap(), ["three", "two", "one"]);
}

#[test]
fn test_dispose_is_idempotent() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    register_tracked(&mut builder, "once", &log);
    let container = builder.build();

    let scope = container.begin_lifetime_scope();
    scope.resolve_keyed::<Tracked>("once").unwrap();
    scope.dispose();
    scope.dispose();
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_externally_owned_instances_are_not_disposed() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    let owned_log = log.clone();
    builder
        .register(move |_, _| {
            Ok(Arc::new(Tracked {
                name: "external".into(),
                log: owned_log.clone(),
            }))
        })
        .disposable()
        .externally_owned();
    let container = builder.build();

    let scope = container.begin_lifetime_scope();
    scope.resolve::<Tracked>().unwrap();
    scope.dispose();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_transient_disposables_are_tracked_by_requesting_scope() {
    let log: Log = Arc::default();
    let counter = Arc::new(AtomicUsize::new(0));
    let mut builder = ContainerBuilder::new();
    let (transient_log, c) = (log.clone(), counter.clone());
    builder
        .register(move |_, _| {
            Ok(Arc::new(Tracked {
                name: format!("t{}", c.fetch_add(1, Ordering::SeqCst)),
                log: transient_log.clone(),
            }))
        })
        .disposable();
    let container = builder.build();

    let scope = container.begin_lifetime_scope();
    scope.resolve::<Tracked>().unwrap();
    scope.resolve::<Tracked>().unwrap();
    scope.dispose();
    assert_eq!(*log.lock().unwrap(), ["t1", "t0"]);
}

#[test]
fn test_provided_instance_is_disposed_once_with_root() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    builder
        .register_instance(Arc::new(Tracked {
            name: "provided".into(),
            log: log.clone(),
        }))
        .disposable();
    let container = builder.build();

    container.resolve::<Tracked>().unwrap();
    container.begin_lifetime_scope().resolve::<Tracked>().unwrap();
    container.dispose();
    assert_eq!(*log.lock().unwrap(), ["provided"]);
}

#[test]
fn test_sync_dispose_skips_async_only_disposers() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    let async_log = log.clone();
    builder
        .register(move |_, _| {
            Ok(Arc::new(AsyncTracked {
                name: "a".into(),
                log: async_log.clone(),
            }))
        })
        .instance_per_lifetime_scope()
        .async_disposable();
    let container = builder.build();

    let scope = container.begin_lifetime_scope();
    scope.resolve::<AsyncTracked>().unwrap();
    scope.dispose();
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dispose_async_runs_sync_and_async_in_one_reverse_order() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    register_tracked(&mut builder, "sync", &log);
    let async_log = log.clone();
    builder
        .register(move |_, _| {
            Ok(Arc::new(AsyncTracked {
                name: "a".into(),
                log: async_log.clone(),
            }))
        })
        .instance_per_lifetime_scope()
        .async_disposable();
    let container = builder.build();

    let scope = container.begin_lifetime_scope();
    scope.resolve_keyed::<Tracked>("sync").unwrap();
    scope.resolve::<AsyncTracked>().unwrap();

    scope.dispose_async().await;
    assert_eq!(*log.lock().unwrap(), ["async:a", "sync"]);
}

#[tokio::test]
async fn test_dispose_async_prefers_async_disposal() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    let both_log = log.clone();
    builder
        .register(move |_, _| Ok(Arc::new(Both { log: both_log.clone() })))
        .instance_per_lifetime_scope()
        .disposable()
        .async_disposable();
    let container = builder.build();

    let sync_scope = container.begin_lifetime_scope();
    sync_scope.resolve::<Both>().unwrap();
    sync_scope.dispose();

    let async_scope = container.begin_lifetime_scope();
    async_scope.resolve::<Both>().unwrap();
    async_scope.dispose_async().await;

    assert_eq!(*log.lock().unwrap(), ["both:sync", "both:async"]);
}

#[tokio::test]
async fn test_container_dispose_async_disposes_children() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    register_tracked(&mut builder, "item", &log);
    let container = builder.build();

    let child = container.begin_lifetime_scope();
    child.resolve_keyed::<Tracked>("item").unwrap();

    container.dispose_async().await;
    assert!(child.is_disposed());
    assert_eq!(*log.lock().unwrap(), ["item"]);
}

#[test]
fn test_instance_activated_while_its_scope_disposes_is_disposed_at_once() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    let late_log = log.clone();
    builder
        .register(move |ctx, _| {
            ctx.scope().dispose();
            Ok(Arc::new(Tracked {
                name: "late".into(),
                log: late_log.clone(),
            }))
        })
        .disposable();
    let container = builder.build();

    let scope = container.begin_lifetime_scope();
    assert!(matches!(
        scope.resolve::<Tracked>(),
        Err(DiError::DisposedScopeAccessed { .. })
    ));
    assert_eq!(*log.lock().unwrap(), ["late"]);
}

#[test]
fn test_owned_disposes_dependencies() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();
    register_tracked(&mut builder, "dependency", &log);
    builder
        .register(|ctx, _| {
            ctx.resolve_keyed::<Tracked>("dependency")?;
            Ok(Arc::new(String::from("root")))
        })
        .instance_per_lifetime_scope();
    let container = builder.build();

    let owned = container.resolve_owned::<String>().unwrap();
    assert_eq!(owned.as_str(), "root");
    owned.dispose();
    assert_eq!(*log.lock().unwrap(), ["dependency"]);
}
