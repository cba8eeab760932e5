//! Teardown hooks run by lifetime scopes.

/// Synchronous teardown of a tracked instance.
///
/// Declare it on the registration with
/// [`disposable`](crate::RegistrationBuilder::disposable). The owning lifetime scope
/// calls `dispose` exactly once, in reverse creation order, when it is disposed.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{ContainerBuilder, Dispose, Resolver};
/// use std::sync::Arc;
///
/// struct Cache {
///     region: &'static str,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         println!("flushing {}", self.region);
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register(|_, _| Ok(Arc::new(Cache { region: "users" })))
///     .instance_per_lifetime_scope()
///     .disposable();
///
/// let container = builder.build();
/// let scope = container.begin_lifetime_scope();
/// let _cache = scope.resolve::<Cache>().unwrap();
/// scope.dispose(); // flushing users
/// ```
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self);
}

/// Asynchronous teardown of a tracked instance, declared with
/// [`async_disposable`](crate::RegistrationBuilder::async_disposable). Async disposers
/// only run from [`LifetimeScope::dispose_async`](crate::LifetimeScope::dispose_async).
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{AsyncDispose, ContainerBuilder};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Connection {
///     peer: &'static str,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for Connection {
///     async fn dispose(&self) {
///         println!("closing {}", self.peer);
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register(|_, _| Ok(Arc::new(Connection { peer: "db:5432" })))
///     .single_instance()
///     .async_disposable();
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    async fn dispose(&self);
}
