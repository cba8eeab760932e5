//! Values resolved in a child scope the caller owns.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::LifetimeScope;

/// A value together with the lifetime scope it was resolved in.
///
/// Created by [`LifetimeScope::resolve_owned`]. The scope, and every
/// disposable dependency activated in it, is disposed when the `Owned` is
/// disposed or dropped.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{ContainerBuilder, Dispose};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Connection(Arc<AtomicBool>);
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         self.0.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let closed = Arc::new(AtomicBool::new(false));
/// let flag = closed.clone();
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register(move |_, _| Ok(Arc::new(Connection(flag.clone()))))
///     .instance_per_lifetime_scope()
///     .disposable();
/// let container = builder.build();
///
/// let connection = container.resolve_owned::<Connection>().unwrap();
/// assert!(!closed.load(Ordering::SeqCst));
/// drop(connection);
/// assert!(closed.load(Ordering::SeqCst));
/// ```
pub struct Owned<S: ?Sized> {
    value: Arc<S>,
    scope: LifetimeScope,
}

impl<S: ?Sized> Owned<S> {
    pub(crate) fn new(value: Arc<S>, scope: LifetimeScope) -> Self {
        Self { value, scope }
    }

    pub fn value(&self) -> &Arc<S> {
        &self.value
    }

    /// The scope owning the value and its dependencies.
    pub fn scope(&self) -> &LifetimeScope {
        &self.scope
    }

    /// Disposes the owning scope now.
    pub fn dispose(self) {
        drop(self);
    }
}

impl<S: ?Sized> Deref for Owned<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.value
    }
}

impl<S: ?Sized> Drop for Owned<S> {
    fn drop(&mut self) {
        self.scope.dispose();
    }
}

impl<S: ?Sized> fmt::Debug for Owned<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned").field("scope", &self.scope.path()).finish()
    }
}
