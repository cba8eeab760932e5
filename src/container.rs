//! The built container: owner of the root lifetime scope.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::DiResult;
use crate::instance::Instance;
use crate::lifetime::ScopeTag;
use crate::options::ContainerOptions;
use crate::parameters::Parameters;
use crate::registration::ComponentRegistry;
use crate::scope::{LifetimeScope, Owned};
use crate::service::Service;
use crate::traits::ResolverCore;

/// A built container.
///
/// Resolving from the container resolves from its root scope, tagged
/// [`ROOT_TAG`](crate::ROOT_TAG). Clones share the same root scope.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Cache;
///
/// let mut builder = ContainerBuilder::new();
/// builder.register(|_, _| Ok(Arc::new(Cache))).single_instance();
/// let container = builder.build();
///
/// let request = container.begin_tagged_lifetime_scope("request");
/// assert!(Arc::ptr_eq(
///     &container.resolve::<Cache>().unwrap(),
///     &request.resolve::<Cache>().unwrap()
/// ));
///
/// container.dispose();
/// assert!(request.is_disposed());
/// ```
#[derive(Clone)]
pub struct Container {
    root: LifetimeScope,
}

impl Container {
    pub(crate) fn new(root: LifetimeScope) -> Self {
        Self { root }
    }

    pub fn root_scope(&self) -> &LifetimeScope {
        &self.root
    }

    pub fn begin_lifetime_scope(&self) -> LifetimeScope {
        self.root.begin_lifetime_scope()
    }

    pub fn begin_tagged_lifetime_scope(&self, tag: impl Into<ScopeTag>) -> LifetimeScope {
        self.root.begin_tagged_lifetime_scope(tag)
    }

    /// Resolves `S` in a new child of the root scope owned by the result.
    pub fn resolve_owned<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Owned<S>> {
        self.root.resolve_owned::<S>()
    }

    pub fn registry(&self) -> &ComponentRegistry {
        self.root.registry()
    }

    pub fn options(&self) -> &ContainerOptions {
        self.root.options()
    }

    /// Disposes the root scope and, with it, every scope begun from it.
    pub fn dispose(&self) {
        self.root.dispose();
    }

    pub fn dispose_async(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.root.dispose_async()
    }

    pub fn is_disposed(&self) -> bool {
        self.root.is_disposed()
    }

    /// Renders one line per registration.
    #[cfg(feature = "diagnostics")]
    pub fn describe_registrations(&self) -> String {
        crate::diagnostics::describe_registrations(self.registry())
    }
}

impl ResolverCore for Container {
    fn resolve_service(&self, service: &Service, parameters: Parameters) -> DiResult<Instance> {
        self.root.resolve_service(service, parameters)
    }

    fn resolve_all_services(&self, service: &Service) -> DiResult<Vec<Instance>> {
        self.root.resolve_all_services(service)
    }

    fn resolve_unique_service(&self, service: &Service) -> DiResult<Instance> {
        self.root.resolve_unique_service(service)
    }

    fn is_service_registered(&self, service: &Service) -> bool {
        self.root.is_service_registered(service)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.registry().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
