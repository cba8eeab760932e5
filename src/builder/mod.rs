//! Container builder.
//!
//! This module contains the ContainerBuilder type used to collect
//! registrations, sources and options before freezing them into a
//! [`Container`].

use std::sync::Arc;

use tracing::{debug, error};

use crate::container::Container;
use crate::diagnostics::{Observers, ResolveObserver};
use crate::error::{DiError, DiResult};
use crate::options::ContainerOptions;
use crate::parameters::Parameters;
use crate::pipeline::DecoratorContext;
use crate::registration::{
    Activator, ComponentRegistry, DecoratorBuilder, PendingRegistration, RegistrationBuilder, RegistrationSource,
};
use crate::resolve::{ActivationContext, ResolveOperation, ResolveRequest};
use crate::scope::{ContainerShared, LifetimeScope};
use crate::service::Service;

pub mod module;
pub use module::{ContainerBuilderModuleExt, ContainerModule};

/// Collects registrations and produces a [`Container`].
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Settings { retries: u32 }
/// struct Client { settings: Arc<Settings> }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(Arc::new(Settings { retries: 3 }));
/// builder
///     .register(|ctx, _| Ok(Arc::new(Client { settings: ctx.resolve()? })))
///     .single_instance();
///
/// let container = builder.build();
/// assert_eq!(container.resolve::<Client>().unwrap().settings.retries, 3);
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    pending: Vec<PendingRegistration>,
    sources: Vec<Arc<dyn RegistrationSource>>,
    options: ContainerOptions,
    observers: Vec<Arc<dyn ResolveObserver>>,
}

impl ContainerBuilder {
    /// Creates an empty builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, pending: PendingRegistration) -> &mut PendingRegistration {
        self.pending.push(pending);
        let last = self.pending.len() - 1;
        &mut self.pending[last]
    }

    // ----- Components -----

    /// Registers a component created by `factory` on every activation.
    ///
    /// The factory receives the [`ActivationContext`] for resolving
    /// dependencies and the parameters of the request.
    pub fn register<S, F>(&mut self, factory: F) -> RegistrationBuilder<'_, S>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ActivationContext, &Parameters) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        RegistrationBuilder::new(self.push(PendingRegistration::delegate(factory)))
    }

    /// Registers an already-built instance. It is shared from the root scope.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_scopes::{ContainerBuilder, Resolver};
    /// use std::sync::Arc;
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.register_instance(Arc::new(String::from("eu-west-1"))).keyed("region");
    ///
    /// let container = builder.build();
    /// let scope = container.begin_lifetime_scope();
    /// assert_eq!(*scope.resolve_keyed::<String>("region").unwrap(), "eu-west-1");
    /// ```
    pub fn register_instance<S: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<S>) -> RegistrationBuilder<'_, S> {
        RegistrationBuilder::new(self.push(PendingRegistration::instance(value)))
    }

    /// Registers a component built by a custom [`Activator`].
    pub fn register_activator<S: ?Sized + Send + Sync + 'static>(
        &mut self,
        activator: Arc<dyn Activator>,
    ) -> RegistrationBuilder<'_, S> {
        RegistrationBuilder::new(self.push(PendingRegistration::activator::<S>(activator)))
    }

    // ----- Decorators and adapters -----

    /// Registers a decorator wrapping every resolved `S`.
    ///
    /// Decorators apply in registration order: the first registered wraps the
    /// original instance, the next wraps the first, and so on.
    pub fn register_decorator<S, F>(&mut self, decorate: F) -> DecoratorBuilder<'_, S>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ActivationContext, Arc<S>, &DecoratorContext) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        DecoratorBuilder::new(self.push(PendingRegistration::decorator(decorate)))
    }

    /// Exposes the registration of `existing` as `exposed` too.
    ///
    /// The target is looked up when the alias is resolved, so it may be
    /// registered after the alias.
    ///
    /// # Panics
    ///
    /// Panics if the two services have different types, or if `exposed` is
    /// `existing` itself.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_scopes::{ContainerBuilder, Resolver, Service};
    /// use std::sync::Arc;
    ///
    /// struct Pool;
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.register_alias(Service::typed::<Pool>(), Service::keyed::<Pool>("primary"));
    /// builder.register(|_, _| Ok(Arc::new(Pool))).single_instance();
    ///
    /// let container = builder.build();
    /// assert!(Arc::ptr_eq(
    ///     &container.resolve::<Pool>().unwrap(),
    ///     &container.resolve_keyed::<Pool>("primary").unwrap()
    /// ));
    /// ```
    pub fn register_alias(&mut self, existing: Service, exposed: Service) -> &mut Self {
        assert!(
            existing.service_type() == exposed.service_type(),
            "alias {exposed} must have the type of {existing}"
        );
        assert!(existing != exposed, "{existing} cannot be an alias of itself");
        self.pending.push(PendingRegistration::alias(existing, exposed));
        self
    }

    /// Adds a source consulted for services with no explicit registration.
    pub fn register_source(&mut self, source: impl RegistrationSource + 'static) -> &mut Self {
        self.sources.push(Arc::new(source));
        self
    }

    // ----- Configuration -----

    pub fn with_options(&mut self, options: ContainerOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    /// Adds an observer notified of every resolve operation and request.
    pub fn add_observer(&mut self, observer: Arc<dyn ResolveObserver>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    /// Number of registrations added so far, decorators and aliases included.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    // ----- Build -----

    /// Builds the container.
    ///
    /// Auto-activated components that fail are logged and skipped; use
    /// [`try_build`](Self::try_build) to receive the failure instead.
    pub fn build(self) -> Container {
        let (container, failures) = self.build_inner(false);
        for (name, err) in failures {
            error!(activator = %name, error = %err, "auto-activation failed");
        }
        container
    }

    /// Builds the container, failing on the first auto-activated component that
    /// cannot be resolved. The container is disposed before the error is
    /// returned.
    pub fn try_build(self) -> DiResult<Container> {
        let (container, failures) = self.build_inner(true);
        match failures.into_iter().next() {
            Some((_, err)) => {
                container.dispose();
                Err(err)
            }
            None => Ok(container),
        }
    }

    fn build_inner(self, stop_on_failure: bool) -> (Container, Vec<(String, DiError)>) {
        let registrations = self
            .pending
            .into_iter()
            .map(|pending| pending.finish(false))
            .collect::<Vec<_>>();
        let registry = ComponentRegistry::new(registrations, self.sources);
        debug!(registrations = registry.len(), "building container");

        let shared = Arc::new(ContainerShared {
            registry,
            options: self.options,
            observers: Observers::new(self.observers),
        });
        let root = LifetimeScope::root(shared);

        let auto_activated = root
            .registry()
            .iter()
            .filter(|registration| registration.auto_activates() && !registration.is_decorator())
            .cloned()
            .collect::<Vec<_>>();

        let mut failures = Vec::new();
        for registration in auto_activated {
            let Some(service) = registration.services().first().cloned() else {
                continue;
            };
            let name = registration.display_name().to_string();
            let result = ResolveOperation::execute(&root, |operation| {
                operation.resolve_request(ResolveRequest::new(service, registration.clone(), root.clone()))
            });
            if let Err(err) = result {
                failures.push((name, err));
                if stop_on_failure {
                    break;
                }
            }
        }

        (Container::new(root), failures)
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("registrations", &self.pending.len())
            .field("sources", &self.sources.len())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Resolver;

    #[test]
    fn counts_every_kind_of_registration() {
        let mut builder = ContainerBuilder::new();
        assert!(builder.is_empty());
        builder.register(|_, _| Ok(Arc::new(1u8)));
        builder.register_decorator::<u8, _>(|_, inner, _| Ok(inner));
        builder.register_alias(Service::typed::<u8>(), Service::keyed::<u8>("byte"));
        assert_eq!(builder.len(), 3);
    }

    #[test]
    #[should_panic(expected = "must have the type of")]
    fn alias_rejects_a_different_type() {
        let mut builder = ContainerBuilder::new();
        builder.register_alias(Service::typed::<u8>(), Service::keyed::<u16>("wide"));
    }

    #[test]
    #[should_panic(expected = "cannot be an alias of itself")]
    fn alias_rejects_itself() {
        let mut builder = ContainerBuilder::new();
        builder.register_alias(Service::keyed::<u8>("byte"), Service::keyed::<u8>("byte"));
    }

    #[test]
    fn try_build_reports_auto_activation_failures() {
        let mut builder = ContainerBuilder::new();
        builder
            .register::<u8, _>(|_, _| Err(DiError::factory_message("boom")))
            .auto_activate();

        let err = builder.try_build().unwrap_err();
        assert!(matches!(err, DiError::ActivationFailed { .. }));
    }

    #[test]
    fn build_tolerates_auto_activation_failures() {
        let mut builder = ContainerBuilder::new();
        builder
            .register::<u8, _>(|_, _| Err(DiError::factory_message("boom")))
            .auto_activate();
        builder.register(|_, _| Ok(Arc::new(String::from("ok"))));

        let container = builder.build();
        assert_eq!(*container.resolve::<String>().unwrap(), "ok");
    }
}
