//! Per-request state threaded through the pipeline, and the resolver handed
//! to activators.

use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;
use crate::instance::Instance;
use crate::parameters::Parameters;
use crate::registration::ComponentRegistration;
use crate::scope::LifetimeScope;
use crate::service::Service;
use crate::traits::ResolverCore;

use super::{ResolveOperation, ResolveRequest};

/// The state of one request as it travels down and back up a pipeline.
///
/// Middleware reads the request from it and writes the chosen activation
/// scope and the produced instance into it.
pub struct ResolveRequestContext {
    operation: ResolveOperation,
    service: Service,
    registration: Arc<ComponentRegistration>,
    decorator_target: Option<Arc<ComponentRegistration>>,
    parameters: Parameters,
    requesting_scope: LifetimeScope,
    activation_scope: LifetimeScope,
    instance: Option<Instance>,
}

impl ResolveRequestContext {
    pub(crate) fn new(operation: ResolveOperation, request: ResolveRequest) -> Self {
        Self {
            operation,
            service: request.service,
            registration: request.registration,
            decorator_target: request.decorator_target,
            parameters: request.parameters,
            activation_scope: request.scope.clone(),
            requesting_scope: request.scope,
            instance: None,
        }
    }

    pub fn operation(&self) -> &ResolveOperation {
        &self.operation
    }

    /// The service that was requested.
    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn registration(&self) -> &ComponentRegistration {
        &self.registration
    }

    pub(crate) fn registration_arc(&self) -> Arc<ComponentRegistration> {
        self.registration.clone()
    }

    /// The registration a decorator request stands in for.
    pub fn decorator_target(&self) -> Option<&ComponentRegistration> {
        self.decorator_target.as_deref()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters = parameters;
    }

    /// The scope the request was issued in.
    pub fn requesting_scope(&self) -> &LifetimeScope {
        &self.requesting_scope
    }

    /// The scope the instance is activated (and shared) in. Equal to the
    /// requesting scope until scope selection has run.
    pub fn activation_scope(&self) -> &LifetimeScope {
        &self.activation_scope
    }

    pub fn set_activation_scope(&mut self, scope: LifetimeScope) {
        self.activation_scope = scope;
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn set_instance(&mut self, instance: Instance) {
        self.instance = Some(instance);
    }

    pub(crate) fn take_instance(&mut self) -> Option<Instance> {
        self.instance.take()
    }
}

impl fmt::Debug for ResolveRequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveRequestContext")
            .field("service", &self.service)
            .field("activator", &self.registration.display_name())
            .field("activation_scope", &self.activation_scope.path())
            .field("has_instance", &self.instance.is_some())
            .finish()
    }
}

/// Resolver handed to activators and activating handlers.
///
/// Requests made through it are issued in the activation scope of the
/// component being built and belong to the same resolve operation, so cycles
/// through them are detected.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Repository { config: Arc<Config> }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(Arc::new(Config { url: "postgres://db".into() }));
/// builder.register(|ctx, _| Ok(Arc::new(Repository { config: ctx.resolve::<Config>()? })));
///
/// let container = builder.build();
/// assert_eq!(container.resolve::<Repository>().unwrap().config.url, "postgres://db");
/// ```
pub struct ActivationContext {
    operation: ResolveOperation,
    scope: LifetimeScope,
    registration: Arc<ComponentRegistration>,
    service: Service,
}

impl ActivationContext {
    pub(crate) fn new(
        operation: ResolveOperation,
        scope: LifetimeScope,
        registration: Arc<ComponentRegistration>,
        service: Service,
    ) -> Self {
        Self {
            operation,
            scope,
            registration,
            service,
        }
    }

    /// The activation scope.
    pub fn scope(&self) -> &LifetimeScope {
        &self.scope
    }

    pub fn registration(&self) -> &ComponentRegistration {
        &self.registration
    }

    /// The service whose request triggered the activation.
    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn operation(&self) -> &ResolveOperation {
        &self.operation
    }
}

impl ResolverCore for ActivationContext {
    fn resolve_service(&self, service: &Service, parameters: Parameters) -> DiResult<Instance> {
        self.operation.resolve_service(&self.scope, service, parameters)
    }

    fn resolve_all_services(&self, service: &Service) -> DiResult<Vec<Instance>> {
        self.operation.resolve_all(&self.scope, service)
    }

    fn resolve_unique_service(&self, service: &Service) -> DiResult<Instance> {
        self.operation.resolve_unique(&self.scope, service)
    }

    fn is_service_registered(&self, service: &Service) -> bool {
        self.scope.registry().is_registered(service)
    }
}

impl fmt::Debug for ActivationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationContext")
            .field("scope", &self.scope.path())
            .field("activator", &self.registration.display_name())
            .finish()
    }
}
