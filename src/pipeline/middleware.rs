//! Built-in middleware of the standard pipeline.

use tracing::{debug, trace};

use crate::error::{DiError, DiResult};
use crate::lifetime::{Ownership, Sharing};
use crate::resolve::{ActivationContext, ResolveRequest, ResolveRequestContext};
use crate::scope::SharingKey;

use super::{Next, PipelinePhase, ResolveMiddleware};

/// Fails requests that re-enter a registration already being resolved, or
/// that nest deeper than the configured limit.
pub(crate) struct CircularDependencyDetector {
    max_depth: usize,
}

impl CircularDependencyDetector {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl ResolveMiddleware for CircularDependencyDetector {
    fn phase(&self) -> PipelinePhase {
        PipelinePhase::RequestStart
    }

    fn name(&self) -> &str {
        "CircularDependencyDetector"
    }

    fn execute(&self, context: &mut ResolveRequestContext, next: Next<'_>) -> DiResult<()> {
        let operation = context.operation().clone();
        let _frame = operation.enter_request(context.registration(), self.max_depth)?;
        next.run(context)
    }
}

/// Chooses the activation scope from the lifetime of the registration, or of
/// the decorated registration when resolving a decorator.
pub(crate) struct ScopeSelectionMiddleware;

impl ResolveMiddleware for ScopeSelectionMiddleware {
    fn phase(&self) -> PipelinePhase {
        PipelinePhase::ScopeSelection
    }

    fn name(&self) -> &str {
        "ScopeSelection"
    }

    fn execute(&self, context: &mut ResolveRequestContext, next: Next<'_>) -> DiResult<()> {
        let lifetime = context
            .decorator_target()
            .unwrap_or_else(|| context.registration())
            .lifetime();
        let scope = lifetime.find_scope(context.requesting_scope(), context.service())?;
        scope.ensure_active()?;
        context.set_activation_scope(scope);
        next.run(context)
    }
}

/// Returns the shared instance of the activation scope, creating it at most
/// once per scope when absent.
pub(crate) struct SharingMiddleware;

impl ResolveMiddleware for SharingMiddleware {
    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Sharing
    }

    fn name(&self) -> &str {
        "Sharing"
    }

    fn execute(&self, context: &mut ResolveRequestContext, next: Next<'_>) -> DiResult<()> {
        let sharing = context
            .decorator_target()
            .unwrap_or_else(|| context.registration())
            .sharing();
        if sharing == Sharing::None {
            return next.run(context);
        }

        let key = SharingKey::new(
            context.registration().id(),
            context.decorator_target().map(|target| target.id()),
        );
        let scope = context.activation_scope().clone();

        if let Some(shared) = scope.try_get_shared_instance(&key) {
            trace!(scope = %scope, registration = %key, "shared instance found");
            context.set_instance(shared);
            return Ok(());
        }

        let instance = scope.create_shared_instance(key, || {
            next.run(context)?;
            context
                .instance()
                .cloned()
                .ok_or(DiError::InvariantViolated("shared instance factory produced no instance"))
        })?;
        context.set_instance(instance);
        Ok(())
    }
}

/// Runs the activator and the activating handlers, then tracks the instance
/// for disposal and queues activated handlers for operation completion.
pub(crate) struct ActivationMiddleware;

impl ResolveMiddleware for ActivationMiddleware {
    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Activation
    }

    fn name(&self) -> &str {
        "Activation"
    }

    fn execute(&self, context: &mut ResolveRequestContext, next: Next<'_>) -> DiResult<()> {
        let registration = context.registration_arc();
        let scope = context.activation_scope().clone();
        let operation = context.operation().clone();
        let display_name = registration.display_name().to_string();

        let activation = ActivationContext::new(
            operation.clone(),
            scope.clone(),
            registration.clone(),
            context.service().clone(),
        );

        let mut instance = registration
            .activator()
            .activate(&activation, context.parameters())
            .map_err(|e| e.within_activator(&display_name))?;

        for handler in &registration.hooks.activating {
            instance = handler(&activation, instance).map_err(|e| e.within_activator(&display_name))?;
        }

        if registration.ownership() == Ownership::OwnedByScope {
            if let Some(disposer) = registration.disposer_for(&instance) {
                scope.track_disposer(&instance, disposer)?;
            }
        }

        if !registration.hooks.activated.is_empty() {
            let handlers = registration.hooks.activated.clone();
            let (scope, instance) = (scope.clone(), instance.clone());
            operation.defer(Box::new(move || {
                for handler in &handlers {
                    handler(&scope, &instance);
                }
            }));
        }

        if scope.options().start_on_activate && registration.is_startable() {
            let registration = registration.clone();
            let instance = instance.clone();
            operation.defer(Box::new(move || {
                if registration.mark_started() {
                    if let Some(start) = &registration.hooks.start {
                        debug!(activator = registration.display_name(), "starting component");
                        start(&instance);
                    }
                }
            }));
        }

        context.set_instance(instance);
        next.run(context)
    }
}

/// Terminal middleware. Alias registrations hand the request to the pipeline
/// of their target; for everything else this is a no-op.
pub(crate) struct ServicePipelineEnd;

impl ResolveMiddleware for ServicePipelineEnd {
    fn phase(&self) -> PipelinePhase {
        PipelinePhase::ServicePipelineEnd
    }

    fn name(&self) -> &str {
        "ServicePipelineEnd"
    }

    fn execute(&self, context: &mut ResolveRequestContext, next: Next<'_>) -> DiResult<()> {
        if let Some(target) = context.registration().target().cloned() {
            let scope = context.activation_scope().clone();
            let registration = scope
                .registry()
                .registration_for(&target)
                .ok_or_else(|| DiError::ServiceNotRegistered(target.description()))?;
            let request = ResolveRequest::new(target, registration, scope)
                .with_parameters(context.parameters().clone());
            let instance = context.operation().clone().resolve_request(request)?;
            context.set_instance(instance);
        }
        next.run(context)
    }
}
