//! Decorator application.

use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::parameters::{Parameter, Parameters};
use crate::resolve::{ResolveRequest, ResolveRequestContext};
use crate::service::ServiceType;

use super::{Next, PipelinePhase, ResolveMiddleware};

/// Snapshot of a decoration in progress.
///
/// A new snapshot is created after each applied decorator; earlier snapshots
/// stay as they were, so a decorator holding on to its context keeps seeing
/// the state it was created with.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Message: Send + Sync { fn text(&self) -> String; }
///
/// struct Plain;
/// impl Message for Plain { fn text(&self) -> String { "hi".into() } }
///
/// struct Exclaim(Arc<dyn Message>);
/// impl Message for Exclaim { fn text(&self) -> String { format!("{}!", self.0.text()) } }
///
/// struct Shout(Arc<dyn Message>);
/// impl Message for Shout { fn text(&self) -> String { self.0.text().to_uppercase() } }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register(|_, _| Ok(Arc::new(Plain) as Arc<dyn Message>));
/// builder.register_decorator::<dyn Message, _>(|_, inner, _| Ok(Arc::new(Exclaim(inner)) as Arc<dyn Message>));
/// // Only applies on top of another decorator
/// builder
///     .register_decorator::<dyn Message, _>(|_, inner, _| Ok(Arc::new(Shout(inner)) as Arc<dyn Message>))
///     .when(|ctx| !ctx.applied_decorator_types().is_empty());
///
/// let container = builder.build();
/// assert_eq!(container.resolve::<dyn Message>().unwrap().text(), "HI!");
/// ```
#[derive(Clone)]
pub struct DecoratorContext {
    service_type: ServiceType,
    implementation_type: ServiceType,
    current_instance: Instance,
    applied_decorator_types: Vec<ServiceType>,
    applied_decorators: Vec<Instance>,
}

impl DecoratorContext {
    pub(crate) fn new(service_type: ServiceType, implementation_type: ServiceType, instance: Instance) -> Self {
        Self {
            service_type,
            implementation_type,
            current_instance: instance,
            applied_decorator_types: Vec::new(),
            applied_decorators: Vec::new(),
        }
    }

    /// The snapshot after `decorator_type` produced `decorated`.
    pub(crate) fn with_decorator(&self, decorator_type: ServiceType, decorated: Instance) -> Self {
        let mut applied_decorator_types = self.applied_decorator_types.clone();
        applied_decorator_types.push(decorator_type);
        let mut applied_decorators = self.applied_decorators.clone();
        applied_decorators.push(decorated.clone());
        Self {
            service_type: self.service_type,
            implementation_type: self.implementation_type,
            current_instance: decorated,
            applied_decorator_types,
            applied_decorators,
        }
    }

    /// The decorated service.
    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// The implementation type of the undecorated instance.
    pub fn implementation_type(&self) -> ServiceType {
        self.implementation_type
    }

    /// The instance the next decorator would wrap.
    pub fn current_instance(&self) -> &Instance {
        &self.current_instance
    }

    pub fn current<S: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        self.current_instance.downcast::<S>()
    }

    /// Implementation types of the decorators applied so far, innermost first.
    pub fn applied_decorator_types(&self) -> &[ServiceType] {
        &self.applied_decorator_types
    }

    /// Instances produced by the decorators applied so far, innermost first.
    pub fn applied_decorators(&self) -> &[Instance] {
        &self.applied_decorators
    }
}

impl fmt::Debug for DecoratorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratorContext")
            .field("service_type", &self.service_type)
            .field("implementation_type", &self.implementation_type)
            .field("applied_decorator_types", &self.applied_decorator_types)
            .finish()
    }
}

/// Wraps the instance produced further down the pipeline with the decorators
/// registered for its service type, first registered innermost.
pub(crate) struct DecorationMiddleware;

impl ResolveMiddleware for DecorationMiddleware {
    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Decoration
    }

    fn name(&self) -> &str {
        "Decoration"
    }

    fn execute(&self, context: &mut ResolveRequestContext, next: Next<'_>) -> DiResult<()> {
        next.run(context)?;

        if !context.service().is_decoratable() || context.registration().is_external() {
            return Ok(());
        }

        let target = context.registration_arc();
        let scope = context.activation_scope().clone();
        let registry = scope.registry();
        let decorators = registry.decorators_for(target.service_type());
        if decorators.is_empty() {
            return Ok(());
        }

        let mut current = context
            .instance()
            .cloned()
            .ok_or(DiError::InvariantViolated("decoration reached without an instance"))?;
        let mut snapshot = DecoratorContext::new(target.service_type(), target.implementation_type(), current.clone());
        let last = decorators.len() - 1;

        for (index, decorator) in decorators.iter().enumerate() {
            let applies = decorator
                .services()
                .iter()
                .find_map(|service| service.condition())
                .map_or(true, |condition| condition(&snapshot));
            if !applies {
                continue;
            }

            let parameters = Parameters::new()
                .with(Parameter::Typed(current.service_type(), current.clone()))
                .with(Parameter::typed(Arc::new(snapshot.clone())));
            let request = ResolveRequest::new(decorator.services()[0].clone(), decorator.clone(), scope.clone())
                .with_parameters(parameters)
                .decorating(target.clone());
            current = context.operation().clone().resolve_request(request)?;

            if index < last {
                snapshot = snapshot.with_decorator(decorator.implementation_type(), current.clone());
            }
        }

        context.set_instance(current);
        Ok(())
    }
}
