//! Activators: the strategies that produce component instances.

use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;
use crate::instance::Instance;
use crate::parameters::Parameters;
use crate::resolve::ActivationContext;
use crate::service::{Service, ServiceType};
use crate::traits::ResolverCore;

/// Produces an instance for a registration.
///
/// The pipeline treats activators as opaque: it hands over the activation
/// context (a resolver bound to the activation scope) and the request
/// parameters, and takes whatever instance comes back.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{
///     ActivationContext, Activator, ContainerBuilder, DiResult, Instance, Parameters,
///     Resolver, ServiceType,
/// };
/// use std::sync::Arc;
///
/// struct Greeting(String);
///
/// struct GreetingActivator;
///
/// impl Activator for GreetingActivator {
///     fn limit_type(&self) -> ServiceType {
///         ServiceType::of::<Greeting>()
///     }
///
///     fn display_name(&self) -> &str {
///         "GreetingActivator"
///     }
///
///     fn activate(&self, _: &ActivationContext, parameters: &Parameters) -> DiResult<Instance> {
///         let name = parameters.named::<String>("name").map(|n| n.to_string());
///         let text = format!("hello {}", name.unwrap_or_else(|| "world".into()));
///         Ok(Instance::new(Arc::new(Greeting(text))))
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_activator::<Greeting>(Arc::new(GreetingActivator));
/// let container = builder.build();
///
/// assert_eq!(container.resolve::<Greeting>().unwrap().0, "hello world");
/// ```
pub trait Activator: Send + Sync {
    /// The most specific type the produced instances are known to have.
    fn limit_type(&self) -> ServiceType;

    /// Name used in dependency graphs and activation error chains.
    fn display_name(&self) -> &str;

    fn activate(&self, context: &ActivationContext, parameters: &Parameters) -> DiResult<Instance>;
}

pub(crate) type DelegateFn =
    Arc<dyn Fn(&ActivationContext, &Parameters) -> DiResult<Instance> + Send + Sync>;

/// Activator backed by a factory closure.
pub struct DelegateActivator {
    limit_type: ServiceType,
    name: String,
    delegate: DelegateFn,
}

impl DelegateActivator {
    pub(crate) fn from_erased(limit_type: ServiceType, name: String, delegate: DelegateFn) -> Self {
        Self {
            limit_type,
            name,
            delegate,
        }
    }

    /// Wraps a typed factory; the display name defaults to the short name of `S`.
    pub fn new<S, F>(factory: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ActivationContext, &Parameters) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        let limit_type = ServiceType::of::<S>();
        Self {
            limit_type,
            name: limit_type.short_name(),
            delegate: Arc::new(move |ctx, params| factory(ctx, params).map(Instance::new)),
        }
    }
}

impl Activator for DelegateActivator {
    fn limit_type(&self) -> ServiceType {
        self.limit_type
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn activate(&self, context: &ActivationContext, parameters: &Parameters) -> DiResult<Instance> {
        (self.delegate)(context, parameters)
    }
}

impl fmt::Debug for DelegateActivator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateActivator").field("name", &self.name).finish()
    }
}

/// Activator returning an instance supplied at registration time.
#[derive(Debug)]
pub struct ProvidedInstanceActivator {
    instance: Instance,
    name: String,
}

impl ProvidedInstanceActivator {
    pub fn new(instance: Instance, name: String) -> Self {
        Self { instance, name }
    }
}

impl Activator for ProvidedInstanceActivator {
    fn limit_type(&self) -> ServiceType {
        self.instance.service_type()
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn activate(&self, _: &ActivationContext, _: &Parameters) -> DiResult<Instance> {
        Ok(self.instance.clone())
    }
}

/// Activator of alias registrations. Their pipeline hands the request to the
/// target registration, so this only runs when invoked directly.
#[derive(Debug)]
pub(crate) struct ForwardingActivator {
    target: Service,
    name: String,
}

impl ForwardingActivator {
    pub(crate) fn new(target: Service) -> Self {
        let name = format!("Alias({})", target.service_type().short_name());
        Self { target, name }
    }
}

impl Activator for ForwardingActivator {
    fn limit_type(&self) -> ServiceType {
        self.target.service_type()
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn activate(&self, context: &ActivationContext, parameters: &Parameters) -> DiResult<Instance> {
        context.resolve_service(&self.target, parameters.clone())
    }
}
