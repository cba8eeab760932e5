//! Component registrations: immutable recipes for producing instances.

mod activator;
mod builder;
mod registry;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::DiResult;
use crate::instance::Instance;
use crate::lifetime::{Lifetime, Ownership, Sharing};
use crate::options::ContainerOptions;
use crate::pipeline::{ResolveMiddleware, ResolvePipeline};
use crate::resolve::ActivationContext;
use crate::scope::{AsyncDisposeFn, Disposer, LifetimeScope, SyncDisposeFn};
use crate::service::{Service, ServiceType};

pub use activator::{Activator, DelegateActivator, ProvidedInstanceActivator};
pub use builder::{DecoratorBuilder, RegistrationBuilder};
pub use registry::{ComponentRegistry, RegistrationSource, SourceRegistrations};

pub(crate) use builder::PendingRegistration;

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub(crate) fn next() -> Self {
        RegistrationId(NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) type ActivatingHandler =
    Arc<dyn Fn(&ActivationContext, Instance) -> DiResult<Instance> + Send + Sync>;
pub(crate) type ActivatedHandler = Arc<dyn Fn(&LifetimeScope, &Instance) + Send + Sync>;
pub(crate) type SyncDisposalProbe = Arc<dyn Fn(&Instance) -> Option<SyncDisposeFn> + Send + Sync>;
pub(crate) type AsyncDisposalProbe = Arc<dyn Fn(&Instance) -> Option<AsyncDisposeFn> + Send + Sync>;
pub(crate) type StartProbe = Arc<dyn Fn(&Instance) + Send + Sync>;

/// Handlers and capabilities attached to a registration's instances.
#[derive(Clone, Default)]
pub(crate) struct LifecycleHooks {
    pub(crate) activating: Vec<ActivatingHandler>,
    pub(crate) activated: Vec<ActivatedHandler>,
    pub(crate) sync_disposal: Option<SyncDisposalProbe>,
    pub(crate) async_disposal: Option<AsyncDisposalProbe>,
    pub(crate) start: Option<StartProbe>,
}

/// Immutable description of one registered component.
///
/// A registration produces instances of a single service type and exposes
/// them under one or more [`Service`] keys. Its resolve pipeline is built
/// on first use and shared by every thread afterwards.
pub struct ComponentRegistration {
    id: RegistrationId,
    service_type: ServiceType,
    implementation_type: ServiceType,
    services: Vec<Service>,
    activator: Arc<dyn Activator>,
    lifetime: Lifetime,
    sharing: Sharing,
    ownership: Ownership,
    target: Option<Service>,
    external: bool,
    auto_activate: bool,
    pub(crate) hooks: LifecycleHooks,
    middleware: Vec<Arc<dyn ResolveMiddleware>>,
    started: AtomicBool,
    pipeline: OnceCell<ResolvePipeline>,
}

pub(crate) struct RegistrationParts {
    pub(crate) service_type: ServiceType,
    pub(crate) implementation_type: ServiceType,
    pub(crate) services: Vec<Service>,
    pub(crate) activator: Arc<dyn Activator>,
    pub(crate) lifetime: Lifetime,
    pub(crate) sharing: Sharing,
    pub(crate) ownership: Ownership,
    pub(crate) target: Option<Service>,
    pub(crate) external: bool,
    pub(crate) auto_activate: bool,
    pub(crate) hooks: LifecycleHooks,
    pub(crate) middleware: Vec<Arc<dyn ResolveMiddleware>>,
}

impl ComponentRegistration {
    pub(crate) fn from_parts(parts: RegistrationParts) -> Self {
        let mut services: Vec<Service> = Vec::with_capacity(parts.services.len());
        for service in parts.services {
            if !services.contains(&service) {
                services.push(service);
            }
        }
        Self {
            id: RegistrationId::next(),
            service_type: parts.service_type,
            implementation_type: parts.implementation_type,
            services,
            activator: parts.activator,
            lifetime: parts.lifetime,
            sharing: parts.sharing,
            ownership: parts.ownership,
            target: parts.target,
            external: parts.external,
            auto_activate: parts.auto_activate,
            hooks: parts.hooks,
            middleware: parts.middleware,
            started: AtomicBool::new(false),
            pipeline: OnceCell::new(),
        }
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// Type of the instances this registration produces.
    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// Concrete type behind the service, when declared with
    /// [`implemented_by`](RegistrationBuilder::implemented_by).
    pub fn implementation_type(&self) -> ServiceType {
        self.implementation_type
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn activator(&self) -> &dyn Activator {
        &*self.activator
    }

    pub fn display_name(&self) -> &str {
        self.activator.display_name()
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    pub fn sharing(&self) -> Sharing {
        self.sharing
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// The service an alias registration forwards to.
    pub fn target(&self) -> Option<&Service> {
        self.target.as_ref()
    }

    pub fn is_adapter(&self) -> bool {
        self.target.is_some()
    }

    /// Whether the registration came from an external registration source.
    /// External registrations are never decorated.
    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn is_decorator(&self) -> bool {
        self.services.iter().any(|s| !s.is_decoratable())
    }

    pub(crate) fn auto_activates(&self) -> bool {
        self.auto_activate
    }

    pub(crate) fn custom_middleware(&self) -> &[Arc<dyn ResolveMiddleware>] {
        &self.middleware
    }

    /// The compiled pipeline; built once, on first use.
    pub fn pipeline(&self, options: &ContainerOptions) -> &ResolvePipeline {
        self.pipeline
            .get_or_init(|| ResolvePipeline::for_registration(self, options))
    }

    /// Disposal capability of an instance produced by this registration.
    pub(crate) fn disposer_for(&self, instance: &Instance) -> Option<Disposer> {
        let sync = self.hooks.sync_disposal.as_ref().and_then(|probe| probe(instance));
        let asynchronous = self.hooks.async_disposal.as_ref().and_then(|probe| probe(instance));
        Disposer::from_parts(sync, asynchronous)
    }

    pub(crate) fn is_startable(&self) -> bool {
        self.hooks.start.is_some()
    }

    /// Sets the started marker; `true` when this call was the first to set it.
    pub(crate) fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistration")
            .field("id", &self.id)
            .field("activator", &self.display_name())
            .field("services", &self.services)
            .field("lifetime", &self.lifetime)
            .field("sharing", &self.sharing)
            .field("ownership", &self.ownership)
            .finish()
    }
}

impl fmt::Display for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services: Vec<String> = self.services.iter().map(|s| s.to_string()).collect();
        write!(
            f,
            "{} Activator = {}, Services = [{}], Lifetime = {}, Sharing = {:?}, Ownership = {:?}",
            self.id,
            self.display_name(),
            services.join(", "),
            self.lifetime,
            self.sharing,
            self.ownership
        )
    }
}
