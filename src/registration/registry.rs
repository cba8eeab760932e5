//! The registration catalog consulted by resolve operations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{DiError, DiResult};
use crate::parameters::Parameters;
use crate::resolve::ActivationContext;
use crate::service::{Service, ServiceType};

use super::builder::{PendingRegistration, RegistrationBuilder};
use super::ComponentRegistration;

/// Supplies registrations on demand for services nothing was registered for.
///
/// Sources are consulted in the order they were added, only when a service
/// has no explicit registration. What a source returns for a service is
/// cached, so each source is asked at most once per service.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{
///     ContainerBuilder, RegistrationSource, Resolver, Service, ServiceType, SourceRegistrations,
/// };
/// use std::sync::Arc;
///
/// /// Provides an empty `Vec<String>` for anything nobody registered.
/// struct EmptyLists;
///
/// impl RegistrationSource for EmptyLists {
///     fn registrations_for(&self, service: &Service, registrations: &mut SourceRegistrations) {
///         if service.service_type() == ServiceType::of::<Vec<String>>() {
///             registrations.register(|_, _| Ok(Arc::new(Vec::<String>::new())));
///         }
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_source(EmptyLists);
/// let container = builder.build();
///
/// assert!(container.resolve::<Vec<String>>().unwrap().is_empty());
/// assert!(container.resolve::<Vec<u8>>().is_err());
/// ```
pub trait RegistrationSource: Send + Sync {
    /// Adds registrations able to satisfy `service`, if the source can.
    fn registrations_for(&self, service: &Service, registrations: &mut SourceRegistrations);

    /// Registrations from external sources adapt components that live elsewhere
    /// and are excluded from decoration.
    fn is_external(&self) -> bool {
        false
    }
}

/// Collects the registrations a [`RegistrationSource`] supplies for one service.
#[derive(Default)]
pub struct SourceRegistrations {
    pending: Vec<PendingRegistration>,
}

impl SourceRegistrations {
    pub fn register<S, F>(&mut self, factory: F) -> RegistrationBuilder<'_, S>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ActivationContext, &Parameters) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        self.pending.push(PendingRegistration::delegate(factory));
        let last = self.pending.len() - 1;
        RegistrationBuilder::new(&mut self.pending[last])
    }

    pub fn register_instance<S: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<S>) -> RegistrationBuilder<'_, S> {
        self.pending.push(PendingRegistration::instance(value));
        let last = self.pending.len() - 1;
        RegistrationBuilder::new(&mut self.pending[last])
    }
}

/// Read-only catalog of registrations, indexed by service.
///
/// Explicit registrations are fixed when the container is built; registrations
/// from sources are added to a cache the first time a service is looked up.
pub struct ComponentRegistry {
    registrations: Vec<Arc<ComponentRegistration>>,
    by_service: HashMap<Service, Vec<Arc<ComponentRegistration>>>,
    decorators: HashMap<ServiceType, Vec<Arc<ComponentRegistration>>>,
    sources: Vec<Arc<dyn RegistrationSource>>,
    sourced: RwLock<HashMap<Service, Arc<[Arc<ComponentRegistration>]>>>,
}

impl ComponentRegistry {
    pub(crate) fn new(
        registrations: Vec<ComponentRegistration>,
        sources: Vec<Arc<dyn RegistrationSource>>,
    ) -> Self {
        let mut registry = Self {
            registrations: Vec::with_capacity(registrations.len()),
            by_service: HashMap::new(),
            decorators: HashMap::new(),
            sources,
            sourced: RwLock::new(HashMap::new()),
        };
        for registration in registrations {
            registry.add(Arc::new(registration));
        }
        registry
    }

    fn add(&mut self, registration: Arc<ComponentRegistration>) {
        for service in registration.services() {
            match service {
                Service::Decorator(service_type, _) => self
                    .decorators
                    .entry(*service_type)
                    .or_default()
                    .push(registration.clone()),
                _ => self
                    .by_service
                    .entry(service.clone())
                    .or_default()
                    .push(registration.clone()),
            }
        }
        self.registrations.push(registration);
    }

    /// The default registration for `service`: the most recently registered one.
    pub fn registration_for(&self, service: &Service) -> Option<Arc<ComponentRegistration>> {
        match self.by_service.get(service) {
            Some(registrations) => registrations.last().cloned(),
            None => self.from_sources(service).last().cloned(),
        }
    }

    /// The only registration for `service`.
    pub fn registration_for_unique(&self, service: &Service) -> DiResult<Arc<ComponentRegistration>> {
        let registrations = self.registrations_for(service);
        match registrations.len() {
            0 => Err(DiError::ServiceNotRegistered(service.description())),
            1 => Ok(registrations[0].clone()),
            count => Err(DiError::ServiceRegisteredMultipleTimes {
                service: service.description(),
                count,
            }),
        }
    }

    /// Every registration for `service`, in registration order.
    pub fn registrations_for(&self, service: &Service) -> Vec<Arc<ComponentRegistration>> {
        match self.by_service.get(service) {
            Some(registrations) => registrations.clone(),
            None => self.from_sources(service).to_vec(),
        }
    }

    /// Decorators registered for `service_type`, in registration order.
    pub fn decorators_for(&self, service_type: ServiceType) -> &[Arc<ComponentRegistration>] {
        self.decorators
            .get(&service_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_registered(&self, service: &Service) -> bool {
        self.by_service.contains_key(service) || !self.from_sources(service).is_empty()
    }

    /// Explicit registrations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ComponentRegistration>> {
        self.registrations.iter()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn from_sources(&self, service: &Service) -> Arc<[Arc<ComponentRegistration>]> {
        if self.sources.is_empty() || !service.is_decoratable() {
            return Arc::from(Vec::new());
        }
        if let Some(cached) = self.sourced.read().get(service) {
            return cached.clone();
        }

        // Sources run without the cache lock held; they may look up other services.
        let mut found = Vec::new();
        for source in &self.sources {
            let mut collected = SourceRegistrations::default();
            source.registrations_for(service, &mut collected);
            for pending in collected.pending {
                if pending.is_decorator() {
                    continue;
                }
                let registration = pending.finish(source.is_external());
                if registration.services().contains(service) {
                    found.push(Arc::new(registration));
                }
            }
        }

        let mut sourced = self.sourced.write();
        sourced
            .entry(service.clone())
            .or_insert_with(|| Arc::from(found))
            .clone()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("registrations", &self.registrations.len())
            .field("decorated_services", &self.decorators.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}
