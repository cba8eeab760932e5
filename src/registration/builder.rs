//! Fluent configuration of registrations before the container is built.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::lifetime::{Lifetime, Ownership, ScopeTag, Sharing};
use crate::parameters::Parameters;
use crate::pipeline::{DecoratorContext, PipelineBuilder};
use crate::resolve::ActivationContext;
use crate::scope::{BoxFutureUnit, LifetimeScope};
use crate::service::{DecoratorCondition, Service, ServiceType};
use crate::traits::{AsyncDispose, Dispose, Startable};

use super::activator::{Activator, DelegateActivator, DelegateFn, ForwardingActivator, ProvidedInstanceActivator};
use super::{ComponentRegistration, LifecycleHooks, RegistrationParts, SyncDisposalProbe};

pub(crate) enum ActivatorSource {
    Delegate(DelegateFn),
    Instance(Instance),
    Custom(Arc<dyn Activator>),
}

pub(crate) enum PendingKind {
    Component,
    Decorator(Option<DecoratorCondition>),
    Alias(Service),
}

/// A registration still being configured.
pub(crate) struct PendingRegistration {
    kind: PendingKind,
    service_type: ServiceType,
    implementation_type: ServiceType,
    display_name: Option<String>,
    activator: ActivatorSource,
    as_typed: bool,
    keys: Vec<Arc<str>>,
    lifetime: Lifetime,
    sharing: Sharing,
    ownership: Ownership,
    hooks: LifecycleHooks,
    pipeline: PipelineBuilder,
    auto_activate: bool,
}

impl PendingRegistration {
    fn new(kind: PendingKind, service_type: ServiceType, activator: ActivatorSource) -> Self {
        Self {
            kind,
            service_type,
            implementation_type: service_type,
            display_name: None,
            activator,
            as_typed: false,
            keys: Vec::new(),
            lifetime: Lifetime::CurrentScope,
            sharing: Sharing::None,
            ownership: Ownership::OwnedByScope,
            hooks: LifecycleHooks::default(),
            pipeline: PipelineBuilder::new(),
            auto_activate: false,
        }
    }

    pub(crate) fn delegate<S, F>(factory: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ActivationContext, &Parameters) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        let delegate: DelegateFn = Arc::new(move |ctx, params| factory(ctx, params).map(Instance::new));
        Self::new(PendingKind::Component, ServiceType::of::<S>(), ActivatorSource::Delegate(delegate))
    }

    pub(crate) fn instance<S: ?Sized + Send + Sync + 'static>(value: Arc<S>) -> Self {
        let mut pending = Self::new(
            PendingKind::Component,
            ServiceType::of::<S>(),
            ActivatorSource::Instance(Instance::new(value)),
        );
        pending.lifetime = Lifetime::RootScope;
        pending.sharing = Sharing::Shared;
        pending
    }

    pub(crate) fn activator<S: ?Sized + Send + Sync + 'static>(activator: Arc<dyn Activator>) -> Self {
        let mut pending = Self::new(
            PendingKind::Component,
            ServiceType::of::<S>(),
            ActivatorSource::Custom(activator.clone()),
        );
        pending.implementation_type = activator.limit_type();
        pending
    }

    pub(crate) fn decorator<S, F>(decorate: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ActivationContext, Arc<S>, &DecoratorContext) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        let delegate: DelegateFn = Arc::new(move |ctx, params| {
            let inner = params
                .typed::<S>()
                .ok_or(DiError::InvariantViolated("decorator invoked without the instance to decorate"))?;
            let context = params
                .typed::<DecoratorContext>()
                .ok_or(DiError::InvariantViolated("decorator invoked without a decorator context"))?;
            decorate(ctx, inner, &context).map(Instance::new)
        });
        Self::new(
            PendingKind::Decorator(None),
            ServiceType::of::<S>(),
            ActivatorSource::Delegate(delegate),
        )
    }

    pub(crate) fn alias(existing: Service, exposed: Service) -> Self {
        let service_type = existing.service_type();
        let activator: Arc<dyn Activator> = Arc::new(ForwardingActivator::new(existing.clone()));
        let mut pending = Self::new(
            PendingKind::Alias(existing),
            service_type,
            ActivatorSource::Custom(activator),
        );
        match exposed {
            Service::Keyed(_, key) => pending.keys.push(key),
            _ => pending.as_typed = true,
        }
        pending
    }

    pub(crate) fn is_decorator(&self) -> bool {
        matches!(self.kind, PendingKind::Decorator(_))
    }

    /// Freezes the configuration into a registration.
    pub(crate) fn finish(self, external: bool) -> ComponentRegistration {
        let name = self
            .display_name
            .unwrap_or_else(|| self.implementation_type.short_name());

        let activator: Arc<dyn Activator> = match self.activator {
            ActivatorSource::Delegate(delegate) => Arc::new(DelegateActivator::from_erased(
                self.implementation_type,
                name,
                delegate,
            )),
            ActivatorSource::Instance(instance) => Arc::new(ProvidedInstanceActivator::new(instance, name)),
            ActivatorSource::Custom(activator) => activator,
        };

        let (services, target) = match self.kind {
            PendingKind::Decorator(condition) => (vec![Service::Decorator(self.service_type, condition)], None),
            kind => {
                let mut services = Vec::new();
                if self.as_typed || self.keys.is_empty() {
                    services.push(Service::Typed(self.service_type));
                }
                services.extend(self.keys.into_iter().map(|key| Service::Keyed(self.service_type, key)));
                let target = match kind {
                    PendingKind::Alias(target) => Some(target),
                    _ => None,
                };
                (services, target)
            }
        };

        ComponentRegistration::from_parts(RegistrationParts {
            service_type: self.service_type,
            implementation_type: self.implementation_type,
            services,
            activator,
            lifetime: self.lifetime,
            sharing: self.sharing,
            ownership: self.ownership,
            target,
            external,
            auto_activate: self.auto_activate,
            hooks: self.hooks,
            middleware: self.pipeline.into_middleware(),
        })
    }
}

/// Fluent configuration of a component registration.
///
/// Returned by [`ContainerBuilder::register`](crate::ContainerBuilder::register) and
/// friends. Registrations default to a fresh instance per request, owned by
/// the scope that activates it, exposed as the typed service `S`.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync { fn now(&self) -> u64; }
/// struct FixedClock(u64);
/// impl Clock for FixedClock { fn now(&self) -> u64 { self.0 } }
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register(|_, _| Ok(Arc::new(FixedClock(7)) as Arc<dyn Clock>))
///     .implemented_by::<FixedClock>()
///     .keyed("fixed")
///     .as_typed()
///     .single_instance();
///
/// let container = builder.build();
/// let typed = container.resolve::<dyn Clock>().unwrap();
/// let keyed = container.resolve_keyed::<dyn Clock>("fixed").unwrap();
/// assert!(Arc::ptr_eq(&typed, &keyed));
/// assert_eq!(typed.now(), 7);
/// ```
pub struct RegistrationBuilder<'a, S: ?Sized + 'static> {
    pending: &'a mut PendingRegistration,
    _marker: PhantomData<fn() -> Arc<S>>,
}

impl<'a, S: ?Sized + Send + Sync + 'static> RegistrationBuilder<'a, S> {
    pub(crate) fn new(pending: &'a mut PendingRegistration) -> Self {
        Self {
            pending,
            _marker: PhantomData,
        }
    }

    /// Exposes the registration under `key`. Once keyed, the registration is no
    /// longer the typed default unless [`as_typed`](Self::as_typed) is also called.
    pub fn keyed(self, key: impl Into<Arc<str>>) -> Self {
        let key = key.into();
        if !self.pending.keys.contains(&key) {
            self.pending.keys.push(key);
        }
        self
    }

    /// Keeps the typed service exposed alongside any keys.
    pub fn as_typed(self) -> Self {
        self.pending.as_typed = true;
        self
    }

    /// Display name used in dependency graphs and activation errors.
    pub fn named(self, display_name: impl Into<String>) -> Self {
        self.pending.display_name = Some(display_name.into());
        self
    }

    /// Records the concrete type behind the service; it becomes the default display name.
    pub fn implemented_by<C: ?Sized + 'static>(self) -> Self {
        self.pending.implementation_type = ServiceType::of::<C>();
        self
    }

    /// A fresh instance for every request (the default).
    pub fn instance_per_dependency(self) -> Self {
        self.pending.lifetime = Lifetime::CurrentScope;
        self.pending.sharing = Sharing::None;
        self
    }

    /// One instance for the whole container, activated in the root scope.
    pub fn single_instance(self) -> Self {
        self.pending.lifetime = Lifetime::RootScope;
        self.pending.sharing = Sharing::Shared;
        self
    }

    /// One instance per lifetime scope the request is issued in.
    pub fn instance_per_lifetime_scope(self) -> Self {
        self.pending.lifetime = Lifetime::CurrentScope;
        self.pending.sharing = Sharing::Shared;
        self
    }

    /// One instance per nearest ancestor scope carrying any of `tags`.
    pub fn instance_per_matching_lifetime_scope<I, T>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ScopeTag>,
    {
        self.pending.lifetime = Lifetime::MatchingScope(tags.into_iter().map(Into::into).collect());
        self.pending.sharing = Sharing::Shared;
        self
    }

    /// The container never disposes instances of this registration.
    pub fn externally_owned(self) -> Self {
        self.pending.ownership = Ownership::ExternallyOwned;
        self
    }

    pub fn owned_by_lifetime_scope(self) -> Self {
        self.pending.ownership = Ownership::OwnedByScope;
        self
    }

    /// Instances are disposed with [`Dispose`] when their activation scope is disposed.
    pub fn disposable(self) -> Self
    where
        S: Dispose,
    {
        self.pending.hooks.sync_disposal = Some(sync_disposal_probe::<S>());
        self
    }

    /// Instances are disposed with [`AsyncDispose`] by
    /// [`LifetimeScope::dispose_async`].
    pub fn async_disposable(self) -> Self
    where
        S: AsyncDispose,
    {
        self.pending.hooks.async_disposal = Some(Arc::new(|instance: &Instance| {
            instance.downcast::<S>().map(|value| {
                Box::new(move || -> BoxFutureUnit {
                    Box::pin(async move { AsyncDispose::dispose(&*value).await })
                }) as Box<dyn FnOnce() -> BoxFutureUnit + Send>
            })
        }));
        self
    }

    /// Instances are started on activation when
    /// [`ContainerOptions::start_on_activate`](crate::ContainerOptions::start_on_activate) is set.
    pub fn startable(self) -> Self
    where
        S: Startable,
    {
        self.pending.hooks.start = Some(Arc::new(|instance: &Instance| {
            if let Some(value) = instance.downcast::<S>() {
                Startable::start(&*value);
            }
        }));
        self
    }

    /// Runs before the instance is handed out; the handler may replace it.
    pub fn on_activating<F>(self, handler: F) -> Self
    where
        F: Fn(&ActivationContext, Arc<S>) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        self.pending.hooks.activating.push(Arc::new(move |ctx, instance| {
            let value = instance
                .downcast::<S>()
                .ok_or(DiError::TypeMismatch(std::any::type_name::<S>()))?;
            handler(ctx, value).map(Instance::new)
        }));
        self
    }

    /// Runs once the resolve operation that activated the instance has completed.
    pub fn on_activated<F>(self, handler: F) -> Self
    where
        F: Fn(&LifetimeScope, Arc<S>) + Send + Sync + 'static,
    {
        self.pending.hooks.activated.push(Arc::new(move |scope, instance| {
            if let Some(value) = instance.downcast::<S>() {
                handler(scope, value);
            }
        }));
        self
    }

    /// Adds middleware to this registration's pipeline.
    pub fn configure_pipeline<F>(self, configure: F) -> Self
    where
        F: FnOnce(&mut PipelineBuilder),
    {
        configure(&mut self.pending.pipeline);
        self
    }

    /// Resolves the registration once from the root scope when the container is built.
    pub fn auto_activate(self) -> Self {
        self.pending.auto_activate = true;
        self
    }
}

/// Fluent configuration of a decorator registration.
///
/// Decorators take the lifetime and sharing of the registration they decorate.
pub struct DecoratorBuilder<'a, S: ?Sized + 'static> {
    pending: &'a mut PendingRegistration,
    _marker: PhantomData<fn() -> Arc<S>>,
}

impl<'a, S: ?Sized + Send + Sync + 'static> DecoratorBuilder<'a, S> {
    pub(crate) fn new(pending: &'a mut PendingRegistration) -> Self {
        Self {
            pending,
            _marker: PhantomData,
        }
    }

    /// Applies the decorator only when `condition` holds for the decoration state
    /// at the point the decorator would run.
    pub fn when<F>(self, condition: F) -> Self
    where
        F: Fn(&DecoratorContext) -> bool + Send + Sync + 'static,
    {
        self.pending.kind = PendingKind::Decorator(Some(Arc::new(condition)));
        self
    }

    pub fn named(self, display_name: impl Into<String>) -> Self {
        self.pending.display_name = Some(display_name.into());
        self
    }

    pub fn implemented_by<C: ?Sized + 'static>(self) -> Self {
        self.pending.implementation_type = ServiceType::of::<C>();
        self
    }

    /// Decorator instances are disposed with [`Dispose`] by their activation scope.
    pub fn disposable(self) -> Self
    where
        S: Dispose,
    {
        self.pending.hooks.sync_disposal = Some(sync_disposal_probe::<S>());
        self
    }

    pub fn externally_owned(self) -> Self {
        self.pending.ownership = Ownership::ExternallyOwned;
        self
    }
}

fn sync_disposal_probe<S: ?Sized + Dispose>() -> SyncDisposalProbe {
    Arc::new(|instance: &Instance| {
        instance
            .downcast::<S>()
            .map(|value| Box::new(move || Dispose::dispose(&*value)) as Box<dyn FnOnce() + Send>)
    })
}
