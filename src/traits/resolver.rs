//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::parameters::Parameters;
use crate::service::Service;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`Container`](crate::Container), [`LifetimeScope`](crate::LifetimeScope)
/// and the [`ActivationContext`](crate::ActivationContext) handed to activators. Every
/// call runs inside a resolve operation: a new one when none is active on the calling
/// thread, the ambient one otherwise, so circular dependency detection and depth
/// tracking span nested calls.
///
/// Most users should use the [`Resolver`] trait instead, which provides typed
/// helpers built on top of this trait.
pub trait ResolverCore {
    /// Resolves the default registration of `service`.
    ///
    /// # Returns
    ///
    /// * `Ok(Instance)` - The resolved instance
    /// * `Err(DiError)` - Resolution error (not registered, circular, disposed scope, etc.)
    fn resolve_service(&self, service: &Service, parameters: Parameters) -> DiResult<Instance>;

    /// Resolves every registration of `service`, in registration order.
    ///
    /// An unregistered service yields an empty list.
    fn resolve_all_services(&self, service: &Service) -> DiResult<Vec<Instance>>;

    /// Resolves `service`, failing with
    /// [`DiError::ServiceRegisteredMultipleTimes`] when more than one registration exists.
    fn resolve_unique_service(&self, service: &Service) -> DiResult<Instance>;

    /// Whether any registration (explicit or from a registration source) provides `service`.
    fn is_service_registered(&self, service: &Service) -> bool;
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// Available on everything that implements [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_instance(Arc::new(42usize));
/// builder.register(|_, _| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>));
///
/// let container = builder.build();
///
/// let number = container.resolve::<usize>().unwrap();
/// assert_eq!(*number, 42);
///
/// let logger = container.resolve::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("resolved"), "LOG: resolved");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the default registration of `T`.
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let instance = self.resolve_service(&Service::typed::<T>(), Parameters::new())?;
        downcast_instance(&instance)
    }

    /// Resolves the registration of `T` stored under `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_scopes::{ContainerBuilder, Resolver};
    /// use std::sync::Arc;
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.register_instance(Arc::new(5432u16)).keyed("db_port");
    /// builder.register_instance(Arc::new(6379u16)).keyed("cache_port");
    ///
    /// let container = builder.build();
    /// assert_eq!(*container.resolve_keyed::<u16>("cache_port").unwrap(), 6379);
    /// assert!(container.resolve::<u16>().is_err());
    /// ```
    fn resolve_keyed<T: ?Sized + Send + Sync + 'static>(&self, key: &str) -> DiResult<Arc<T>> {
        let instance = self.resolve_service(&Service::keyed::<T>(key), Parameters::new())?;
        downcast_instance(&instance)
    }

    /// Resolves `T`, handing `parameters` to its activator.
    fn resolve_with<T: ?Sized + Send + Sync + 'static>(&self, parameters: Parameters) -> DiResult<Arc<T>> {
        let instance = self.resolve_service(&Service::typed::<T>(), parameters)?;
        downcast_instance(&instance)
    }

    /// Resolves `T` if it is registered.
    ///
    /// Only [`DiError::ServiceNotRegistered`] for `T` itself becomes `None`; a missing
    /// dependency deeper in the graph still fails the call.
    fn resolve_optional<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        match self.resolve::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(DiError::ServiceNotRegistered(_)) if !self.is_registered::<T>() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Resolves every registration of `T` in registration order.
    fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.resolve_all_services(&Service::typed::<T>())?
            .iter()
            .map(downcast_instance)
            .collect()
    }

    /// Resolves `T`, requiring exactly one registration.
    fn resolve_unique<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let instance = self.resolve_unique_service(&Service::typed::<T>())?;
        downcast_instance(&instance)
    }

    fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.is_service_registered(&Service::typed::<T>())
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

fn downcast_instance<T: ?Sized + Send + Sync + 'static>(instance: &Instance) -> DiResult<Arc<T>> {
    instance
        .downcast::<T>()
        .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
}
