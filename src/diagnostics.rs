//! Observation hooks for resolve operations.
//!
//! Observers receive synchronous callbacks as operations and requests start
//! and finish. Keep implementations cheap: they run on the resolving thread,
//! inside the pipeline.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::DiError;
use crate::service::Service;

/// Observer of resolve operations and the requests within them.
///
/// Every method has an empty default, so implementations only override what
/// they need.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{ContainerBuilder, Resolver, ResolveObserver, Service};
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<String>>);
///
/// impl ResolveObserver for Recorder {
///     fn request_starting(&self, _service: &Service, activator: &str, depth: usize) {
///         self.0.lock().unwrap().push(format!("{depth}:{activator}"));
///     }
/// }
///
/// struct Engine;
/// struct Car(Arc<Engine>);
///
/// let recorder = Arc::new(Recorder::default());
/// let mut builder = ContainerBuilder::new();
/// builder.add_observer(recorder.clone());
/// builder.register(|_, _| Ok(Arc::new(Engine)));
/// builder.register(|ctx, _| Ok(Arc::new(Car(ctx.resolve::<Engine>()?))));
///
/// let container = builder.build();
/// container.resolve::<Car>().unwrap();
/// assert_eq!(*recorder.0.lock().unwrap(), vec!["0:Car", "1:Engine"]);
/// ```
pub trait ResolveObserver: Send + Sync {
    fn operation_starting(&self, _operation: u64) {}

    fn operation_succeeded(&self, _operation: u64) {}

    fn operation_failed(&self, _operation: u64, _error: &DiError) {}

    /// A request is entering the pipeline of the registration whose activator
    /// is `activator`. `depth` is the number of requests already in flight.
    fn request_starting(&self, _service: &Service, _activator: &str, _depth: usize) {}

    fn request_succeeded(&self, _service: &Service, _activator: &str, _duration: Duration) {}

    fn request_failed(&self, _service: &Service, _activator: &str, _error: &DiError) {}
}

/// Registered observers of a container.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ResolveObserver>>,
}

impl Observers {
    pub(crate) fn new(observers: Vec<Arc<dyn ResolveObserver>>) -> Self {
        Self { observers }
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn operation_starting(&self, operation: u64) {
        for observer in &self.observers {
            observer.operation_starting(operation);
        }
    }

    pub(crate) fn operation_succeeded(&self, operation: u64) {
        for observer in &self.observers {
            observer.operation_succeeded(operation);
        }
    }

    pub(crate) fn operation_failed(&self, operation: u64, error: &DiError) {
        for observer in &self.observers {
            observer.operation_failed(operation, error);
        }
    }

    pub(crate) fn request_starting(&self, service: &Service, activator: &str, depth: usize) {
        for observer in &self.observers {
            observer.request_starting(service, activator, depth);
        }
    }

    pub(crate) fn request_succeeded(&self, service: &Service, activator: &str, duration: Duration) {
        for observer in &self.observers {
            observer.request_succeeded(service, activator, duration);
        }
    }

    pub(crate) fn request_failed(&self, service: &Service, activator: &str, error: &DiError) {
        for observer in &self.observers {
            observer.request_failed(service, activator, error);
        }
    }
}

/// Forwards resolve events to `tracing`.
///
/// Operations are logged at `debug`, requests at `trace`, failures at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ResolveObserver for TracingObserver {
    fn operation_starting(&self, operation: u64) {
        debug!(operation, "resolve operation starting");
    }

    fn operation_succeeded(&self, operation: u64) {
        debug!(operation, "resolve operation succeeded");
    }

    fn operation_failed(&self, operation: u64, error: &DiError) {
        warn!(operation, kind = ?error.kind(), %error, "resolve operation failed");
    }

    fn request_starting(&self, service: &Service, activator: &str, depth: usize) {
        trace!(%service, activator, depth, "request starting");
    }

    fn request_succeeded(&self, service: &Service, activator: &str, duration: Duration) {
        trace!(%service, activator, ?duration, "request succeeded");
    }

    fn request_failed(&self, service: &Service, activator: &str, error: &DiError) {
        trace!(%service, activator, %error, "request failed");
    }
}

/// One line per registration: id, activator, services, lifetime, sharing, ownership.
#[cfg(feature = "diagnostics")]
pub(crate) fn describe_registrations(registry: &crate::registration::ComponentRegistry) -> String {
    let mut out = String::new();
    out.push_str("=== Registrations ===\n");
    for registration in registry.iter() {
        out.push_str(&format!("  {}\n", registration));
    }
    out
}
