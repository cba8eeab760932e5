//! Resolve operations: the bookkeeping of one external resolve call.
//!
//! An operation lives for one top-level `resolve` and every nested request it
//! triggers (dependencies, decorators, alias targets). It is installed as the
//! thread's ambient operation while it runs, so a resolve issued on any scope
//! from inside an activator joins it instead of starting a fresh one. That
//! keeps the request stack, and with it cycle detection, intact across nested
//! calls.

mod context;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug_span, trace};

use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::parameters::Parameters;
use crate::registration::{ComponentRegistration, RegistrationId};
use crate::scope::LifetimeScope;
use crate::service::Service;

pub use context::{ActivationContext, ResolveRequestContext};

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static AMBIENT_OPERATION: RefCell<Option<ResolveOperation>> = RefCell::new(None);
}

/// Work deferred until the operation completes successfully.
pub(crate) type Completion = Box<dyn FnOnce()>;

struct RequestFrame {
    registration: RegistrationId,
    display_name: String,
}

struct OperationState {
    id: u64,
    stack: RefCell<Vec<RequestFrame>>,
    completions: RefCell<Vec<Completion>>,
}

/// Handle to the resolve operation a request belongs to.
///
/// Operations are bound to the thread that started them.
#[derive(Clone)]
pub struct ResolveOperation {
    state: Rc<OperationState>,
}

/// What to resolve, with which registration, from which scope.
pub(crate) struct ResolveRequest {
    pub(crate) service: Service,
    pub(crate) registration: Arc<ComponentRegistration>,
    pub(crate) decorator_target: Option<Arc<ComponentRegistration>>,
    pub(crate) parameters: Parameters,
    pub(crate) scope: LifetimeScope,
}

impl ResolveRequest {
    pub(crate) fn new(service: Service, registration: Arc<ComponentRegistration>, scope: LifetimeScope) -> Self {
        Self {
            service,
            registration,
            decorator_target: None,
            parameters: Parameters::new(),
            scope,
        }
    }

    pub(crate) fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Marks the request as a decorator standing in for `target`.
    pub(crate) fn decorating(mut self, target: Arc<ComponentRegistration>) -> Self {
        self.decorator_target = Some(target);
        self
    }
}

/// Pops the request frame pushed by [`ResolveOperation::enter_request`].
pub(crate) struct RequestFrameGuard {
    operation: ResolveOperation,
}

impl Drop for RequestFrameGuard {
    fn drop(&mut self) {
        self.operation.state.stack.borrow_mut().pop();
    }
}

struct AmbientGuard;

impl AmbientGuard {
    fn install(operation: ResolveOperation) -> Self {
        AMBIENT_OPERATION.with(|slot| *slot.borrow_mut() = Some(operation));
        AmbientGuard
    }
}

impl Drop for AmbientGuard {
    fn drop(&mut self) {
        AMBIENT_OPERATION.with(|slot| slot.borrow_mut().take());
    }
}

impl ResolveOperation {
    fn new() -> Self {
        Self {
            state: Rc::new(OperationState {
                id: NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed),
                stack: RefCell::new(Vec::new()),
                completions: RefCell::new(Vec::new()),
            }),
        }
    }

    fn ambient() -> Option<ResolveOperation> {
        AMBIENT_OPERATION.with(|slot| slot.borrow().clone())
    }

    /// Runs `f` inside the ambient operation, starting one for `scope` when the
    /// thread has none. A started operation runs its completions once `f`
    /// succeeds, or drops them when it fails.
    pub(crate) fn execute<T, F>(scope: &LifetimeScope, f: F) -> DiResult<T>
    where
        F: FnOnce(&ResolveOperation) -> DiResult<T>,
    {
        if let Some(operation) = Self::ambient() {
            return f(&operation);
        }

        let operation = ResolveOperation::new();
        let _ambient = AmbientGuard::install(operation.clone());
        let span = debug_span!("resolve_operation", operation = operation.id(), scope = %scope);
        let _entered = span.enter();

        let observers = scope.observers();
        observers.operation_starting(operation.id());

        let result = f(&operation);
        match &result {
            Ok(_) => {
                operation.complete();
                observers.operation_succeeded(operation.id());
            }
            Err(error) => {
                operation.state.completions.borrow_mut().clear();
                observers.operation_failed(operation.id(), error);
            }
        }
        result
    }

    pub fn id(&self) -> u64 {
        self.state.id
    }

    /// Number of requests currently in flight.
    pub fn depth(&self) -> usize {
        self.state.stack.borrow().len()
    }

    /// Activator display names of the in-flight requests, outermost first.
    pub fn request_stack(&self) -> Vec<String> {
        self.state
            .stack
            .borrow()
            .iter()
            .map(|frame| frame.display_name.clone())
            .collect()
    }

    /// Pushes a frame for `registration`, failing when it is already in flight
    /// or when the stack is at `max_depth`.
    pub(crate) fn enter_request(
        &self,
        registration: &ComponentRegistration,
        max_depth: usize,
    ) -> DiResult<RequestFrameGuard> {
        let mut stack = self.state.stack.borrow_mut();

        if let Some(position) = stack.iter().position(|frame| frame.registration == registration.id()) {
            let graph = stack[position..]
                .iter()
                .map(|frame| frame.display_name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(DiError::CircularDependency { graph });
        }
        if stack.len() >= max_depth {
            return Err(DiError::MaxDepthExceeded(max_depth));
        }

        stack.push(RequestFrame {
            registration: registration.id(),
            display_name: registration.display_name().to_string(),
        });
        Ok(RequestFrameGuard {
            operation: self.clone(),
        })
    }

    pub(crate) fn defer(&self, completion: Completion) {
        self.state.completions.borrow_mut().push(completion);
    }

    /// Runs deferred completions in the order they were queued, including any
    /// queued while running them.
    fn complete(&self) {
        loop {
            let pending = std::mem::take(&mut *self.state.completions.borrow_mut());
            if pending.is_empty() {
                break;
            }
            for completion in pending {
                completion();
            }
        }
    }

    /// Resolves the default registration of `service` from `scope`.
    pub(crate) fn resolve_service(
        &self,
        scope: &LifetimeScope,
        service: &Service,
        parameters: Parameters,
    ) -> DiResult<Instance> {
        scope.ensure_active()?;
        let registration = scope
            .registry()
            .registration_for(service)
            .ok_or_else(|| DiError::ServiceNotRegistered(service.description()))?;
        self.resolve_request(ResolveRequest::new(service.clone(), registration, scope.clone()).with_parameters(parameters))
    }

    pub(crate) fn resolve_all(&self, scope: &LifetimeScope, service: &Service) -> DiResult<Vec<Instance>> {
        scope.ensure_active()?;
        scope
            .registry()
            .registrations_for(service)
            .into_iter()
            .map(|registration| self.resolve_request(ResolveRequest::new(service.clone(), registration, scope.clone())))
            .collect()
    }

    pub(crate) fn resolve_unique(&self, scope: &LifetimeScope, service: &Service) -> DiResult<Instance> {
        scope.ensure_active()?;
        let registration = scope.registry().registration_for_unique(service)?;
        self.resolve_request(ResolveRequest::new(service.clone(), registration, scope.clone()))
    }

    /// Runs the pipeline of the request's registration.
    pub(crate) fn resolve_request(&self, request: ResolveRequest) -> DiResult<Instance> {
        let registration = request.registration.clone();
        let scope = request.scope.clone();
        let observers = scope.observers();
        let started = observers.is_active().then(Instant::now);

        trace!(
            service = %request.service,
            activator = registration.display_name(),
            depth = self.depth(),
            "resolve request"
        );
        observers.request_starting(&request.service, registration.display_name(), self.depth());

        let service = request.service.clone();
        let pipeline = registration.pipeline(scope.options());
        let mut context = ResolveRequestContext::new(self.clone(), request);
        let result = pipeline.invoke(&mut context).and_then(|()| {
            context
                .take_instance()
                .ok_or(DiError::InvariantViolated("pipeline completed without producing an instance"))
        });

        match &result {
            Ok(_) => observers.request_succeeded(
                &service,
                registration.display_name(),
                started.map(|s| s.elapsed()).unwrap_or_default(),
            ),
            Err(error) => observers.request_failed(&service, registration.display_name(), error),
        }
        result
    }
}

impl fmt::Debug for ResolveOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOperation")
            .field("id", &self.state.id)
            .field("stack", &self.request_stack())
            .finish()
    }
}
