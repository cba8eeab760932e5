//! The resolve pipeline: an ordered chain of middleware run for every request.
//!
//! Each registration compiles its own pipeline from a fixed set of phases:
//!
//! 1. **RequestStart** - circular dependency and depth guard
//! 2. **ScopeSelection** - picks the activation scope from the lifetime
//! 3. **Decoration** - applies decorators to the instance produced further down
//! 4. **Sharing** - returns or publishes the shared instance of the activation scope
//! 5. **Activation** - runs the activator, activating handlers and disposal tracking
//! 6. **ServicePipelineEnd** - forwards alias registrations to their target
//!
//! Middleware receives the request context and a [`Next`] continuation. It may
//! do work before calling `next`, after it, or skip it altogether; that is how
//! sharing returns cached instances without re-activating them.

mod decoration;
mod middleware;

use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;
use crate::options::{CircularDependencyCheck, ContainerOptions};
use crate::registration::ComponentRegistration;
use crate::resolve::ResolveRequestContext;

pub use decoration::DecoratorContext;

pub(crate) use decoration::DecorationMiddleware;
pub(crate) use middleware::{
    ActivationMiddleware, CircularDependencyDetector, ScopeSelectionMiddleware, ServicePipelineEnd,
    SharingMiddleware,
};

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelinePhase {
    RequestStart,
    ScopeSelection,
    Decoration,
    Sharing,
    Activation,
    ServicePipelineEnd,
}

/// A step of the resolve pipeline.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{
///     ContainerBuilder, DiResult, Next, PipelinePhase, ResolveMiddleware, ResolveRequestContext,
///     Resolver,
/// };
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct CountActivations(AtomicUsize);
///
/// impl ResolveMiddleware for CountActivations {
///     fn phase(&self) -> PipelinePhase {
///         PipelinePhase::Activation
///     }
///
///     fn execute(&self, context: &mut ResolveRequestContext, next: Next<'_>) -> DiResult<()> {
///         self.0.fetch_add(1, Ordering::SeqCst);
///         next.run(context)
///     }
/// }
///
/// let counter = Arc::new(CountActivations::default());
/// let middleware = counter.clone();
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register(|_, _| Ok(Arc::new(3u8)))
///     .single_instance()
///     .configure_pipeline(move |pipeline| {
///         pipeline.use_middleware(middleware);
///     });
///
/// let container = builder.build();
/// container.resolve::<u8>().unwrap();
/// container.resolve::<u8>().unwrap();
/// assert_eq!(counter.0.load(Ordering::SeqCst), 1); // second request is served by sharing
/// ```
pub trait ResolveMiddleware: Send + Sync {
    fn phase(&self) -> PipelinePhase;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn execute(&self, context: &mut ResolveRequestContext, next: Next<'_>) -> DiResult<()>;
}

/// Continuation invoking the rest of the pipeline.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn ResolveMiddleware>],
}

impl<'a> Next<'a> {
    pub fn run(self, context: &mut ResolveRequestContext) -> DiResult<()> {
        match self.remaining.split_first() {
            Some((middleware, rest)) => middleware.execute(context, Next { remaining: rest }),
            None => Ok(()),
        }
    }

    /// Whether any middleware is left after this point.
    pub fn is_end(&self) -> bool {
        self.remaining.is_empty()
    }
}

type MiddlewareFn = dyn Fn(&mut ResolveRequestContext, Next<'_>) -> DiResult<()> + Send + Sync;

struct FnMiddleware {
    phase: PipelinePhase,
    name: String,
    f: Box<MiddlewareFn>,
}

impl ResolveMiddleware for FnMiddleware {
    fn phase(&self) -> PipelinePhase {
        self.phase
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, context: &mut ResolveRequestContext, next: Next<'_>) -> DiResult<()> {
        (self.f)(context, next)
    }
}

/// Collects middleware and orders it by phase.
///
/// Ordering is stable: within a phase, middleware runs in the order it was added.
#[derive(Default)]
pub struct PipelineBuilder {
    middleware: Vec<Arc<dyn ResolveMiddleware>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_middleware(&mut self, middleware: Arc<dyn ResolveMiddleware>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Adds a closure as middleware of `phase`.
    pub fn use_fn<F>(&mut self, phase: PipelinePhase, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&mut ResolveRequestContext, Next<'_>) -> DiResult<()> + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(FnMiddleware {
            phase,
            name: name.into(),
            f: Box::new(f),
        }));
        self
    }

    pub(crate) fn into_middleware(self) -> Vec<Arc<dyn ResolveMiddleware>> {
        self.middleware
    }

    pub fn build(mut self) -> ResolvePipeline {
        self.middleware.sort_by_key(|m| m.phase());
        ResolvePipeline {
            middleware: self.middleware,
        }
    }
}

/// A compiled, immutable pipeline.
pub struct ResolvePipeline {
    middleware: Vec<Arc<dyn ResolveMiddleware>>,
}

impl ResolvePipeline {
    /// The standard pipeline of `registration` followed by its custom middleware.
    pub(crate) fn for_registration(registration: &ComponentRegistration, options: &ContainerOptions) -> Self {
        let mut builder = PipelineBuilder::new();

        if options.circular_dependency_check == CircularDependencyCheck::Enabled {
            builder.use_middleware(Arc::new(CircularDependencyDetector::new(options.max_resolve_depth)));
        }
        builder.use_middleware(Arc::new(ScopeSelectionMiddleware));

        if registration.is_adapter() {
            builder.use_middleware(Arc::new(ServicePipelineEnd));
        } else {
            if !registration.is_decorator() && !registration.is_external() {
                builder.use_middleware(Arc::new(DecorationMiddleware));
            }
            builder
                .use_middleware(Arc::new(SharingMiddleware))
                .use_middleware(Arc::new(ActivationMiddleware))
                .use_middleware(Arc::new(ServicePipelineEnd));
        }

        for middleware in registration.custom_middleware() {
            builder.use_middleware(middleware.clone());
        }
        builder.build()
    }

    pub fn invoke(&self, context: &mut ResolveRequestContext) -> DiResult<()> {
        Next {
            remaining: &self.middleware,
        }
        .run(context)
    }

    /// Phase and name of each middleware, in execution order.
    pub fn describe(&self) -> Vec<(PipelinePhase, String)> {
        self.middleware
            .iter()
            .map(|m| (m.phase(), m.name().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

impl fmt::Debug for ResolvePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_orders_by_phase_and_keeps_insertion_order_within_a_phase() {
        let mut builder = PipelineBuilder::new();
        builder
            .use_fn(PipelinePhase::Activation, "activate", |ctx, next| next.run(ctx))
            .use_fn(PipelinePhase::RequestStart, "first", |ctx, next| next.run(ctx))
            .use_fn(PipelinePhase::Sharing, "share", |ctx, next| next.run(ctx))
            .use_fn(PipelinePhase::RequestStart, "second", |ctx, next| next.run(ctx));

        let names: Vec<String> = builder.build().describe().into_iter().map(|(_, name)| name).collect();
        assert_eq!(names, ["first", "second", "share", "activate"]);
    }
}
