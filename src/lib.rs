//! # ferrous-scopes
//!
//! Dependency resolution for Rust built around a tree of lifetime scopes and
//! a per-registration resolve pipeline.
//!
//! ## Features
//!
//! - **Lifetime scopes**: instances shared per dependency, per scope, per tagged
//!   scope, or from the root
//! - **Deterministic disposal**: scopes dispose what they own in reverse
//!   creation order, children first, synchronously or asynchronously
//! - **Circular dependency detection**: cycles fail with the dependency graph
//!   instead of overflowing the stack
//! - **Decorators**: wrap every resolved instance of a service, conditionally
//! - **Pipelines**: every registration resolves through an ordered middleware
//!   chain that can be extended per registration
//! - **Thread-safe sharing**: shared instances are created at most once per
//!   scope even under contention
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_scopes::{ContainerBuilder, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register_instance(Arc::new(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! }));
//! builder.register(|ctx, _| Ok(Arc::new(UserService { db: ctx.resolve()? })));
//!
//! let container = builder.build();
//! let users = container.resolve::<UserService>().unwrap();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Lifetimes
//!
//! - **Instance per dependency**: a fresh instance on every request (default)
//! - **Single instance**: one instance, shared from the root scope
//! - **Instance per lifetime scope**: one instance per scope that resolves it
//! - **Instance per matching lifetime scope**: one instance per nearest ancestor
//!   scope carrying one of the given tags
//!
//! ```rust
//! use ferrous_scopes::{ContainerBuilder, Resolver};
//! use std::sync::Arc;
//!
//! struct UnitOfWork;
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .register(|_, _| Ok(Arc::new(UnitOfWork)))
//!     .instance_per_matching_lifetime_scope(["request"]);
//! let container = builder.build();
//!
//! let request = container.begin_tagged_lifetime_scope("request");
//! let nested = request.begin_lifetime_scope();
//! assert!(Arc::ptr_eq(
//!     &request.resolve::<UnitOfWork>().unwrap(),
//!     &nested.resolve::<UnitOfWork>().unwrap()
//! ));
//!
//! // No tagged ancestor
//! assert!(container.resolve::<UnitOfWork>().is_err());
//! ```
//!
//! ## Trait Objects
//!
//! ```rust
//! use ferrous_scopes::{ContainerBuilder, Resolver};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("[LOG] {}", message)
//!     }
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .register(|_, _| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>))
//!     .implemented_by::<ConsoleLogger>()
//!     .single_instance();
//!
//! let container = builder.build();
//! let logger = container.resolve::<dyn Logger>().unwrap();
//! assert_eq!(logger.log("hello"), "[LOG] hello");
//! ```

pub mod builder;
pub mod container;
pub mod diagnostics;
pub mod error;
pub mod instance;
pub mod lifetime;
pub mod options;
pub mod parameters;
pub mod pipeline;
pub mod registration;
pub mod resolve;
pub mod scope;
pub mod service;
pub mod traits;

pub use builder::{ContainerBuilder, ContainerBuilderModuleExt, ContainerModule};
pub use container::Container;
pub use diagnostics::{ResolveObserver, TracingObserver};
pub use error::{DiError, DiResult, ErrorKind, FactoryError};
pub use instance::Instance;
pub use lifetime::{Lifetime, Ownership, ScopeTag, Sharing};
pub use options::{
    CircularDependencyCheck, ContainerOptions, DEFAULT_MAX_RESOLVE_DEPTH, ENV_CIRCULAR_CHECK,
    ENV_MAX_RESOLVE_DEPTH, ENV_START_ON_ACTIVATE,
};
pub use parameters::{Parameter, Parameters};
pub use pipeline::{DecoratorContext, Next, PipelineBuilder, PipelinePhase, ResolveMiddleware, ResolvePipeline};
pub use registration::{
    Activator, ComponentRegistration, ComponentRegistry, DecoratorBuilder, DelegateActivator,
    ProvidedInstanceActivator, RegistrationBuilder, RegistrationId, RegistrationSource, SourceRegistrations,
};
pub use resolve::{ActivationContext, ResolveOperation, ResolveRequestContext};
pub use scope::{LifetimeScope, Owned, ROOT_TAG};
pub use service::{DecoratorCondition, Service, ServiceType};
pub use traits::{AsyncDispose, Dispose, Resolver, ResolverCore, Startable};
