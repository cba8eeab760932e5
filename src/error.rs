//! Error types for the resolve pipeline and lifetime scopes.

use std::fmt;
use std::sync::Arc;

/// Resolution errors
///
/// Every failure surfaced by [`Resolver`](crate::Resolver) calls is a `DiError`.
/// Use [`DiError::kind`] to branch on the category without matching payloads,
/// or match the variants directly when the structured context matters.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{ContainerBuilder, DiError, ErrorKind, Resolver};
///
/// let container = ContainerBuilder::new().build();
/// match container.resolve::<String>() {
///     Err(err @ DiError::ServiceNotRegistered(_)) => {
///         assert_eq!(err.kind(), ErrorKind::ServiceNotRegistered);
///         assert!(err.is_recoverable());
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_scopes::DiError;
///
/// let circular = DiError::CircularDependency { graph: "A -> B".to_string() };
/// let depth = DiError::MaxDepthExceeded(50);
///
/// println!("Error: {}", circular);
/// println!("Error: {}", depth);
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// No registration (explicit or from a registration source) satisfies the service
    #[error("the requested service '{0}' has not been registered")]
    ServiceNotRegistered(String),
    /// A single default was demanded but several registrations exist
    #[error("the requested service '{service}' has {count} registrations but exactly one was required")]
    ServiceRegisteredMultipleTimes { service: String, count: usize },
    /// A registration was requested while already on the resolve stack
    #[error("circular component dependency detected: {graph}")]
    CircularDependency { graph: String },
    /// The operation nested deeper than the configured maximum
    #[error("maximum resolve depth of {0} exceeded; check for deep or unbounded dependency chains")]
    MaxDepthExceeded(usize),
    /// A matching-scope lifetime found no tagged ancestor
    #[error("no lifetime scope in the hierarchy matches tag(s) [{tags}] while resolving '{service}'")]
    LifetimeScopeNotFound { tags: String, service: String },
    /// An activator failed; `chain` lists activator display names, innermost last
    #[error("an error occurred while activating {}: {source}", .chain.join(" -> "))]
    ActivationFailed {
        chain: Vec<String>,
        #[source]
        source: Box<DiError>,
    },
    /// The lifetime scope was disposed before or during the request
    #[error("lifetime scope {scope} has been disposed")]
    DisposedScopeAccessed { scope: String },
    /// Type downcast failed
    #[error("type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Error returned by user code inside an activator or handler
    #[error("{0}")]
    Factory(FactoryError),
    /// The pipeline broke one of its own guarantees
    #[error("internal invariant violated: {0}")]
    InvariantViolated(&'static str),
    /// Container options could not be read
    #[error("invalid configuration value for {key}: {message}")]
    Configuration { key: String, message: String },
}

/// Category of a [`DiError`], for matching recoverable vs fatal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ServiceNotRegistered,
    ServiceRegisteredMultipleTimes,
    CircularDependency,
    MaxDepthExceeded,
    LifetimeScopeNotFound,
    ActivationFailed,
    DisposedScopeAccessed,
    TypeMismatch,
    Factory,
    InvariantViolated,
    Configuration,
}

impl DiError {
    /// Wraps an arbitrary user error raised inside a factory.
    pub fn factory<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DiError::Factory(FactoryError(Arc::new(error)))
    }

    /// Builds a factory error from a plain message.
    pub fn factory_message(message: impl Into<String>) -> Self {
        DiError::Factory(FactoryError(Arc::new(MessageError(message.into()))))
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiError::ServiceNotRegistered(_) => ErrorKind::ServiceNotRegistered,
            DiError::ServiceRegisteredMultipleTimes { .. } => ErrorKind::ServiceRegisteredMultipleTimes,
            DiError::CircularDependency { .. } => ErrorKind::CircularDependency,
            DiError::MaxDepthExceeded(_) => ErrorKind::MaxDepthExceeded,
            DiError::LifetimeScopeNotFound { .. } => ErrorKind::LifetimeScopeNotFound,
            DiError::ActivationFailed { .. } => ErrorKind::ActivationFailed,
            DiError::DisposedScopeAccessed { .. } => ErrorKind::DisposedScopeAccessed,
            DiError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            DiError::Factory(_) => ErrorKind::Factory,
            DiError::InvariantViolated(_) => ErrorKind::InvariantViolated,
            DiError::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// Only a missing registration is something callers are expected to recover from
    /// (optional dependencies, fallbacks). Everything else is a configuration or
    /// hosting problem.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DiError::ServiceNotRegistered(_))
    }

    /// The innermost error, looking through activation wrappers.
    pub fn root_cause(&self) -> &DiError {
        match self {
            DiError::ActivationFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Errors that must reach the caller verbatim instead of being wrapped in
    /// [`DiError::ActivationFailed`].
    pub(crate) fn passes_through_activation(&self) -> bool {
        matches!(
            self,
            DiError::CircularDependency { .. }
                | DiError::MaxDepthExceeded(_)
                | DiError::DisposedScopeAccessed { .. }
        )
    }

    /// Wraps this error as a failure of the activator named `display_name`,
    /// concatenating chains when the error is itself an activation failure.
    pub(crate) fn within_activator(self, display_name: &str) -> DiError {
        if self.passes_through_activation() {
            return self;
        }
        match self {
            DiError::ActivationFailed { mut chain, source } => {
                chain.insert(0, display_name.to_string());
                DiError::ActivationFailed { chain, source }
            }
            other => DiError::ActivationFailed {
                chain: vec![display_name.to_string()],
                source: Box::new(other),
            },
        }
    }
}

/// Shared, clonable handle to a user error raised inside a factory.
#[derive(Clone)]
pub struct FactoryError(Arc<dyn std::error::Error + Send + Sync>);

impl FactoryError {
    /// The wrapped user error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Debug for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MessageError {}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout ferrous-scopes.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{DiResult, DiError};
///
/// fn create_service() -> DiResult<String> {
///     Ok("service created".to_string())
/// }
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::ServiceNotRegistered("some_service".to_string()))
/// }
///
/// assert!(create_service().is_ok());
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
