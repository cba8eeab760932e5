//! Lifetime, sharing and ownership policies of a registration.

use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::scope::LifetimeScope;
use crate::service::Service;

/// Tag attached to a lifetime scope, matched literally by
/// [`Lifetime::MatchingScope`].
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::ScopeTag;
///
/// let tag = ScopeTag::from("request");
/// assert_eq!(tag.as_str(), "request");
/// assert_eq!(tag, ScopeTag::new(String::from("request")));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ScopeTag(Arc<str>);

impl ScopeTag {
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScopeTag {
    fn from(tag: &str) -> Self {
        Self(Arc::from(tag))
    }
}

impl From<String> for ScopeTag {
    fn from(tag: String) -> Self {
        Self(Arc::from(tag))
    }
}

impl fmt::Debug for ScopeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for ScopeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which lifetime scope an instance is activated in (and cached in, when shared).
///
/// # Lifetime Characteristics
///
/// - **CurrentScope**: the scope the request was issued in
/// - **RootScope**: the root of the tree, shared by every scope
/// - **MatchingScope**: the nearest ancestor (or self) carrying one of the tags
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Database;
/// struct UnitOfWork;
///
/// let mut builder = ContainerBuilder::new();
/// builder.register(|_, _| Ok(Arc::new(Database))).single_instance();
/// builder
///     .register(|_, _| Ok(Arc::new(UnitOfWork)))
///     .instance_per_matching_lifetime_scope(["request"]);
///
/// let container = builder.build();
/// let request = container.begin_tagged_lifetime_scope("request");
/// let nested = request.begin_lifetime_scope();
///
/// // Root-scoped: one instance everywhere
/// assert!(Arc::ptr_eq(
///     &container.resolve::<Database>().unwrap(),
///     &nested.resolve::<Database>().unwrap()
/// ));
/// // Matching scope: shared across the tagged subtree
/// assert!(Arc::ptr_eq(
///     &request.resolve::<UnitOfWork>().unwrap(),
///     &nested.resolve::<UnitOfWork>().unwrap()
/// ));
/// // No tagged ancestor: failure
/// assert!(container.resolve::<UnitOfWork>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifetime {
    CurrentScope,
    RootScope,
    MatchingScope(Vec<ScopeTag>),
}

impl Lifetime {
    /// Picks the activation scope for a request issued in `most_nested`.
    pub(crate) fn find_scope(&self, most_nested: &LifetimeScope, service: &Service) -> DiResult<LifetimeScope> {
        match self {
            Lifetime::CurrentScope => Ok(most_nested.clone()),
            Lifetime::RootScope => Ok(most_nested.root_scope()),
            Lifetime::MatchingScope(tags) => {
                let mut next = Some(most_nested.clone());
                while let Some(scope) = next {
                    if scope.tag().map_or(false, |tag| tags.contains(tag)) {
                        return Ok(scope);
                    }
                    next = scope.parent();
                }
                Err(DiError::LifetimeScopeNotFound {
                    tags: tags
                        .iter()
                        .map(|tag| tag.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                    service: service.description(),
                })
            }
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::CurrentScope => f.write_str("current-scope"),
            Lifetime::RootScope => f.write_str("root-scope"),
            Lifetime::MatchingScope(tags) => {
                let tags: Vec<&str> = tags.iter().map(ScopeTag::as_str).collect();
                write!(f, "matching-scope({})", tags.join(", "))
            }
        }
    }
}

/// Whether activated instances are cached in their activation scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sharing {
    /// Fresh instance per request
    None,
    /// One instance per activation scope
    Shared,
}

/// Whether the activation scope disposes the instances it activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    OwnedByScope,
    ExternallyOwned,
}
