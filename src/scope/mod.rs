//! Lifetime scopes: the tree governing instance sharing and disposal.

mod disposer;
mod owned;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::diagnostics::Observers;
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::lifetime::ScopeTag;
use crate::options::ContainerOptions;
use crate::parameters::Parameters;
use crate::registration::{ComponentRegistry, RegistrationId};
use crate::resolve::ResolveOperation;
use crate::service::Service;
use crate::traits::{Resolver, ResolverCore};

pub use owned::Owned;

pub(crate) use disposer::{AsyncDisposeFn, BoxFutureUnit, DisposeBag, Disposer, SyncDisposeFn};

/// Tag of the root scope of every container.
pub const ROOT_TAG: &str = "root";

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by every scope of one container.
pub(crate) struct ContainerShared {
    pub(crate) registry: ComponentRegistry,
    pub(crate) options: ContainerOptions,
    pub(crate) observers: Observers,
}

/// Key of a shared instance within a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SharingKey {
    registration: RegistrationId,
    decorator_target: Option<RegistrationId>,
}

impl SharingKey {
    pub(crate) fn new(registration: RegistrationId, decorator_target: Option<RegistrationId>) -> Self {
        Self {
            registration,
            decorator_target,
        }
    }
}

impl fmt::Display for SharingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decorator_target {
            Some(target) => write!(f, "{} over {}", self.registration, target),
            None => write!(f, "{}", self.registration),
        }
    }
}

struct ScopeInner {
    id: u64,
    tag: Option<ScopeTag>,
    parent: Option<LifetimeScope>,
    depth: usize,
    shared: Arc<ContainerShared>,
    children: Mutex<Vec<Weak<ScopeInner>>>,
    instances: Mutex<HashMap<SharingKey, Arc<OnceCell<Instance>>>>,
    disposer: Mutex<DisposeBag>,
    disposed: AtomicBool,
}

/// A node in the tree of lifetime scopes.
///
/// Each scope caches the shared instances activated in it and disposes the
/// instances it owns when it is disposed. Child scopes keep their parent alive;
/// disposing a scope disposes its children first. Handles are cheap to clone
/// and refer to the same scope.
///
/// Scopes are never disposed by `Drop`; call [`dispose`](Self::dispose) or
/// [`dispose_async`](Self::dispose_async).
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct RequestState;
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .register(|_, _| Ok(Arc::new(RequestState)))
///     .instance_per_lifetime_scope();
/// let container = builder.build();
///
/// let first = container.begin_lifetime_scope();
/// let second = container.begin_lifetime_scope();
///
/// assert!(Arc::ptr_eq(
///     &first.resolve::<RequestState>().unwrap(),
///     &first.resolve::<RequestState>().unwrap()
/// ));
/// assert!(!Arc::ptr_eq(
///     &first.resolve::<RequestState>().unwrap(),
///     &second.resolve::<RequestState>().unwrap()
/// ));
///
/// first.dispose();
/// assert!(first.resolve::<RequestState>().is_err());
/// ```
#[derive(Clone)]
pub struct LifetimeScope {
    inner: Arc<ScopeInner>,
}

impl LifetimeScope {
    pub(crate) fn root(shared: Arc<ContainerShared>) -> Self {
        let scope = Self::new(Some(ScopeTag::from(ROOT_TAG)), None, shared);
        debug!(scope = %scope, "created root lifetime scope");
        scope
    }

    fn new(tag: Option<ScopeTag>, parent: Option<LifetimeScope>, shared: Arc<ContainerShared>) -> Self {
        let depth = parent.as_ref().map_or(0, |p| p.inner.depth + 1);
        Self {
            inner: Arc::new(ScopeInner {
                id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
                tag,
                parent,
                depth,
                shared,
                children: Mutex::new(Vec::new()),
                instances: Mutex::new(HashMap::new()),
                disposer: Mutex::new(DisposeBag::default()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Begins an untagged child scope.
    pub fn begin_lifetime_scope(&self) -> LifetimeScope {
        self.begin_child(None)
    }

    /// Begins a child scope carrying `tag`, for matching-scope lifetimes.
    pub fn begin_tagged_lifetime_scope(&self, tag: impl Into<ScopeTag>) -> LifetimeScope {
        self.begin_child(Some(tag.into()))
    }

    fn begin_child(&self, tag: Option<ScopeTag>) -> LifetimeScope {
        let child = LifetimeScope::new(tag, Some(self.clone()), self.inner.shared.clone());
        {
            let mut children = self.inner.children.lock();
            if self.is_disposed() {
                child.inner.disposed.store(true, Ordering::Release);
                warn!(parent = %self, "began a lifetime scope under a disposed scope");
                return child;
            }
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        debug!(scope = %child, "began lifetime scope");
        child
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn tag(&self) -> Option<&ScopeTag> {
        self.inner.tag.as_ref()
    }

    pub fn parent(&self) -> Option<LifetimeScope> {
        self.inner.parent.clone()
    }

    /// The root of the tree this scope belongs to.
    pub fn root_scope(&self) -> LifetimeScope {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Distance from the root; the root is at depth 0.
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    /// Tags from the root down to this scope, joined by `/`. Untagged scopes
    /// appear as `#<id>`.
    pub fn path(&self) -> String {
        let mut segments = Vec::with_capacity(self.inner.depth + 1);
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            segments.push(match scope.tag() {
                Some(tag) => tag.to_string(),
                None => format!("#{}", scope.id()),
            });
            current = scope.parent();
        }
        segments.reverse();
        segments.join("/")
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn ptr_eq(&self, other: &LifetimeScope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.inner.shared.registry
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.shared.options
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.inner.shared.observers
    }

    pub(crate) fn ensure_active(&self) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::DisposedScopeAccessed { scope: self.path() });
        }
        Ok(())
    }

    /// Resolves `S` in a new child scope owned by the returned value.
    pub fn resolve_owned<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Owned<S>> {
        let scope = self.begin_lifetime_scope();
        match scope.resolve::<S>() {
            Ok(value) => Ok(Owned::new(value, scope)),
            Err(err) => {
                scope.dispose();
                Err(err)
            }
        }
    }

    pub(crate) fn try_get_shared_instance(&self, key: &SharingKey) -> Option<Instance> {
        let cell = self.inner.instances.lock().get(key).cloned()?;
        cell.get().cloned()
    }

    /// Returns the instance shared under `key`, running `factory` to create it
    /// when absent. Concurrent callers for the same key wait for the first one
    /// and receive its instance; `factory` runs at most once per successful
    /// creation. The map lock is not held while `factory` runs.
    pub(crate) fn create_shared_instance<F>(&self, key: SharingKey, factory: F) -> DiResult<Instance>
    where
        F: FnOnce() -> DiResult<Instance>,
    {
        self.ensure_active()?;
        let cell = {
            let mut instances = self.inner.instances.lock();
            instances
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        let instance = cell.get_or_try_init(|| {
            debug!(scope = %self, registration = %key, "creating shared instance");
            factory()
        })?;
        Ok(instance.clone())
    }

    /// Tracks `instance` for disposal with this scope. When the scope is
    /// already being disposed, the instance is disposed at once and the
    /// request fails.
    pub(crate) fn track_disposer(&self, instance: &Instance, disposer: Disposer) -> DiResult<()> {
        let rejected = self.inner.disposer.lock().push(instance.address(), disposer);
        match rejected {
            Ok(()) => Ok(()),
            Err(disposer) => {
                disposer.dispose(&self.path());
                Err(DiError::DisposedScopeAccessed { scope: self.path() })
            }
        }
    }

    /// Marks the scope disposed; `false` when it already was.
    fn begin_dispose(&self) -> bool {
        !self.inner.disposed.swap(true, Ordering::AcqRel)
    }

    /// Live children, most recently created first.
    fn take_children(&self) -> Vec<LifetimeScope> {
        let children = std::mem::take(&mut *self.inner.children.lock());
        children
            .into_iter()
            .rev()
            .filter_map(|weak| weak.upgrade())
            .map(|inner| LifetimeScope { inner })
            .collect()
    }

    fn finish_dispose(&self) {
        self.inner.instances.lock().clear();
        if let Some(parent) = &self.inner.parent {
            let me = Arc::as_ptr(&self.inner);
            parent
                .inner
                .children
                .lock()
                .retain(|weak| weak.strong_count() > 0 && weak.as_ptr() != me);
        }
        debug!(scope = %self, "disposed lifetime scope");
    }

    /// Disposes child scopes, then the instances owned by this scope in
    /// reverse creation order, then detaches from the parent.
    ///
    /// Instances that only declared asynchronous disposal are skipped with a
    /// warning. Later calls do nothing.
    pub fn dispose(&self) {
        if !self.begin_dispose() {
            return;
        }
        for child in self.take_children() {
            child.dispose();
        }
        let disposers = self.inner.disposer.lock().close();
        let path = self.path();
        for disposer in disposers {
            disposer.dispose(&path);
        }
        self.finish_dispose();
    }

    /// Like [`dispose`](Self::dispose), running synchronous and asynchronous
    /// disposers in one reverse creation order.
    pub fn dispose_async(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if !self.begin_dispose() {
                return;
            }
            for child in self.take_children() {
                child.dispose_async().await;
            }
            let disposers = self.inner.disposer.lock().close();
            for disposer in disposers {
                disposer.dispose_async().await;
            }
            self.finish_dispose();
        })
    }
}

impl ResolverCore for LifetimeScope {
    fn resolve_service(&self, service: &Service, parameters: Parameters) -> DiResult<Instance> {
        ResolveOperation::execute(self, |operation| operation.resolve_service(self, service, parameters))
    }

    fn resolve_all_services(&self, service: &Service) -> DiResult<Vec<Instance>> {
        ResolveOperation::execute(self, |operation| operation.resolve_all(self, service))
    }

    fn resolve_unique_service(&self, service: &Service) -> DiResult<Instance> {
        ResolveOperation::execute(self, |operation| operation.resolve_unique(self, service))
    }

    fn is_service_registered(&self, service: &Service) -> bool {
        self.registry().is_registered(service)
    }
}

impl fmt::Display for LifetimeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl fmt::Debug for LifetimeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeScope")
            .field("path", &self.path())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if !*self.disposed.get_mut() {
            let pending = self.disposer.get_mut().len();
            if pending > 0 {
                warn!(
                    scope = self.id,
                    pending,
                    "lifetime scope dropped without being disposed; its disposers never ran"
                );
            }
        }
    }
}
