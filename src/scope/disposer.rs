//! Per-scope disposal list.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use tracing::warn;

/// Future type for disposal operations.
pub(crate) type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

pub(crate) type SyncDisposeFn = Box<dyn FnOnce() + Send>;
pub(crate) type AsyncDisposeFn = Box<dyn FnOnce() -> BoxFutureUnit + Send>;

/// Disposal capability of one tracked instance.
pub(crate) enum Disposer {
    Sync(SyncDisposeFn),
    Async(AsyncDisposeFn),
    Both {
        sync: SyncDisposeFn,
        asynchronous: AsyncDisposeFn,
    },
}

impl Disposer {
    pub(crate) fn from_parts(sync: Option<SyncDisposeFn>, asynchronous: Option<AsyncDisposeFn>) -> Option<Self> {
        match (sync, asynchronous) {
            (Some(sync), Some(asynchronous)) => Some(Disposer::Both { sync, asynchronous }),
            (Some(sync), None) => Some(Disposer::Sync(sync)),
            (None, Some(asynchronous)) => Some(Disposer::Async(asynchronous)),
            (None, None) => None,
        }
    }

    /// Synchronous disposal; async-only disposers are skipped with a warning.
    pub(crate) fn dispose(self, scope: &str) {
        match self {
            Disposer::Sync(sync) | Disposer::Both { sync, .. } => sync(),
            Disposer::Async(_) => {
                warn!(
                    scope,
                    "skipping asynchronous disposer during synchronous dispose; use dispose_async"
                );
            }
        }
    }

    pub(crate) async fn dispose_async(self) {
        match self {
            Disposer::Sync(sync) => sync(),
            Disposer::Async(asynchronous) | Disposer::Both { asynchronous, .. } => asynchronous().await,
        }
    }
}

/// Disposers in creation order. Once closed, the bag accepts nothing more.
#[derive(Default)]
pub(crate) struct DisposeBag {
    entries: Vec<Disposer>,
    tracked: HashSet<usize>,
    closed: bool,
}

impl DisposeBag {
    /// Adds the disposer of the instance at `address`. An instance already in
    /// the bag is not tracked twice. A closed bag hands the disposer back.
    pub(crate) fn push(&mut self, address: usize, disposer: Disposer) -> Result<(), Disposer> {
        if self.closed {
            return Err(disposer);
        }
        if self.tracked.insert(address) {
            self.entries.push(disposer);
        }
        Ok(())
    }

    /// Closes the bag and returns its disposers in reverse creation order.
    pub(crate) fn close(&mut self) -> Vec<Disposer> {
        self.closed = true;
        self.tracked.clear();
        let mut entries = std::mem::take(&mut self.entries);
        entries.reverse();
        entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
