//! Observable load/error bookkeeping shared by the async stores.
//!
//! A [`Resource`] wraps one piece of data loaded through a collaborator. Every
//! fetch takes a sequence number; only the most recently issued request may
//! write its result, and that same request always clears `loading`, whether
//! it succeeds, fails, is cancelled or is dropped before resolving. Results
//! from superseded requests are discarded.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::notifications::Notifier;
use crate::infrastructure::ports::FileManagerError;

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T> {
    pub data: T,
    pub loading: bool,
    /// At least one fetch (or `replace`) has written data.
    pub loaded: bool,
    pub error: Option<FileManagerError>,
    in_flight: Option<u64>,
}

impl<T> ResourceState<T> {
    pub fn status(&self) -> LoadStatus {
        if self.loading {
            LoadStatus::Loading
        } else if self.error.is_some() {
            LoadStatus::Failed
        } else if self.loaded {
            LoadStatus::Loaded
        } else {
            LoadStatus::Idle
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// What happened to one fetch request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The result was written to state.
    Applied,
    /// The load failed; the error is in state and was published.
    Failed(FileManagerError),
    /// A newer request (or `replace`/`cancel_pending`) superseded this one.
    Stale,
    /// The caller's token fired before the load resolved.
    Cancelled,
    /// `ensure_loaded` found nothing to do.
    Skipped,
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

pub struct Resource<T> {
    name: &'static str,
    state: watch::Sender<ResourceState<T>>,
    next_seq: AtomicU64,
    notifier: Notifier,
}

impl<T> Resource<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// `loading` starts true when the owner already knows a fetch is due.
    pub fn new(name: &'static str, initial: T, loading: bool, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(ResourceState {
            data: initial,
            loading,
            loaded: false,
            error: None,
            in_flight: None,
        });
        Self {
            name,
            state,
            next_seq: AtomicU64::new(0),
            notifier,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ResourceState<T> {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> T {
        self.state.borrow().data.clone()
    }

    pub fn status(&self) -> LoadStatus {
        self.state.borrow().status()
    }

    /// Issue a new request, superseding any in flight.
    pub async fn fetch(
        &self,
        load: impl Future<Output = Result<T, FileManagerError>>,
    ) -> FetchOutcome {
        let pending = self.begin();
        let result = load.await;
        pending.complete(result)
    }

    /// Like [`fetch`](Self::fetch), abandoned when `token` is cancelled first.
    pub async fn fetch_with_token(
        &self,
        token: &CancellationToken,
        load: impl Future<Output = Result<T, FileManagerError>>,
    ) -> FetchOutcome {
        let pending = self.begin();
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                pending.abandon();
                FetchOutcome::Cancelled
            }
            result = load => pending.complete(result),
        }
    }

    /// Fetch once unless a request is already in flight or data is loaded.
    ///
    /// Safe to call on every render: the check and the request start happen
    /// under the same state update, so overlapping callers never double-submit.
    pub async fn ensure_loaded(
        &self,
        load: impl Future<Output = Result<T, FileManagerError>>,
    ) -> FetchOutcome {
        let mut started = None;
        self.state.send_if_modified(|state| {
            if state.in_flight.is_some() || state.loaded {
                return false;
            }
            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
            start(state, seq);
            started = Some(seq);
            true
        });

        match started {
            Some(seq) => {
                let pending = Pending::new(self, seq);
                let result = load.await;
                pending.complete(result)
            }
            None => FetchOutcome::Skipped,
        }
    }

    /// Write data directly, superseding anything in flight.
    pub fn replace(&self, data: T) {
        self.state.send_modify(|state| {
            state.data = data;
            state.loaded = true;
            state.loading = false;
            state.error = None;
            state.in_flight = None;
        });
    }

    /// Edit loaded data in place without touching request bookkeeping.
    pub fn modify(&self, edit: impl FnOnce(&mut T)) {
        self.state.send_modify(|state| edit(&mut state.data));
    }

    /// Drop every in-flight request; their results will be discarded.
    pub fn cancel_pending(&self) {
        self.state.send_if_modified(|state| {
            if state.in_flight.take().is_none() && !state.loading {
                return false;
            }
            state.loading = false;
            true
        });
    }

    fn begin(&self) -> Pending<'_, T> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| start(state, seq));
        tracing::trace!(store = self.name, seq, "Fetch started");
        Pending::new(self, seq)
    }

    fn complete(&self, seq: u64, result: Result<T, FileManagerError>) -> FetchOutcome {
        let mut outcome = FetchOutcome::Stale;
        self.state.send_if_modified(|state| {
            if state.in_flight != Some(seq) {
                return false;
            }
            state.in_flight = None;
            state.loading = false;
            outcome = match result {
                Ok(data) => {
                    state.data = data;
                    state.loaded = true;
                    state.error = None;
                    FetchOutcome::Applied
                }
                Err(err) => {
                    state.error = Some(err.clone());
                    FetchOutcome::Failed(err)
                }
            };
            true
        });

        match &outcome {
            FetchOutcome::Applied => tracing::debug!(store = self.name, seq, "Fetch applied"),
            FetchOutcome::Failed(err) => {
                tracing::error!(store = self.name, seq, error = %err, "Fetch failed");
                self.notifier.error(self.name, err.to_string());
            }
            _ => tracing::debug!(store = self.name, seq, "Discarding stale fetch result"),
        }
        outcome
    }

    fn abandon(&self, seq: u64) {
        let cleared = self.state.send_if_modified(|state| {
            if state.in_flight != Some(seq) {
                return false;
            }
            state.in_flight = None;
            state.loading = false;
            true
        });
        tracing::debug!(store = self.name, seq, cleared, "Fetch abandoned");
    }
}

/// One started request. Dropping it unresolved abandons the request, so a
/// fetch future that is aborted or timed out never leaves `loading` set.
struct Pending<'a, T>
where
    T: Clone + Send + Sync + 'static,
{
    resource: &'a Resource<T>,
    seq: u64,
    settled: bool,
}

impl<'a, T> Pending<'a, T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(resource: &'a Resource<T>, seq: u64) -> Self {
        Self {
            resource,
            seq,
            settled: false,
        }
    }

    fn complete(mut self, result: Result<T, FileManagerError>) -> FetchOutcome {
        self.settled = true;
        self.resource.complete(self.seq, result)
    }

    fn abandon(mut self) {
        self.settled = true;
        self.resource.abandon(self.seq);
    }
}

impl<T> Drop for Pending<'_, T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.settled {
            self.resource.abandon(self.seq);
        }
    }
}

fn start<T>(state: &mut ResourceState<T>, seq: u64) {
    state.in_flight = Some(seq);
    state.loading = true;
    state.error = None;
}
