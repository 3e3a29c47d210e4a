//! Reactive fetch state for queries and mutations.
//!
//! # Design
//! A `Query` binds a dependency key to an async fetcher and tracks the
//! outcome of its fetch cycles:
//!
//! ```text
//! Idle ──activate──▶ Loading ──ok──▶ Success
//!                       │   ▲           │
//!                       err └─refetch───┤
//!                       ▼               │
//!                     Error ──refetch───┘
//! ```
//!
//! Entering `Loading` clears the error but keeps the previous data, so a
//! refetch overwrites rendered data instead of blanking it first. A failed
//! cycle leaves data untouched.
//!
//! Re-fetching on dependency change is an explicit comparison: `set_key`
//! starts a cycle only when the new key differs from the current one.
//! A result fetched for a key that is no longer current is discarded;
//! cycles for the same key commit in arrival order.
//!
//! Each `Query` owns a `CancellationToken` cancelled on drop. Detached
//! cycles (`spawn_refetch`) check it before writing, so a result arriving
//! after the owner went away is a no-op.
//!
//! A `Mutation` is the manually triggered counterpart for state-changing
//! calls: `mutate` runs once per call and `reset` returns it to idle.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::failure_message;

/// Async call producing a query's data for a key.
pub type Fetcher<K, T> = Arc<dyn Fn(K) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// Async call performing a mutation.
pub type MutationFn<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// Side channel invoked with every successfully committed result.
pub type SuccessHook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Box an async closure into a [`Fetcher`] (or [`MutationFn`], which has
/// the same shape), converting its error into `anyhow::Error`.
pub fn fetcher<K, T, E, F, Fut>(f: F) -> Fetcher<K, T>
where
    K: 'static,
    T: 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<anyhow::Error> + 'static,
{
    Arc::new(move |key| f(key).map(|result| result.map_err(Into::into)).boxed())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot<T> {
    pub status: FetchStatus,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> QuerySnapshot<T> {
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}

struct QueryState<K, T> {
    key: K,
    status: FetchStatus,
    /// Outcome of the last committed cycle for the current key.
    settled: FetchStatus,
    data: Option<T>,
    error: Option<String>,
    in_flight: usize,
}

struct QueryInner<K, T> {
    label: &'static str,
    state: Mutex<QueryState<K, T>>,
    fetcher: Fetcher<K, T>,
    on_success: Option<SuccessHook<T>>,
    alive: CancellationToken,
}

impl<K, T> QueryInner<K, T> {
    fn lock(&self) -> MutexGuard<'_, QueryState<K, T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts one running cycle. Dropping it, whether the cycle committed or
/// its future was dropped mid-fetch, releases the slot and recomputes the
/// visible status.
struct InFlight<'a, K, T> {
    inner: &'a QueryInner<K, T>,
}

impl<'a, K: Clone, T> InFlight<'a, K, T> {
    /// Enter Loading and return the key the cycle fetches for.
    fn enter(inner: &'a QueryInner<K, T>) -> (Self, K) {
        let mut state = inner.lock();
        state.in_flight += 1;
        state.status = FetchStatus::Loading;
        state.error = None;
        (Self { inner }, state.key.clone())
    }
}

impl<K, T> Drop for InFlight<'_, K, T> {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.status = if state.in_flight > 0 {
            FetchStatus::Loading
        } else {
            state.settled
        };
    }
}

impl<K, T> QueryInner<K, T>
where
    K: PartialEq + Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    async fn run_cycle(self: Arc<Self>) {
        let (_cycle, key) = InFlight::enter(&self);

        let fetch = (self.fetcher)(key.clone());
        let outcome = tokio::select! {
            _ = self.alive.cancelled() => {
                debug!(query = self.label, "query dropped before fetch resolved");
                return;
            }
            outcome = fetch => outcome,
        };

        self.commit(key, outcome);
    }

    fn commit(&self, key: K, outcome: anyhow::Result<T>) {
        if self.alive.is_cancelled() {
            debug!(query = self.label, "discarding result for dropped query");
            return;
        }

        let outcome = outcome.map_err(|err| {
            error!(query = self.label, error = %err, "API call failed");
            failure_message(&err)
        });

        let mut state = self.lock();
        if state.key != key {
            debug!(query = self.label, "discarding result for stale key");
            return;
        }
        let settled = match outcome {
            Ok(data) => {
                if let Some(hook) = &self.on_success {
                    hook(&data);
                }
                state.data = Some(data);
                state.error = None;
                FetchStatus::Success
            }
            Err(message) => {
                state.error = Some(message);
                FetchStatus::Error
            }
        };
        state.settled = settled;
    }
}

/// Auto-fetching, read-only binding of a dependency key to fetched data.
pub struct Query<K, T> {
    inner: Arc<QueryInner<K, T>>,
}

impl<K, T> Query<K, T>
where
    K: PartialEq + Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new(label: &'static str, key: K, fetcher: Fetcher<K, T>) -> Self {
        Self::build(label, key, fetcher, None)
    }

    /// Like [`Query::new`], additionally handing every committed result to
    /// `on_success`.
    pub fn with_on_success(
        label: &'static str,
        key: K,
        fetcher: Fetcher<K, T>,
        on_success: SuccessHook<T>,
    ) -> Self {
        Self::build(label, key, fetcher, Some(on_success))
    }

    fn build(
        label: &'static str,
        key: K,
        fetcher: Fetcher<K, T>,
        on_success: Option<SuccessHook<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(QueryInner {
                label,
                state: Mutex::new(QueryState {
                    key,
                    status: FetchStatus::Idle,
                    settled: FetchStatus::Idle,
                    data: None,
                    error: None,
                    in_flight: 0,
                }),
                fetcher,
                on_success,
                alive: CancellationToken::new(),
            }),
        }
    }

    /// Run the initial fetch cycle.
    pub async fn activate(&self) {
        self.inner.clone().run_cycle().await;
    }

    /// Run one fetch cycle for the current key, whatever the current state.
    pub async fn refetch(&self) {
        self.inner.clone().run_cycle().await;
    }

    /// Run a fetch cycle on a detached task. The cycle commits nothing if
    /// this query is dropped before it resolves.
    pub fn spawn_refetch(&self) -> JoinHandle<()> {
        tokio::spawn(self.inner.clone().run_cycle())
    }

    /// Replace the dependency key, fetching only if it changed. Returns
    /// whether a cycle ran.
    pub async fn set_key(&self, key: K) -> bool {
        {
            let mut state = self.inner.lock();
            if state.key == key {
                return false;
            }
            state.key = key;
        }
        self.refetch().await;
        true
    }

    pub fn status(&self) -> FetchStatus {
        self.inner.lock().status
    }

    pub fn is_loading(&self) -> bool {
        self.status() == FetchStatus::Loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    pub fn key(&self) -> K {
        self.inner.lock().key.clone()
    }
}

impl<K, T> Query<K, T>
where
    K: PartialEq + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn data(&self) -> Option<T> {
        self.inner.lock().data.clone()
    }

    pub fn snapshot(&self) -> QuerySnapshot<T> {
        let state = self.inner.lock();
        QuerySnapshot {
            status: state.status,
            data: state.data.clone(),
            error: state.error.clone(),
        }
    }
}

impl<K, T> Drop for Query<K, T> {
    fn drop(&mut self) {
        self.inner.alive.cancel();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationSnapshot<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

struct MutationState<T> {
    data: Option<T>,
    loading: bool,
    error: Option<String>,
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Manually triggered state-changing call with tracked result.
pub struct Mutation<A, T> {
    label: &'static str,
    state: Mutex<MutationState<T>>,
    run: MutationFn<A, T>,
}

impl<A, T: Clone> Mutation<A, T> {
    pub fn new(label: &'static str, run: MutationFn<A, T>) -> Self {
        Self {
            label,
            state: Mutex::new(MutationState::default()),
            run,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MutationState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the mutation. Returns the result, or `None` on failure, in which
    /// case `error` holds the failure message and `data` is unchanged.
    pub async fn mutate(&self, args: A) -> Option<T> {
        {
            let mut state = self.lock();
            state.loading = true;
            state.error = None;
        }

        let outcome = (self.run)(args).await;

        let mut state = self.lock();
        state.loading = false;
        match outcome {
            Ok(data) => {
                state.data = Some(data.clone());
                Some(data)
            }
            Err(err) => {
                error!(mutation = self.label, error = %err, "Mutation failed");
                state.error = Some(failure_message(&err));
                None
            }
        }
    }

    /// Clear data, error and loading back to the initial state.
    pub fn reset(&self) {
        *self.lock() = MutationState::default();
    }

    pub fn data(&self) -> Option<T> {
        self.lock().data.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn status(&self) -> FetchStatus {
        let state = self.lock();
        if state.loading {
            FetchStatus::Loading
        } else if state.error.is_some() {
            FetchStatus::Error
        } else if state.data.is_some() {
            FetchStatus::Success
        } else {
            FetchStatus::Idle
        }
    }

    pub fn snapshot(&self) -> MutationSnapshot<T> {
        let state = self.lock();
        MutationSnapshot {
            data: state.data.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }
}
