use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::ClientError;

#[derive(Debug, Clone)]
pub struct LoadState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ClientError>> + Send + Sync>;

/// Fetch-on-demand state holder shared by every list and detail screen.
///
/// Starting a new fetch aborts the one in flight, and dropping the loader
/// aborts any pending fetch. Each fetch also carries a generation number; a
/// result is published only while its generation is still current, which
/// covers a task that was already past its last await when aborted.
pub struct ResourceLoader<T> {
    fetcher: Fetcher<T>,
    state: watch::Sender<LoadState<T>>,
    generation: Arc<AtomicU64>,
    in_flight: Option<JoinHandle<()>>,
}

impl<T: Clone + Send + Sync + 'static> ResourceLoader<T> {
    pub fn new<F, Fut>(fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || fetcher().boxed());
        let (state, _) = watch::channel(LoadState::default());
        Self {
            fetcher,
            state,
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: None,
        }
    }

    /// Starts a fetch in the background. Requires a Tokio runtime.
    pub fn refetch(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }
        let current = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let fetch = (self.fetcher)();
        let state = self.state.clone();
        let generation = self.generation.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = fetch.await;
            publish(&state, &generation, current, result);
        }));
    }

    /// Waits for the current fetch, if any, and returns the resulting state.
    pub async fn settled(&mut self) -> LoadState<T> {
        if let Some(handle) = self.in_flight.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::error!("Resource fetch task failed: {e}");
                    self.state.send_modify(|s| {
                        s.is_loading = false;
                        s.error = Some("Failed to load data".to_string());
                    });
                }
            }
        }
        self.snapshot()
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.state.send_modify(|s| s.is_loading = false);
        }
    }

    pub fn snapshot(&self) -> LoadState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState<T>> {
        self.state.subscribe()
    }
}

/// Stores a fetch result unless a newer fetch (or a cancel) has started since.
/// The generation is compared under the channel lock so a refetch cannot
/// interleave. Returns whether the result was applied.
fn publish<T>(
    state: &watch::Sender<LoadState<T>>,
    generation: &AtomicU64,
    current: u64,
    result: Result<T, ClientError>,
) -> bool {
    state.send_if_modified(|s| {
        if generation.load(Ordering::SeqCst) != current {
            return false;
        }
        s.is_loading = false;
        match result {
            Ok(data) => {
                s.data = Some(data);
                s.error = None;
            }
            Err(err) => s.error = Some(err.message),
        }
        true
    })
}

impl<T> Drop for ResourceLoader<T> {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
