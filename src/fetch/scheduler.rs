//! Per-subscription auto-refresh
//!
//! A [`PollSubscription`] fetches once immediately (cache allowed), then on every
//! interval tick with the cache bypassed, until it is closed or dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::client::ResourceFetcher;
use super::dedup::{FetchOptions, RequestDeduplicator};
use super::error::FetchError;
use super::request::ResourceRequest;

/// What a subscriber sees for its signature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollState {
    /// Most recent successful data; kept across later failures
    pub data: Option<Value>,
    /// Error from the most recent fetch, cleared on success
    pub error: Option<FetchError>,
    /// A fetch is outstanding
    pub loading: bool,
    /// When `data` was last replaced
    pub last_updated: Option<DateTime<Utc>>,
}

/// Issues one-shot and recurring fetches through a shared deduplicator.
#[derive(Clone)]
pub struct FetchScheduler {
    dedup: Arc<RequestDeduplicator>,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl FetchScheduler {
    pub fn new(dedup: Arc<RequestDeduplicator>, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self { dedup, fetcher }
    }

    pub fn deduplicator(&self) -> &Arc<RequestDeduplicator> {
        &self.dedup
    }

    /// Fetch once through the cache and deduplicator.
    pub async fn fetch(
        &self,
        request: &ResourceRequest,
        skip_cache: bool,
    ) -> Result<Value, FetchError> {
        let fetcher = Arc::clone(&self.fetcher);
        let owned = request.clone();
        self.dedup
            .get_or_fetch(
                &request.signature(),
                move || async move { fetcher.fetch(&owned).await },
                FetchOptions { skip_cache },
            )
            .await
    }

    /// Start polling `request`.
    ///
    /// With `interval == None` only the initial fetch is made. Must be called
    /// inside a tokio runtime.
    pub fn subscribe(&self, request: ResourceRequest, interval: Option<Duration>) -> PollSubscription {
        let signature = request.signature();
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(PollState {
            loading: true,
            ..PollState::default()
        });

        tracing::info!(
            signature = %signature,
            interval_ms = interval.map(|i| i.as_millis() as u64),
            "Polling started"
        );

        let handle = tokio::spawn(run_poll(
            self.clone(),
            request,
            interval,
            state_tx,
            cancel.clone(),
        ));

        PollSubscription {
            signature,
            cancel,
            handle: Some(handle),
            state: state_rx,
        }
    }
}

async fn run_poll(
    scheduler: FetchScheduler,
    request: ResourceRequest,
    interval: Option<Duration>,
    state_tx: watch::Sender<PollState>,
    cancel: CancellationToken,
) {
    if !poll_once(&scheduler, &request, false, &state_tx, &cancel).await {
        return;
    }

    let Some(period) = interval else {
        return;
    };

    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !poll_once(&scheduler, &request, true, &state_tx, &cancel).await {
                    break;
                }
            }
        }
    }
}

/// One fetch cycle. Returns `false` once the subscription is no longer live.
async fn poll_once(
    scheduler: &FetchScheduler,
    request: &ResourceRequest,
    skip_cache: bool,
    state_tx: &watch::Sender<PollState>,
    cancel: &CancellationToken,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    state_tx.send_modify(|state| state.loading = true);

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return false,
        result = scheduler.fetch(request, skip_cache) => result,
    };

    // Liveness check before touching subscriber-visible state
    if cancel.is_cancelled() {
        return false;
    }

    state_tx.send_modify(|state| {
        state.loading = false;
        match result {
            Ok(data) => {
                state.data = Some(data);
                state.error = None;
                state.last_updated = Some(Utc::now());
            }
            Err(e) => state.error = Some(e),
        }
    });
    true
}

/// Handle to a running poll. Closing or dropping it stops all further fetches.
pub struct PollSubscription {
    signature: String,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    state: watch::Receiver<PollState>,
}

impl PollSubscription {
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Latest state snapshot.
    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Wait for the next state change.
    ///
    /// Returns `None` once the poll has stopped and no further updates will come.
    pub async fn changed(&mut self) -> Option<PollState> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            changed = self.state.changed() => match changed {
                Ok(()) => Some(self.state.borrow_and_update().clone()),
                Err(_) => None,
            },
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop polling. The interval timer is cleared before this returns.
    pub fn close(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        tracing::info!(signature = %self.signature, "Polling stopped");
    }
}

impl Drop for PollSubscription {
    fn drop(&mut self) {
        self.close();
    }
}
