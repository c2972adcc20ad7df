//! Starts traversal runs and keeps at most one of them alive

use crate::bfs::Traversal;
use crate::cancel::{cancel_pair, CancelHandle};
use crate::channel::{event_channel, EventStream};
use crate::config::TraversalConfig;
use crate::event::{RunId, RunOutcome, TraversalEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use waypoint_core::{normalize_label, GraphResult, GraphStore};

/// Runs breadth-first searches against a shared [`GraphStore`].
///
/// Starting a run cancels whichever run this engine started before it, so
/// two runs never feed the same consumer at once. Each run still carries its
/// own [`RunId`] so stale events can be recognised downstream.
#[derive(Debug)]
pub struct TraversalEngine {
    store: GraphStore,
    config: TraversalConfig,
    next_run: AtomicU64,
    active: Arc<Mutex<Option<(RunId, CancelHandle)>>>,
}

impl TraversalEngine {
    pub fn new(store: GraphStore, config: TraversalConfig) -> Self {
        TraversalEngine {
            store,
            config,
            next_run: AtomicU64::new(1),
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    /// Start a search from `start` to `end` in the background.
    ///
    /// Fails with `UnknownNode` before anything is emitted if either endpoint
    /// is missing. Otherwise the previous run is cancelled and the new run's
    /// handle is returned immediately.
    pub async fn run(&self, start: &str, end: &str) -> GraphResult<RunHandle> {
        let (start, end) = (normalize_label(start), normalize_label(end));
        let epoch = self.store.require_nodes(&[start.as_str(), end.as_str()]).await?;

        let id = RunId(self.next_run.fetch_add(1, Ordering::Relaxed));
        let (cancel, token) = cancel_pair();
        {
            let mut active = self.active.lock().await;
            if let Some((previous, handle)) = active.replace((id, cancel.clone())) {
                debug!(%previous, next = %id, "cancelling superseded run");
                handle.cancel();
            }
        }

        let (events_tx, events) = event_channel(id, self.config.channel_capacity);
        let traversal = Traversal::new(
            id,
            self.store.clone(),
            start.clone(),
            end.clone(),
            epoch,
            self.config.pacing(),
            events_tx,
            token,
        );
        let active = Arc::clone(&self.active);
        let task = tokio::spawn(async move {
            let outcome = traversal.run().await;
            // A newer run may already own the slot.
            let mut slot = active.lock().await;
            if slot.as_ref().is_some_and(|(current, _)| *current == id) {
                *slot = None;
            }
            outcome
        });
        info!(run = %id, %start, %end, "run scheduled");

        Ok(RunHandle {
            id,
            events,
            cancel,
            completion: RunCompletion { id, task },
        })
    }

    /// Cancel the run still in progress, if any. Returns its id.
    pub async fn cancel_active(&self) -> Option<RunId> {
        let (id, handle) = self.active.lock().await.take()?;
        handle.cancel();
        info!(run = %id, "run cancelled");
        Some(id)
    }

    /// Id of the run still in progress.
    pub async fn active_run(&self) -> Option<RunId> {
        self.active.lock().await.as_ref().map(|(id, _)| *id)
    }
}

/// Caller's side of one run: its events, a way to cancel it, and its outcome.
#[derive(Debug)]
pub struct RunHandle {
    id: RunId,
    events: EventStream,
    cancel: CancelHandle,
    completion: RunCompletion,
}

impl RunHandle {
    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn events(&mut self) -> &mut EventStream {
        &mut self.events
    }

    /// Cancel just this run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn into_parts(self) -> (EventStream, RunCompletion) {
        (self.events, self.completion)
    }

    /// Drain the remaining events and wait for the run to end.
    pub async fn finish(self) -> (Vec<TraversalEvent>, RunOutcome) {
        let events = self.events.collect_all().await;
        let outcome = self.completion.wait().await;
        (events, outcome)
    }
}

/// Resolves to the outcome of a run once its worker has exited.
#[derive(Debug)]
pub struct RunCompletion {
    id: RunId,
    task: JoinHandle<RunOutcome>,
}

impl RunCompletion {
    pub fn id(&self) -> RunId {
        self.id
    }

    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(run = %self.id, "traversal worker failed: {}", e);
                RunOutcome::Cancelled
            }
        }
    }
}
