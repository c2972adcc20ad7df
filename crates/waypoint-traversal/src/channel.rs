//! Ordered, bounded delivery of traversal events from a run to its consumer

use crate::event::{RunEvent, RunId, TraversalEvent};
use futures_util::Stream;
use thiserror::Error;
use tokio::sync::mpsc;

/// The consumer dropped its [`EventStream`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("event consumer for {0} went away")]
pub struct ChannelClosed(pub RunId);

/// Producer half. Owned by the run's worker.
#[derive(Debug)]
pub struct EventSender {
    run: RunId,
    tx: mpsc::Sender<TraversalEvent>,
}

/// Consumer half. Yields events in exactly the order they were emitted and
/// ends when the run is over.
#[derive(Debug)]
pub struct EventStream {
    run: RunId,
    rx: mpsc::Receiver<TraversalEvent>,
}

/// Create the channel for one run. A full buffer makes the producer wait
/// (backpressure) rather than drop events.
pub fn event_channel(run: RunId, capacity: usize) -> (EventSender, EventStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { run, tx }, EventStream { run, rx })
}

impl EventSender {
    pub fn run(&self) -> RunId {
        self.run
    }

    pub async fn emit(&self, event: TraversalEvent) -> Result<(), ChannelClosed> {
        self.tx.send(event).await.map_err(|_| ChannelClosed(self.run))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl EventStream {
    pub fn run(&self) -> RunId {
        self.run
    }

    /// Next event, or `None` once the run has ended and the buffer is drained.
    pub async fn recv(&mut self) -> Option<TraversalEvent> {
        self.rx.recv().await
    }

    /// Drain every remaining event.
    pub async fn collect_all(mut self) -> Vec<TraversalEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }

    pub fn into_stream(self) -> impl Stream<Item = TraversalEvent> {
        futures_util::stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }

    /// Same events, each tagged with this run's id.
    pub fn tagged(self) -> impl Stream<Item = RunEvent> {
        use futures_util::StreamExt;

        let run = self.run;
        self.into_stream().map(move |event| RunEvent { run, event })
    }
}
