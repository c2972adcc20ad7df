//! The breadth-first search worker behind every run

use crate::cancel::CancelToken;
use crate::channel::EventSender;
use crate::event::{RunId, RunOutcome, TraversalEvent};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info};
use waypoint_core::GraphStore;

/// Why a run stopped before finishing.
enum Halt {
    Cancelled,
    Invalidated,
}

/// Private state of one run. Lives in exactly one task and is dropped when
/// the run ends.
pub(crate) struct Traversal {
    run: RunId,
    store: GraphStore,
    start: String,
    end: String,
    /// Store epoch the endpoints were validated in.
    epoch: u64,
    pacing: Duration,
    events: EventSender,
    cancel: CancelToken,
    visited: HashSet<String>,
    frontier: VecDeque<String>,
    parent: HashMap<String, String>,
}

impl Traversal {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        run: RunId,
        store: GraphStore,
        start: String,
        end: String,
        epoch: u64,
        pacing: Duration,
        events: EventSender,
        cancel: CancelToken,
    ) -> Self {
        Traversal {
            run,
            store,
            start,
            end,
            epoch,
            pacing,
            events,
            cancel,
            visited: HashSet::new(),
            frontier: VecDeque::new(),
            parent: HashMap::new(),
        }
    }

    pub(crate) async fn run(mut self) -> RunOutcome {
        info!(run = %self.run, start = %self.start, end = %self.end, "traversal started");
        let outcome = match self.search().await {
            Ok(outcome) => outcome,
            Err(Halt::Cancelled) => RunOutcome::Cancelled,
            Err(Halt::Invalidated) => RunOutcome::Invalidated,
        };
        info!(run = %self.run, ?outcome, discovered = self.visited.len(), "traversal ended");
        outcome
    }

    async fn search(&mut self) -> Result<RunOutcome, Halt> {
        self.visited.insert(self.start.clone());
        self.frontier.push_back(self.start.clone());
        self.emit(TraversalEvent::NodeVisited { node: self.start.clone() }).await?;

        while let Some(current) = self.frontier.pop_front() {
            if self.store.epoch().await != self.epoch {
                return Err(Halt::Invalidated);
            }

            if current == self.end {
                let path = self.path_to_end();
                let path_len = path.len();
                for (from, to) in path {
                    self.emit(TraversalEvent::PathEdge { from, to }).await?;
                }
                self.emit(TraversalEvent::TraversalFinished { found: true }).await?;
                return Ok(RunOutcome::Found { path_len });
            }

            for neighbor in self.expand(&current).await? {
                if !self.visited.insert(neighbor.clone()) {
                    continue;
                }
                self.parent.insert(neighbor.clone(), current.clone());
                self.frontier.push_back(neighbor.clone());
                self.emit(TraversalEvent::NodeDiscovered {
                    node: neighbor,
                    parent: current.clone(),
                })
                .await?;
                self.pace().await?;
            }
        }

        self.emit(TraversalEvent::TraversalFinished { found: false }).await?;
        Ok(RunOutcome::NotFound)
    }

    /// Neighbors of `current`. A node removed mid-run has none.
    async fn expand(&self, current: &str) -> Result<Vec<String>, Halt> {
        let (epoch, neighbors) = self.store.neighbors_with_epoch(current).await;
        if epoch != self.epoch {
            return Err(Halt::Invalidated);
        }
        match neighbors {
            Ok(neighbors) => Ok(neighbors),
            Err(e) => {
                debug!(run = %self.run, node = %current, "treating vanished node as a leaf: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Edges from `end` back to `start`, nearest `end` first.
    fn path_to_end(&self) -> Vec<(String, String)> {
        let mut edges = Vec::new();
        let mut current = self.end.as_str();
        // Only called once `end` was dequeued: every node on the way back
        // was discovered and so has a parent.
        while current != self.start {
            let Some(prev) = self.parent.get(current) else {
                unreachable!("{current} was dequeued without a parent");
            };
            edges.push((prev.clone(), current.to_string()));
            current = prev.as_str();
        }
        edges
    }

    async fn emit(&mut self, event: TraversalEvent) -> Result<(), Halt> {
        debug!(run = %self.run, %event, "emit");
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Halt::Cancelled),
            sent = self.events.emit(event) => sent.map_err(|closed| {
                debug!("{}", closed);
                Halt::Cancelled
            }),
        }
    }

    async fn pace(&mut self) -> Result<(), Halt> {
        if self.cancel.sleep(self.pacing).await {
            Ok(())
        } else {
            Err(Halt::Cancelled)
        }
    }
}
