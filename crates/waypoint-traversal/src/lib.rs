//! Waypoint Traversal — paced breadth-first search that streams its progress

pub mod event;
pub mod config;
pub mod cancel;
pub mod channel;
mod bfs;
pub mod engine;

#[cfg(test)]
mod tests;

pub use event::{RunEvent, RunId, RunOutcome, TraversalEvent};
pub use config::TraversalConfig;
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use channel::{event_channel, ChannelClosed, EventSender, EventStream};
pub use engine::{RunCompletion, RunHandle, TraversalEngine};
