//! Traversal tuning knobs

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pause after each discovery, matching the classic visualizer's pace.
pub const DEFAULT_PACING_MS: u64 = 400;

/// Events a run may get ahead of its consumer before it waits.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Delay after every `NodeDiscovered`, in milliseconds. Zero disables pacing.
    pub pacing_ms: u64,
    /// Bound of each run's event channel.
    pub channel_capacity: usize,
}

impl TraversalConfig {
    /// No pacing at all; what tests and batch callers want.
    pub fn unpaced() -> Self {
        TraversalConfig {
            pacing_ms: 0,
            ..Default::default()
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        TraversalConfig {
            pacing_ms: DEFAULT_PACING_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
