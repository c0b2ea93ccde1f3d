//! Multi-record workflows.
//!
//! Both workflows fan out one future per record over a bounded worker pool
//! and await every future (or the deadline) before they return.

pub mod assignment;
pub mod sweep;

use std::collections::HashSet;
use std::time::Duration;

use crate::config::ServiceConfig;

pub use assignment::{assign_students, Assignment};
pub use sweep::{sweep_recent_students, SweepOutcome};

/// Bounds for one fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    /// Futures polled at once.
    pub concurrency: usize,
    /// Time allowed for the whole fan-out.
    pub deadline: Duration,
}

impl FanOut {
    /// Limits taken from the service configuration.
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            concurrency: config.assignment_concurrency.max(1),
            deadline: config.fanout_deadline(),
        }
    }
}

/// Drop repeated IDs, keeping the first occurrence of each.
#[must_use]
pub fn dedupe_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
