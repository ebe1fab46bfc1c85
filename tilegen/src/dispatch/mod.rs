//! Parallel tile dispatch.
//!
//! A [`Dispatcher`] owns a fixed pool of blocking workers and one async
//! control loop. The control loop is the only place run state changes: it
//! hands out tiles, counts outcomes and decides when the run is over.
//!
//! ```text
//!                       ┌──────────────┐  Render(task) / Shutdown
//!  Vec<TileTask> ──────►│ control loop │──────────────┬──────────────┐
//!                       └──────▲───────┘              ▼              ▼
//!                              │                 ┌─────────┐    ┌─────────┐
//!                              │                 │ worker 0│ …  │ worker N│
//!                              │                 └────┬────┘    └────┬────┘
//!                              └──── WorkerEvent ─────┴──────────────┘
//! ```
//!
//! Workers never share mutable state. Each tile is handed out at most once,
//! and a run always ends: workers that fail a tile keep going, workers that
//! panic are dropped from the pool, and cancellation lets tiles in flight
//! finish before everyone is shut down.

mod messages;
mod pool;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use messages::{DispatchOutcome, TileFailure, WorkerCommand, WorkerEvent, WorkerId};
pub use pool::Dispatcher;

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::imaging::ImagingError;

/// Errors that prevent a run from starting.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Worker pool needs at least one worker")]
    NoWorkers,

    #[error("Failed to prepare blank tile: {0}")]
    BlankTile(#[source] ImagingError),
}

/// Pool size used when none is configured: one worker per available core.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// What happened to every tile of a run.
///
/// `completed + failures.len() + undispatched == total` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub failures: Vec<TileFailure>,
    /// Tiles never handed to a worker, due to cancellation or losing every worker.
    pub undispatched: usize,
    pub workers: usize,
    pub crashed_workers: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Every tile was written.
    pub fn is_success(&self) -> bool {
        self.completed == self.total
    }

    /// Every tile was attempted, whether or not it succeeded.
    pub fn is_exhaustive(&self) -> bool {
        self.undispatched == 0
    }

    /// The pool died before the task list was drained.
    pub fn all_workers_lost(&self) -> bool {
        self.workers > 0 && self.crashed_workers == self.workers && self.undispatched > 0
    }
}
