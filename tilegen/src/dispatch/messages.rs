//! Messages exchanged between the control loop and its workers.

use std::fmt;

use crate::pyramid::TileTask;

/// Index of a worker within its pool.
pub type WorkerId = usize;

/// Control loop → worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Render one tile and report the outcome.
    Render(TileTask),
    /// Acknowledge with [`DispatchOutcome::Terminated`] and exit.
    Shutdown,
}

/// Worker → control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The tile was rendered and stored; the worker is idle again.
    Completed(TileTask),
    /// The tile could not be produced; the worker is idle again.
    Failed { task: TileTask, reason: String },
    /// The worker accepted a shutdown and has exited.
    Terminated,
    /// The worker panicked and has exited without acknowledging shutdown.
    ///
    /// `task` is the tile it was working on, if any.
    Crashed {
        task: Option<TileTask>,
        reason: String,
    },
}

/// An outcome tagged with the worker that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEvent {
    pub worker: WorkerId,
    pub outcome: DispatchOutcome,
}

impl WorkerEvent {
    pub fn new(worker: WorkerId, outcome: DispatchOutcome) -> Self {
        Self { worker, outcome }
    }
}

/// A tile that did not make it to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFailure {
    pub task: TileTask,
    pub reason: String,
}

impl fmt::Display for TileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.task, self.reason)
    }
}
