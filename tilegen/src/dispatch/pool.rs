//! The worker pool and its control loop.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::messages::{DispatchOutcome, TileFailure, WorkerCommand, WorkerEvent, WorkerId};
use super::worker::Worker;
use super::{default_workers, DispatchError, RunSummary};
use crate::imaging::{ImageProcessor, TileFormat};
use crate::layout::TileStore;
use crate::progress::{ProgressSink, RunProgress};
use crate::pyramid::{PyramidConfig, TileTask};

/// Hands tiles to a fixed pool of workers, one at a time.
///
/// Each worker holds at most one tile. Whenever a worker reports back, the
/// control loop gives it the next undispatched tile, or tells it to shut down
/// once none remain. The run ends when every worker has terminated or
/// crashed.
///
/// # Example
///
/// ```ignore
/// let dispatcher = Dispatcher::new(pyramid, processor, store, TileFormat::Png)
///     .with_workers(8)
///     .with_progress(sink);
/// let summary = dispatcher.run(pyramid.tasks(), CancellationToken::new()).await?;
/// ```
pub struct Dispatcher<P: ImageProcessor> {
    pyramid: Arc<PyramidConfig>,
    processor: Arc<P>,
    store: Arc<dyn TileStore>,
    format: TileFormat,
    workers: usize,
    progress: Option<ProgressSink>,
}

impl<P: ImageProcessor> Dispatcher<P> {
    /// Creates a dispatcher sized to the machine's available parallelism.
    pub fn new(
        pyramid: PyramidConfig,
        processor: Arc<P>,
        store: Arc<dyn TileStore>,
        format: TileFormat,
    ) -> Self {
        Self {
            pyramid: Arc::new(pyramid),
            processor,
            store,
            format,
            workers: default_workers(),
            progress: None,
        }
    }

    /// Sets the pool size.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Installs a sink that receives a snapshot after every tile outcome.
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Renders every task in `tasks` and waits for the pool to wind down.
    ///
    /// Cancelling `cancel` stops further dispatch; tiles already handed out
    /// are finished first, the rest are reported as undispatched.
    ///
    /// # Errors
    ///
    /// Fails before any worker starts if the pool is empty or the blank
    /// tile cannot be encoded. Per-tile problems are reported in the
    /// returned [`RunSummary`] instead.
    pub async fn run(
        self,
        tasks: Vec<TileTask>,
        cancel: CancellationToken,
    ) -> Result<RunSummary, DispatchError> {
        if self.workers == 0 {
            return Err(DispatchError::NoWorkers);
        }

        let blank_canvas = self.processor.blank_canvas(self.pyramid.tile_size());
        let blank: Arc<[u8]> = self
            .processor
            .encode(&blank_canvas, self.format)
            .map_err(DispatchError::BlankTile)?
            .into();

        info!(
            workers = self.workers,
            tiles = tasks.len(),
            format = %self.format,
            "Spawning workers"
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut command_txs = Vec::with_capacity(self.workers);
        let mut handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let (command_tx, command_rx) = mpsc::unbounded_channel();
            let worker = Worker::new(
                id,
                Arc::clone(&self.pyramid),
                Arc::clone(&self.processor),
                Arc::clone(&self.store),
                self.format,
                Arc::clone(&blank),
            );
            let events = event_tx.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                worker.run(command_rx, events)
            }));
            command_txs.push(command_tx);
        }
        // Only workers hold senders now, so the channel closes if they all die.
        drop(event_tx);

        let mut control = ControlLoop::new(tasks, command_txs, cancel, self.progress);
        let summary = control.run(event_rx).await;

        join_workers(handles).await;
        Ok(summary)
    }
}

/// All mutable run state, owned by the single control loop.
struct ControlLoop {
    tasks: Vec<TileTask>,
    next_task: usize,
    commands: Vec<UnboundedSender<WorkerCommand>>,
    in_flight: Vec<Option<TileTask>>,
    alive: Vec<bool>,
    active_workers: usize,
    crashed_workers: usize,
    progress: RunProgress,
    failures: Vec<TileFailure>,
    cancel: CancellationToken,
    cancelled: bool,
    sink: Option<ProgressSink>,
}

impl ControlLoop {
    fn new(
        tasks: Vec<TileTask>,
        commands: Vec<UnboundedSender<WorkerCommand>>,
        cancel: CancellationToken,
        sink: Option<ProgressSink>,
    ) -> Self {
        let workers = commands.len();
        Self {
            progress: RunProgress::new(tasks.len()),
            tasks,
            next_task: 0,
            commands,
            in_flight: vec![None; workers],
            alive: vec![true; workers],
            active_workers: workers,
            crashed_workers: 0,
            failures: Vec::new(),
            cancel,
            cancelled: false,
            sink,
        }
    }

    async fn run(&mut self, mut events: UnboundedReceiver<WorkerEvent>) -> RunSummary {
        for worker in 0..self.commands.len() {
            self.dispatch(worker);
        }

        let cancel = self.cancel.clone();
        let mut cancel_seen = false;
        while self.active_workers > 0 {
            tokio::select! {
                biased;

                _ = cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    info!(
                        remaining = self.tasks.len() - self.next_task,
                        "Cancellation requested, finishing tiles in flight"
                    );
                }

                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => self.abandon_workers(),
                }
            }
        }

        self.summary()
    }

    /// Sends `worker` its next tile, or a shutdown if there is none.
    fn dispatch(&mut self, worker: WorkerId) {
        let has_task = self.next_task < self.tasks.len();
        if has_task && self.cancel.is_cancelled() {
            self.cancelled = true;
        }

        let command = if has_task && !self.cancelled {
            WorkerCommand::Render(self.tasks[self.next_task])
        } else {
            WorkerCommand::Shutdown
        };

        if self.commands[worker].send(command).is_err() {
            // The worker's receiver is gone, so no Terminated will follow.
            error!(worker, "Worker unreachable, dropping it from the pool");
            self.lose_worker(worker);
            return;
        }

        if let WorkerCommand::Render(task) = command {
            self.next_task += 1;
            self.in_flight[worker] = Some(task);
        }
    }

    fn handle(&mut self, event: WorkerEvent) {
        let WorkerEvent { worker, outcome } = event;
        match outcome {
            DispatchOutcome::Completed(task) => {
                debug!(worker, z = task.z, x = task.x, y = task.y, "Tile completed");
                self.in_flight[worker] = None;
                self.progress.record_completed();
                self.publish();
                self.dispatch(worker);
            }
            DispatchOutcome::Failed { task, reason } => {
                warn!(worker, z = task.z, x = task.x, y = task.y, %reason, "Tile failed");
                self.in_flight[worker] = None;
                self.record_failure(task, reason);
                self.dispatch(worker);
            }
            DispatchOutcome::Terminated => {
                debug!(worker, "Worker terminated");
                self.in_flight[worker] = None;
                self.retire(worker);
            }
            DispatchOutcome::Crashed { task, reason } => {
                error!(worker, task = ?task, %reason, "Worker crashed");
                self.lose_worker(worker);
            }
        }
    }

    /// Every worker dropped its event sender without a final event.
    fn abandon_workers(&mut self) {
        for worker in 0..self.alive.len() {
            if self.alive[worker] {
                error!(worker, "Worker exited without reporting");
                self.lose_worker(worker);
            }
        }
    }

    /// Removes a crashed worker, failing whatever tile it held.
    fn lose_worker(&mut self, worker: WorkerId) {
        if let Some(task) = self.in_flight[worker].take() {
            self.record_failure(task, "worker crashed while rendering".to_string());
        }
        if self.retire(worker) {
            self.crashed_workers += 1;
        }
    }

    /// Marks `worker` as gone. Returns `false` if it already was.
    fn retire(&mut self, worker: WorkerId) -> bool {
        if !std::mem::replace(&mut self.alive[worker], false) {
            return false;
        }
        self.active_workers -= 1;
        true
    }

    fn record_failure(&mut self, task: TileTask, reason: String) {
        self.progress.record_failed();
        self.failures.push(TileFailure { task, reason });
        self.publish();
    }

    fn publish(&self) {
        if let Some(sink) = &self.sink {
            sink(&self.progress.snapshot());
        }
    }

    fn summary(&mut self) -> RunSummary {
        let undispatched = self.tasks.len() - self.next_task;
        if undispatched > 0 && self.cancel.is_cancelled() {
            self.cancelled = true;
        }

        RunSummary {
            total: self.tasks.len(),
            completed: self.progress.completed(),
            failures: std::mem::take(&mut self.failures),
            undispatched,
            workers: self.commands.len(),
            crashed_workers: self.crashed_workers,
            cancelled: self.cancelled,
            elapsed: Instant::now().saturating_duration_since(self.progress.started()),
        }
    }
}

async fn join_workers(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "Worker thread did not exit cleanly");
        }
    }
}
