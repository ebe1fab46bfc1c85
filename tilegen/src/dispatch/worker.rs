//! A single tile worker.
//!
//! Workers run on tokio's blocking pool. Each one loops on its own command
//! channel, renders whatever tile it is handed and reports back on the shared
//! event channel. Errors from the processor or the store become
//! [`DispatchOutcome::Failed`]; a panic becomes [`DispatchOutcome::Crashed`]
//! and ends the worker.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use super::messages::{DispatchOutcome, WorkerCommand, WorkerEvent, WorkerId};
use crate::imaging::{ImageProcessor, ImagingError, TileFormat};
use crate::layout::{LayoutError, TileStore};
use crate::pyramid::{PyramidConfig, RenderPlan, TileTask};

/// Why a single tile failed.
#[derive(Debug, thiserror::Error)]
enum RenderError {
    #[error(transparent)]
    Imaging(#[from] ImagingError),

    #[error(transparent)]
    Store(#[from] LayoutError),
}

/// Everything a worker needs to turn a [`TileTask`] into a stored tile.
pub(crate) struct Worker<P: ImageProcessor> {
    id: WorkerId,
    pyramid: Arc<PyramidConfig>,
    processor: Arc<P>,
    store: Arc<dyn TileStore>,
    format: TileFormat,
    blank: Arc<[u8]>,
}

impl<P: ImageProcessor> Worker<P> {
    pub(crate) fn new(
        id: WorkerId,
        pyramid: Arc<PyramidConfig>,
        processor: Arc<P>,
        store: Arc<dyn TileStore>,
        format: TileFormat,
        blank: Arc<[u8]>,
    ) -> Self {
        Self {
            id,
            pyramid,
            processor,
            store,
            format,
            blank,
        }
    }

    /// Processes commands until told to shut down.
    ///
    /// Returns early, without a `Terminated` event, if either channel is
    /// closed or the worker crashes.
    pub(crate) fn run(
        self,
        mut commands: UnboundedReceiver<WorkerCommand>,
        events: UnboundedSender<WorkerEvent>,
    ) {
        trace!(worker = self.id, "Worker started");

        while let Some(command) = commands.blocking_recv() {
            let task = match command {
                WorkerCommand::Render(task) => task,
                WorkerCommand::Shutdown => {
                    trace!(worker = self.id, "Worker shutting down");
                    let _ = events.send(WorkerEvent::new(self.id, DispatchOutcome::Terminated));
                    return;
                }
            };

            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.render(task))) {
                Ok(Ok(())) => DispatchOutcome::Completed(task),
                Ok(Err(e)) => DispatchOutcome::Failed {
                    task,
                    reason: e.to_string(),
                },
                Err(payload) => {
                    let _ = events.send(WorkerEvent::new(
                        self.id,
                        DispatchOutcome::Crashed {
                            task: Some(task),
                            reason: panic_message(payload.as_ref()),
                        },
                    ));
                    return;
                }
            };

            if events.send(WorkerEvent::new(self.id, outcome)).is_err() {
                return;
            }
        }
    }

    /// Produces and stores one tile.
    fn render(&self, task: TileTask) -> Result<(), RenderError> {
        let TileTask { z, x, y } = task;

        let (window, scaled_width, scaled_height, offset_x, offset_y) =
            match self.pyramid.render_plan(task) {
                RenderPlan::Blank => {
                    debug!(worker = self.id, z, x, y, "Writing blank tile");
                    self.store.put(&task, &self.blank)?;
                    return Ok(());
                }
                RenderPlan::Render {
                    window,
                    scaled_width,
                    scaled_height,
                    offset_x,
                    offset_y,
                } => (window, scaled_width, scaled_height, offset_x, offset_y),
            };

        debug!(
            worker = self.id,
            z,
            x,
            y,
            sx = window.x,
            sy = window.y,
            sw = window.width,
            sh = window.height,
            "Rendering tile"
        );

        let region = self.processor.extract_region(window)?;
        let scaled = self.processor.resample(region, scaled_width, scaled_height)?;
        let tile = self.processor.composite_on_canvas(
            scaled,
            self.pyramid.tile_size(),
            offset_x,
            offset_y,
        )?;
        let data = self.processor.encode(&tile, self.format)?;
        self.store.put(&task, &data)?;
        Ok(())
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
