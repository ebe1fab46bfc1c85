//! Run sequencing for one pyramid.
//!
//! [`TileGenApp::prepare`] does everything that can fail cheaply: it reads
//! the image header, plans the pyramid and creates the output directories.
//! [`TileGenApp::run`] then decodes the source and drives the worker pool.

use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::config::GeneratorConfig;
use super::error::AppError;
use super::report::RunReport;
use crate::dispatch::Dispatcher;
use crate::imaging::{self, ImagingError, RasterProcessor};
use crate::layout::{TileLayout, TileStore};
use crate::progress::ProgressSink;
use crate::pyramid::{Dimensions, PyramidConfig, TileTask};

/// A planned pyramid, ready to render.
///
/// # Example
///
/// ```ignore
/// use tilegen::app::{GeneratorConfig, TileGenApp};
/// use tokio_util::sync::CancellationToken;
///
/// let app = TileGenApp::prepare(GeneratorConfig::new("map.png", "tiles"))?;
/// println!("{} tiles up to zoom {}", app.task_count(), app.max_zoom());
///
/// let report = app.run(CancellationToken::new(), None).await?;
/// assert!(report.is_successful());
/// ```
#[derive(Debug)]
pub struct TileGenApp {
    config: GeneratorConfig,
    pyramid: PyramidConfig,
    layout: TileLayout,
    tasks: Vec<TileTask>,
    directories: usize,
}

impl TileGenApp {
    /// Validates `config`, plans the pyramid and creates the output tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the input cannot be
    /// read as an image, or the output directories cannot be created.
    pub fn prepare(config: GeneratorConfig) -> Result<Self, AppError> {
        config.validate()?;

        let dimensions = imaging::probe(config.input())?;
        let pyramid = PyramidConfig::for_image(
            config.tile_size(),
            config.max_magnification(),
            dimensions,
        )?;
        let tasks = pyramid.tasks();

        info!(
            input = %config.input().display(),
            dimensions = %dimensions,
            tile_size = pyramid.tile_size(),
            max_zoom = pyramid.max_zoom(),
            tiles = tasks.len(),
            "Planned tile pyramid"
        );

        let layout = TileLayout::new(config.output(), config.format());
        let directories = layout.prepare(&tasks)?;
        info!(
            output = %layout.root().display(),
            directories,
            "Created output directories"
        );

        Ok(Self {
            config,
            pyramid,
            layout,
            tasks,
            directories,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn pyramid(&self) -> &PyramidConfig {
        &self.pyramid
    }

    pub fn dimensions(&self) -> Dimensions {
        self.pyramid.dimensions()
    }

    pub fn max_zoom(&self) -> u32 {
        self.pyramid.max_zoom()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of `{z}/{x}` directories the output needs.
    pub fn directories(&self) -> usize {
        self.directories
    }

    /// Decodes the source and renders every tile.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be decoded or the pool cannot
    /// start. Tile failures, crashes and cancellation are reported in the
    /// returned [`RunReport`].
    pub async fn run(
        self,
        cancel: CancellationToken,
        progress: Option<ProgressSink>,
    ) -> Result<RunReport, AppError> {
        let Self {
            config,
            pyramid,
            layout,
            tasks,
            ..
        } = self;

        let input = config.input().to_path_buf();
        let processor = tokio::task::spawn_blocking(move || RasterProcessor::open(&input))
            .await
            .map_err(|e| ImagingError::Processing(format!("decoder task failed: {}", e)))??;

        let store: Arc<dyn TileStore> = Arc::new(layout);
        let mut dispatcher = Dispatcher::new(pyramid, Arc::new(processor), store, config.format())
            .with_workers(config.workers());
        if let Some(sink) = progress {
            dispatcher = dispatcher.with_progress(sink);
        }

        let summary = dispatcher.run(tasks, cancel).await?;
        info!(
            completed = summary.completed,
            failed = summary.failed(),
            undispatched = summary.undispatched,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Run finished"
        );

        Ok(RunReport::new(summary, config.failure_policy()))
    }

    /// Runs on a dedicated multi-threaded Tokio runtime.
    ///
    /// For callers that are not already inside a runtime, such as the CLI.
    pub fn run_blocking(
        self,
        cancel: CancellationToken,
        progress: Option<ProgressSink>,
    ) -> Result<RunReport, AppError> {
        let runtime = Runtime::new().map_err(|e| AppError::RuntimeCreation(e.to_string()))?;
        runtime.block_on(self.run(cancel, progress))
    }
}
