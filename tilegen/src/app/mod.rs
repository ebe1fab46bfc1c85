//! Application layer: one call sequence from configuration to report.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          TileGenApp                             │
//! │                                                                 │
//! │  prepare(GeneratorConfig)                                       │
//! │    1. validate config                                           │
//! │    2. probe ─────────────► Dimensions                           │
//! │    3. PyramidConfig ─────► max_zoom, Vec<TileTask>              │
//! │    4. TileLayout::prepare ► {output}/{z}/{x}/                   │
//! │                                                                 │
//! │  run(cancel, progress)                                          │
//! │    5. RasterProcessor::open (decoded once, shared)              │
//! │    6. Dispatcher::run ───► RunSummary                           │
//! │    7. RunReport (status + FailurePolicy)                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every step before 6 is fatal on error and surfaces as [`AppError`].
//! From step 6 on, per-tile problems only show up in the [`RunReport`].

mod bootstrap;
mod config;
mod error;
mod report;

pub use bootstrap::TileGenApp;
pub use config::{
    FailurePolicy, GeneratorConfig, DEFAULT_INPUT, DEFAULT_MAX_MAGNIFICATION, DEFAULT_OUTPUT,
    DEFAULT_TILE_SIZE, MAX_TILE_SIZE,
};
pub use error::AppError;
pub use report::{RunReport, RunStatus};
