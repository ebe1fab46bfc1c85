//! Run configuration for [`TileGenApp`](super::TileGenApp).
//!
//! `GeneratorConfig` is built once at startup from defaults, an optional
//! configuration file and command-line flags, then handed to the app by
//! value. Nothing reads global settings after that.

use std::path::{Path, PathBuf};

use super::AppError;
use crate::dispatch::default_workers;
use crate::imaging::TileFormat;

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Largest accepted tile edge; one RGBA canvas of this size is 256 MiB.
pub const MAX_TILE_SIZE: u32 = 8192;

/// Default maximum magnification.
pub const DEFAULT_MAX_MAGNIFICATION: u32 = 1;

/// Default source image.
pub const DEFAULT_INPUT: &str = "./input.png";

/// Default output root.
pub const DEFAULT_OUTPUT: &str = "./out/";

/// How tile failures affect the outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Any failed tile makes the run unsuccessful.
    #[default]
    Strict,
    /// Failed tiles are reported but the run still counts as successful.
    Tolerant,
}

impl FailurePolicy {
    pub fn from_allow_failures(allow: bool) -> Self {
        if allow {
            FailurePolicy::Tolerant
        } else {
            FailurePolicy::Strict
        }
    }

    pub fn allows_failures(&self) -> bool {
        matches!(self, FailurePolicy::Tolerant)
    }
}

/// Everything needed to generate one pyramid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    tile_size: u32,
    format: TileFormat,
    max_magnification: u32,
    input: PathBuf,
    output: PathBuf,
    workers: usize,
    failure_policy: FailurePolicy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            format: TileFormat::default(),
            max_magnification: DEFAULT_MAX_MAGNIFICATION,
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            workers: default_workers(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl GeneratorConfig {
    /// Creates a configuration for `input` → `output` with default tiling.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self::default().with_input(input).with_output(output)
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_format(mut self, format: TileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_max_magnification(mut self, max_magnification: u32) -> Self {
        self.max_magnification = max_magnification;
        self
    }

    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn format(&self) -> TileFormat {
        self.format
    }

    pub fn max_magnification(&self) -> u32 {
        self.max_magnification
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Rejects values no run could use.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.tile_size == 0 {
            return Err(AppError::Config("tile size must be at least 1".to_string()));
        }
        if self.tile_size > MAX_TILE_SIZE {
            return Err(AppError::Config(format!(
                "tile size {} exceeds the maximum of {}",
                self.tile_size, MAX_TILE_SIZE
            )));
        }
        if self.max_magnification == 0 {
            return Err(AppError::Config(
                "maximum magnification must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(AppError::Config("workers must be at least 1".to_string()));
        }
        Ok(())
    }
}
