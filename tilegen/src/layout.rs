//! Output layout and tile persistence.
//!
//! Tiles are written as `{root}/{z}/{x}/{y}.{ext}`. Every column directory
//! is created once, before any worker starts, so workers only ever write
//! files into directories that already exist.
//!
//! ```text
//! out/
//! ├── 0/
//! │   └── 0/
//! │       └── 0.png
//! └── 1/
//!     ├── 0/
//!     │   ├── 0.png
//!     │   └── 1.png
//!     └── 1/
//!         ├── 0.png
//!         └── 1.png
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::imaging::TileFormat;
use crate::pyramid::TileTask;

/// Errors raised while preparing or writing the output tree.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// A directory could not be created.
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// A tile file could not be written.
    #[error("Failed to write tile {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The output root exists but is not a directory.
    #[error("Output path {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

/// Destination for encoded tiles.
///
/// Implementations must be thread-safe: every worker writes through the same
/// store concurrently, each to a distinct tile.
pub trait TileStore: Send + Sync {
    /// Persists the encoded bytes of one tile.
    fn put(&self, task: &TileTask, data: &[u8]) -> Result<(), LayoutError>;
}

/// Filesystem layout rooted at the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayout {
    root: PathBuf,
    format: TileFormat,
}

impl TileLayout {
    /// Creates a layout; nothing is touched on disk until [`prepare`](Self::prepare).
    pub fn new(root: impl Into<PathBuf>, format: TileFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> TileFormat {
        self.format
    }

    /// Directory holding all rows of one column: `{root}/{z}/{x}`.
    pub fn column_dir(&self, z: u32, x: u32) -> PathBuf {
        self.root.join(z.to_string()).join(x.to_string())
    }

    /// File path of one tile: `{root}/{z}/{x}/{y}.{ext}`.
    pub fn tile_path(&self, task: &TileTask) -> PathBuf {
        self.column_dir(task.z, task.x)
            .join(format!("{}.{}", task.y, self.format.extension()))
    }

    /// Distinct column directories needed by `tasks`, in sorted order.
    pub fn column_dirs(&self, tasks: &[TileTask]) -> Vec<PathBuf> {
        let columns: BTreeSet<(u32, u32)> = tasks.iter().map(|t| (t.z, t.x)).collect();
        columns
            .into_iter()
            .map(|(z, x)| self.column_dir(z, x))
            .collect()
    }

    /// Creates the root and every column directory needed by `tasks`.
    ///
    /// Existing directories are left untouched, so re-running over a previous
    /// output only overwrites tile files. Returns the number of distinct
    /// column directories the run needs.
    ///
    /// # Errors
    ///
    /// Fails if the root is a file or any directory cannot be created.
    pub fn prepare(&self, tasks: &[TileTask]) -> Result<usize, LayoutError> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(LayoutError::NotADirectory(self.root.clone()));
        }
        create_dir_if_missing(&self.root)?;

        let dirs = self.column_dirs(tasks);
        let mut created = 0usize;
        for dir in &dirs {
            if create_dir_if_missing(dir)? {
                created += 1;
            }
        }

        debug!(
            root = %self.root.display(),
            needed = dirs.len(),
            created,
            "Output directories ready"
        );
        Ok(dirs.len())
    }
}

/// Returns `true` if the directory had to be created.
fn create_dir_if_missing(path: &Path) -> Result<bool, LayoutError> {
    if path.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path).map_err(|source| LayoutError::CreateDir {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

impl TileStore for TileLayout {
    fn put(&self, task: &TileTask, data: &[u8]) -> Result<(), LayoutError> {
        let path = self.tile_path(task);
        fs::write(&path, data).map_err(|source| LayoutError::Write { path, source })
    }
}
