//! Test doubles for the dispatcher.

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::imaging::{ImageProcessor, ImagingError, TileFormat};
use crate::layout::{LayoutError, TileStore};
use crate::pyramid::{SourceWindow, TileTask};

pub(crate) const BLANK_BYTES: &[u8] = b"blank";
pub(crate) const TILE_BYTES: &[u8] = b"tile";

/// Image stand-in: only its size and whether any pixels were drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FakeImage {
    pub width: u32,
    pub height: u32,
    pub blank: bool,
}

/// Processor that does no pixel work but counts region extractions.
#[derive(Debug, Default)]
pub(crate) struct FakeProcessor {
    extracts: AtomicUsize,
    fail_encode: bool,
    fail_extract: Vec<SourceWindow>,
}

impl FakeProcessor {
    /// A processor whose every `encode` call fails.
    pub(crate) fn failing_encode() -> Self {
        Self {
            fail_encode: true,
            ..Self::default()
        }
    }

    /// Makes `extract_region` fail for exactly this source window.
    pub(crate) fn fail_extract_on(mut self, window: SourceWindow) -> Self {
        self.fail_extract.push(window);
        self
    }

    pub(crate) fn extract_calls(&self) -> usize {
        self.extracts.load(Ordering::SeqCst)
    }
}

impl ImageProcessor for FakeProcessor {
    type Image = FakeImage;

    fn extract_region(&self, window: SourceWindow) -> Result<FakeImage, ImagingError> {
        self.extracts.fetch_add(1, Ordering::SeqCst);
        if self.fail_extract.contains(&window) {
            return Err(ImagingError::RegionOutOfBounds {
                window,
                width: 0,
                height: 0,
            });
        }
        Ok(FakeImage {
            width: window.width,
            height: window.height,
            blank: false,
        })
    }

    fn resample(&self, image: FakeImage, width: u32, height: u32) -> Result<FakeImage, ImagingError> {
        Ok(FakeImage {
            width,
            height,
            ..image
        })
    }

    fn composite_on_canvas(
        &self,
        image: FakeImage,
        canvas_size: u32,
        _offset_x: i64,
        _offset_y: i64,
    ) -> Result<FakeImage, ImagingError> {
        Ok(FakeImage {
            width: canvas_size,
            height: canvas_size,
            blank: image.blank,
        })
    }

    fn blank_canvas(&self, size: u32) -> FakeImage {
        FakeImage {
            width: size,
            height: size,
            blank: true,
        }
    }

    fn encode(&self, image: &FakeImage, format: TileFormat) -> Result<Vec<u8>, ImagingError> {
        if self.fail_encode {
            return Err(ImagingError::Encode {
                format,
                reason: "encoder disabled".to_string(),
            });
        }
        Ok(if image.blank { BLANK_BYTES } else { TILE_BYTES }.to_vec())
    }
}

/// Store that keeps every write in memory.
///
/// Selected tiles can be made to fail with an I/O error or to panic.
#[derive(Debug, Default)]
pub(crate) struct RecordingStore {
    writes: Mutex<Vec<(TileTask, Vec<u8>)>>,
    fail_on: HashSet<TileTask>,
    panic_on: HashSet<TileTask>,
}

impl RecordingStore {
    pub(crate) fn fail_on(mut self, task: TileTask) -> Self {
        self.fail_on.insert(task);
        self
    }

    pub(crate) fn panic_on(mut self, task: TileTask) -> Self {
        self.panic_on.insert(task);
        self
    }

    pub(crate) fn writes(&self) -> Vec<(TileTask, Vec<u8>)> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    /// Tasks written so far, sorted.
    pub(crate) fn written_tasks(&self) -> Vec<TileTask> {
        let mut tasks: Vec<_> = self.writes().into_iter().map(|(task, _)| task).collect();
        tasks.sort();
        tasks
    }
}

impl TileStore for RecordingStore {
    fn put(&self, task: &TileTask, data: &[u8]) -> Result<(), LayoutError> {
        if self.panic_on.contains(task) {
            panic!("injected panic at {}", task);
        }
        if self.fail_on.contains(task) {
            return Err(LayoutError::Write {
                path: PathBuf::from(format!("{}.png", task)),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push((*task, data.to_vec()));
        }
        Ok(())
    }
}
