//! Application error types.

use std::fmt;

use crate::dispatch::DispatchError;
use crate::imaging::ImagingError;
use crate::layout::LayoutError;
use crate::pyramid::PyramidError;

/// Errors that stop a run before or while it starts.
///
/// Per-tile problems are not errors at this level; they are counted in the
/// run report instead.
#[derive(Debug)]
pub enum AppError {
    /// Invalid run configuration.
    Config(String),

    /// The source image could not be read.
    Image(ImagingError),

    /// The image and tiling options do not describe a pyramid.
    Pyramid(PyramidError),

    /// The output tree could not be prepared.
    Output(LayoutError),

    /// The worker pool could not start.
    Dispatch(DispatchError),

    /// Failed to create the Tokio runtime.
    RuntimeCreation(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Image(e) => write!(f, "{}", e),
            AppError::Pyramid(e) => write!(f, "Cannot plan tiles: {}", e),
            AppError::Output(e) => write!(f, "Cannot prepare output: {}", e),
            AppError::Dispatch(e) => write!(f, "Cannot start workers: {}", e),
            AppError::RuntimeCreation(msg) => {
                write!(f, "Failed to create Tokio runtime: {}", msg)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Image(e) => Some(e),
            AppError::Pyramid(e) => Some(e),
            AppError::Output(e) => Some(e),
            AppError::Dispatch(e) => Some(e),
            AppError::Config(_) | AppError::RuntimeCreation(_) => None,
        }
    }
}

impl From<ImagingError> for AppError {
    fn from(e: ImagingError) -> Self {
        AppError::Image(e)
    }
}

impl From<PyramidError> for AppError {
    fn from(e: PyramidError) -> Self {
        AppError::Pyramid(e)
    }
}

impl From<LayoutError> for AppError {
    fn from(e: LayoutError) -> Self {
        AppError::Output(e)
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        AppError::Dispatch(e)
    }
}
