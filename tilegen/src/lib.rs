//! Tilegen - slice large images into slippy-map tile pyramids
//!
//! This library plans a multi-resolution pyramid for a source image and
//! renders every tile in parallel into a `{z}/{x}/{y}.{ext}` directory tree.
//!
//! # Modules
//!
//! - [`pyramid`] - Zoom levels, tile lists and per-tile source windows
//! - [`imaging`] - Image processing trait and the `image`-crate backend
//! - [`layout`] - Output directory layout and tile storage
//! - [`dispatch`] - Worker pool and control loop
//! - [`progress`] - Throughput, ETA and the progress line
//! - [`app`] - Run configuration and sequencing
//! - [`config`] - INI configuration file
//! - [`logging`] - Tracing subscriber setup

pub mod app;
pub mod config;
pub mod dispatch;
pub mod imaging;
pub mod layout;
pub mod logging;
pub mod progress;
pub mod pyramid;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
