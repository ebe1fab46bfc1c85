//! End-to-end generation through the public API.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use tempfile::TempDir;
use tilegen::app::{GeneratorConfig, RunStatus, TileGenApp};
use tilegen::imaging::TileFormat;
use tilegen::progress::{ProgressSink, ProgressSnapshot};
use tokio_util::sync::CancellationToken;

const OPAQUE_RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

fn write_source(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("source.png");
    RgbaImage::from_pixel(width, height, OPAQUE_RED)
        .save(&path)
        .unwrap();
    path
}

/// Every file under `root`, relative to it.
fn tree(root: &Path) -> BTreeSet<PathBuf> {
    let mut files = BTreeSet::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.insert(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }
    files
}

fn generate(config: GeneratorConfig) -> tilegen::app::RunReport {
    TileGenApp::prepare(config)
        .unwrap()
        .run_blocking(CancellationToken::new(), None)
        .unwrap()
}

#[test]
fn landscape_image_produces_seventeen_tiles() {
    let temp = TempDir::new().unwrap();
    let input = write_source(temp.path(), 1000, 600);
    let output = temp.path().join("out");

    let report = generate(GeneratorConfig::new(&input, &output).with_workers(4));
    assert_eq!(report.status(), RunStatus::Success);
    assert_eq!(report.summary().completed, 17);

    let files = tree(&output);
    assert_eq!(files.len(), 17);
    assert!(files.contains(Path::new("0/0/0.png")));
    assert!(files.contains(Path::new("2/3/2.png")));
}

#[test]
fn tiles_are_full_size_with_transparent_overhang() {
    let temp = TempDir::new().unwrap();
    let input = write_source(temp.path(), 1000, 600);
    let output = temp.path().join("out");
    generate(GeneratorConfig::new(&input, &output).with_workers(2));

    // Interior tile: fully covered.
    let interior = image::open(output.join("2/1/1.png")).unwrap().into_rgba8();
    assert_eq!(interior.dimensions(), (256, 256));
    assert!(interior.pixels().all(|p| *p == OPAQUE_RED));

    // Bottom-right tile: 232×88 of source, the rest transparent.
    let corner = image::open(output.join("2/3/2.png")).unwrap().into_rgba8();
    assert_eq!(corner.dimensions(), (256, 256));
    assert_eq!(*corner.get_pixel(0, 0), OPAQUE_RED);
    assert_eq!(*corner.get_pixel(231, 87), OPAQUE_RED);
    assert_eq!(*corner.get_pixel(232, 0), CLEAR);
    assert_eq!(*corner.get_pixel(0, 88), CLEAR);

    // Overview tile: the whole image scaled to 250×150.
    let overview = image::open(output.join("0/0/0.png")).unwrap().into_rgba8();
    assert_eq!(*overview.get_pixel(249, 149), OPAQUE_RED);
    assert_eq!(*overview.get_pixel(250, 0), CLEAR);
    assert_eq!(*overview.get_pixel(0, 150), CLEAR);
}

#[test]
fn single_tile_image() {
    let temp = TempDir::new().unwrap();
    let input = write_source(temp.path(), 256, 256);
    let output = temp.path().join("out");

    let app = TileGenApp::prepare(GeneratorConfig::new(&input, &output)).unwrap();
    assert_eq!(app.max_zoom(), 0);
    assert_eq!(app.task_count(), 1);

    let report = app.run_blocking(CancellationToken::new(), None).unwrap();
    assert!(report.is_successful());
    assert_eq!(tree(&output), BTreeSet::from([PathBuf::from("0/0/0.png")]));
}

#[test]
fn rerun_over_existing_output_is_identical() {
    let temp = TempDir::new().unwrap();
    let input = write_source(temp.path(), 500, 300);
    let output = temp.path().join("out");
    let config = GeneratorConfig::new(&input, &output)
        .with_tile_size(128)
        .with_format(TileFormat::Jpg)
        .with_workers(3);

    let first = TileGenApp::prepare(config.clone()).unwrap();
    let first_dirs = first.directories();
    first.run_blocking(CancellationToken::new(), None).unwrap();
    let first_tree = tree(&output);

    let second = TileGenApp::prepare(config).unwrap();
    assert_eq!(second.directories(), first_dirs);
    let report = second.run_blocking(CancellationToken::new(), None).unwrap();

    assert_eq!(report.status(), RunStatus::Success);
    assert_eq!(tree(&output), first_tree);
    assert!(first_tree.iter().all(|p| p.extension().unwrap() == "jpg"));
}

#[test]
fn progress_sink_sees_every_tile() {
    let temp = TempDir::new().unwrap();
    let input = write_source(temp.path(), 300, 300);
    let output = temp.path().join("out");

    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&snapshots);
    let sink: ProgressSink = Arc::new(move |snapshot: &ProgressSnapshot| {
        recorder.lock().unwrap().push(*snapshot);
    });

    let app = TileGenApp::prepare(GeneratorConfig::new(&input, &output).with_tile_size(100))
        .unwrap();
    let total = app.task_count();
    app.run_blocking(CancellationToken::new(), Some(sink)).unwrap();

    let snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), total);
    let last = snapshots.last().unwrap();
    assert_eq!(last.completed, total);
    assert_eq!(last.percent(), 100);
    assert_eq!(last.eta, std::time::Duration::ZERO);
}

#[test]
fn cancelled_run_is_incomplete() {
    let temp = TempDir::new().unwrap();
    let input = write_source(temp.path(), 1000, 600);
    let output = temp.path().join("out");

    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = TileGenApp::prepare(GeneratorConfig::new(&input, &output).with_workers(2))
        .unwrap()
        .run_blocking(cancel, None)
        .unwrap();

    assert_eq!(report.status(), RunStatus::Incomplete);
    assert!(report.summary().cancelled);
    assert!(!report.is_successful());
    assert!(tree(&output).is_empty());
}
