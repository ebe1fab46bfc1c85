//! Console output: run header, live progress line and final summary.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use console::{style, Term};
use tilegen::app::{RunReport, RunStatus, TileGenApp};
use tilegen::progress::{format_duration, ProgressSink, ProgressSnapshot};

use crate::error::{EXIT_FAILURE, EXIT_SUCCESS, EXIT_TILE_FAILURES};

/// Percentage step between progress lines when stdout is not a terminal.
const PLAIN_PROGRESS_STEP: usize = 5;

/// Failed tiles listed individually in the summary.
const MAX_LISTED_FAILURES: usize = 10;

/// Prints what is about to happen, once planning is done.
pub fn print_header(app: &TileGenApp) {
    let config = app.config();
    let tile_size = config.tile_size();

    println!(
        "Reading image metadata from {}...",
        style(config.input().display()).bold()
    );
    println!("Image size: {}", style(app.dimensions()).bold());
    println!(
        "Tile size: {}",
        style(format!("{}×{}", tile_size, tile_size)).bold()
    );
    println!(
        "Tile format: {}",
        style(config.format().extension().to_uppercase()).bold()
    );
    println!("Computed max zoom level: {}", style(app.max_zoom()).bold());
    println!(
        "Created {} output directories.",
        style(app.directories()).bold()
    );
    println!(
        "Spawning {} workers for {} tiles.",
        style(config.workers()).bold(),
        style(app.task_count()).bold()
    );
}

/// Builds the progress sink for stdout.
///
/// On a terminal the line is redrawn in place; otherwise a new line is
/// printed each time progress crosses a 5% step.
pub fn progress_sink() -> ProgressSink {
    let term = Term::stdout();
    if term.is_term() {
        Arc::new(move |snapshot: &ProgressSnapshot| {
            let _ = redraw_line(&term, &snapshot.to_string());
        })
    } else {
        let last_step = AtomicUsize::new(0);
        Arc::new(move |snapshot: &ProgressSnapshot| {
            let step = snapshot.percent() / PLAIN_PROGRESS_STEP;
            if step > last_step.load(Ordering::Relaxed) || snapshot.is_finished() {
                last_step.store(step, Ordering::Relaxed);
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{}", snapshot);
            }
        })
    }
}

/// Replaces the current terminal line with `line`.
///
/// The old line is cleared first so a shorter line leaves nothing behind.
fn redraw_line(term: &Term, line: &str) -> std::io::Result<()> {
    term.clear_line()?;
    term.write_str(line)?;
    term.flush()
}

/// Prints the outcome of the run and returns the process exit code.
pub fn print_summary(report: &RunReport) -> i32 {
    let summary = report.summary();
    let elapsed = format_duration(summary.elapsed);

    // Finish the progress line.
    println!();

    match report.status() {
        RunStatus::Success => {
            println!(
                "{}",
                style(format!(
                    "Success! Generated {} tiles in {}.",
                    summary.completed, elapsed
                ))
                .green()
                .bright()
            );
            EXIT_SUCCESS
        }
        RunStatus::PartialFailure => {
            print_failures(report);
            let line = format!(
                "Generated {} of {} tiles in {} ({} failed).",
                summary.completed,
                summary.total,
                elapsed,
                summary.failed()
            );
            if report.is_successful() {
                println!("{}", style(line).yellow());
                EXIT_SUCCESS
            } else {
                println!("{}", style(line).red());
                eprintln!("Re-run with --allow-failures to accept missing tiles.");
                EXIT_TILE_FAILURES
            }
        }
        RunStatus::Incomplete => {
            print_failures(report);
            let reason = if summary.cancelled {
                "Cancelled".to_string()
            } else {
                format!("Stopped: all {} workers crashed", summary.workers)
            };
            println!(
                "{}",
                style(format!(
                    "{} after {} of {} tiles in {} ({} not started).",
                    reason, summary.completed, summary.total, elapsed, summary.undispatched
                ))
                .red()
            );
            EXIT_FAILURE
        }
    }
}

fn print_failures(report: &RunReport) {
    let failures = report.failures();
    if failures.is_empty() {
        return;
    }

    eprintln!("{} tile(s) failed:", failures.len());
    for failure in failures.iter().take(MAX_LISTED_FAILURES) {
        eprintln!("  {}", failure);
    }
    if failures.len() > MAX_LISTED_FAILURES {
        eprintln!("  ... and {} more", failures.len() - MAX_LISTED_FAILURES);
    }
}
