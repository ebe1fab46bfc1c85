//! Run progress accounting.
//!
//! The dispatcher owns a [`RunProgress`] and updates it from its control
//! loop only. After every tile outcome it takes a [`ProgressSnapshot`] and
//! hands it to the optional [`ProgressSink`]. Sinks observe; they cannot
//! influence scheduling.
//!
//! ```text
//! ████████████████░░░░░░░░░░░░░░░░░░░░░░░░  40% (68/170), 35 tiles/s, elapsed: 00:00:02, eta: 00:00:03
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Characters for progress bar rendering.
const PROGRESS_FULL: char = '█';
const PROGRESS_EMPTY: char = '░';

/// Width of the progress bar in characters.
pub const PROGRESS_BAR_WIDTH: usize = 40;

/// Receives a snapshot after every completed or failed tile.
pub type ProgressSink = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

/// Mutable counters for one run.
#[derive(Debug, Clone)]
pub struct RunProgress {
    completed: usize,
    failed: usize,
    total: usize,
    started: Instant,
}

impl RunProgress {
    /// Starts the clock for a run of `total` tiles.
    pub fn new(total: usize) -> Self {
        Self::started_at(total, Instant::now())
    }

    /// Creates counters with an explicit start time.
    pub fn started_at(total: usize, started: Instant) -> Self {
        Self {
            completed: 0,
            failed: 0,
            total,
            started,
        }
    }

    pub fn record_completed(&mut self) {
        if self.completed + self.failed < self.total {
            self.completed += 1;
        }
    }

    pub fn record_failed(&mut self) {
        if self.completed + self.failed < self.total {
            self.failed += 1;
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Snapshot as of now.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Snapshot as of `now`.
    pub fn snapshot_at(&self, now: Instant) -> ProgressSnapshot {
        let elapsed = now.saturating_duration_since(self.started);
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        };

        let remaining = self.total.saturating_sub(self.completed + self.failed);
        let eta = if throughput > 0.0 {
            Duration::from_secs_f64(remaining as f64 / throughput)
        } else {
            Duration::ZERO
        };

        ProgressSnapshot {
            completed: self.completed,
            failed: self.failed,
            total: self.total,
            elapsed,
            throughput,
            eta,
        }
    }
}

/// Read-only view of run progress at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// Completed tiles per second since the run started.
    pub throughput: f64,
    /// Estimated time until every remaining tile has an outcome.
    pub eta: Duration,
}

impl ProgressSnapshot {
    /// Tiles with an outcome, successful or not.
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    /// Whole percentage of processed tiles (0..=100).
    pub fn percent(&self) -> usize {
        percent(self.processed(), self.total)
    }

    pub fn is_finished(&self) -> bool {
        self.processed() >= self.total
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {:.0} tiles/s, elapsed: {}, eta: {}",
            render_progress_bar(self.processed(), self.total, PROGRESS_BAR_WIDTH),
            self.throughput,
            format_duration(self.elapsed),
            format_duration(self.eta),
        )?;
        if self.failed > 0 {
            write!(f, ", failed: {}", self.failed)?;
        }
        Ok(())
    }
}

fn percent(done: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100) / total
}

/// Renders `{bar} {pct:>3}% ({done}/{total})`.
///
/// The bar fills in whole cells only, so it reaches full width exactly when
/// `done == total`. An empty run renders as complete.
pub fn render_progress_bar(done: usize, total: usize, width: usize) -> String {
    let filled = if total == 0 {
        width
    } else {
        done.min(total) * width / total
    };

    let mut bar = String::with_capacity(width * PROGRESS_FULL.len_utf8() + 16);
    bar.extend(std::iter::repeat(PROGRESS_FULL).take(filled));
    bar.extend(std::iter::repeat(PROGRESS_EMPTY).take(width - filled));

    format!("{} {:>3}% ({}/{})", bar, percent(done, total), done, total)
}

/// Formats a duration as `HH:MM:SS`, truncating fractional seconds.
///
/// Hours are not wrapped, so very long runs render as e.g. `100:00:00`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "00:00:00");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "00:00:59");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "01:02:05");
        assert_eq!(format_duration(Duration::from_secs(360_000)), "100:00:00");
    }

    #[test]
    fn test_progress_bar_partial() {
        let line = render_progress_bar(1, 4, 8);
        assert_eq!(line, "██░░░░░░  25% (1/4)");
    }

    #[test]
    fn test_progress_bar_bounds() {
        assert_eq!(render_progress_bar(0, 3, 4), "░░░░   0% (0/3)");
        assert_eq!(render_progress_bar(3, 3, 4), "████ 100% (3/3)");
        // 2/3 floors to 66%, not 67%
        assert_eq!(render_progress_bar(2, 3, 3), "██░  66% (2/3)");
    }

    #[test]
    fn test_progress_bar_empty_run_is_complete() {
        assert_eq!(render_progress_bar(0, 0, 2), "██ 100% (0/0)");
    }

    #[test]
    fn test_progress_bar_default_width() {
        let line = render_progress_bar(17, 17, PROGRESS_BAR_WIDTH);
        assert_eq!(line.chars().filter(|c| *c == PROGRESS_FULL).count(), 40);
    }

    #[test]
    fn test_snapshot_throughput_and_eta() {
        let start = Instant::now();
        let mut progress = RunProgress::started_at(100, start);
        for _ in 0..20 {
            progress.record_completed();
        }

        let snapshot = progress.snapshot_at(start + Duration::from_secs(10));
        assert_eq!(snapshot.throughput, 2.0);
        assert_eq!(snapshot.eta, Duration::from_secs(40));
        assert_eq!(snapshot.percent(), 20);
    }

    #[test]
    fn test_eta_excludes_failed_tiles() {
        let start = Instant::now();
        let mut progress = RunProgress::started_at(10, start);
        for _ in 0..4 {
            progress.record_completed();
        }
        for _ in 0..2 {
            progress.record_failed();
        }

        let snapshot = progress.snapshot_at(start + Duration::from_secs(4));
        assert_eq!(snapshot.processed(), 6);
        // 4 remaining at 1 tile/s
        assert_eq!(snapshot.eta, Duration::from_secs(4));
    }

    #[test]
    fn test_eta_is_zero_without_throughput() {
        let start = Instant::now();
        let progress = RunProgress::started_at(10, start);
        let snapshot = progress.snapshot_at(start + Duration::from_secs(5));
        assert_eq!(snapshot.throughput, 0.0);
        assert_eq!(snapshot.eta, Duration::ZERO);

        let snapshot = progress.snapshot_at(start);
        assert_eq!(snapshot.eta, Duration::ZERO);
    }

    #[test]
    fn test_counters_never_exceed_total() {
        let mut progress = RunProgress::new(2);
        progress.record_completed();
        progress.record_failed();
        progress.record_completed();
        progress.record_failed();
        assert_eq!(progress.completed() + progress.failed(), 2);
        assert!(progress.snapshot().is_finished());
    }

    #[test]
    fn test_snapshot_display() {
        let start = Instant::now();
        let mut progress = RunProgress::started_at(4, start);
        progress.record_completed();
        progress.record_completed();

        let line = progress
            .snapshot_at(start + Duration::from_secs(1))
            .to_string();
        assert!(line.starts_with(&render_progress_bar(2, 4, PROGRESS_BAR_WIDTH)));
        assert!(line.ends_with(", 2 tiles/s, elapsed: 00:00:01, eta: 00:00:01"));
    }

    #[test]
    fn test_snapshot_display_mentions_failures() {
        let start = Instant::now();
        let mut progress = RunProgress::started_at(4, start);
        progress.record_failed();
        let line = progress
            .snapshot_at(start + Duration::from_secs(1))
            .to_string();
        assert!(line.ends_with(", failed: 1"));
    }
}
