//! Progress markers and build statistics.
//!
//! Generated Makefiles echo `[built/total] Building target` before every
//! step. [`extract`] recovers the counters from a chunk of tool output and
//! [`BuildStats`] turns them into a progress bar and summary line.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;

static MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)/(\d+)\]").unwrap());

/// Throughput is only recomputed once this much time has passed.
pub const THROUGHPUT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Default progress bar width, in cells.
pub const DEFAULT_BAR_WIDTH: usize = 50;

/// Counters recovered from a progress marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCount {
    pub built: usize,
    pub total: usize,
}

impl ProgressCount {
    /// No marker was found.
    pub fn is_empty(&self) -> bool {
        self.built == 0 && self.total == 0
    }

    /// Replace an unknown (zero) total with `fallback`.
    pub fn with_fallback_total(mut self, fallback: usize) -> Self {
        if self.total == 0 {
            self.total = fallback;
        }
        self
    }
}

/// Find the first well-formed `[built/total]` marker in `text`.
///
/// Markers whose numbers do not fit are skipped. Returns zeros when nothing
/// matches.
pub fn extract(text: &str) -> ProgressCount {
    for caps in MARKER.captures_iter(text) {
        let built = caps[1].parse::<usize>();
        let total = caps[2].parse::<usize>();
        if let (Ok(built), Ok(total)) = (built, total) {
            return ProgressCount { built, total };
        }
    }
    ProgressCount::default()
}

/// Elapsed time, built count and throughput of a running build.
#[derive(Debug, Clone)]
pub struct BuildStats {
    start: Instant,
    last_built: usize,
    last_total: usize,
    last_throughput: f64,
}

impl Default for BuildStats {
    fn default() -> Self {
        BuildStats::new()
    }
}

impl BuildStats {
    /// Start measuring now.
    pub fn new() -> Self {
        BuildStats::started_at(Instant::now())
    }

    pub fn started_at(start: Instant) -> Self {
        BuildStats {
            start,
            last_built: 0,
            last_total: 0,
            last_throughput: 0.0,
        }
    }

    /// Record progress.
    pub fn update(&mut self, built: usize, total: usize) {
        self.update_at(built, total, Instant::now());
    }

    /// Record progress as of `now`.
    ///
    /// Throughput keeps its previous value until the debounce window has passed.
    pub fn update_at(&mut self, built: usize, total: usize, now: Instant) {
        let elapsed = now.saturating_duration_since(self.start);
        self.last_built = built;
        self.last_total = total;
        if elapsed > THROUGHPUT_DEBOUNCE {
            self.last_throughput = built as f64 / elapsed.as_secs_f64();
        }
    }

    pub fn built(&self) -> usize {
        self.last_built
    }

    pub fn total(&self) -> usize {
        self.last_total
    }

    /// Files per second.
    pub fn throughput(&self) -> f64 {
        self.last_throughput
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Cell of the `>` marker.
    fn position(&self, width: usize) -> usize {
        if self.last_total == 0 {
            0
        } else {
            self.last_built.saturating_mul(width) / self.last_total
        }
    }

    /// `[=====>    ]`: `width` cells, filled up to the current position.
    pub fn progress_bar(&self, width: usize) -> String {
        let pos = self.position(width);
        let mut bar = String::with_capacity(width + 2);
        bar.push('[');
        for i in 0..width {
            bar.push(match i.cmp(&pos) {
                std::cmp::Ordering::Less => '=',
                std::cmp::Ordering::Equal => '>',
                std::cmp::Ordering::Greater => ' ',
            });
        }
        bar.push(']');
        bar
    }

    /// One-line summary of built count, elapsed time and throughput.
    pub fn summary(&self) -> String {
        self.summary_with_elapsed(self.elapsed())
    }

    fn summary_with_elapsed(&self, elapsed: Duration) -> String {
        format!(
            "Built: {} files | Elapsed: {:.1}s | Speed: {:.1} files/s",
            self.last_built,
            elapsed.as_secs_f64(),
            self.last_throughput
        )
    }

    /// Bar and summary on one line.
    pub fn render(&self, width: usize) -> String {
        format!("{} {}", self.progress_bar(width), self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_secs_ago(secs: u64) -> BuildStats {
        let now = Instant::now();
        let start = now.checked_sub(Duration::from_secs(secs)).unwrap_or(now);
        BuildStats::started_at(start)
    }

    #[test]
    fn test_extract_marker() {
        assert_eq!(
            extract("... [12/40] ..."),
            ProgressCount { built: 12, total: 40 }
        );
        assert_eq!(extract("[3/5] Building main.o"), ProgressCount { built: 3, total: 5 });
    }

    #[test]
    fn test_extract_no_marker() {
        assert_eq!(extract("no markers here"), ProgressCount::default());
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_extract_first_marker_wins() {
        let text = "[1/4] Building a.o\n[2/4] Building b.o\n[3/4] Building c.o\n";
        assert_eq!(extract(text), ProgressCount { built: 1, total: 4 });
    }

    #[test]
    fn test_extract_ignores_malformed() {
        assert!(extract("[a/b] [1/] [/2] [1-2] [ 1/2]").is_empty());
        assert_eq!(
            extract("[x/3] then [2/3]"),
            ProgressCount { built: 2, total: 3 }
        );
    }

    #[test]
    fn test_extract_skips_overflow() {
        let text = "[99999999999999999999999999/1] [4/8]";
        assert_eq!(extract(text), ProgressCount { built: 4, total: 8 });
    }

    #[test]
    fn test_fallback_total() {
        let count = ProgressCount { built: 0, total: 0 }.with_fallback_total(7);
        assert_eq!(count.total, 7);
        let count = ProgressCount { built: 1, total: 3 }.with_fallback_total(7);
        assert_eq!(count.total, 3);
    }

    #[test]
    fn test_progress_bar_half() {
        let mut stats = BuildStats::new();
        stats.update(5, 10);
        assert_eq!(stats.progress_bar(10), "[=====>    ]");
        assert_eq!(stats.progress_bar(10), stats.progress_bar(10));
    }

    #[test]
    fn test_progress_bar_edges() {
        let mut stats = BuildStats::new();
        assert_eq!(stats.progress_bar(4), "[>   ]");

        stats.update(10, 10);
        assert_eq!(stats.progress_bar(4), "[====]");

        stats.update(12, 10);
        assert_eq!(stats.progress_bar(4), "[====]");

        assert_eq!(stats.progress_bar(0), "[]");
    }

    #[test]
    fn test_progress_bar_width() {
        let mut stats = BuildStats::new();
        stats.update(1, 3);
        let bar = stats.progress_bar(DEFAULT_BAR_WIDTH);
        assert_eq!(bar.chars().count(), DEFAULT_BAR_WIDTH + 2);
        assert_eq!(bar.matches('>').count(), 1);
    }

    #[test]
    fn test_throughput_debounced() {
        let start = Instant::now();
        let mut stats = BuildStats::started_at(start);

        stats.update_at(3, 10, start + Duration::from_millis(50));
        assert_eq!(stats.built(), 3);
        assert_eq!(stats.throughput(), 0.0);

        stats.update_at(4, 10, start + Duration::from_secs(2));
        assert!((stats.throughput() - 2.0).abs() < 1e-9);

        // Inside the window again (clock skew): previous throughput retained.
        stats.update_at(9, 10, start);
        assert_eq!(stats.built(), 9);
        assert!((stats.throughput() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_format() {
        let start = Instant::now();
        let mut stats = BuildStats::started_at(start);
        stats.update_at(6, 10, start + Duration::from_secs(4));
        let summary = stats.summary_with_elapsed(Duration::from_millis(4300));
        assert_eq!(summary, "Built: 6 files | Elapsed: 4.3s | Speed: 1.5 files/s");
    }

    #[test]
    fn test_summary_uses_elapsed() {
        let mut stats = started_secs_ago(3);
        stats.update(3, 3);
        assert!(stats.summary().starts_with("Built: 3 files | Elapsed: "));
        assert!(stats.render(10).starts_with("[==========] Built: 3 files"));
    }
}
