//! Level-gated progress reporting.
//!
//! A [`Reporter`] emits a message iff the configured [`ReportLevel`] is at
//! least the message's threshold. It never affects control flow or data,
//! and lines already emitted stay emitted when a later stage fails.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::info;

use crate::schema::ReportLevel;
use crate::stage::Stage;

/// Destination for report lines.
pub trait ReportSink: Send + Sync {
    /// Writes one line.
    fn emit(&self, line: &str);
}

/// Sends report lines to `tracing` under the `simdispatch::report` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&self, line: &str) {
        info!(target: "simdispatch::report", "{line}");
    }
}

/// Collects report lines in memory.
///
/// Clones share the same buffer, so a clone handed to a pipeline can be
/// inspected after the run.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines emitted so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true if any emitted line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Emits progress for one pipeline invocation.
pub struct Reporter<'a> {
    level: ReportLevel,
    sink: &'a dyn ReportSink,
}

impl std::fmt::Debug for Reporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").field("level", &self.level).finish_non_exhaustive()
    }
}

impl<'a> Reporter<'a> {
    #[must_use]
    pub fn new(level: ReportLevel, sink: &'a dyn ReportSink) -> Self {
        Self { level, sink }
    }

    #[must_use]
    pub const fn level(&self) -> ReportLevel {
        self.level
    }

    /// Whether a message with `threshold` would be emitted.
    #[must_use]
    pub fn enabled(&self, threshold: ReportLevel) -> bool {
        self.level >= threshold
    }

    /// Emits `message` if the level reaches `threshold`.
    pub fn emit(&self, threshold: ReportLevel, message: impl AsRef<str>) {
        if self.enabled(threshold) {
            self.sink.emit(message.as_ref());
        }
    }

    /// Emits a stage-progress message (level 1 and above).
    pub fn progress(&self, message: impl AsRef<str>) {
        self.emit(ReportLevel::Stages, message);
    }

    /// Reports that `stage` is switched off.
    pub fn skipped(&self, stage: Stage) {
        self.progress(stage.skipped_message());
    }

    /// Runs `f`, reporting its wall-clock duration at level 2 and above.
    ///
    /// The returned duration is `None` when timing is not enabled.
    pub fn timed<T>(&self, f: impl FnOnce() -> T) -> (T, Option<Duration>) {
        if !self.enabled(ReportLevel::Timing) {
            return (f(), None);
        }
        let started = Instant::now();
        let out = f();
        let elapsed = started.elapsed();
        self.emit(
            ReportLevel::Timing,
            format!("Elapsed time: {:.3} s", elapsed.as_secs_f64()),
        );
        (out, Some(elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_iff_level_reaches_threshold() {
        let sink = MemorySink::new();
        let reporter = Reporter::new(ReportLevel::Stages, &sink);

        reporter.emit(ReportLevel::Quiet, "always");
        reporter.emit(ReportLevel::Stages, "stages");
        reporter.emit(ReportLevel::Timing, "timing");

        assert_eq!(sink.lines(), vec!["always", "stages"]);
    }

    #[test]
    fn quiet_reporter_emits_nothing_above_zero() {
        let sink = MemorySink::new();
        let reporter = Reporter::new(ReportLevel::Quiet, &sink);
        reporter.progress("Parsing...");
        reporter.skipped(Stage::Build);
        let (value, elapsed) = reporter.timed(|| 5);
        assert_eq!(value, 5);
        assert!(elapsed.is_none());
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn timing_line_needs_level_two() {
        let sink = MemorySink::new();
        let (_, elapsed) = Reporter::new(ReportLevel::Stages, &sink).timed(|| ());
        assert!(elapsed.is_none());
        assert!(!sink.contains("Elapsed time"));

        let (_, elapsed) = Reporter::new(ReportLevel::Timing, &sink).timed(|| ());
        assert!(elapsed.is_some());
        assert!(sink.contains("Elapsed time"));
    }

    #[test]
    fn memory_sink_clones_share_lines() {
        let sink = MemorySink::new();
        let other = sink.clone();
        Reporter::new(ReportLevel::Interactive, &other).skipped(Stage::Validate);
        assert_eq!(sink.lines(), vec!["Parsing turned off."]);
    }
}
