use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for extraction progress, stage timings and per-frame failures.
///
/// Lets the CLI report through `log` while tests stay silent, without the
/// use case knowing which.
pub trait ExtractionLogger: Send {
    fn progress(&mut self, current: usize, total: usize);

    /// How long a named stage took, in milliseconds.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A frame was marked unavailable.
    fn frame_failed(&mut self, frame_index: usize, message: &str);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

pub struct NullExtractionLogger;

impl ExtractionLogger for NullExtractionLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn frame_failed(&mut self, _frame_index: usize, _message: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// Maximum failed frames listed individually in the summary.
const MAX_LISTED_FAILURES: usize = 10;

/// Reports through the `log` facade, throttling progress lines to every
/// `throttle_frames` frames, and keeps per-stage totals for the summary.
pub struct LogExtractionLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, Vec<f64>>,
    failures: Vec<(usize, String)>,
    start_time: Instant,
    total_frames: usize,
}

impl LogExtractionLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            failures: Vec::new(),
            start_time: Instant::now(),
            total_frames: 0,
        }
    }

    pub fn failures(&self) -> &[(usize, String)] {
        &self.failures
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    /// `None` until something has been recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.failures.is_empty() {
            return None;
        }
        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Extraction summary ({} frames, {} unavailable, {elapsed_s:.1}s total):",
            self.total_frames,
            self.failures.len()
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        for (index, message) in self.failures.iter().take(MAX_LISTED_FAILURES) {
            lines.push(format!("  frame {index}: {message}"));
        }
        if self.failures.len() > MAX_LISTED_FAILURES {
            lines.push(format!(
                "  ... and {} more",
                self.failures.len() - MAX_LISTED_FAILURES
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for LogExtractionLogger {
    fn default() -> Self {
        Self::new(50)
    }
}

impl ExtractionLogger for LogExtractionLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_frames = total;
        if total > 0 && (current % self.throttle_frames == 0 || current == total) {
            log::info!("Analyzed {current}/{total} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn frame_failed(&mut self, frame_index: usize, message: &str) {
        log::warn!("Frame {frame_index} unavailable: {message}");
        self.failures.push((frame_index, message.to_string()));
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
