//! Progress accounting: a pure reducer from progress events to
//! percent/speed/ETA samples.
//!
//! Speed is computed from the delta since the previous sample (bytes since
//! last over time since last), not a running average from upload start, so
//! it tracks bandwidth changes. Samples inside the warmup window are
//! discarded to avoid connection-setup spikes. Timestamps are injected,
//! which keeps the timing behavior testable without real clocks.

use std::time::{Duration, Instant};

/// One observed progress point for one file.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub file_id: String,
    pub loaded: u64,
    pub total: u64,
    pub timestamp: Instant,
}

/// Derived view of a progress event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub percent: u8,
    pub speed_bps: Option<f64>,
    pub eta_seconds: Option<f64>,
}

/// Default warmup window discarded at the start of a transfer.
pub const DEFAULT_WARMUP: Duration = Duration::from_millis(500);

/// Per-file speed/ETA estimator.
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    warmup: Duration,
    started: Option<Instant>,
    last: Option<(Instant, u64)>,
}

impl SpeedEstimator {
    pub fn new() -> Self {
        Self::with_warmup(DEFAULT_WARMUP)
    }

    pub fn with_warmup(warmup: Duration) -> Self {
        Self {
            warmup,
            started: None,
            last: None,
        }
    }

    /// Fold one event into the estimator and derive the current sample.
    pub fn update(&mut self, event: &ProgressEvent) -> ProgressSample {
        let percent = percent(event.loaded, event.total);

        let started = *self.started.get_or_insert(event.timestamp);
        let previous = self.last.replace((event.timestamp, event.loaded));

        // Connection-setup spikes: ignore everything inside the warmup
        // window, including the sample that first crosses it (its delta
        // would span the spike).
        if event.timestamp.duration_since(started) < self.warmup {
            return ProgressSample {
                percent,
                speed_bps: None,
                eta_seconds: None,
            };
        }

        let speed_bps = previous.and_then(|(prev_ts, prev_loaded)| {
            let elapsed = event.timestamp.duration_since(prev_ts).as_secs_f64();
            if elapsed <= 0.0 || event.loaded < prev_loaded {
                return None;
            }
            if prev_ts.duration_since(started) < self.warmup {
                return None;
            }
            Some((event.loaded - prev_loaded) as f64 / elapsed)
        });

        let eta_seconds = speed_bps.and_then(|speed| {
            if speed > 0.0 {
                Some((event.total.saturating_sub(event.loaded)) as f64 / speed)
            } else {
                None
            }
        });

        ProgressSample {
            percent,
            speed_bps,
            eta_seconds,
        }
    }
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// percent = round(loaded / total · 100), clamped to 100.
pub fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (loaded as f64 / total as f64 * 100.0).round();
    pct.min(100.0) as u8
}
