use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Aggregate view over every task of a batch, recomputed on each update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateProgress {
    pub bytes_downloaded: u64,
    pub total_bytes: u64,
    /// Moving average over the trailing speed window.
    pub bytes_per_second: f64,
    /// `None` while the speed is zero.
    pub eta_seconds: Option<f64>,
    pub completed_tasks: usize,
    pub total_tasks: usize,
    /// The artifact whose update triggered this emission. `None` on the
    /// closing update of a batch.
    pub artifact: Option<ArtifactProgress>,
}

/// Byte counters of a single artifact within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactProgress {
    /// Position in the batch, stable for the whole fetch.
    pub index: usize,
    pub url: String,
    pub target_path: PathBuf,
    pub bytes_downloaded: u64,
    pub size_bytes: u64,
}

impl AggregateProgress {
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            self.bytes_downloaded as f64 / self.total_bytes as f64
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(&AggregateProgress) + Send + Sync>;

/// A callback that drops every update.
pub fn ignore_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

pub fn eta_seconds(remaining: u64, bytes_per_second: f64) -> Option<f64> {
    if bytes_per_second > 0.0 {
        Some(remaining as f64 / bytes_per_second)
    } else {
        None
    }
}

/// Throughput over a trailing window of cumulative byte samples.
#[derive(Debug, Clone)]
pub struct SpeedWindow {
    window: Duration,
    samples: VecDeque<(Instant, u64)>,
}

impl SpeedWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    /// Record the cumulative byte counter at `now`.
    pub fn record(&mut self, now: Instant, cumulative: u64) {
        self.samples.push_back((now, cumulative));
        self.prune(now);
    }

    /// Bytes per second between the oldest sample still in the window and `now`.
    pub fn rate(&mut self, now: Instant) -> f64 {
        self.prune(now);
        let (Some(&(first_at, first)), Some(&(_, last))) = (self.samples.front(), self.samples.back())
        else {
            return 0.0;
        };
        let elapsed = now.saturating_duration_since(first_at).as_secs_f64();
        if elapsed <= 0.0 || last <= first {
            return 0.0;
        }
        (last - first) as f64 / elapsed
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&(at, _)) = self.samples.front() {
            if now.saturating_duration_since(at) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Rate limiter for progress callbacks.
///
/// An update is emitted only once both the time interval has elapsed and at
/// least 1% of the total has arrived since the last emission.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    min_step: u64,
    last_emit: Option<Instant>,
    last_bytes: u64,
}

impl ProgressThrottle {
    pub fn new(interval: Duration, total_bytes: u64) -> Self {
        Self {
            interval,
            min_step: total_bytes / 100,
            last_emit: None,
            last_bytes: 0,
        }
    }

    pub fn should_emit(&mut self, now: Instant, bytes: u64) -> bool {
        let time_ok = self
            .last_emit
            .map_or(true, |at| now.saturating_duration_since(at) >= self.interval);
        let bytes_ok = bytes.abs_diff(self.last_bytes) >= self.min_step.max(1);

        if time_ok && bytes_ok {
            self.last_emit = Some(now);
            self.last_bytes = bytes;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_is_zero_without_history() {
        let mut window = SpeedWindow::new(Duration::from_secs(3));
        let now = Instant::now();
        assert_eq!(window.rate(now), 0.0);
        window.record(now, 100);
        assert_eq!(window.rate(now), 0.0);
    }

    #[test]
    fn speed_uses_trailing_window_only() {
        let mut window = SpeedWindow::new(Duration::from_secs(2));
        let t0 = Instant::now();
        // Fast start: 10 MB in the first second.
        window.record(t0, 0);
        window.record(t0 + Duration::from_secs(1), 10_000_000);
        // Then 1 KB/s for a while.
        for s in 2..=6u64 {
            window.record(t0 + Duration::from_secs(s), 10_000_000 + (s - 1) * 1_000);
        }
        let rate = window.rate(t0 + Duration::from_secs(6));
        assert!((rate - 1_000.0).abs() < 1.0, "rate was {}", rate);
    }

    #[test]
    fn speed_decays_when_transfer_stops() {
        let mut window = SpeedWindow::new(Duration::from_secs(10));
        let t0 = Instant::now();
        window.record(t0, 0);
        window.record(t0 + Duration::from_secs(1), 1_000);
        let early = window.rate(t0 + Duration::from_secs(1));
        let late = window.rate(t0 + Duration::from_secs(5));
        assert!(late < early);
    }

    #[test]
    fn eta_is_unknown_at_zero_speed() {
        assert_eq!(eta_seconds(1_000, 0.0), None);
        assert_eq!(eta_seconds(1_000, 250.0), Some(4.0));
    }

    #[test]
    fn throttle_requires_interval_and_byte_step() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(100), 10_000);
        let t0 = Instant::now();
        assert!(throttle.should_emit(t0, 500));
        // Too soon.
        assert!(!throttle.should_emit(t0 + Duration::from_millis(50), 5_000));
        // Late enough but less than 1% (100 bytes) since last emission.
        assert!(!throttle.should_emit(t0 + Duration::from_millis(200), 550));
        assert!(throttle.should_emit(t0 + Duration::from_millis(200), 600));
    }

    #[test]
    fn fraction_handles_empty_batches() {
        let progress = AggregateProgress {
            bytes_downloaded: 0,
            total_bytes: 0,
            bytes_per_second: 0.0,
            eta_seconds: None,
            completed_tasks: 0,
            total_tasks: 0,
            artifact: None,
        };
        assert_eq!(progress.fraction(), 1.0);
    }
}
