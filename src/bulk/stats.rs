use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

/// Samples kept for the rolling timing summary.
pub const MAX_TIMING_SAMPLES: usize = 100;

/// Whole milliseconds, saturating at `u64::MAX`.
pub fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Rolling summary of single-item action durations.
#[derive(Debug, Clone)]
pub struct ActionTimings {
    samples: VecDeque<Duration>,
    total_recorded: u64,
    slow_threshold: Duration,
}

impl ActionTimings {
    pub fn new(slow_threshold: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(MAX_TIMING_SAMPLES),
            total_recorded: 0,
            slow_threshold,
        }
    }

    /// Record one duration; returns true when it crossed the slow threshold.
    pub fn record(&mut self, elapsed: Duration) -> bool {
        if self.samples.len() == MAX_TIMING_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(elapsed);
        self.total_recorded += 1;

        let slow = elapsed >= self.slow_threshold;
        if slow {
            warn!(elapsed_ms = whole_millis(elapsed), threshold_ms = whole_millis(self.slow_threshold), "slow single-item action");
        }
        slow
    }

    pub fn summary(&self) -> TimingSummary {
        let count = self.samples.len();
        if count == 0 {
            return TimingSummary::default();
        }

        let total: Duration = self.samples.iter().sum();
        // count is bounded by MAX_TIMING_SAMPLES
        let divisor = u32::try_from(count).unwrap_or(u32::MAX);
        TimingSummary {
            recorded: self.total_recorded,
            mean_ms: whole_millis(total / divisor),
            min_ms: self.samples.iter().min().copied().map_or(0, whole_millis),
            max_ms: self.samples.iter().max().copied().map_or(0, whole_millis),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimingSummary {
    pub recorded: u64,
    pub mean_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Read-only projection of the controller for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub running: bool,
    pub processed: u32,
    pub failed: u32,
    pub handled: usize,
    pub queue_length: usize,
    pub elapsed: Duration,
    pub cap: u32,
    pub rate_limit_ms: u64,
    pub in_flight: bool,
    pub timings: TimingSummary,
}

pub trait StatsReporter: Send {
    fn report(&mut self, snapshot: &StatsSnapshot);
}

/// Writes each snapshot as one structured log line.
#[derive(Debug, Default)]
pub struct LogStatsReporter;

impl StatsReporter for LogStatsReporter {
    fn report(&mut self, s: &StatsSnapshot) {
        info!(
            processed = s.processed,
            cap = s.cap,
            failed = s.failed,
            queued = s.queue_length,
            elapsed_s = s.elapsed.as_secs(),
            rate_ms = s.rate_limit_ms,
            in_flight = s.in_flight,
            mean_ms = s.timings.mean_ms,
            "bulk stats"
        );
    }
}
