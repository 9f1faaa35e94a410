//! Delta batching under dual count/time thresholds.

use std::time::{Duration, Instant};

const MAIN_MAX_DELTAS: usize = 3;
const MAIN_MAX_INTERVAL_MS: u64 = 20;
const TITLE_MAX_INTERVAL_MS: u64 = 50;
const TITLE_PACING_DELAY_MS: u64 = 25;

/// Flush thresholds for one stream kind. A flush is due when either the
/// delta-count threshold (if any) or the elapsed-time threshold is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushProfile {
    pub max_deltas: Option<usize>,
    pub max_interval: Duration,
    /// Pause inserted after each flush to throttle perceived typing speed.
    pub pacing_delay: Option<Duration>,
}

impl FlushProfile {
    /// Main response stream: small batches, fast cadence.
    pub fn main() -> Self {
        Self {
            max_deltas: Some(MAIN_MAX_DELTAS),
            max_interval: Duration::from_millis(MAIN_MAX_INTERVAL_MS),
            pacing_delay: None,
        }
    }

    /// Title stream: time-driven only, with extra pacing between flushes.
    pub fn title() -> Self {
        Self {
            max_deltas: None,
            max_interval: Duration::from_millis(TITLE_MAX_INTERVAL_MS),
            pacing_delay: Some(Duration::from_millis(TITLE_PACING_DELAY_MS)),
        }
    }
}

/// Accumulates stream deltas into a monotone `full` buffer and a `pending`
/// buffer that drains on every flush.
#[derive(Debug)]
pub struct DeltaBatcher {
    profile: FlushProfile,
    full: String,
    pending: String,
    delta_count: usize,
    last_flush: Instant,
}

impl DeltaBatcher {
    pub fn new(profile: FlushProfile) -> Self {
        Self {
            profile,
            full: String::new(),
            pending: String::new(),
            delta_count: 0,
            last_flush: Instant::now(),
        }
    }

    /// Append one delta. Returns the drained pending text when a flush is
    /// due. Empty deltas are ignored entirely: not appended, not counted.
    pub fn push(&mut self, delta: &str) -> Option<String> {
        if delta.is_empty() {
            return None;
        }

        self.full.push_str(delta);
        self.pending.push_str(delta);
        self.delta_count += 1;

        let count_due = self
            .profile
            .max_deltas
            .is_some_and(|max| self.delta_count >= max);
        let time_due = self.last_flush.elapsed() >= self.profile.max_interval;

        if count_due || time_due {
            return self.flush();
        }

        None
    }

    /// Drain whatever is pending at stream exhaustion, if anything.
    pub fn take_pending(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        self.flush()
    }

    /// Everything accumulated since the start of the stream.
    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn pacing_delay(&self) -> Option<Duration> {
        self.profile.pacing_delay
    }

    fn flush(&mut self) -> Option<String> {
        self.delta_count = 0;
        self.last_flush = Instant::now();
        Some(std::mem::take(&mut self.pending))
    }
}
