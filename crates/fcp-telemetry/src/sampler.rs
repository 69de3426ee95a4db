//! ---
//! fcp_section: "03-observability"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Request telemetry sampling for SLO scorecards."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fcp_common::TelemetryConfig;
use parking_lot::RwLock;
use serde::Serialize;
use serde_with::{serde_as, DurationMilliSeconds};

use crate::metrics::TelemetryMetrics;

/// Look-back used when a snapshot is requested with a zero window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5 * 60);
/// Default retention for samples.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(15 * 60);
/// Default capacity of the sample buffer.
pub const DEFAULT_MAX_SAMPLES: usize = 10_000;

/// Outcome of one sampled request.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestSample {
    /// When the request completed.
    pub at: DateTime<Utc>,
    /// Final HTTP status code.
    pub status: u16,
    /// Wall-clock time spent in the wrapped handler.
    #[serde(rename = "latency_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub latency: Duration,
}

impl RequestSample {
    /// Build a sample.
    pub fn new(at: DateTime<Utc>, status: u16, latency: Duration) -> Self {
        Self {
            at,
            status,
            latency,
        }
    }

    /// Anything below 500 counts toward availability.
    pub fn is_success(&self) -> bool {
        self.status < 500
    }
}

/// Aggregates over one window of samples.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetrySnapshot {
    /// Effective window after defaulting.
    #[serde(rename = "window_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub window: Duration,
    /// Inclusive lower bound, clamped to the sampler start time.
    pub from: DateTime<Utc>,
    /// Inclusive upper bound.
    pub to: DateTime<Utc>,
    /// Samples in the window.
    pub total: u64,
    /// Samples with status below 500.
    pub successes: u64,
    /// Samples with status 500 or above.
    pub server_errors: u64,
    /// 95th percentile latency; zero when the window is empty.
    #[serde(rename = "p95_latency_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub p95_latency: Duration,
}

/// Bounded, time-ordered buffer of request outcomes.
///
/// Mutation is serialised behind the write half of a single lock and reads copy the
/// buffer under the shared half, so snapshots never hold the lock while sorting.
#[derive(Debug)]
pub struct RequestSampler {
    started_at: DateTime<Utc>,
    max_age: Option<Duration>,
    max_samples: usize,
    default_window: Duration,
    samples: RwLock<VecDeque<RequestSample>>,
    metrics: Option<TelemetryMetrics>,
}

impl RequestSampler {
    /// Create a sampler. `max_samples` is raised to at least one.
    pub fn new(max_age: Option<Duration>, max_samples: usize) -> Self {
        let max_age = max_age.filter(|age| !age.is_zero());
        let max_samples = max_samples.max(1);
        Self {
            started_at: Utc::now(),
            max_age,
            max_samples,
            default_window: DEFAULT_WINDOW,
            samples: RwLock::new(VecDeque::with_capacity(max_samples.min(1024))),
            metrics: None,
        }
    }

    /// Build a sampler from the `[telemetry]` configuration section.
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.max_age(), config.max_samples).with_default_window(config.default_window)
    }

    /// Override the sampler start time (used to clamp look-back windows).
    pub fn with_start(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Override the window used when a snapshot asks for a zero window.
    pub fn with_default_window(mut self, window: Duration) -> Self {
        if !window.is_zero() {
            self.default_window = window;
        }
        self
    }

    /// Attach Prometheus counters.
    pub fn with_metrics(mut self, metrics: TelemetryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Time the sampler was created; snapshots never look back past it.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Configured capacity.
    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }

    /// Insert a sample and apply both eviction rules.
    ///
    /// Callers must insert in non-decreasing timestamp order; age eviction only
    /// scans the front of the buffer.
    pub fn record(&self, sample: RequestSample) {
        {
            let mut samples = self.samples.write();
            self.push_locked(&mut samples, sample);
        }
        self.observe(&sample);
    }

    /// Stamp a sample with the current time under the write lock and insert it.
    ///
    /// Taking the timestamp inside the critical section keeps concurrent writers in
    /// timestamp order.
    pub fn record_now(&self, status: u16, latency: Duration) -> RequestSample {
        let sample = {
            let mut samples = self.samples.write();
            let sample = RequestSample::new(Utc::now(), status, latency);
            self.push_locked(&mut samples, sample);
            sample
        };
        self.observe(&sample);
        sample
    }

    fn push_locked(&self, samples: &mut VecDeque<RequestSample>, sample: RequestSample) {
        samples.push_back(sample);
        if let Some(cutoff) = self
            .max_age
            .and_then(|age| chrono::Duration::from_std(age).ok())
            .and_then(|age| sample.at.checked_sub_signed(age))
        {
            while samples.front().is_some_and(|oldest| oldest.at < cutoff) {
                samples.pop_front();
            }
        }
        while samples.len() > self.max_samples {
            samples.pop_front();
        }
    }

    fn observe(&self, sample: &RequestSample) {
        if let Some(metrics) = &self.metrics {
            metrics.observe(sample);
        }
    }

    /// Aggregate the samples in `[max(now - window, started_at), now]`.
    ///
    /// A zero window falls back to the default window and `None` means the current
    /// time.
    pub fn snapshot(&self, window: Duration, now: Option<DateTime<Utc>>) -> TelemetrySnapshot {
        let window = if window.is_zero() {
            self.default_window
        } else {
            window
        };
        let now = now.unwrap_or_else(Utc::now);
        let from = chrono::Duration::from_std(window)
            .ok()
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .unwrap_or(self.started_at)
            .max(self.started_at);

        let copied: Vec<RequestSample> = self.samples.read().iter().copied().collect();

        let mut total = 0_u64;
        let mut successes = 0_u64;
        let mut server_errors = 0_u64;
        let mut latencies = Vec::with_capacity(copied.len());
        for sample in copied
            .iter()
            .filter(|sample| sample.at >= from && sample.at <= now)
        {
            total += 1;
            if sample.is_success() {
                successes += 1;
            } else {
                server_errors += 1;
            }
            latencies.push(sample.latency);
        }

        TelemetrySnapshot {
            window,
            from,
            to: now,
            total,
            successes,
            server_errors,
            p95_latency: p95(&mut latencies),
        }
    }
}

impl Default for RequestSampler {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_AGE), DEFAULT_MAX_SAMPLES)
    }
}

/// Nearest-rank 95th percentile: index `ceil(0.95 * n) - 1` of the ascending sort.
///
/// Sorts `latencies` in place. Returns zero for an empty slice.
pub fn p95(latencies: &mut [Duration]) -> Duration {
    if latencies.is_empty() {
        return Duration::ZERO;
    }
    latencies.sort_unstable();
    let n = latencies.len();
    let rank = (0.95 * n as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(n - 1);
    latencies[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        base() + chrono::Duration::seconds(seconds)
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn p95_uses_nearest_rank() {
        let mut five = vec![ms(30), ms(10), ms(50), ms(20), ms(40)];
        assert_eq!(p95(&mut five), ms(50));

        let mut hundred: Vec<Duration> = (1..=100).map(ms).collect();
        assert_eq!(p95(&mut hundred), ms(95));

        let mut single = vec![ms(7)];
        assert_eq!(p95(&mut single), ms(7));

        assert_eq!(p95(&mut []), Duration::ZERO);
    }

    #[test]
    fn snapshot_counts_successes_and_server_errors() {
        let sampler = RequestSampler::new(None, 100).with_start(base());
        for (offset, status, latency) in [
            (1, 200, 10),
            (2, 404, 20),
            (3, 500, 30),
            (4, 503, 40),
            (5, 201, 50),
        ] {
            sampler.record(RequestSample::new(at(offset), status, ms(latency)));
        }
        let snapshot = sampler.snapshot(Duration::from_secs(60), Some(at(10)));
        assert_eq!(snapshot.total, 5);
        assert_eq!(snapshot.successes, 3);
        assert_eq!(snapshot.server_errors, 2);
        assert_eq!(snapshot.p95_latency, ms(50));
    }

    #[test]
    fn capacity_overflow_drops_oldest() {
        let sampler = RequestSampler::new(None, 3).with_start(base());
        for offset in 0..5 {
            sampler.record(RequestSample::new(at(offset), 200, ms(offset as u64)));
        }
        assert_eq!(sampler.len(), 3);
        let snapshot = sampler.snapshot(Duration::from_secs(3600), Some(at(10)));
        assert_eq!(snapshot.total, 3);
        // Survivors are the samples recorded at 2, 3 and 4 seconds.
        assert_eq!(snapshot.p95_latency, ms(4));
    }

    #[test]
    fn age_eviction_drops_stale_prefix_on_record() {
        let sampler = RequestSampler::new(Some(Duration::from_secs(60)), 100).with_start(base());
        sampler.record(RequestSample::new(at(0), 200, ms(1)));
        sampler.record(RequestSample::new(at(30), 200, ms(2)));
        assert_eq!(sampler.len(), 2);
        sampler.record(RequestSample::new(at(100), 200, ms(3)));
        assert_eq!(sampler.len(), 1);
    }

    #[test]
    fn window_lower_bound_clamps_to_start() {
        let sampler = RequestSampler::new(None, 100).with_start(at(50));
        // Recorded before the sampler start; a long look-back must not reach it.
        sampler.record(RequestSample::new(at(10), 200, ms(5)));
        sampler.record(RequestSample::new(at(60), 200, ms(6)));
        let snapshot = sampler.snapshot(Duration::from_secs(3600), Some(at(70)));
        assert_eq!(snapshot.from, at(50));
        assert_eq!(snapshot.total, 1);
    }

    #[test]
    fn window_excludes_samples_outside_bounds() {
        let sampler = RequestSampler::new(None, 100).with_start(base());
        sampler.record(RequestSample::new(at(0), 200, ms(1)));
        sampler.record(RequestSample::new(at(100), 200, ms(2)));
        sampler.record(RequestSample::new(at(200), 200, ms(3)));
        let snapshot = sampler.snapshot(Duration::from_secs(60), Some(at(150)));
        assert_eq!(snapshot.from, at(90));
        assert_eq!(snapshot.total, 1);
        assert_eq!(snapshot.p95_latency, ms(2));
    }

    #[test]
    fn zero_window_uses_default() {
        let sampler = RequestSampler::new(None, 100)
            .with_start(base())
            .with_default_window(Duration::from_secs(120));
        let snapshot = sampler.snapshot(Duration::ZERO, Some(at(600)));
        assert_eq!(snapshot.window, Duration::from_secs(120));
        assert_eq!(snapshot.from, at(480));
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.p95_latency, Duration::ZERO);
    }

    #[test]
    fn snapshot_is_idempotent_without_new_samples() {
        let sampler = RequestSampler::new(None, 100).with_start(base());
        for offset in 0..20 {
            sampler.record(RequestSample::new(at(offset), 200 + offset as u16 * 20, ms(offset as u64)));
        }
        let first = sampler.snapshot(Duration::from_secs(15), Some(at(25)));
        let second = sampler.snapshot(Duration::from_secs(15), Some(at(25)));
        assert_eq!(first, second);
    }

    #[test]
    fn record_now_keeps_timestamps_ordered() {
        let sampler = RequestSampler::default();
        let first = sampler.record_now(200, ms(1));
        let second = sampler.record_now(502, ms(2));
        assert!(second.at >= first.at);
        let snapshot = sampler.snapshot(Duration::from_secs(60), None);
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.server_errors, 1);
    }

    #[test]
    fn snapshot_serializes_durations_as_milliseconds() {
        let sampler = RequestSampler::new(None, 10).with_start(base());
        sampler.record(RequestSample::new(at(1), 200, ms(320)));
        let snapshot = sampler.snapshot(Duration::from_secs(60), Some(at(2)));
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["window_ms"], 60_000);
        assert_eq!(json["p95_latency_ms"], 320);
        assert_eq!(json["total"], 1);
    }
}
