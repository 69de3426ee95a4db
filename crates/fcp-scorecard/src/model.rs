//! ---
//! fcp_section: "08-slo-scoring"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "SLO scorecard engine."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Which side of the thresholds is good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Comparator {
    /// Availability-style indicators.
    HigherIsBetter,
    /// Latency and error-rate style indicators.
    LowerIsBetter,
}

impl Comparator {
    /// Symbol used in rationales.
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::HigherIsBetter => ">=",
            Comparator::LowerIsBetter => "<=",
        }
    }
}

/// Verdict for a single indicator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IndicatorStatus {
    Unknown,
    Pass,
    Warning,
    Fail,
}

/// Verdict for a surface or the whole scorecard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RollupStatus {
    Unknown,
    Healthy,
    Warning,
    Critical,
}

/// Thresholds an indicator is held to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub target: f64,
    pub warning: f64,
    pub critical: f64,
    pub comparator: Comparator,
    /// Window label the counters were aggregated over, e.g. `5m`.
    pub window: String,
}

/// Observed value. `value` is present iff `sample_size > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub value: Option<f64>,
    pub unit: String,
    pub sample_size: u64,
}

impl Metric {
    /// A metric backed by `sample_size` samples.
    pub fn observed(value: f64, unit: impl Into<String>, sample_size: u64) -> Self {
        if sample_size == 0 || !value.is_finite() {
            return Self::empty(unit);
        }
        Self {
            value: Some(value),
            unit: unit.into(),
            sample_size,
        }
    }

    /// A metric with no backing samples.
    pub fn empty(unit: impl Into<String>) -> Self {
        Self {
            value: None,
            unit: unit.into(),
            sample_size: 0,
        }
    }

    /// Percentage `numerator / denominator * 100`, or empty when the ratio is undefined
    /// or the counters are inconsistent.
    pub fn ratio(numerator: u64, denominator: u64) -> Self {
        if denominator == 0 || numerator > denominator {
            return Self::empty("%");
        }
        Self::observed(
            numerator as f64 / denominator as f64 * 100.0,
            "%",
            denominator,
        )
    }
}

/// One scored signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: String,
    pub name: String,
    pub objective: Objective,
    pub metric: Metric,
    pub status: IndicatorStatus,
    pub score: u8,
    pub rationale: String,
}

/// Indicator counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compliance {
    pub passing: u32,
    pub warning: u32,
    pub failing: u32,
    pub unknown: u32,
}

impl Compliance {
    pub(crate) fn count(&mut self, status: IndicatorStatus) {
        match status {
            IndicatorStatus::Pass => self.passing += 1,
            IndicatorStatus::Warning => self.warning += 1,
            IndicatorStatus::Fail => self.failing += 1,
            IndicatorStatus::Unknown => self.unknown += 1,
        }
    }

    pub(crate) fn absorb(&mut self, other: &Compliance) {
        self.passing += other.passing;
        self.warning += other.warning;
        self.failing += other.failing;
        self.unknown += other.unknown;
    }

    /// Indicators that produced a verdict.
    pub fn scored(&self) -> u32 {
        self.passing + self.warning + self.failing
    }
}

/// Derived summary for a surface or the whole scorecard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
    pub score: u8,
    pub status: RollupStatus,
    pub rationale: String,
    pub compliance: Compliance,
}

/// Named group of indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub id: String,
    pub name: String,
    pub indicators: Vec<Indicator>,
    pub rollup: Rollup,
}

impl Surface {
    /// Look up an indicator by id.
    pub fn indicator(&self, id: &str) -> Option<&Indicator> {
        self.indicators.iter().find(|indicator| indicator.id == id)
    }
}

/// Full report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub generated_at: DateTime<Utc>,
    pub window: String,
    pub surfaces: Vec<Surface>,
    pub overall: Rollup,
}

impl Scorecard {
    /// Look up a surface by id.
    pub fn surface(&self, id: &str) -> Option<&Surface> {
        self.surfaces.iter().find(|surface| surface.id == id)
    }

    /// Iterate every indicator across surfaces.
    pub fn indicators(&self) -> impl Iterator<Item = &Indicator> {
        self.surfaces
            .iter()
            .flat_map(|surface| surface.indicators.iter())
    }
}

/// Request counters for the control plane surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlPlaneCounters {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub server_errors: u64,
    pub p95_latency_ms: f64,
}

/// Probe and command counters for the probe fleet surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetCounters {
    pub probes_total: u64,
    pub probes_connected: u64,
    pub commands_total: u64,
    pub commands_succeeded: u64,
}

/// Everything the engine needs for one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardInput {
    /// Defaults to the current time when absent.
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    pub window: String,
    #[serde(default)]
    pub control_plane: ControlPlaneCounters,
    #[serde(default)]
    pub fleet: FleetCounters,
}

impl ScorecardInput {
    pub fn new(
        window: impl Into<String>,
        control_plane: ControlPlaneCounters,
        fleet: FleetCounters,
    ) -> Self {
        Self {
            generated_at: None,
            window: window.into(),
            control_plane,
            fleet,
        }
    }

    pub fn at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }
}
