//! ---
//! fcp_section: "08-slo-scoring"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "SLO scorecard engine."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
//! Shipped surfaces and objectives. These thresholds are business policy and are
//! consumed verbatim by dashboards; change them only together with their consumers.

use crate::calculus::{evaluate, rollup_indicators};
use crate::model::{Comparator, Indicator, Metric, Objective, ScorecardInput, Surface};

/// Static definition of one indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPolicy {
    pub id: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub target: f64,
    pub warning: f64,
    pub critical: f64,
    pub comparator: Comparator,
}

impl IndicatorPolicy {
    fn objective(&self, window: &str) -> Objective {
        Objective {
            target: self.target,
            warning: self.warning,
            critical: self.critical,
            comparator: self.comparator,
            window: window.to_owned(),
        }
    }

    fn score(&self, window: &str, metric: Metric) -> Indicator {
        let objective = self.objective(window);
        let evaluation = evaluate(&objective, &metric);
        Indicator {
            id: self.id.to_owned(),
            name: self.name.to_owned(),
            objective,
            metric,
            status: evaluation.status,
            score: evaluation.score,
            rationale: evaluation.rationale,
        }
    }
}

const AVAILABILITY: IndicatorPolicy = IndicatorPolicy {
    id: "availability",
    name: "Availability",
    unit: "%",
    target: 99.5,
    warning: 99.0,
    critical: 97.0,
    comparator: Comparator::HigherIsBetter,
};

const P95_LATENCY: IndicatorPolicy = IndicatorPolicy {
    id: "p95-latency",
    name: "p95 Latency",
    unit: "ms",
    target: 500.0,
    warning: 1000.0,
    critical: 1500.0,
    comparator: Comparator::LowerIsBetter,
};

const ERROR_RATE: IndicatorPolicy = IndicatorPolicy {
    id: "error-rate",
    name: "Error Rate",
    unit: "%",
    target: 1.0,
    warning: 2.0,
    critical: 5.0,
    comparator: Comparator::LowerIsBetter,
};

const CONNECTIVITY: IndicatorPolicy = IndicatorPolicy {
    id: "connectivity",
    name: "Probe Connectivity",
    unit: "%",
    target: 95.0,
    warning: 90.0,
    critical: 80.0,
    comparator: Comparator::HigherIsBetter,
};

const COMMAND_SUCCESS: IndicatorPolicy = IndicatorPolicy {
    id: "command-success",
    name: "Command Success",
    unit: "%",
    target: 98.0,
    warning: 95.0,
    critical: 90.0,
    comparator: Comparator::HigherIsBetter,
};

/// The surfaces every scorecard carries, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    ControlPlane,
    ProbeFleet,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 2] = [SurfaceKind::ControlPlane, SurfaceKind::ProbeFleet];

    pub fn id(&self) -> &'static str {
        match self {
            SurfaceKind::ControlPlane => "control-plane",
            SurfaceKind::ProbeFleet => "probe-fleet",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SurfaceKind::ControlPlane => "Control Plane",
            SurfaceKind::ProbeFleet => "Probe Fleet",
        }
    }

    /// Indicator policies in report order.
    pub fn policies(&self) -> &'static [IndicatorPolicy] {
        const CONTROL_PLANE: [IndicatorPolicy; 3] = [AVAILABILITY, P95_LATENCY, ERROR_RATE];
        const PROBE_FLEET: [IndicatorPolicy; 2] = [CONNECTIVITY, COMMAND_SUCCESS];
        match self {
            SurfaceKind::ControlPlane => &CONTROL_PLANE,
            SurfaceKind::ProbeFleet => &PROBE_FLEET,
        }
    }

    fn metrics(&self, input: &ScorecardInput) -> Vec<Metric> {
        match self {
            SurfaceKind::ControlPlane => {
                let counters = &input.control_plane;
                let total = counters.total_requests;
                let latency = if counters.p95_latency_ms >= 0.0 {
                    Metric::observed(counters.p95_latency_ms, P95_LATENCY.unit, total)
                } else {
                    Metric::empty(P95_LATENCY.unit)
                };
                vec![
                    Metric::ratio(counters.successful_requests, total),
                    latency,
                    Metric::ratio(counters.server_errors, total),
                ]
            }
            SurfaceKind::ProbeFleet => {
                let counters = &input.fleet;
                vec![
                    Metric::ratio(counters.probes_connected, counters.probes_total),
                    Metric::ratio(counters.commands_succeeded, counters.commands_total),
                ]
            }
        }
    }

    /// Score this surface from the input counters.
    pub fn build(&self, input: &ScorecardInput) -> Surface {
        let indicators: Vec<Indicator> = self
            .policies()
            .iter()
            .zip(self.metrics(input))
            .map(|(policy, metric)| policy.score(&input.window, metric))
            .collect();
        let rollup = rollup_indicators(&indicators);
        Surface {
            id: self.id().to_owned(),
            name: self.name().to_owned(),
            indicators,
            rollup,
        }
    }
}
