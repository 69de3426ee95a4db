//! ---
//! fcp_section: "08-slo-scoring"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "SLO scorecard engine."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
//! Turns raw operational counters into a scored, explainable [`Scorecard`].
//!
//! The engine has no error path: missing or inconsistent counters surface as
//! `unknown` indicators with a score of zero.

pub mod calculus;
pub mod model;
pub mod policy;

use chrono::Utc;
use tracing::debug;

pub use calculus::{evaluate, rollup_indicators, rollup_surfaces, Evaluation, NO_DATA_RATIONALE};
pub use model::{
    Comparator, Compliance, ControlPlaneCounters, FleetCounters, Indicator, IndicatorStatus,
    Metric, Objective, Rollup, RollupStatus, Scorecard, ScorecardInput, Surface,
};
pub use policy::{IndicatorPolicy, SurfaceKind};

/// Build a scorecard from counters. Pure apart from defaulting `generated_at` to now.
pub fn build_scorecard(input: &ScorecardInput) -> Scorecard {
    let generated_at = input.generated_at.unwrap_or_else(Utc::now);
    let surfaces: Vec<Surface> = SurfaceKind::ALL
        .iter()
        .map(|kind| kind.build(input))
        .collect();
    let overall = rollup_surfaces(&surfaces);
    debug!(
        score = overall.score,
        status = %overall.status,
        window = %input.window,
        "scorecard built"
    );
    Scorecard {
        generated_at,
        window: input.window.clone(),
        surfaces,
        overall,
    }
}
