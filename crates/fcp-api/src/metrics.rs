//! ---
//! fcp_section: "05-networking-external-interfaces"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Scorecard gauges published by the API."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use anyhow::Result;
use fcp_metrics::SharedRegistry;
use fcp_scorecard::Scorecard;
use prometheus::{GaugeVec, Opts};

/// Last built score per surface plus `overall`.
#[derive(Clone)]
pub struct ScorecardMetrics {
    score: GaugeVec,
}

impl ScorecardMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let score = GaugeVec::new(
            Opts::new(
                "fcp_scorecard_score",
                "Most recent scorecard score (0-100) by surface",
            ),
            &["surface"],
        )?;
        registry.register(Box::new(score.clone()))?;
        Ok(Self { score })
    }

    pub fn record(&self, scorecard: &Scorecard) {
        for surface in &scorecard.surfaces {
            self.score
                .with_label_values(&[surface.id.as_str()])
                .set(f64::from(surface.rollup.score));
        }
        self.score
            .with_label_values(&["overall"])
            .set(f64::from(scorecard.overall.score));
    }
}

impl std::fmt::Debug for ScorecardMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorecardMetrics").finish_non_exhaustive()
    }
}
