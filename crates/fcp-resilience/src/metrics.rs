//! ---
//! fcp_section: "07-resilience-drills"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Prometheus metrics for drills and recovery checks."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use anyhow::Result;
use fcp_metrics::SharedRegistry;
use prometheus::{self, HistogramOpts, HistogramVec, IntCounterVec, Opts};

use crate::drills::{DrillResult, DrillStatus};

/// Metrics published by the drill harness and recovery verifier.
#[derive(Clone)]
pub struct ReliabilityMetrics {
    registry: SharedRegistry,
    drill_runs_total: IntCounterVec,
    drill_recovery_seconds: HistogramVec,
    recovery_checks_total: IntCounterVec,
}

impl ReliabilityMetrics {
    /// Register the reliability metric family against the provided registry.
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let drill_runs_total = IntCounterVec::new(
            Opts::new(
                "fcp_drill_runs_total",
                "Failure drills executed, by scenario and verdict",
            ),
            &["scenario", "status"],
        )?;
        registry.register(Box::new(drill_runs_total.clone()))?;

        let histogram_opts = HistogramOpts::new(
            "fcp_drill_recovery_seconds",
            "Measured duration of the recovery phase of passing drills",
        )
        .buckets(prometheus::exponential_buckets(0.001, 2.0, 16)?);
        let drill_recovery_seconds = HistogramVec::new(histogram_opts, &["scenario"])?;
        registry.register(Box::new(drill_recovery_seconds.clone()))?;

        let recovery_checks_total = IntCounterVec::new(
            Opts::new(
                "fcp_recovery_checks_total",
                "Recovery verifier checks, by check and outcome",
            ),
            &["check", "outcome"],
        )?;
        registry.register(Box::new(recovery_checks_total.clone()))?;

        Ok(Self {
            registry,
            drill_runs_total,
            drill_recovery_seconds,
            recovery_checks_total,
        })
    }

    /// Expose the underlying shared registry for convenience.
    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    /// Count a finished drill; recovery time is only observed for passing runs.
    pub fn observe_drill(&self, result: &DrillResult) {
        self.drill_runs_total
            .with_label_values(&[result.scenario.as_str(), result.status.as_ref()])
            .inc();
        if result.status == DrillStatus::Pass {
            self.drill_recovery_seconds
                .with_label_values(&[result.scenario.as_str()])
                .observe(result.recovery.as_secs_f64());
        }
    }

    /// Count one recovery verifier check.
    pub fn observe_check(&self, check: &str, healthy: bool) {
        let outcome = if healthy { "ok" } else { "failed" };
        self.recovery_checks_total
            .with_label_values(&[check, outcome])
            .inc();
    }
}

impl std::fmt::Debug for ReliabilityMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReliabilityMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fcp_metrics::new_registry;
    use std::time::Duration;
    use uuid::Uuid;

    fn result(status: DrillStatus) -> DrillResult {
        DrillResult {
            id: Uuid::new_v4(),
            scenario: "probe-disconnect".into(),
            status,
            started_at: Utc::now(),
            duration: Duration::from_millis(12),
            recovery: Duration::from_millis(3),
            error: None,
            observations: vec!["marked offline".into()],
        }
    }

    #[test]
    fn drill_counters_are_labelled_by_verdict() {
        let registry = new_registry();
        let metrics = ReliabilityMetrics::new(registry.clone()).unwrap();
        metrics.observe_drill(&result(DrillStatus::Pass));
        metrics.observe_drill(&result(DrillStatus::Fail));
        metrics.observe_check("probe_online", true);

        let families = registry.gather();
        let runs = families
            .iter()
            .find(|family| family.get_name() == "fcp_drill_runs_total")
            .unwrap();
        assert_eq!(runs.get_metric().len(), 2);
        let recovery = families
            .iter()
            .find(|family| family.get_name() == "fcp_drill_recovery_seconds")
            .unwrap();
        assert_eq!(
            recovery.get_metric()[0].get_histogram().get_sample_count(),
            1
        );
        assert!(families
            .iter()
            .any(|family| family.get_name() == "fcp_recovery_checks_total"));
    }

    #[test]
    fn registering_twice_fails() {
        let registry = new_registry();
        ReliabilityMetrics::new(registry.clone()).unwrap();
        assert!(ReliabilityMetrics::new(registry).is_err());
    }
}
