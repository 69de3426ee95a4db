//! ---
//! fcp_section: "03-observability"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Request telemetry sampling for SLO scorecards."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use anyhow::Result;
use fcp_metrics::SharedRegistry;
use prometheus::{IntCounterVec, Opts};

use crate::sampler::RequestSample;

/// Counters published by the request sampler.
#[derive(Clone)]
pub struct TelemetryMetrics {
    sampled_total: IntCounterVec,
}

impl TelemetryMetrics {
    /// Register the telemetry metric family against the provided registry.
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let sampled_total = IntCounterVec::new(
            Opts::new(
                "fcp_http_requests_sampled_total",
                "Requests recorded by the telemetry sampler, by outcome class",
            ),
            &["class"],
        )?;
        registry.register(Box::new(sampled_total.clone()))?;
        Ok(Self { sampled_total })
    }

    pub(crate) fn observe(&self, sample: &RequestSample) {
        let class = if sample.is_success() {
            "ok"
        } else {
            "server_error"
        };
        self.sampled_total.with_label_values(&[class]).inc();
    }
}

impl std::fmt::Debug for TelemetryMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryMetrics").finish_non_exhaustive()
    }
}
