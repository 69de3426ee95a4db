//! ---
//! fcp_section: "03-observability"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Request telemetry sampling for SLO scorecards."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
//! Request telemetry for the control plane.
//!
//! [`RequestSampler`] keeps a bounded, time-ordered buffer of request outcomes and
//! answers windowed aggregate queries. [`RequestTelemetryLayer`] feeds it from an
//! HTTP stack without touching response bodies.
#![warn(missing_docs)]

pub mod layer;
pub mod metrics;
pub mod sampler;

pub use layer::{is_sampled_path, RequestTelemetryLayer, RequestTelemetryService};
pub use metrics::TelemetryMetrics;
pub use sampler::{
    p95, RequestSample, RequestSampler, TelemetrySnapshot, DEFAULT_MAX_AGE, DEFAULT_MAX_SAMPLES,
    DEFAULT_WINDOW,
};
