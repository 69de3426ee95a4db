//! ---
//! fcp_section: "01-core-functionality"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Shared primitives and utilities for the reliability core."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
//! Shared primitives for the fleet control plane reliability workspace.
//! This crate exposes configuration loading and tracing bootstrap consumed
//! by the daemon and the API layer.

pub mod config;
pub mod logging;

pub use config::{
    ApiConfig, AppConfig, DrillConfig, FleetConfig, LoadedAppConfig, LoggingConfig,
    MetricsConfig, ScorecardConfig, TelemetryConfig,
};
pub use logging::{init_tracing, LogFormat};
