//! ---
//! fcp_section: "03-observability"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Shared Prometheus registry, scrape route and daemon process metrics."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGaugeVec, Opts, Registry};
use prometheus::{TextEncoder, TEXT_FORMAT};
use tracing::error;

pub use prometheus;

/// Registry handle shared by every reliability component.
pub type SharedRegistry = Arc<Registry>;

pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Encode every registered family in the text exposition format.
pub fn render(registry: &Registry) -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("failed to encode metric families")?;
    String::from_utf8(buffer).context("metric exposition is not valid UTF-8")
}

/// `/metrics` scrape route, meant to be merged into the API router.
pub fn metrics_router(registry: SharedRegistry) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .with_state(registry)
}

async fn scrape(State(registry): State<SharedRegistry>) -> Response {
    match render(&registry) {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(err) => {
            error!(error = %err, "metrics scrape failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics scrape failed").into_response()
        }
    }
}

/// Process series for `fcpd`, published once per start.
#[derive(Clone)]
pub struct DaemonMetrics {
    starts_total: IntCounter,
    config_load_seconds: Histogram,
    build_info: IntGaugeVec,
}

impl DaemonMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let starts_total = IntCounter::with_opts(Opts::new(
            "fcpd_starts_total",
            "Times the reliability daemon entered serve mode",
        ))?;
        let config_load_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "fcpd_config_load_seconds",
                "Time spent locating, parsing and validating configuration",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        let build_info = IntGaugeVec::new(
            Opts::new("fcpd_build_info", "Constant 1, labelled with version and profile"),
            &["version", "profile"],
        )?;
        registry.register(Box::new(starts_total.clone()))?;
        registry.register(Box::new(config_load_seconds.clone()))?;
        registry.register(Box::new(build_info.clone()))?;
        Ok(Self {
            starts_total,
            config_load_seconds,
            build_info,
        })
    }

    /// Count a start, with how long configuration took to load and which build is running.
    pub fn record_start(&self, version: &str, profile: &str, config_load: Duration) {
        self.starts_total.inc();
        self.config_load_seconds.observe(config_load.as_secs_f64());
        self.build_info.with_label_values(&[version, profile]).set(1);
    }
}

impl std::fmt::Debug for DaemonMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonMetrics")
            .field("starts_total", &self.starts_total.get())
            .finish_non_exhaustive()
    }
}
