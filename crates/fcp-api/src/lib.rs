//! ---
//! fcp_section: "05-networking-external-interfaces"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Reliability HTTP API."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---

pub mod metrics;
mod routes;

use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use fcp_common::{AppConfig, FleetConfig};
use fcp_logging::{fcp_error, fcp_warn, LogContext};
use fcp_metrics::{metrics_router, SharedRegistry};
use fcp_resilience::{
    Capabilities, DrillHarness, DrillHistory, InMemoryDrillHistory, RecoveryVerifier,
    ReliabilityMetrics,
};
use fcp_scorecard::{
    build_scorecard, ControlPlaneCounters, FleetCounters, RollupStatus, Scorecard, ScorecardInput,
};
use fcp_telemetry::{RequestSampler, RequestTelemetryLayer, TelemetrySnapshot};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use metrics::ScorecardMetrics;

/// Probe fleet counters from the static `[fleet]` section.
pub fn fleet_counters(fleet: &FleetConfig) -> FleetCounters {
    FleetCounters {
        probes_total: fleet.probes_total,
        probes_connected: fleet.probes_connected,
        commands_total: fleet.commands_total,
        commands_succeeded: fleet.commands_succeeded,
    }
}

/// Control plane counters derived from a telemetry snapshot.
pub fn control_plane_counters(snapshot: &TelemetrySnapshot) -> ControlPlaneCounters {
    ControlPlaneCounters {
        total_requests: snapshot.total,
        successful_requests: snapshot.successes,
        server_errors: snapshot.server_errors,
        p95_latency_ms: snapshot.p95_latency.as_secs_f64() * 1000.0,
    }
}

/// Shared API state exposed to handlers.
pub struct ApiState {
    config: AppConfig,
    started: Instant,
    capabilities: Capabilities,
    sampler: Arc<RequestSampler>,
    harness: DrillHarness,
    verifier: RecoveryVerifier,
    history: Arc<dyn DrillHistory>,
    metrics: Option<ScorecardMetrics>,
    registry: Option<SharedRegistry>,
}

impl ApiState {
    /// State with in-memory history and the configured static fleet counters.
    pub fn new(config: AppConfig, sampler: Arc<RequestSampler>, capabilities: Capabilities) -> Self {
        let harness = DrillHarness::new(capabilities.clone(), None)
            .with_probe_id(config.drills.probe_id.clone());
        let verifier = RecoveryVerifier::new(capabilities.clone(), None);
        let history = Arc::new(InMemoryDrillHistory::new(config.drills.history_limit));
        Self {
            config,
            started: Instant::now(),
            capabilities,
            sampler,
            harness,
            verifier,
            history,
            metrics: None,
            registry: None,
        }
    }

    pub fn with_history(mut self, history: Arc<dyn DrillHistory>) -> Self {
        self.history = history;
        self
    }

    /// Register drill, recovery and scorecard metrics against `registry` and
    /// serve it from `/metrics`.
    pub fn with_metrics(mut self, registry: SharedRegistry) -> Result<Self> {
        let reliability = ReliabilityMetrics::new(registry.clone())
            .context("failed to register reliability metrics")?;
        let scorecard = ScorecardMetrics::new(registry.clone())
            .context("failed to register scorecard metrics")?;
        self.harness = DrillHarness::new(self.capabilities.clone(), Some(reliability.clone()))
            .with_probe_id(self.config.drills.probe_id.clone());
        self.verifier = RecoveryVerifier::new(self.capabilities.clone(), Some(reliability));
        self.metrics = Some(scorecard);
        self.registry = Some(registry);
        Ok(self)
    }

    pub fn sampler(&self) -> Arc<RequestSampler> {
        Arc::clone(&self.sampler)
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Build a scorecard over the sampler's default window.
    pub fn scorecard(&self) -> Scorecard {
        let snapshot = self.sampler.snapshot(Duration::ZERO, None);
        let input = ScorecardInput::new(
            self.config.scorecard.window_label.clone(),
            control_plane_counters(&snapshot),
            fleet_counters(&self.config.fleet),
        )
        .at(snapshot.to);
        let scorecard = build_scorecard(&input);
        log_degraded_surfaces(&scorecard);
        if let Some(metrics) = &self.metrics {
            metrics.record(&scorecard);
        }
        scorecard
    }

    /// Overall score, or `None` while nothing has been scored.
    fn overall_score(&self) -> Option<u8> {
        let scorecard = self.scorecard();
        (scorecard.overall.status != RollupStatus::Unknown).then_some(scorecard.overall.score)
    }
}

fn log_degraded_surfaces(scorecard: &Scorecard) {
    for surface in &scorecard.surfaces {
        let context = LogContext::new().with_surface(&surface.id);
        match surface.rollup.status {
            RollupStatus::Critical => {
                fcp_error!(context = context, "surface critical: {}", surface.rollup.rationale)
            }
            RollupStatus::Warning => {
                fcp_warn!(context = context, "surface warning: {}", surface.rollup.rationale)
            }
            RollupStatus::Healthy | RollupStatus::Unknown => {}
        }
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("probe_id", &self.config.drills.probe_id)
            .field("window", &self.config.scorecard.window_label)
            .finish_non_exhaustive()
    }
}

/// Every route, wrapped in request telemetry and HTTP tracing. `/metrics` is
/// mounted only when a registry was attached with [`ApiState::with_metrics`].
pub fn router(state: Arc<ApiState>) -> Router {
    let sampler = state.sampler();
    let registry = state.registry.clone();
    let mut app = routes::routes(state);
    if let Some(registry) = registry {
        app = app.merge(metrics_router(registry));
    }
    app.layer(RequestTelemetryLayer::new(sampler))
        .layer(TraceLayer::new_for_http())
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ApiServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Spawn the API on `addr`. Port 0 binds an ephemeral port, reported by [`ApiServer::addr`].
pub fn spawn_api_server(state: Arc<ApiState>, addr: SocketAddr) -> Result<ApiServer> {
    let app = router(state);

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let local_addr = listener.local_addr().unwrap_or(addr);
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %local_addr, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %local_addr, error = %err, "api server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(ApiServer {
        addr: local_addr,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}
