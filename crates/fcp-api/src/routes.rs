//! ---
//! fcp_section: "05-networking-external-interfaces"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Reliability HTTP API."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fcp_resilience::{DrillDefinition, DrillResult, DrillScenario, RecoveryState};
use fcp_scorecard::Scorecard;
use fcp_telemetry::TelemetrySnapshot;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::ApiState;

pub(crate) fn routes(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/healthz", get(get_health))
        .route("/version", get(get_version))
        .route("/api/v1/reliability/telemetry", get(get_telemetry))
        .route("/api/v1/reliability/scorecard", get(get_scorecard))
        .route("/api/v1/reliability/drills", get(get_drills))
        .route("/api/v1/reliability/drills/history", get(get_drill_history))
        .route("/api/v1/reliability/drills/:scenario", post(post_drill))
        .route("/api/v1/reliability/recovery/:probe_id", get(get_recovery))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TelemetryQuery {
    #[serde(default)]
    window_secs: u64,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    limit: usize,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

async fn get_health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.uptime().as_secs(),
    })
}

async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: "fcpd",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn get_telemetry(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<TelemetryQuery>,
) -> Json<TelemetrySnapshot> {
    let window = Duration::from_secs(query.window_secs);
    Json(state.sampler.snapshot(window, None))
}

async fn get_scorecard(State(state): State<Arc<ApiState>>) -> Json<Scorecard> {
    Json(state.scorecard())
}

async fn get_drills() -> Json<Vec<DrillDefinition>> {
    Json(DrillDefinition::catalogue())
}

async fn post_drill(
    State(state): State<Arc<ApiState>>,
    Path(scenario): Path<String>,
) -> Result<Json<DrillResult>, ApiError> {
    let scenario: DrillScenario = scenario.parse().map_err(|_| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            format!("unknown drill scenario {scenario:?}"),
        )
    })?;
    let result = state.harness.run_scenario(scenario).await;
    state.history.save(result.clone()).await.map_err(|err| {
        error!(drill_id = %result.id, error = %err, "failed to persist drill result");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    })?;
    Ok(Json(result))
}

async fn get_drill_history(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DrillResult>>, ApiError> {
    state
        .history
        .list(query.limit)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()))
}

async fn get_recovery(
    State(state): State<Arc<ApiState>>,
    Path(probe_id): Path<String>,
) -> Json<RecoveryState> {
    let recovery = state.verifier.verify(&probe_id).await;
    let recovery = match state.overall_score() {
        Some(score) => recovery.with_scorecard_score(score),
        None => recovery,
    };
    Json(recovery)
}
