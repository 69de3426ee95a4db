//! ---
//! fcp_section: "03-observability"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Request telemetry sampling for SLO scorecards."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::http::{Request, Response};
use futures::future::BoxFuture;
use tower::{Layer, Service};
use tracing::trace;

use crate::sampler::RequestSampler;

const SAMPLED_EXACT: [&str; 3] = ["/healthz", "/version", "/mcp"];
const SAMPLED_PREFIX: &str = "/api/v1/";

/// Only control-plane endpoints count toward availability and latency.
pub fn is_sampled_path(path: &str) -> bool {
    SAMPLED_EXACT.contains(&path) || path.starts_with(SAMPLED_PREFIX)
}

/// Layer recording the status and latency of sampled requests.
///
/// The wrapped service's response is returned as-is: the body is never buffered or
/// re-wrapped, so streaming bodies, trailers and upgrade handles reach the client
/// exactly as the handler produced them.
#[derive(Debug, Clone)]
pub struct RequestTelemetryLayer {
    sampler: Arc<RequestSampler>,
}

impl RequestTelemetryLayer {
    /// Feed the given sampler.
    pub fn new(sampler: Arc<RequestSampler>) -> Self {
        Self { sampler }
    }
}

impl<S> Layer<S> for RequestTelemetryLayer {
    type Service = RequestTelemetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTelemetryService {
            inner,
            sampler: self.sampler.clone(),
        }
    }
}

/// Service produced by [`RequestTelemetryLayer`].
#[derive(Debug, Clone)]
pub struct RequestTelemetryService<S> {
    inner: S,
    sampler: Arc<RequestSampler>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestTelemetryService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        if !is_sampled_path(request.uri().path()) {
            return Box::pin(self.inner.call(request));
        }

        // The instance that was polled ready moves into the future.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let sampler = self.sampler.clone();
        let path = request.uri().path().to_owned();
        Box::pin(async move {
            let started = Instant::now();
            let result = inner.call(request).await;
            // A response always carries a status; handlers that never set one produce 200.
            let status = match &result {
                Ok(response) => response.status().as_u16(),
                Err(_) => 500,
            };
            let sample = sampler.record_now(status, started.elapsed());
            trace!(
                path = %path,
                status,
                latency_ms = sample.latency.as_millis() as u64,
                "request sampled"
            );
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_paths_match_control_plane_surface() {
        assert!(is_sampled_path("/healthz"));
        assert!(is_sampled_path("/version"));
        assert!(is_sampled_path("/mcp"));
        assert!(is_sampled_path("/api/v1/devices"));
        assert!(is_sampled_path("/api/v1/reliability/scorecard"));

        assert!(!is_sampled_path("/"));
        assert!(!is_sampled_path("/static/app.js"));
        assert!(!is_sampled_path("/healthz/extra"));
        assert!(!is_sampled_path("/api/v1"));
        assert!(!is_sampled_path("/api/v2/devices"));
        assert!(!is_sampled_path("/mcp/tools"));
    }
}
