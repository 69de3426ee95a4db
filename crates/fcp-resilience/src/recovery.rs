//! ---
//! fcp_section: "07-resilience-drills"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Post-incident recovery verification."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::time::Duration;

use chrono::Utc;
use fcp_logging::{fcp_info, fcp_warn, LogContext};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::capabilities::Capabilities;
use crate::metrics::ReliabilityMetrics;

/// Deadline of the chat check.
pub const RECOVERY_CHAT_DEADLINE: Duration = Duration::from_millis(100);

/// Health snapshot answering "are we back to nominal?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryState {
    pub probe_online: bool,
    pub db_writeable: bool,
    pub llm_responsive: bool,
    /// Overall scorecard score supplied by the caller, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scorecard_score: Option<u8>,
}

impl RecoveryState {
    /// All three checks held.
    pub fn is_nominal(&self) -> bool {
        self.probe_online && self.db_writeable && self.llm_responsive
    }

    pub fn with_scorecard_score(mut self, score: u8) -> Self {
        self.scorecard_score = Some(score);
        self
    }
}

/// Read-mostly health probe over the drill capabilities. Safe to call at any time.
#[derive(Debug, Clone)]
pub struct RecoveryVerifier {
    capabilities: Capabilities,
    metrics: Option<ReliabilityMetrics>,
}

impl RecoveryVerifier {
    pub fn new(capabilities: Capabilities, metrics: Option<ReliabilityMetrics>) -> Self {
        Self {
            capabilities,
            metrics,
        }
    }

    /// Run the three checks concurrently. Performs exactly one write.
    pub async fn verify(&self, probe_id: &str) -> RecoveryState {
        let key = format!("recovery-checks/{probe_id}");
        let stamp = Utc::now().to_rfc3339();
        let (offline, written, chat) = tokio::join!(
            self.capabilities.probes.is_offline(probe_id),
            self.capabilities.storage.write(&key, stamp.as_bytes()),
            timeout(
                RECOVERY_CHAT_DEADLINE,
                self.capabilities
                    .chat
                    .complete("recovery check: ping", RECOVERY_CHAT_DEADLINE),
            ),
        );

        let context = LogContext::new().with_probe(probe_id);
        if let Err(err) = &written {
            fcp_warn!(context = context, "recovery write failed: {}", err);
        }
        let llm_responsive = match chat {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                fcp_warn!(context = context, "recovery chat check failed: {}", err);
                false
            }
            Err(_) => {
                fcp_warn!(
                    context = context,
                    "recovery chat check exceeded {}ms",
                    RECOVERY_CHAT_DEADLINE.as_millis()
                );
                false
            }
        };

        let state = RecoveryState {
            probe_online: !offline,
            db_writeable: written.is_ok(),
            llm_responsive,
            scorecard_score: None,
        };
        if let Some(metrics) = &self.metrics {
            metrics.observe_check("probe_online", state.probe_online);
            metrics.observe_check("db_writeable", state.db_writeable);
            metrics.observe_check("llm_responsive", state.llm_responsive);
        }
        fcp_info!(
            context = context,
            "recovery verified: probe_online={} db_writeable={} llm_responsive={}",
            state.probe_online,
            state.db_writeable,
            state.llm_responsive
        );
        state
    }
}
