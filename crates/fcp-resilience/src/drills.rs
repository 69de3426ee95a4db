//! ---
//! fcp_section: "07-resilience-drills"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Drill catalogue and execution records."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Built-in failure drills.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DrillScenario {
    /// Probe drops off the registry and comes back.
    ProbeDisconnect,
    /// Storage writes degrade while reads keep working.
    DbWriteFailure,
    /// Chat upstream hangs past its deadline.
    LlmTimeout,
    /// Outbound message queue is flooded.
    WebsocketFlood,
    /// Many jobs are submitted at once.
    ConcurrentJobStorm,
}

impl DrillScenario {
    /// Every scenario, in catalogue order.
    pub const ALL: [DrillScenario; 5] = [
        DrillScenario::ProbeDisconnect,
        DrillScenario::DbWriteFailure,
        DrillScenario::LlmTimeout,
        DrillScenario::WebsocketFlood,
        DrillScenario::ConcurrentJobStorm,
    ];

    /// Static metadata for this scenario.
    pub fn definition(&self) -> DrillDefinition {
        let (title, description, category, timeout_secs) = match self {
            DrillScenario::ProbeDisconnect => (
                "Probe disconnect",
                "Marks a probe offline, confirms the registry notices, then brings it back online.",
                DrillCategory::Connectivity,
                5,
            ),
            DrillScenario::DbWriteFailure => (
                "Database write failure",
                "Writes a baseline record, reads it back during the failure window and times the recovery write.",
                DrillCategory::Storage,
                5,
            ),
            DrillScenario::LlmTimeout => (
                "LLM timeout",
                "Forces a chat call past a 200ms deadline and proves an independent short call still returns promptly.",
                DrillCategory::Llm,
                3,
            ),
            DrillScenario::WebsocketFlood => (
                "Websocket flood",
                "Floods the outbound queue with 50 concurrent messages and requires backpressure and recovery.",
                DrillCategory::Backpressure,
                5,
            ),
            DrillScenario::ConcurrentJobStorm => (
                "Concurrent job storm",
                "Submits 30 jobs concurrently and drains the queue under a 2s deadline.",
                DrillCategory::Concurrency,
                10,
            ),
        };
        DrillDefinition {
            scenario: *self,
            title,
            description,
            category,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Capability area a drill exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DrillCategory {
    Connectivity,
    Storage,
    Llm,
    Backpressure,
    Concurrency,
}

/// Immutable description of a drill.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrillDefinition {
    #[serde(rename = "id")]
    pub scenario: DrillScenario,
    pub title: &'static str,
    pub description: &'static str,
    pub category: DrillCategory,
    /// Upper bound on a whole run of this drill.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "timeout_ms")]
    pub timeout: Duration,
}

impl DrillDefinition {
    /// All built-in drills in scenario order.
    pub fn catalogue() -> Vec<DrillDefinition> {
        DrillScenario::ALL
            .iter()
            .map(DrillScenario::definition)
            .collect()
    }
}

/// Verdict of a drill run. There is no partial status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DrillStatus {
    Pass,
    Fail,
}

/// Record of one drill execution.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillResult {
    pub id: Uuid,
    /// Scenario identifier as requested, which may be unknown.
    pub scenario: String,
    pub status: DrillStatus,
    pub started_at: DateTime<Utc>,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "duration_ms")]
    pub duration: Duration,
    /// Wall-clock time of the recovery phase; zero when it never ran.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "recovery_ms")]
    pub recovery: Duration,
    /// Failure detail, present only on `fail`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// What the drill checked, in execution order.
    #[serde(default)]
    pub observations: Vec<String>,
}

impl DrillResult {
    pub fn is_pass(&self) -> bool {
        self.status == DrillStatus::Pass
    }
}
