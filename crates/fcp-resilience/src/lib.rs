//! ---
//! fcp_section: "07-resilience-drills"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Failure drills and recovery verification."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
//! Synthetic failure drills and recovery checks for the fleet control plane.
//!
//! Drills only ever reach dependencies through the capability traits in
//! [`capabilities`]; the crate ships in-memory reference implementations plus
//! deliberately broken ones in [`fakes`].

pub mod capabilities;
pub mod drills;
pub mod fakes;
pub mod harness;
pub mod history;
pub mod metrics;
pub mod recovery;

pub use capabilities::{
    Capabilities, CapabilitiesBuilder, CapabilityError, CapabilityResult, ChatClient,
    DurableWriter, JobQueue, MessageQueue, ProbeRegistry, QueueDrain,
};
pub use drills::{DrillCategory, DrillDefinition, DrillResult, DrillScenario, DrillStatus};
pub use harness::{DrillHarness, DEFAULT_DRILL_PROBE, DRILL_LOG_TARGET};
pub use history::{DrillHistory, HistoryError, InMemoryDrillHistory};
pub use metrics::ReliabilityMetrics;
pub use recovery::{RecoveryState, RecoveryVerifier, RECOVERY_CHAT_DEADLINE};

/// Crate prelude collecting the most commonly used types.
pub mod prelude {
    pub use super::capabilities::Capabilities;
    pub use super::drills::{DrillDefinition, DrillResult, DrillScenario, DrillStatus};
    pub use super::harness::DrillHarness;
    pub use super::history::{DrillHistory, InMemoryDrillHistory};
    pub use super::metrics::ReliabilityMetrics;
    pub use super::recovery::{RecoveryState, RecoveryVerifier};
}
