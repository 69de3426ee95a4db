//! ---
//! fcp_section: "07-resilience-drills"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Fault-injection capability seams exercised by drills."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
//! The dependencies a drill is allowed to perturb. Production adapters implement these
//! traits; the harness only ever talks to them through [`Capabilities`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::fakes::{
    BoundedMessageQueue, InMemoryChatClient, InMemoryDurableWriter, InMemoryJobQueue,
    InMemoryProbeRegistry,
};

/// Outcome of a failed capability call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The dependency refused the request, typically under backpressure.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The dependency is down or unreachable.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// The call did not complete before its deadline.
    #[error("deadline of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),
    /// Any other failure reported by the dependency.
    #[error("{0}")]
    Failed(String),
}

/// Result alias for capability calls.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Registry tracking which probes are connected.
#[async_trait]
pub trait ProbeRegistry: Send + Sync {
    /// Mark a probe as disconnected.
    async fn mark_offline(&self, probe_id: &str) -> CapabilityResult<()>;
    /// Mark a probe as connected again.
    async fn mark_online(&self, probe_id: &str) -> CapabilityResult<()>;
    /// Whether the probe is currently offline.
    async fn is_offline(&self, probe_id: &str) -> bool;
}

/// Durable key/value storage. Reads must keep working while writes are degraded.
#[async_trait]
pub trait DurableWriter: Send + Sync {
    /// Persist a value.
    async fn write(&self, key: &str, value: &[u8]) -> CapabilityResult<()>;
    /// Read a value back; `None` when the key was never written.
    async fn read(&self, key: &str) -> CapabilityResult<Option<Vec<u8>>>;
}

/// Chat/completion client.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Complete a prompt. Implementations must give up once `deadline` elapses and
    /// must tolerate the returned future being dropped at any await point.
    async fn complete(&self, prompt: &str, deadline: Duration) -> CapabilityResult<String>;
}

/// Bounded outbound message queue (e.g. websocket fan-out).
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue a message; rejects with [`CapabilityError::Rejected`] when full.
    async fn enqueue(&self, message: Vec<u8>) -> CapabilityResult<()>;
    /// Messages currently buffered.
    fn depth(&self) -> usize;
    /// Bulk-drain support, when the queue has it.
    fn drainer(&self) -> Option<&dyn QueueDrain> {
        None
    }
}

/// Optional bulk-drain capability of a [`MessageQueue`].
#[async_trait]
pub trait QueueDrain: Send + Sync {
    /// Flush every buffered message, returning how many were removed.
    async fn drain(&self) -> CapabilityResult<usize>;
}

/// Background job queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submit a job; rejects when saturated.
    async fn submit(&self, job_id: &str) -> CapabilityResult<()>;
    /// Process queued jobs until empty or until `deadline` elapses.
    async fn drain(&self, deadline: Duration) -> CapabilityResult<usize>;
}

/// The full set of capabilities a drill or verification may touch.
///
/// Every field is always populated; use [`Capabilities::builder`] to override some of
/// them and let the rest fall back to the in-memory reference implementations.
#[derive(Clone)]
pub struct Capabilities {
    pub probes: Arc<dyn ProbeRegistry>,
    pub storage: Arc<dyn DurableWriter>,
    pub chat: Arc<dyn ChatClient>,
    pub messages: Arc<dyn MessageQueue>,
    pub jobs: Arc<dyn JobQueue>,
}

impl Capabilities {
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

/// Builder for [`Capabilities`]; unset capabilities become reference fakes on `build`.
#[derive(Default)]
pub struct CapabilitiesBuilder {
    probes: Option<Arc<dyn ProbeRegistry>>,
    storage: Option<Arc<dyn DurableWriter>>,
    chat: Option<Arc<dyn ChatClient>>,
    messages: Option<Arc<dyn MessageQueue>>,
    jobs: Option<Arc<dyn JobQueue>>,
}

impl CapabilitiesBuilder {
    pub fn probes(mut self, probes: Arc<dyn ProbeRegistry>) -> Self {
        self.probes = Some(probes);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn DurableWriter>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn messages(mut self, messages: Arc<dyn MessageQueue>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn jobs(mut self, jobs: Arc<dyn JobQueue>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn build(self) -> Capabilities {
        Capabilities {
            probes: self
                .probes
                .unwrap_or_else(|| Arc::new(InMemoryProbeRegistry::default())),
            storage: self
                .storage
                .unwrap_or_else(|| Arc::new(InMemoryDurableWriter::default())),
            chat: self
                .chat
                .unwrap_or_else(|| Arc::new(InMemoryChatClient::default())),
            messages: self
                .messages
                .unwrap_or_else(|| Arc::new(BoundedMessageQueue::default())),
            jobs: self
                .jobs
                .unwrap_or_else(|| Arc::new(InMemoryJobQueue::default())),
        }
    }
}
