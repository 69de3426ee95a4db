//! ---
//! fcp_section: "07-resilience-drills"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "In-memory capability implementations for drills and tests."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
//! Reference implementations model correct production behaviour. The broken
//! counterparts each violate exactly one contract so drills can be shown to catch it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::time::sleep;

use crate::capabilities::{
    CapabilityError, CapabilityResult, ChatClient, DurableWriter, JobQueue, MessageQueue,
    ProbeRegistry, QueueDrain,
};

/// Upstream latency of the default chat client; long enough that every drill deadline fires.
pub const DEFAULT_CHAT_LATENCY: Duration = Duration::from_secs(30);
/// Capacity of the default message queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;
/// Capacity of the default job queue.
pub const DEFAULT_JOB_CAPACITY: usize = 16;

/// Probe registry backed by a set of offline probe ids.
#[derive(Debug, Default)]
pub struct InMemoryProbeRegistry {
    offline: Mutex<HashSet<String>>,
}

#[async_trait]
impl ProbeRegistry for InMemoryProbeRegistry {
    async fn mark_offline(&self, probe_id: &str) -> CapabilityResult<()> {
        self.offline.lock().insert(probe_id.to_owned());
        Ok(())
    }

    async fn mark_online(&self, probe_id: &str) -> CapabilityResult<()> {
        self.offline.lock().remove(probe_id);
        Ok(())
    }

    async fn is_offline(&self, probe_id: &str) -> bool {
        self.offline.lock().contains(probe_id)
    }
}

/// Key/value store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDurableWriter {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryDurableWriter {
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl DurableWriter for InMemoryDurableWriter {
    async fn write(&self, key: &str, value: &[u8]) -> CapabilityResult<()> {
        self.entries.write().insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    async fn read(&self, key: &str) -> CapabilityResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }
}

/// Chat client simulating an upstream with fixed latency that honours its deadline.
#[derive(Debug, Clone)]
pub struct InMemoryChatClient {
    latency: Duration,
}

impl InMemoryChatClient {
    /// Upstream answering after `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    /// Upstream answering immediately. Never times out.
    pub fn instant() -> Self {
        Self::with_latency(Duration::ZERO)
    }
}

impl Default for InMemoryChatClient {
    fn default() -> Self {
        Self::with_latency(DEFAULT_CHAT_LATENCY)
    }
}

#[async_trait]
impl ChatClient for InMemoryChatClient {
    async fn complete(&self, prompt: &str, deadline: Duration) -> CapabilityResult<String> {
        if self.latency <= deadline {
            sleep(self.latency).await;
            Ok(format!("ack: {prompt}"))
        } else {
            sleep(deadline).await;
            Err(CapabilityError::Timeout(deadline))
        }
    }
}

/// Message queue rejecting enqueues once `capacity` messages are buffered.
#[derive(Debug)]
pub struct BoundedMessageQueue {
    capacity: usize,
    buffer: Mutex<VecDeque<Vec<u8>>>,
}

impl BoundedMessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }
}

impl Default for BoundedMessageQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[async_trait]
impl MessageQueue for BoundedMessageQueue {
    async fn enqueue(&self, message: Vec<u8>) -> CapabilityResult<()> {
        let mut buffer = self.buffer.lock();
        if buffer.len() >= self.capacity {
            return Err(CapabilityError::Rejected(format!(
                "queue full at {} messages",
                self.capacity
            )));
        }
        buffer.push_back(message);
        Ok(())
    }

    fn depth(&self) -> usize {
        self.buffer.lock().len()
    }

    fn drainer(&self) -> Option<&dyn QueueDrain> {
        Some(self)
    }
}

#[async_trait]
impl QueueDrain for BoundedMessageQueue {
    async fn drain(&self) -> CapabilityResult<usize> {
        let mut buffer = self.buffer.lock();
        let drained = buffer.len();
        buffer.clear();
        Ok(drained)
    }
}

/// Job queue holding at most `capacity` pending jobs.
#[derive(Debug)]
pub struct InMemoryJobQueue {
    capacity: usize,
    pending: Mutex<VecDeque<String>>,
}

impl InMemoryJobQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pending: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_CAPACITY)
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn submit(&self, job_id: &str) -> CapabilityResult<()> {
        let mut pending = self.pending.lock();
        if pending.len() >= self.capacity {
            return Err(CapabilityError::Rejected(format!(
                "job queue saturated, {job_id} not accepted"
            )));
        }
        pending.push_back(job_id.to_owned());
        Ok(())
    }

    async fn drain(&self, _deadline: Duration) -> CapabilityResult<usize> {
        let mut pending = self.pending.lock();
        let drained = pending.len();
        pending.clear();
        Ok(drained)
    }
}

/// Broken: accepts `mark_offline` but keeps reporting the probe online.
#[derive(Debug, Default)]
pub struct NeverOfflineRegistry;

#[async_trait]
impl ProbeRegistry for NeverOfflineRegistry {
    async fn mark_offline(&self, _probe_id: &str) -> CapabilityResult<()> {
        Ok(())
    }

    async fn mark_online(&self, _probe_id: &str) -> CapabilityResult<()> {
        Ok(())
    }

    async fn is_offline(&self, _probe_id: &str) -> bool {
        false
    }
}

/// Broken: once offline, a probe never comes back.
#[derive(Debug, Default)]
pub struct StuckOfflineRegistry {
    offline: Mutex<HashSet<String>>,
}

#[async_trait]
impl ProbeRegistry for StuckOfflineRegistry {
    async fn mark_offline(&self, probe_id: &str) -> CapabilityResult<()> {
        self.offline.lock().insert(probe_id.to_owned());
        Ok(())
    }

    async fn mark_online(&self, _probe_id: &str) -> CapabilityResult<()> {
        Ok(())
    }

    async fn is_offline(&self, probe_id: &str) -> bool {
        self.offline.lock().contains(probe_id)
    }
}

/// Broken: every write fails, reads still work.
#[derive(Debug, Default)]
pub struct FailingDurableWriter;

#[async_trait]
impl DurableWriter for FailingDurableWriter {
    async fn write(&self, _key: &str, _value: &[u8]) -> CapabilityResult<()> {
        Err(CapabilityError::Unavailable("primary is read-only".into()))
    }

    async fn read(&self, _key: &str) -> CapabilityResult<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// Broken: fails with an error message far beyond any reasonable log budget.
#[derive(Debug, Default)]
pub struct VerboseErrorChat;

#[async_trait]
impl ChatClient for VerboseErrorChat {
    async fn complete(&self, _prompt: &str, _deadline: Duration) -> CapabilityResult<String> {
        Err(CapabilityError::Failed(format!(
            "upstream error: {}",
            "stack frame; ".repeat(64)
        )))
    }
}

/// Broken: accepts every message, so there is no backpressure.
#[derive(Debug, Default)]
pub struct UnboundedMessageQueue {
    buffer: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl MessageQueue for UnboundedMessageQueue {
    async fn enqueue(&self, message: Vec<u8>) -> CapabilityResult<()> {
        self.buffer.lock().push(message);
        Ok(())
    }

    fn depth(&self) -> usize {
        self.buffer.lock().len()
    }
}

/// Broken: accepts jobs but `drain` never returns unless cancelled.
#[derive(Debug, Default)]
pub struct DeadlockedJobQueue {
    accepted: Mutex<usize>,
}

#[async_trait]
impl JobQueue for DeadlockedJobQueue {
    async fn submit(&self, _job_id: &str) -> CapabilityResult<()> {
        *self.accepted.lock() += 1;
        Ok(())
    }

    async fn drain(&self, _deadline: Duration) -> CapabilityResult<usize> {
        futures::future::pending::<()>().await;
        Ok(0)
    }
}

/// Broken: rejects every submission.
#[derive(Debug, Default)]
pub struct SaturatedJobQueue;

#[async_trait]
impl JobQueue for SaturatedJobQueue {
    async fn submit(&self, job_id: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Rejected(format!(
            "worker pool wedged, {job_id} not accepted"
        )))
    }

    async fn drain(&self, _deadline: Duration) -> CapabilityResult<usize> {
        Ok(0)
    }
}

/// Broken: a maintenance lock makes the registry refuse a state change.
#[derive(Debug, Default)]
pub struct RefusingProbeRegistry {
    refuse_online: bool,
    offline: Mutex<HashSet<String>>,
}

impl RefusingProbeRegistry {
    /// Rejects `mark_offline`.
    pub fn refusing_offline() -> Self {
        Self::default()
    }

    /// Accepts `mark_offline`, then rejects `mark_online`.
    pub fn refusing_online() -> Self {
        Self {
            refuse_online: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ProbeRegistry for RefusingProbeRegistry {
    async fn mark_offline(&self, probe_id: &str) -> CapabilityResult<()> {
        if !self.refuse_online {
            return Err(CapabilityError::Rejected("probe pinned by maintenance lock".into()));
        }
        self.offline.lock().insert(probe_id.to_owned());
        Ok(())
    }

    async fn mark_online(&self, _probe_id: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Rejected("probe pinned by maintenance lock".into()))
    }

    async fn is_offline(&self, probe_id: &str) -> bool {
        self.offline.lock().contains(probe_id)
    }
}

/// Broken: accepts the first write, then stays read-only.
#[derive(Debug, Default)]
pub struct WriteOnceDurableWriter {
    inner: InMemoryDurableWriter,
}

#[async_trait]
impl DurableWriter for WriteOnceDurableWriter {
    async fn write(&self, key: &str, value: &[u8]) -> CapabilityResult<()> {
        if !self.inner.is_empty() {
            return Err(CapabilityError::Unavailable("replica promoted read-only".into()));
        }
        self.inner.write(key, value).await
    }

    async fn read(&self, key: &str) -> CapabilityResult<Option<Vec<u8>>> {
        self.inner.read(key).await
    }
}

/// Broken: writes succeed but every read errors.
#[derive(Debug, Default)]
pub struct UnreadableDurableWriter {
    inner: InMemoryDurableWriter,
}

#[async_trait]
impl DurableWriter for UnreadableDurableWriter {
    async fn write(&self, key: &str, value: &[u8]) -> CapabilityResult<()> {
        self.inner.write(key, value).await
    }

    async fn read(&self, _key: &str) -> CapabilityResult<Option<Vec<u8>>> {
        Err(CapabilityError::Unavailable("read path offline".into()))
    }
}

/// Broken: bounded, but offers no way to drain, so it stays full.
#[derive(Debug, Default)]
pub struct UndrainableMessageQueue {
    inner: BoundedMessageQueue,
}

#[async_trait]
impl MessageQueue for UndrainableMessageQueue {
    async fn enqueue(&self, message: Vec<u8>) -> CapabilityResult<()> {
        self.inner.enqueue(message).await
    }

    fn depth(&self) -> usize {
        self.inner.depth()
    }
}
