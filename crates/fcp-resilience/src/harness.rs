//! ---
//! fcp_section: "07-resilience-drills"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Failure drill harness."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
//! Runs a drill as a fixed sequence of phases. Each phase appends an observation and the
//! run stops at the first unmet expectation. Capability errors, timeouts and capability
//! panics become failure details; nothing here returns `Err` or unwinds into the caller.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fcp_logging::{log_drill_event, DrillEventOutcome, LogContext};
use futures::future::join_all;
use futures::FutureExt;
use tokio::task::JoinError;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::capabilities::{Capabilities, CapabilityError, CapabilityResult};
use crate::drills::{DrillResult, DrillScenario, DrillStatus};
use crate::metrics::ReliabilityMetrics;

/// Log target of every drill phase event.
pub const DRILL_LOG_TARGET: &str = "fcp::resilience::drill";
/// Probe used when none is configured.
pub const DEFAULT_DRILL_PROBE: &str = "drill-probe";

const LLM_DEADLINE: Duration = Duration::from_millis(200);
const LLM_FOLLOWUP_DEADLINE: Duration = Duration::from_millis(50);
const LLM_FOLLOWUP_GRACE: Duration = Duration::from_millis(250);
const MAX_ERROR_BYTES: usize = 512;
const FLOOD_MESSAGES: usize = 50;
const STORM_JOBS: usize = 30;
const DRAIN_DEADLINE: Duration = Duration::from_secs(2);

type Check = Result<(), String>;

/// Audit trail of a run in progress. Lives outside the scenario future so a run-level
/// timeout keeps what was gathered.
struct Recorder {
    scenario: DrillScenario,
    drill_id: String,
    observations: Vec<String>,
    recovery: Duration,
    last_phase: Option<&'static str>,
}

impl Recorder {
    fn new(scenario: DrillScenario, drill_id: &Uuid) -> Self {
        Self {
            scenario,
            drill_id: drill_id.to_string(),
            observations: Vec::new(),
            recovery: Duration::ZERO,
            last_phase: None,
        }
    }

    fn observe(&mut self, phase: &'static str, message: impl Into<String>) {
        let message = message.into();
        info!(
            target: DRILL_LOG_TARGET,
            scenario = %self.scenario,
            drill_id = %self.drill_id,
            phase,
            "{message}"
        );
        self.observations.push(message);
        self.last_phase = Some(phase);
    }

    fn fail(&mut self, phase: &'static str, detail: impl Into<String>) -> Check {
        let detail = detail.into();
        warn!(
            target: DRILL_LOG_TARGET,
            scenario = %self.scenario,
            drill_id = %self.drill_id,
            phase,
            "{detail}"
        );
        self.observations.push(detail.clone());
        Err(detail)
    }

    /// Failure detail for a capability that panicked mid-phase.
    fn panicked(&mut self, payload: Box<dyn Any + Send>) -> String {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|reason| (*reason).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        let detail = match self.last_phase {
            Some(phase) => format!("capability panicked after phase {phase}: {reason}"),
            None => format!("capability panicked before the first phase: {reason}"),
        };
        warn!(
            target: DRILL_LOG_TARGET,
            scenario = %self.scenario,
            drill_id = %self.drill_id,
            "{detail}"
        );
        self.observations.push(detail.clone());
        detail
    }
}

/// Outcome counts of a concurrent fan-out.
#[derive(Debug, Default)]
struct Tally {
    accepted: usize,
    rejected: usize,
    panicked: usize,
}

impl Tally {
    fn collect<T>(results: Vec<Result<CapabilityResult<T>, JoinError>>) -> Self {
        let mut tally = Tally::default();
        for result in results {
            match result {
                Ok(Ok(_)) => tally.accepted += 1,
                Ok(Err(_)) => tally.rejected += 1,
                Err(_) => tally.panicked += 1,
            }
        }
        tally
    }
}

fn millis(duration: Duration) -> u128 {
    duration.as_millis()
}

/// Executes drills against a capability set.
#[derive(Debug, Clone)]
pub struct DrillHarness {
    capabilities: Capabilities,
    probe_id: String,
    metrics: Option<ReliabilityMetrics>,
}

impl DrillHarness {
    pub fn new(capabilities: Capabilities, metrics: Option<ReliabilityMetrics>) -> Self {
        Self {
            capabilities,
            probe_id: DEFAULT_DRILL_PROBE.to_owned(),
            metrics,
        }
    }

    /// Probe disconnected by the `probe-disconnect` drill.
    pub fn with_probe_id(mut self, probe_id: impl Into<String>) -> Self {
        self.probe_id = probe_id.into();
        self
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Run a drill by identifier. Unknown identifiers yield a failed result.
    pub async fn run(&self, scenario: &str) -> DrillResult {
        match scenario.parse::<DrillScenario>() {
            Ok(known) => self.run_scenario(known).await,
            Err(_) => self.unknown(scenario),
        }
    }

    /// Run one drill to completion or until its definition's timeout.
    pub async fn run_scenario(&self, scenario: DrillScenario) -> DrillResult {
        let definition = scenario.definition();
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        let mut recorder = Recorder::new(scenario, &id);
        info!(
            target: DRILL_LOG_TARGET,
            scenario = %scenario,
            drill_id = %recorder.drill_id,
            timeout_ms = millis(definition.timeout) as u64,
            "drill started"
        );

        let guarded = AssertUnwindSafe(self.dispatch(scenario, &mut recorder)).catch_unwind();
        let finished = timeout(definition.timeout, guarded).await;
        let outcome = match finished {
            Ok(Ok(check)) => check,
            Ok(Err(payload)) => Err(recorder.panicked(payload)),
            Err(_) => Err(format!(
                "drill exceeded timeout of {}ms",
                millis(definition.timeout)
            )),
        };

        let (status, error) = match outcome {
            Ok(()) => (DrillStatus::Pass, None),
            Err(detail) => (DrillStatus::Fail, Some(detail)),
        };
        let result = DrillResult {
            id,
            scenario: scenario.to_string(),
            status,
            started_at,
            duration: started.elapsed(),
            recovery: recorder.recovery,
            error,
            observations: recorder.observations,
        };
        self.finish(&result);
        result
    }

    fn unknown(&self, scenario: &str) -> DrillResult {
        let known: Vec<String> = DrillScenario::ALL.iter().map(ToString::to_string).collect();
        let result = DrillResult {
            id: Uuid::new_v4(),
            scenario: scenario.to_owned(),
            status: DrillStatus::Fail,
            started_at: Utc::now(),
            duration: Duration::ZERO,
            recovery: Duration::ZERO,
            error: Some(format!(
                "unknown drill scenario {scenario:?}; expected one of: {}",
                known.join(", ")
            )),
            observations: Vec::new(),
        };
        self.finish(&result);
        result
    }

    fn finish(&self, result: &DrillResult) {
        let drill_id = result.id.to_string();
        let context = LogContext::new()
            .with_scenario(&result.scenario)
            .with_drill_id(&drill_id);
        let (message, outcome) = match &result.error {
            None => (
                format!(
                    "drill passed in {}ms, recovery {}ms",
                    millis(result.duration),
                    millis(result.recovery)
                ),
                DrillEventOutcome::Pass,
            ),
            Some(detail) => (format!("drill failed: {detail}"), DrillEventOutcome::Fail),
        };
        log_drill_event(Some(&context), "drill.finished", &message, outcome);

        if let Some(metrics) = &self.metrics {
            if result.scenario.parse::<DrillScenario>().is_ok() {
                metrics.observe_drill(result);
            }
        }
    }

    async fn dispatch(&self, scenario: DrillScenario, recorder: &mut Recorder) -> Check {
        match scenario {
            DrillScenario::ProbeDisconnect => self.probe_disconnect(recorder).await,
            DrillScenario::DbWriteFailure => self.db_write_failure(recorder).await,
            DrillScenario::LlmTimeout => self.llm_timeout(recorder).await,
            DrillScenario::WebsocketFlood => self.websocket_flood(recorder).await,
            DrillScenario::ConcurrentJobStorm => self.concurrent_job_storm(recorder).await,
        }
    }

    async fn probe_disconnect(&self, recorder: &mut Recorder) -> Check {
        let probes = &self.capabilities.probes;
        let probe = self.probe_id.as_str();

        if let Err(err) = probes.mark_offline(probe).await {
            return recorder.fail("disconnect", format!("mark offline of {probe} failed: {err}"));
        }
        recorder.observe("disconnect", format!("marked probe {probe} offline"));

        if !probes.is_offline(probe).await {
            return recorder.fail(
                "detect",
                format!("registry accepted mark offline but still reports {probe} online"),
            );
        }
        recorder.observe("detect", format!("registry reports {probe} offline"));

        let started = Instant::now();
        let reconnected = probes.mark_online(probe).await;
        recorder.recovery = started.elapsed();
        if let Err(err) = reconnected {
            return recorder.fail("recover", format!("mark online of {probe} failed: {err}"));
        }
        recorder.observe(
            "recover",
            format!(
                "marked probe {probe} online in {}ms",
                millis(recorder.recovery)
            ),
        );

        if probes.is_offline(probe).await {
            return recorder.fail(
                "verify",
                format!("registry accepted mark online but still reports {probe} offline"),
            );
        }
        recorder.observe("verify", format!("registry reports {probe} online"));
        Ok(())
    }

    async fn db_write_failure(&self, recorder: &mut Recorder) -> Check {
        let storage = &self.capabilities.storage;
        let baseline_key = format!("drills/{}/baseline", recorder.drill_id);
        let recovery_key = format!("drills/{}/recovery", recorder.drill_id);

        if let Err(err) = storage.write(&baseline_key, b"baseline").await {
            return recorder.fail("baseline", format!("baseline write failed: {err}"));
        }
        recorder.observe("baseline", "baseline write accepted");

        match storage.read(&baseline_key).await {
            Ok(Some(value)) => recorder.observe(
                "degraded-read",
                format!("read {} bytes during the write failure window", value.len()),
            ),
            Ok(None) => recorder.observe(
                "degraded-read",
                "read succeeded during the write failure window but the baseline was missing",
            ),
            Err(err) => {
                return recorder.fail(
                    "degraded-read",
                    format!("read failed while writes were degraded: {err}"),
                )
            }
        }

        let started = Instant::now();
        let written = storage.write(&recovery_key, b"recovered").await;
        recorder.recovery = started.elapsed();
        if let Err(err) = written {
            return recorder.fail("recover", format!("write did not recover: {err}"));
        }
        recorder.observe(
            "recover",
            format!("recovery write accepted in {}ms", millis(recorder.recovery)),
        );
        Ok(())
    }

    async fn llm_timeout(&self, recorder: &mut Recorder) -> Check {
        let chat = &self.capabilities.chat;

        let error = match timeout(
            LLM_DEADLINE,
            chat.complete("drill: respond after the deadline", LLM_DEADLINE),
        )
        .await
        {
            Ok(Ok(_)) => {
                return recorder.fail(
                    "timeout",
                    format!(
                        "chat call returned before the {}ms deadline; expected it to time out",
                        millis(LLM_DEADLINE)
                    ),
                )
            }
            Ok(Err(err)) => err,
            Err(_) => CapabilityError::Timeout(LLM_DEADLINE),
        };
        recorder.observe(
            "timeout",
            format!(
                "chat call failed under the {}ms deadline as expected",
                millis(LLM_DEADLINE)
            ),
        );

        let message = error.to_string();
        if message.len() > MAX_ERROR_BYTES {
            return recorder.fail(
                "error-budget",
                format!(
                    "chat error message is {} bytes, over the {MAX_ERROR_BYTES} byte budget",
                    message.len()
                ),
            );
        }
        recorder.observe(
            "error-budget",
            format!("error message within budget ({} bytes): {message}", message.len()),
        );

        let started = Instant::now();
        let followup = timeout(
            LLM_FOLLOWUP_DEADLINE,
            chat.complete("drill: ping", LLM_FOLLOWUP_DEADLINE),
        )
        .await;
        recorder.recovery = started.elapsed();
        if recorder.recovery > LLM_FOLLOWUP_DEADLINE + LLM_FOLLOWUP_GRACE {
            return recorder.fail(
                "responsive",
                format!(
                    "independent {}ms call blocked for {}ms",
                    millis(LLM_FOLLOWUP_DEADLINE),
                    millis(recorder.recovery)
                ),
            );
        }
        let outcome = match followup {
            Ok(Ok(_)) => "answered",
            Ok(Err(_)) => "failed fast",
            Err(_) => "was cancelled",
        };
        recorder.observe(
            "responsive",
            format!(
                "independent {}ms call {outcome} after {}ms",
                millis(LLM_FOLLOWUP_DEADLINE),
                millis(recorder.recovery)
            ),
        );
        Ok(())
    }

    async fn websocket_flood(&self, recorder: &mut Recorder) -> Check {
        let queue = &self.capabilities.messages;

        let handles: Vec<_> = (0..FLOOD_MESSAGES)
            .map(|index| {
                let queue = Arc::clone(queue);
                tokio::spawn(async move { queue.enqueue(format!("flood-{index}").into_bytes()).await })
            })
            .collect();
        let tally = Tally::collect(join_all(handles).await);
        recorder.observe(
            "flood",
            format!(
                "flood of {FLOOD_MESSAGES} messages: {} accepted, {} rejected, depth {}",
                tally.accepted,
                tally.rejected,
                queue.depth()
            ),
        );
        if tally.panicked > 0 {
            return recorder.fail(
                "flood",
                format!("{} enqueue task(s) panicked", tally.panicked),
            );
        }
        if tally.rejected == 0 {
            return recorder.fail(
                "backpressure",
                format!("queue accepted all {FLOOD_MESSAGES} messages without backpressure"),
            );
        }
        recorder.observe(
            "backpressure",
            format!("queue rejected {} messages under load", tally.rejected),
        );

        match queue.drainer() {
            Some(drainer) => match timeout(DRAIN_DEADLINE, drainer.drain()).await {
                Ok(Ok(drained)) => {
                    recorder.observe("drain", format!("drained {drained} buffered messages"))
                }
                Ok(Err(err)) => recorder.observe("drain", format!("drain failed: {err}")),
                Err(_) => recorder.observe(
                    "drain",
                    format!("drain did not finish within {}ms", millis(DRAIN_DEADLINE)),
                ),
            },
            None => recorder.observe("drain", "queue has no bulk drain; skipped"),
        }

        let started = Instant::now();
        let accepted = queue.enqueue(b"drill: post-drain".to_vec()).await;
        recorder.recovery = started.elapsed();
        match accepted {
            Ok(()) => {
                recorder.observe(
                    "recover",
                    format!(
                        "post-drain enqueue accepted in {}ms",
                        millis(recorder.recovery)
                    ),
                );
                Ok(())
            }
            Err(err) => recorder.fail("recover", format!("post-drain enqueue still rejected: {err}")),
        }
    }

    async fn concurrent_job_storm(&self, recorder: &mut Recorder) -> Check {
        let jobs = &self.capabilities.jobs;

        let handles: Vec<_> = (0..STORM_JOBS)
            .map(|index| {
                let jobs = Arc::clone(jobs);
                let job_id = format!("{}-job-{index}", recorder.drill_id);
                tokio::spawn(async move { jobs.submit(&job_id).await })
            })
            .collect();
        let tally = Tally::collect(join_all(handles).await);
        recorder.observe(
            "storm",
            format!(
                "{STORM_JOBS} concurrent submissions: {} accepted, {} errored",
                tally.accepted,
                tally.rejected + tally.panicked
            ),
        );
        if tally.accepted == 0 {
            return recorder.fail(
                "storm",
                format!("no job accepted out of {STORM_JOBS}; queue is deadlocked or saturated"),
            );
        }

        let started = Instant::now();
        let drained = timeout(DRAIN_DEADLINE, jobs.drain(DRAIN_DEADLINE)).await;
        recorder.recovery = started.elapsed();
        let note = match drained {
            Ok(Ok(count)) => format!(
                "drained {count} jobs in {}ms",
                millis(recorder.recovery)
            ),
            Ok(Err(err)) => format!("drain failed: {err}"),
            Err(_) => format!(
                "drain did not finish within {}ms and was cancelled",
                millis(DRAIN_DEADLINE)
            ),
        };
        recorder.observe("drain", note);
        Ok(())
    }
}
