//! ---
//! fcp_section: "07-resilience-drills"
//! fcp_subsection: "tests"
//! fcp_type: "source"
//! fcp_scope: "test"
//! fcp_description: "Drills against reference and broken capabilities."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fcp_metrics::new_registry;
use fcp_resilience::fakes::{
    DeadlockedJobQueue, FailingDurableWriter, InMemoryChatClient, NeverOfflineRegistry,
    RefusingProbeRegistry, SaturatedJobQueue, StuckOfflineRegistry, UnboundedMessageQueue,
    UndrainableMessageQueue, UnreadableDurableWriter, VerboseErrorChat, WriteOnceDurableWriter,
};
use fcp_resilience::prelude::*;
use fcp_resilience::{CapabilityResult, ProbeRegistry};
use uuid::Uuid;

fn harness(capabilities: Capabilities) -> DrillHarness {
    DrillHarness::new(capabilities, None)
}

async fn expect_failure(capabilities: Capabilities, scenario: DrillScenario) -> String {
    let result = harness(capabilities).run_scenario(scenario).await;
    assert_eq!(result.status, DrillStatus::Fail, "{scenario} should fail");
    assert!(!result.observations.is_empty());
    result.error.expect("failed drills carry an error")
}

#[tokio::test(start_paused = true)]
async fn every_scenario_passes_against_reference_capabilities() {
    let harness = harness(Capabilities::default());
    for definition in DrillDefinition::catalogue() {
        let result = harness.run(&definition.scenario.to_string()).await;
        assert_eq!(
            result.status,
            DrillStatus::Pass,
            "{} failed: {:?}",
            definition.scenario,
            result.error
        );
        assert!(result.error.is_none());
        assert!(!result.observations.is_empty());
        assert_ne!(result.id, Uuid::nil());
        assert!(result.started_at.timestamp() > 0);
        assert!(result.duration <= definition.timeout);
    }
}

#[tokio::test]
async fn registry_that_never_goes_offline_is_caught() {
    let caps = Capabilities::builder()
        .probes(Arc::new(NeverOfflineRegistry))
        .build();
    let error = expect_failure(caps, DrillScenario::ProbeDisconnect).await;
    assert!(error.contains("still reports drill-probe online"));
}

#[tokio::test]
async fn registry_stuck_offline_is_caught() {
    let caps = Capabilities::builder()
        .probes(Arc::new(StuckOfflineRegistry::default()))
        .build();
    let error = expect_failure(caps, DrillScenario::ProbeDisconnect).await;
    assert!(error.contains("accepted mark online but still reports drill-probe offline"));
}

#[tokio::test]
async fn failing_writer_is_caught_at_baseline() {
    let caps = Capabilities::builder()
        .storage(Arc::new(FailingDurableWriter))
        .build();
    let error = expect_failure(caps, DrillScenario::DbWriteFailure).await;
    assert!(error.starts_with("baseline write failed"));
}

#[tokio::test(start_paused = true)]
async fn chat_that_never_times_out_is_caught() {
    let caps = Capabilities::builder()
        .chat(Arc::new(InMemoryChatClient::instant()))
        .build();
    let error = expect_failure(caps, DrillScenario::LlmTimeout).await;
    assert!(error.contains("200ms deadline"));
}

#[tokio::test]
async fn verbose_chat_error_is_caught() {
    let caps = Capabilities::builder()
        .chat(Arc::new(VerboseErrorChat))
        .build();
    let error = expect_failure(caps, DrillScenario::LlmTimeout).await;
    assert!(error.contains("over the 512 byte budget"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queue_without_backpressure_is_caught() {
    let caps = Capabilities::builder()
        .messages(Arc::new(UnboundedMessageQueue::default()))
        .build();
    let error = expect_failure(caps, DrillScenario::WebsocketFlood).await;
    assert!(error.contains("accepted all 50 messages"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn saturated_job_queue_is_caught() {
    let caps = Capabilities::builder()
        .jobs(Arc::new(SaturatedJobQueue))
        .build();
    let error = expect_failure(caps, DrillScenario::ConcurrentJobStorm).await;
    assert!(error.contains("no job accepted out of 30"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn flood_counts_concurrent_rejections() {
    let result = harness(Capabilities::default())
        .run_scenario(DrillScenario::WebsocketFlood)
        .await;
    assert!(result.is_pass(), "{:?}", result.error);
    assert!(result.observations[0].contains("32 accepted, 18 rejected"));
}

#[tokio::test(start_paused = true)]
async fn deadlocked_drain_is_bounded_and_not_fatal() {
    let caps = Capabilities::builder()
        .jobs(Arc::new(DeadlockedJobQueue::default()))
        .build();
    let result = harness(caps)
        .run_scenario(DrillScenario::ConcurrentJobStorm)
        .await;
    assert_eq!(result.status, DrillStatus::Pass);
    assert!(result.recovery >= Duration::from_secs(2));
    assert!(result.recovery < Duration::from_millis(2500));
    assert!(result
        .observations
        .last()
        .unwrap()
        .contains("did not finish within 2000ms"));
}

/// Registry whose `mark_online` never completes.
struct HangingRegistry;

#[async_trait]
impl ProbeRegistry for HangingRegistry {
    async fn mark_offline(&self, _probe_id: &str) -> CapabilityResult<()> {
        Ok(())
    }

    async fn mark_online(&self, _probe_id: &str) -> CapabilityResult<()> {
        futures::future::pending::<()>().await;
        Ok(())
    }

    async fn is_offline(&self, _probe_id: &str) -> bool {
        true
    }
}

#[tokio::test(start_paused = true)]
async fn run_level_timeout_keeps_observations() {
    let caps = Capabilities::builder()
        .probes(Arc::new(HangingRegistry))
        .build();
    let result = harness(caps)
        .run_scenario(DrillScenario::ProbeDisconnect)
        .await;
    assert_eq!(result.status, DrillStatus::Fail);
    assert_eq!(
        result.error.as_deref(),
        Some("drill exceeded timeout of 5000ms")
    );
    assert_eq!(result.observations.len(), 2);
    assert!(result.duration >= Duration::from_secs(5));
}

#[tokio::test]
async fn registry_refusing_disconnect_fails_before_recovery() {
    let caps = Capabilities::builder()
        .probes(Arc::new(RefusingProbeRegistry::refusing_offline()))
        .build();
    let result = harness(caps)
        .run_scenario(DrillScenario::ProbeDisconnect)
        .await;
    assert_eq!(
        result.error.as_deref(),
        Some("mark offline of drill-probe failed: rejected: probe pinned by maintenance lock")
    );
    assert_eq!(result.observations.len(), 1);
    assert_eq!(result.recovery, Duration::ZERO);
}

#[tokio::test]
async fn registry_refusing_reconnect_is_timed_and_caught() {
    let caps = Capabilities::builder()
        .probes(Arc::new(RefusingProbeRegistry::refusing_online()))
        .build();
    let result = harness(caps)
        .run_scenario(DrillScenario::ProbeDisconnect)
        .await;
    assert_eq!(
        result.error.as_deref(),
        Some("mark online of drill-probe failed: rejected: probe pinned by maintenance lock")
    );
    assert_eq!(result.observations.len(), 3);
    assert!(result.recovery > Duration::ZERO);
}

#[tokio::test]
async fn read_error_during_degraded_window_is_caught() {
    let caps = Capabilities::builder()
        .storage(Arc::new(UnreadableDurableWriter::default()))
        .build();
    let result = harness(caps)
        .run_scenario(DrillScenario::DbWriteFailure)
        .await;
    assert_eq!(
        result.error.as_deref(),
        Some("read failed while writes were degraded: unavailable: read path offline")
    );
    assert_eq!(result.observations[0], "baseline write accepted");
    assert_eq!(result.recovery, Duration::ZERO);
}

#[tokio::test]
async fn write_that_never_recovers_is_caught() {
    let caps = Capabilities::builder()
        .storage(Arc::new(WriteOnceDurableWriter::default()))
        .build();
    let result = harness(caps)
        .run_scenario(DrillScenario::DbWriteFailure)
        .await;
    assert_eq!(
        result.error.as_deref(),
        Some("write did not recover: unavailable: replica promoted read-only")
    );
    assert_eq!(result.observations.len(), 3);
    assert!(result.recovery > Duration::ZERO);
}

#[tokio::test]
async fn queue_that_stays_full_after_flood_is_caught() {
    let caps = Capabilities::builder()
        .messages(Arc::new(UndrainableMessageQueue::default()))
        .build();
    let result = harness(caps)
        .run_scenario(DrillScenario::WebsocketFlood)
        .await;
    assert_eq!(
        result.error.as_deref(),
        Some("post-drain enqueue still rejected: rejected: queue full at 32 messages")
    );
    assert!(result
        .observations
        .iter()
        .any(|observation| observation == "queue has no bulk drain; skipped"));
    assert!(result.recovery > Duration::ZERO);
}

/// Registry whose backend crashes on the named operation.
struct CrashingRegistry {
    crash_on_online: bool,
}

#[async_trait]
impl ProbeRegistry for CrashingRegistry {
    async fn mark_offline(&self, _probe_id: &str) -> CapabilityResult<()> {
        if !self.crash_on_online {
            panic!("registry backend crashed");
        }
        Ok(())
    }

    async fn mark_online(&self, _probe_id: &str) -> CapabilityResult<()> {
        panic!("registry backend crashed");
    }

    async fn is_offline(&self, _probe_id: &str) -> bool {
        true
    }
}

#[tokio::test]
async fn panicking_capability_becomes_a_failed_result() {
    let caps = Capabilities::builder()
        .probes(Arc::new(CrashingRegistry {
            crash_on_online: false,
        }))
        .build();
    let harness = harness(caps);
    let result = tokio::spawn(async move { harness.run("probe-disconnect").await })
        .await
        .expect("run returns instead of unwinding");
    assert_eq!(result.status, DrillStatus::Fail);
    assert_eq!(
        result.error.as_deref(),
        Some("capability panicked before the first phase: registry backend crashed")
    );
    assert_eq!(result.observations.len(), 1);
}

#[tokio::test]
async fn panic_mid_drill_keeps_earlier_observations() {
    let caps = Capabilities::builder()
        .probes(Arc::new(CrashingRegistry {
            crash_on_online: true,
        }))
        .build();
    let result = harness(caps)
        .run_scenario(DrillScenario::ProbeDisconnect)
        .await;
    assert_eq!(
        result.error.as_deref(),
        Some("capability panicked after phase detect: registry backend crashed")
    );
    assert_eq!(result.observations.len(), 3);
    assert_eq!(result.observations[0], "marked probe drill-probe offline");
}

#[tokio::test(start_paused = true)]
async fn metrics_count_runs_by_verdict() {
    let registry = new_registry();
    let metrics = ReliabilityMetrics::new(registry.clone()).unwrap();
    let harness = DrillHarness::new(Capabilities::default(), Some(metrics));
    harness.run("probe-disconnect").await;
    harness.run("not-a-drill").await;

    let families = registry.gather();
    let runs = families
        .iter()
        .find(|family| family.get_name() == "fcp_drill_runs_total")
        .unwrap();
    assert_eq!(runs.get_metric().len(), 1);
    assert_eq!(runs.get_metric()[0].get_counter().get_value() as u64, 1);
}

#[tokio::test(start_paused = true)]
async fn verifier_reports_independent_checks() {
    let verifier = RecoveryVerifier::new(Capabilities::default(), None);
    let state = verifier.verify("edge-1").await;
    assert!(state.probe_online);
    assert!(state.db_writeable);
    assert!(!state.llm_responsive);
    assert!(!state.is_nominal());
    assert_eq!(state.scorecard_score, None);
}

#[tokio::test(start_paused = true)]
async fn verifier_sees_offline_probe_and_healthy_dependencies() {
    let caps = Capabilities::builder()
        .chat(Arc::new(InMemoryChatClient::with_latency(
            Duration::from_millis(10),
        )))
        .build();
    caps.probes.mark_offline("edge-2").await.unwrap();
    let verifier = RecoveryVerifier::new(caps.clone(), None);

    let offline = verifier.verify("edge-2").await;
    assert!(!offline.probe_online);
    assert!(offline.llm_responsive);

    caps.probes.mark_online("edge-2").await.unwrap();
    let state = verifier.verify("edge-2").await;
    assert!(state.is_nominal());
    assert_eq!(state.with_scorecard_score(91).scorecard_score, Some(91));
}

#[tokio::test]
async fn verifier_flags_unwriteable_storage() {
    let caps = Capabilities::builder()
        .storage(Arc::new(FailingDurableWriter))
        .build();
    let registry = new_registry();
    let metrics = ReliabilityMetrics::new(registry.clone()).unwrap();
    let state = RecoveryVerifier::new(caps, Some(metrics))
        .verify("edge-3")
        .await;
    assert!(!state.db_writeable);

    let checks = registry
        .gather()
        .into_iter()
        .find(|family| family.get_name() == "fcp_recovery_checks_total")
        .unwrap();
    assert_eq!(checks.get_metric().len(), 3);
}
