//! ---
//! fcp_section: "08-slo-scoring"
//! fcp_subsection: "tests"
//! fcp_type: "source"
//! fcp_scope: "test"
//! fcp_description: "End-to-end scorecard builds over healthy and degraded fleets."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use chrono::{TimeZone, Utc};
use fcp_scorecard::{
    build_scorecard, ControlPlaneCounters, FleetCounters, IndicatorStatus, RollupStatus,
    ScorecardInput, NO_DATA_RATIONALE,
};

fn healthy_input() -> ScorecardInput {
    ScorecardInput::new(
        "5m",
        ControlPlaneCounters {
            total_requests: 100,
            successful_requests: 100,
            server_errors: 0,
            p95_latency_ms: 320.0,
        },
        FleetCounters {
            probes_total: 10,
            probes_connected: 10,
            commands_total: 25,
            commands_succeeded: 25,
        },
    )
}

fn degraded_input() -> ScorecardInput {
    ScorecardInput::new(
        "5m",
        ControlPlaneCounters {
            total_requests: 100,
            successful_requests: 98,
            server_errors: 3,
            p95_latency_ms: 1800.0,
        },
        FleetCounters {
            probes_total: 10,
            probes_connected: 8,
            commands_total: 0,
            commands_succeeded: 0,
        },
    )
}

#[test]
fn healthy_fleet_scores_full_marks() {
    let scorecard = build_scorecard(&healthy_input());

    assert_eq!(scorecard.overall.status, RollupStatus::Healthy);
    assert_eq!(scorecard.overall.score, 100);
    assert_eq!(scorecard.overall.compliance.passing, 5);
    assert_eq!(scorecard.surfaces.len(), 2);
    for surface in &scorecard.surfaces {
        assert_eq!(surface.rollup.status, RollupStatus::Healthy, "{}", surface.id);
        assert_eq!(surface.rollup.score, 100, "{}", surface.id);
    }
    assert!(scorecard.overall.rationale.ends_with("all healthy"));
}

#[test]
fn degraded_fleet_is_critical_with_explanations() {
    let scorecard = build_scorecard(&degraded_input());

    assert_eq!(scorecard.overall.status, RollupStatus::Critical);
    assert!(scorecard.overall.compliance.failing >= 1);
    assert!(scorecard.overall.compliance.unknown >= 1);

    let control_plane = scorecard.surface("control-plane").unwrap();
    let availability = control_plane.indicator("availability").unwrap();
    assert_eq!(availability.status, IndicatorStatus::Fail);
    assert_eq!(availability.score, 40);
    let error_rate = control_plane.indicator("error-rate").unwrap();
    assert_eq!(error_rate.status, IndicatorStatus::Fail);
    assert_eq!(error_rate.score, 40);
    let latency = control_plane.indicator("p95-latency").unwrap();
    assert_eq!(latency.status, IndicatorStatus::Fail);
    assert_eq!(latency.score, 20);
    assert!(latency.rationale.contains("severe breach"));

    let fleet = scorecard.surface("probe-fleet").unwrap();
    assert_eq!(
        fleet.indicator("connectivity").unwrap().status,
        IndicatorStatus::Fail
    );
    let commands = fleet.indicator("command-success").unwrap();
    assert_eq!(commands.status, IndicatorStatus::Unknown);
    assert_eq!(commands.score, 0);
    assert_eq!(commands.rationale, NO_DATA_RATIONALE);

    assert!(scorecard.indicators().any(|indicator| indicator.score == 20));
    // (40 + 20 + 40) / 3 = 33.33 and the fleet surface scores 40 from connectivity alone.
    assert_eq!(control_plane.rollup.score, 33);
    assert_eq!(fleet.rollup.score, 40);
    assert_eq!(scorecard.overall.score, 37);
    assert!(scorecard
        .overall
        .rationale
        .contains("degraded: control-plane, probe-fleet"));
}

#[test]
fn empty_counters_are_unknown_everywhere() {
    let input = ScorecardInput::new(
        "1h",
        ControlPlaneCounters::default(),
        FleetCounters::default(),
    );
    let scorecard = build_scorecard(&input);
    assert_eq!(scorecard.overall.status, RollupStatus::Unknown);
    assert_eq!(scorecard.overall.score, 0);
    assert_eq!(scorecard.overall.compliance.unknown, 5);
    assert!(scorecard
        .indicators()
        .all(|indicator| indicator.objective.window == "1h"));
}

#[test]
fn builds_are_deterministic_for_a_fixed_timestamp() {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let first = build_scorecard(&degraded_input().at(at));
    let second = build_scorecard(&degraded_input().at(at));
    assert_eq!(first, second);
    assert_eq!(first.generated_at, at);
}

#[test]
fn scorecard_serializes_with_lowercase_statuses() {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let scorecard = build_scorecard(&degraded_input().at(at));
    let json = serde_json::to_value(&scorecard).unwrap();

    assert_eq!(json["window"], "5m");
    assert_eq!(json["overall"]["status"], "critical");
    let indicators = json["surfaces"][0]["indicators"].as_array().unwrap();
    assert_eq!(indicators[0]["id"], "availability");
    assert_eq!(indicators[0]["status"], "fail");
    assert_eq!(indicators[0]["objective"]["comparator"], "higher_is_better");
    let commands = &json["surfaces"][1]["indicators"][1];
    assert_eq!(commands["status"], "unknown");
    assert!(commands["metric"]["value"].is_null());
}
