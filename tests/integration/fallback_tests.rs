//! Integration tests for keep-alive expiry and the fallback policies.

use heatnet::app::commands::CoordinatorCommand;
use heatnet::app::events::CoordinatorEvent;
use heatnet::fallback::FallbackPolicy;
use heatnet::fsm::CycleMode;

use super::mock_net::{Harness, NetCall, three_branch_config};

/// keep_alive = 3 cycles: the third cycle after the link breaks is stale.
fn stale_harness(fallback: &str) -> Harness {
    let mut config = three_branch_config();
    config.fallback = fallback.into();
    let mut h = Harness::new(config);
    h.tick_with(&[("Rest1", true), ("Rest2", true), ("Rest3", true)]);
    h.net.break_link("Rest3");
    h.tick();
    h.tick();
    h
}

#[test]
fn link_stays_fresh_within_threshold() {
    let mut h = stale_harness("DEFAULT");
    assert_eq!(h.coordinator.status().mode, Some(CycleMode::LinkFresh));
    h.net.heal_link("Rest3");
    let report = h.tick();
    assert_eq!(report.mode, Some(CycleMode::LinkFresh));
}

#[test]
fn default_fallback_enables_everything_regardless_of_demand() {
    let mut h = stale_harness("DEFAULT");
    h.net.clear_calls();
    let report = h.tick_with(&[("Rest1", false), ("Rest2", false), ("Rest3", false)]);

    assert_eq!(report.mode, Some(CycleMode::LinkStale));
    assert_eq!(report.admitted, 3, "every branch counts as admitted");
    assert_eq!(h.admitted(), vec![1, 2, 3]);
    assert_eq!(h.net.acked().len(), 4);
    assert_eq!(h.net.last_pump(), Some(80.0));
    assert!(h.net.calls.contains(&NetCall::LineHeater { enable: Some(true) }));
    assert!(h.coordinator.is_type_active("HEAT"));
    assert!(h.coordinator.is_type_active("MORE_HEAT"));
    assert_eq!(
        h.sink.count(|e| matches!(e, CoordinatorEvent::FallbackEngaged(FallbackPolicy::Default))),
        1
    );
}

#[test]
fn fallback_is_reported_once_and_link_recovery_restores_admission() {
    let mut h = stale_harness("DEFAULT");
    h.tick();
    h.tick();
    assert_eq!(h.sink.count(|e| matches!(e, CoordinatorEvent::FallbackEngaged(_))), 1);

    h.net.heal_link("Rest3");
    let report = h.tick();
    assert_eq!(report.mode, Some(CycleMode::LinkFresh));
    assert_eq!(h.sink.count(|e| matches!(e, CoordinatorEvent::LinkRestored)), 1);
    assert_eq!(h.admitted(), vec![1, 2]);
    assert_eq!(h.net.ack("Ack3"), Some(false));
}

#[test]
fn heat_fallback_follows_demand_without_cap() {
    let mut h = stale_harness("HEAT");
    let report = h.tick_with(&[("Rest1b", false)]);
    assert_eq!(report.admitted, 3, "every demanding branch");
    assert_eq!(h.net.ack("Ack1"), Some(true));
    assert_eq!(h.net.ack("Ack2"), Some(true));
    assert_eq!(h.net.ack("Ack3"), Some(true), "cap of 2 is bypassed");
    assert_eq!(h.net.ack("Ack1b"), Some(false));
    assert!(h.coordinator.is_type_active("HEAT"));
}

#[test]
fn open_fallback_acks_all_but_keeps_types_passive() {
    let mut h = stale_harness("OPEN");
    let report = h.tick();
    assert_eq!(report.admitted, 3);
    assert_eq!(h.net.acked().len(), 4);
    assert_eq!(h.net.last_pump(), Some(0.0));
    assert!(!h.coordinator.is_type_active("HEAT"));
}

#[test]
fn close_fallback_shuts_everything() {
    let mut h = stale_harness("CLOSE");
    let report = h.tick();
    assert_eq!(report.admitted, 0);
    assert!(h.admitted().is_empty());
    assert!(h.coordinator.waiting().is_empty());
    assert!(h.net.acked().is_empty());
    assert_eq!(h.net.last_pump(), Some(0.0));
    assert!(h.net.calls.contains(&NetCall::LineHeater { enable: None }));
}

#[test]
fn fallback_policy_can_change_at_runtime() {
    let mut h = stale_harness("DEFAULT");
    h.coordinator
        .handle_command(CoordinatorCommand::SetFallback(FallbackPolicy::Close), &mut h.sink)
        .unwrap();
    h.tick();
    assert!(h.net.acked().is_empty());
    assert_eq!(h.coordinator.config().fallback, "CLOSE");
}
