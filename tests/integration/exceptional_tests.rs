//! Integration tests for the exceptional-state override.

use heatnet::app::commands::CoordinatorCommand;
use heatnet::app::events::CoordinatorEvent;
use heatnet::fsm::{ControlMode, CycleMode};

use super::mock_net::{Harness, NetCall, three_branch_config};

const ALL_DEMAND: [(&str, bool); 4] = [("Rest1", true), ("Rest1b", true), ("Rest2", true), ("Rest3", true)];

fn harness() -> Harness {
    let mut config = three_branch_config();
    config.exceptional_state.timeout = 2;
    Harness::new(config)
}

#[test]
fn override_zero_turns_everything_off_despite_demand() {
    let mut h = harness();
    h.net.override_on(Some(0));
    let report = h.tick_with(&ALL_DEMAND);

    assert_eq!(report.mode, Some(CycleMode::ExceptionalActive));
    assert!(h.net.acked().is_empty());
    assert_eq!(h.net.last_pump(), Some(0.0));
    assert!(h.net.calls.contains(&NetCall::LineHeater { enable: None }));
    assert!(!h.coordinator.is_type_active("HEAT"));
}

#[test]
fn override_without_value_forces_everything_on() {
    let mut h = harness();
    h.net.override_on(None);
    let report = h.tick();

    assert_eq!(report.admitted, 3);
    assert_eq!(h.net.acked().len(), 4, "no demand needed");
    assert_eq!(h.admitted(), vec![1, 2, 3]);
    assert_eq!(h.net.last_pump(), Some(80.0));
    assert!(h.net.calls.contains(&NetCall::LineHeater { enable: Some(true) }));
    assert!(h.coordinator.is_type_active("MORE_HEAT"));
}

#[test]
fn override_zero_publishes_no_admission() {
    let mut h = harness();
    h.tick_with(&[("Rest1", true), ("Rest2", true)]);
    assert_eq!(h.admitted(), vec![1, 2]);

    h.net.override_on(Some(0));
    let report = h.tick();
    assert!(h.net.acked().is_empty());
    assert_eq!(report.admitted, 0);
    assert!(h.admitted().is_empty());
    assert!(h.coordinator.status().summary().contains("exceptional(0)"));
}

#[test]
fn running_override_survives_a_config_update() {
    let mut h = harness();
    h.net.override_on(None);
    h.tick();

    let mut config = three_branch_config();
    config.exceptional_state.timeout = 2;
    config.fallback = "CLOSE".into();
    h.coordinator
        .handle_command(CoordinatorCommand::UpdateConfig(Box::new(config)), &mut h.sink)
        .unwrap();

    let report = h.tick();
    assert_eq!(report.mode, Some(CycleMode::ExceptionalActive));
    assert_eq!(h.net.acked().len(), 4);
    assert_eq!(h.sink.count(|e| matches!(e, CoordinatorEvent::ExceptionalLeft)), 0);

    let report = h.tick();
    assert_eq!(report.mode, Some(CycleMode::LinkFresh), "window runs out as before");
}

#[test]
fn override_value_scales_pump_set_point() {
    let mut h = harness();
    h.net.override_on(Some(50));
    h.tick();
    assert_eq!(h.net.last_pump(), Some(40.0));
}

#[test]
fn override_holds_for_its_window_then_normal_logic_resumes() {
    let mut h = harness();
    h.net.override_on(Some(0));
    h.tick_with(&[("Rest1", true)]);
    let report = h.tick();
    assert_eq!(report.mode, Some(CycleMode::ExceptionalActive));
    assert_eq!(h.net.ack("Ack1"), Some(false));

    let report = h.tick();
    assert_eq!(report.mode, Some(CycleMode::LinkFresh));
    assert_eq!(h.net.ack("Ack1"), Some(true), "latched demand applies again");
    assert_eq!(h.sink.count(|e| matches!(e, CoordinatorEvent::ExceptionalEntered { value: 0 })), 1);
    assert_eq!(h.sink.count(|e| matches!(e, CoordinatorEvent::ExceptionalLeft)), 1);
}

#[test]
fn explicit_disable_ends_override_at_once() {
    let mut h = harness();
    h.net.override_on(None);
    h.tick();
    h.net.override_off();
    let report = h.tick();
    assert_eq!(report.mode, Some(CycleMode::LinkFresh));
}

#[test]
fn override_outranks_forcing() {
    let mut h = harness();
    h.coordinator
        .handle_command(CoordinatorCommand::SetForcing(true), &mut h.sink)
        .unwrap();
    h.net.override_on(Some(0));
    h.tick_with(&ALL_DEMAND);

    assert!(h.net.acked().is_empty());
    assert!(matches!(h.coordinator.status().control, Some(ControlMode::Exceptional(o)) if o.value() == 0));
}

#[test]
fn disabled_exceptional_state_ignores_override_inputs() {
    let mut config = three_branch_config();
    config.exceptional_state.enabled = false;
    let mut h = Harness::new(config);
    h.net.override_on(Some(0));
    let report = h.tick_with(&[("Rest1", true)]);
    assert_eq!(report.mode, Some(CycleMode::LinkFresh));
    assert_eq!(h.net.ack("Ack1"), Some(true));
}
