//! Integration tests for the normal (link fresh) admission → dispatch path.

use heatnet::app::commands::{CoordinatorCommand, CycleTopic};
use heatnet::app::events::CoordinatorEvent;
use heatnet::app::ports::EquipmentStatus;
use heatnet::dispatch::ResponseValue;
use heatnet::error::DispatchError;
use heatnet::fsm::{ControlMode, CoordinatorState, CycleMode};

use super::mock_net::{Harness, MockNetwork, NetCall, three_branch_config};

#[test]
fn valid_config_goes_operational_on_start() {
    let h = Harness::new(three_branch_config());
    assert_eq!(h.coordinator.state(), CoordinatorState::Operational);
    assert!(matches!(h.sink.events[0], CoordinatorEvent::Started(ref id) if id == "comm0"));
}

#[test]
fn arrival_order_decides_admission_and_no_one_is_evicted() {
    let mut h = Harness::new(three_branch_config());

    h.tick_with(&[("Rest1", true)]);
    h.tick_with(&[("Rest2", true)]);
    let report = h.tick_with(&[("Rest3", true)]);

    assert_eq!(report.mode, Some(CycleMode::LinkFresh));
    assert_eq!(report.admitted, 2);
    assert_eq!(h.admitted(), vec![1, 2]);
    assert_eq!(h.coordinator.waiting(), &[3]);
    assert_eq!(h.net.ack("Ack1"), Some(true));
    assert_eq!(h.net.ack("Ack2"), Some(true));
    assert_eq!(h.net.ack("Ack3"), Some(false));

    h.tick_with(&[("Rest1", false)]);
    assert_eq!(h.admitted(), vec![2, 3]);
    assert_eq!(h.net.ack("Ack1"), Some(false));
    assert_eq!(h.net.ack("Ack3"), Some(true));
}

#[test]
fn admission_events_follow_occupancy() {
    let mut h = Harness::new(three_branch_config());
    h.tick_with(&[("Rest1", true), ("Rest2", true), ("Rest3", true)]);
    h.tick_with(&[("Rest2", false)]);

    let admitted = h.sink.count(|e| matches!(e, CoordinatorEvent::Admitted(_)));
    let released = h.sink.count(|e| matches!(e, CoordinatorEvent::Released(2)));
    let queued = h.sink.count(|e| matches!(e, CoordinatorEvent::Queued(3)));
    assert_eq!(admitted, 3, "1, 2, then 3 after 2 vacated");
    assert_eq!(released, 1);
    assert_eq!(queued, 1);
}

#[test]
fn acks_echo_each_request_of_an_admitted_branch() {
    let mut h = Harness::new(three_branch_config());
    h.tick_with(&[("Rest1", true), ("Rest1b", false)]);

    assert_eq!(h.net.ack("Ack1"), Some(true));
    assert_eq!(h.net.ack("Ack1b"), Some(false));
    assert!(h.coordinator.is_type_active("HEAT"));
    assert!(!h.coordinator.is_type_active("MORE_HEAT"));
    assert!(h.net.calls.contains(&NetCall::LineHeater { enable: None }));
    assert_eq!(h.net.last_pump(), Some(80.0));
}

#[test]
fn each_request_type_fires_exactly_one_side_per_cycle() {
    let mut h = Harness::new(three_branch_config());
    for demand in [true, false, true] {
        h.net.clear_calls();
        h.tick_with(&[("Rest2", demand)]);
        let pump: Vec<_> = h
            .net
            .calls
            .iter()
            .filter_map(|c| match c {
                NetCall::Pump { percent } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(pump, vec![if demand { 80.0 } else { 0.0 }]);
        let heaters = h
            .net
            .calls
            .iter()
            .filter(|c| matches!(c, NetCall::LineHeater { .. }))
            .count();
        assert_eq!(heaters, 1);
    }
}

#[test]
fn silent_device_keeps_its_last_demand() {
    let mut h = Harness::new(three_branch_config());
    h.tick_with(&[("Rest1", true)]);
    h.tick();
    h.tick();
    assert_eq!(h.admitted(), vec![1]);
    assert_eq!(h.net.ack("Ack1"), Some(true));
}

#[test]
fn lowering_the_cap_never_evicts() {
    let mut h = Harness::new(three_branch_config());
    h.tick_with(&[("Rest1", true), ("Rest2", true)]);
    h.coordinator
        .handle_command(CoordinatorCommand::SetMaxConcurrent(1), &mut h.sink)
        .unwrap();
    h.tick_with(&[("Rest3", true)]);
    assert_eq!(h.admitted(), vec![1, 2]);

    h.tick_with(&[("Rest1", false)]);
    assert_eq!(h.admitted(), vec![2], "3 must wait until under the new cap");

    h.coordinator
        .handle_command(CoordinatorCommand::SetMaxConcurrent(3), &mut h.sink)
        .unwrap();
    h.tick();
    assert_eq!(h.admitted(), vec![2, 3]);
    assert!(h.coordinator.is_config_dirty());
}

#[test]
fn config_update_keeps_occupants_and_queue_order() {
    let mut h = Harness::new(three_branch_config());
    h.tick_with(&[("Rest3", true)]);
    h.tick_with(&[("Rest2", true)]);
    h.tick_with(&[("Rest1", true)]);
    assert_eq!(h.admitted(), vec![3, 2]);
    assert_eq!(h.coordinator.waiting(), &[1]);

    let mut config = three_branch_config();
    config.fallback = "CLOSE".into();
    h.coordinator
        .handle_command(CoordinatorCommand::UpdateConfig(Box::new(config)), &mut h.sink)
        .unwrap();

    let report = h.tick();
    assert_eq!(report.mode, Some(CycleMode::LinkFresh));
    assert_eq!(h.admitted(), vec![3, 2]);
    assert_eq!(h.coordinator.waiting(), &[1]);
    assert_eq!(h.net.ack("Ack3"), Some(true));
    assert_eq!(h.net.ack("Ack1"), Some(false));
    assert_eq!(h.sink.count(|e| matches!(e, CoordinatorEvent::Released(_))), 0);

    h.tick_with(&[("Rest3", false)]);
    assert_eq!(h.admitted(), vec![2, 1], "the waiting branch moves up");
}

#[test]
fn config_update_drops_removed_branches_from_admission() {
    let mut h = Harness::new(three_branch_config());
    h.tick_with(&[("Rest3", true), ("Rest2", true), ("Rest1", true)]);
    assert_eq!(h.admitted(), vec![1, 2]);

    let mut config = three_branch_config();
    config.slots.retain(|s| !s.starts_with("Rest2:"));
    h.coordinator
        .handle_command(CoordinatorCommand::UpdateConfig(Box::new(config)), &mut h.sink)
        .unwrap();

    h.tick();
    assert_eq!(h.admitted(), vec![1, 3]);
    assert_eq!(h.net.ack("Ack3"), Some(true));
}

#[test]
fn zero_cap_command_is_rejected() {
    let mut h = Harness::new(three_branch_config());
    assert!(
        h.coordinator
            .handle_command(CoordinatorCommand::SetMaxConcurrent(0), &mut h.sink)
            .is_err()
    );
    assert_eq!(h.coordinator.status().max_concurrent, 2);
}

#[test]
fn forcing_bypasses_the_cap_until_cleared() {
    let mut h = Harness::new(three_branch_config());
    h.coordinator
        .handle_command(CoordinatorCommand::SetForcing(true), &mut h.sink)
        .unwrap();
    h.tick_with(&[("Rest1", true), ("Rest2", true), ("Rest3", true)]);
    assert_eq!(h.admitted(), vec![1, 2, 3]);
    assert_eq!(h.coordinator.status().control, Some(ControlMode::Forcing));
    assert_eq!(h.net.acked().len(), 3);

    h.coordinator
        .handle_command(CoordinatorCommand::SetForcing(false), &mut h.sink)
        .unwrap();
    h.tick();
    assert_eq!(h.admitted(), vec![1, 2]);
    assert_eq!(h.net.ack("Ack3"), Some(false));
}

#[test]
fn unresolved_channel_is_contained() {
    let mut h = Harness::new(three_branch_config());
    h.net = MockNetwork::new();
    let report = h.tick_with(&[("Rest1", true)]);

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], DispatchError::ChannelUnresolved(_)));
    assert_eq!(h.net.last_pump(), Some(80.0), "other actions still applied");
    assert_eq!(
        h.sink.count(|e| matches!(e, CoordinatorEvent::ActionFailed { .. })),
        1
    );

    // Resolved on a later cycle without any reconfiguration.
    h.net = MockNetwork::new().with_channel("Valve0/SetPoint");
    let report = h.tick();
    assert!(report.failures.is_empty());
    assert_eq!(h.net.last_channel("Valve0/SetPoint"), Some(ResponseValue::Number(100.0)));
}

#[test]
fn disabled_pump_is_skipped_and_re_resolved() {
    let mut h = Harness::new(three_branch_config());
    h.net.pump_status = EquipmentStatus::Disabled;
    let report = h.tick_with(&[("Rest1", true)]);
    assert!(
        report
            .failures
            .iter()
            .any(|f| matches!(f, DispatchError::TargetUnavailable { id } if id == "Pump0"))
    );
    assert_eq!(h.net.last_pump(), None);

    h.net.pump_status = EquipmentStatus::Available;
    h.tick();
    assert_eq!(h.net.last_pump(), Some(80.0));
}

#[test]
fn telemetry_is_published_every_operational_cycle() {
    let mut h = Harness::new(three_branch_config());
    h.tick_with(&[("Rest1", true)]);
    h.tick();
    let telemetry: Vec<_> = h
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            CoordinatorEvent::Telemetry(s) => Some(s.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(telemetry.len(), 2);
    assert_eq!(telemetry[1].admitted_count(), 1);
    assert!(telemetry[1].summary().contains("admitted 1/2"));
}

#[test]
fn only_after_controllers_topic_runs_a_cycle() {
    let mut h = Harness::new(three_branch_config());
    h.net.demand("Rest1", true);
    let now = h.now;
    assert!(
        h.coordinator
            .on_cycle(CycleTopic::BeforeWrite, now, &mut h.net, &mut h.sink)
            .is_none()
    );
    assert!(h.net.calls.is_empty());

    let report = h
        .coordinator
        .on_cycle(CycleTopic::AfterControllers, now, &mut h.net, &mut h.sink)
        .unwrap();
    assert_eq!(report.admitted, 1);
}
