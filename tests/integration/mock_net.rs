//! Mock heat network for integration tests.
//!
//! Records every write the coordinator makes so tests can assert on the
//! full history without a real bus.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use heatnet::app::events::CoordinatorEvent;
use heatnet::app::ports::{
    DemandPort, EquipmentKind, EquipmentPort, EquipmentStatus, EventSink, OverridePort, ResponsePort,
};
use heatnet::app::service::CommunicationCoordinator;
use heatnet::config::CoordinatorConfig;
use heatnet::dispatch::{ChannelAddress, ResponseValue};
use heatnet::error::DispatchError;
use heatnet::request::DeviceId;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum NetCall {
    Ack { device: String, on: bool },
    Channel { address: String, value: ResponseValue },
    Pump { percent: f64 },
    LineHeater { enable: Option<bool> },
}

// ── MockNetwork ───────────────────────────────────────────────

pub struct MockNetwork {
    pub calls: Vec<NetCall>,
    pending: BTreeMap<String, bool>,
    acks: BTreeMap<String, bool>,
    broken_links: BTreeSet<String>,
    enable: Option<bool>,
    value: Option<i32>,
    /// Channels that resolve; everything else is unresolved.
    channels: BTreeSet<String>,
    pub pump_status: EquipmentStatus,
    pub line_heater_status: EquipmentStatus,
}

#[allow(dead_code)]
impl MockNetwork {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            pending: BTreeMap::new(),
            acks: BTreeMap::new(),
            broken_links: BTreeSet::new(),
            enable: None,
            value: None,
            channels: BTreeSet::new(),
            pump_status: EquipmentStatus::Available,
            line_heater_status: EquipmentStatus::Available,
        }
    }

    pub fn with_channel(mut self, address: &str) -> Self {
        self.channels.insert(address.to_string());
        self
    }

    pub fn demand(&mut self, device: &str, on: bool) {
        self.pending.insert(device.to_string(), on);
    }

    pub fn break_link(&mut self, device: &str) {
        self.broken_links.insert(device.to_string());
    }

    pub fn heal_link(&mut self, device: &str) {
        self.broken_links.remove(device);
    }

    pub fn override_on(&mut self, value: Option<i32>) {
        self.enable = Some(true);
        self.value = value;
    }

    pub fn override_off(&mut self) {
        self.enable = Some(false);
    }

    pub fn ack(&self, device: &str) -> Option<bool> {
        self.acks.get(device).copied()
    }

    /// Devices whose latest acknowledgement is on.
    pub fn acked(&self) -> Vec<String> {
        self.acks
            .iter()
            .filter(|(_, on)| **on)
            .map(|(d, _)| d.clone())
            .collect()
    }

    pub fn last_pump(&self) -> Option<f64> {
        self.calls.iter().rev().find_map(|c| match c {
            NetCall::Pump { percent } => Some(*percent),
            _ => None,
        })
    }

    pub fn last_channel(&self, address: &str) -> Option<ResponseValue> {
        self.calls.iter().rev().find_map(|c| match c {
            NetCall::Channel { address: a, value } if a == address => Some(value.clone()),
            _ => None,
        })
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl DemandPort for MockNetwork {
    fn take_demand(&mut self, device: &DeviceId) -> Option<bool> {
        self.pending.remove(device.as_str())
    }

    fn set_ack(&mut self, device: &DeviceId, on: bool) {
        self.acks.insert(device.to_string(), on);
        self.calls.push(NetCall::Ack {
            device: device.to_string(),
            on,
        });
    }

    fn link_ok(&self, device: &DeviceId) -> bool {
        !self.broken_links.contains(device.as_str())
    }
}

impl OverridePort for MockNetwork {
    fn take_enable_signal(&mut self) -> Option<bool> {
        self.enable.take()
    }

    fn take_override_value(&mut self) -> Option<i32> {
        self.value.take()
    }
}

impl ResponsePort for MockNetwork {
    fn write_channel(&mut self, address: &ChannelAddress, value: &ResponseValue) -> Result<(), DispatchError> {
        if !self.channels.contains(&address.to_string()) {
            return Err(DispatchError::ChannelUnresolved(address.clone()));
        }
        self.calls.push(NetCall::Channel {
            address: address.to_string(),
            value: value.clone(),
        });
        Ok(())
    }
}

impl EquipmentPort for MockNetwork {
    fn status(&self, _id: &DeviceId, kind: EquipmentKind) -> EquipmentStatus {
        match kind {
            EquipmentKind::Pump => self.pump_status,
            EquipmentKind::LineHeater => self.line_heater_status,
        }
    }

    fn set_pump_power(&mut self, _id: &DeviceId, percent: f64) -> Result<(), DispatchError> {
        self.calls.push(NetCall::Pump { percent });
        Ok(())
    }

    fn set_line_heater(&mut self, _id: &DeviceId, enable: Option<bool>) -> Result<(), DispatchError> {
        self.calls.push(NetCall::LineHeater { enable });
        Ok(())
    }
}

// ── LogSink ───────────────────────────────────────────────────

pub struct LogSink {
    pub events: Vec<CoordinatorEvent>,
}

#[allow(dead_code)]
impl LogSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(|e| format!("{:?}", e)).collect()
    }

    pub fn count(&self, pred: impl Fn(&CoordinatorEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &CoordinatorEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

/// Three branches; branch 1 has a second (MORE_HEAT) request.
pub fn three_branch_config() -> CoordinatorConfig {
    CoordinatorConfig {
        id: "comm0".into(),
        max_concurrent: 2,
        keep_alive: 3,
        request_types: vec!["HEAT".into(), "MORE_HEAT".into()],
        slots: vec![
            "Rest1:Ack1:1:HEAT".into(),
            "Rest1b:Ack1b:1:MORE_HEAT".into(),
            "Rest2:Ack2:2:HEAT".into(),
            "Rest3:Ack3:3:HEAT".into(),
        ],
        responses: vec![
            "HEAT:METHOD:ACTIVATE_PUMP:80:0".into(),
            "HEAT:CHANNEL_ADDRESS:Valve0/SetPoint:100:0".into(),
            "MORE_HEAT:METHOD:ACTIVATE_LINEHEATER:true:null".into(),
        ],
        pump_id: Some("Pump0".into()),
        line_heater_id: Some("LineHeater0".into()),
        ..CoordinatorConfig::default()
    }
}

pub struct Harness {
    pub coordinator: CommunicationCoordinator,
    pub net: MockNetwork,
    pub sink: LogSink,
    pub now: Instant,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(config: CoordinatorConfig) -> Self {
        let now = Instant::now();
        let mut coordinator = CommunicationCoordinator::new(config, now);
        let mut sink = LogSink::new();
        coordinator.start(&mut sink);
        Self {
            coordinator,
            net: MockNetwork::new().with_channel("Valve0/SetPoint"),
            sink,
            now,
        }
    }

    pub fn tick(&mut self) -> heatnet::app::events::CycleReport {
        self.now += Duration::from_secs(1);
        self.coordinator.tick(self.now, &mut self.net, &mut self.sink)
    }

    /// Write demand for the given devices, then run a cycle.
    pub fn tick_with(&mut self, demand: &[(&str, bool)]) -> heatnet::app::events::CycleReport {
        for (device, on) in demand {
            self.net.demand(device, *on);
        }
        self.tick()
    }

    pub fn admitted(&self) -> Vec<u32> {
        self.coordinator.status().admitted
    }
}
