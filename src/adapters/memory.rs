//! In-memory heat network.
//!
//! Implements every network port on plain maps so a coordinator can run on
//! a host without any bus.  Used by the simulation binary; the integration
//! tests use their own recording mock.

use std::collections::BTreeMap;

use log::debug;

use crate::app::ports::{
    DemandPort, EquipmentKind, EquipmentPort, EquipmentStatus, OverridePort, ResponsePort,
};
use crate::config::CoordinatorSetup;
use crate::dispatch::{ChannelAddress, ResponseValue, ResponseWrapper};
use crate::error::DispatchError;
use crate::request::DeviceId;

#[derive(Debug, Default)]
pub struct InMemoryNetwork {
    /// Pending (unread) demand writes.
    pending_demand: BTreeMap<DeviceId, bool>,
    acks: BTreeMap<DeviceId, bool>,
    links: BTreeMap<DeviceId, bool>,
    enable_signal: Option<bool>,
    override_value: Option<i32>,
    channels: BTreeMap<ChannelAddress, Option<ResponseValue>>,
    equipment: BTreeMap<DeviceId, (EquipmentKind, EquipmentStatus)>,
    pump_power: BTreeMap<DeviceId, f64>,
    line_heaters: BTreeMap<DeviceId, Option<bool>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every device, channel and piece of equipment a setup uses,
    /// all healthy.
    pub fn populate(&mut self, setup: &CoordinatorSetup) {
        for slot in &setup.slots {
            self.add_device(slot.demand.clone());
            self.add_device(slot.ack.clone());
        }
        for (_, wrapper) in &setup.responses {
            if let ResponseWrapper::Channel { address, .. } = wrapper {
                self.add_channel(address.clone());
            }
        }
        if let Some(id) = &setup.pump {
            self.add_equipment(id.clone(), EquipmentKind::Pump);
        }
        if let Some(id) = &setup.line_heater {
            self.add_equipment(id.clone(), EquipmentKind::LineHeater);
        }
    }

    // ── Devices ───────────────────────────────────────────────

    pub fn add_device(&mut self, id: DeviceId) {
        self.links.insert(id, true);
    }

    pub fn set_link(&mut self, id: &DeviceId, ok: bool) {
        self.links.insert(id.clone(), ok);
    }

    /// Queue a demand write for the next read.
    pub fn write_demand(&mut self, id: &DeviceId, on: bool) {
        self.pending_demand.insert(id.clone(), on);
    }

    pub fn ack(&self, id: &DeviceId) -> Option<bool> {
        self.acks.get(id).copied()
    }

    // ── Exceptional state ─────────────────────────────────────

    pub fn write_enable_signal(&mut self, on: bool) {
        self.enable_signal = Some(on);
    }

    pub fn write_override_value(&mut self, value: i32) {
        self.override_value = Some(value);
    }

    // ── Channels and equipment ────────────────────────────────

    pub fn add_channel(&mut self, address: ChannelAddress) {
        self.channels.entry(address).or_insert(None);
    }

    pub fn channel(&self, address: &ChannelAddress) -> Option<&ResponseValue> {
        self.channels.get(address).and_then(Option::as_ref)
    }

    pub fn add_equipment(&mut self, id: DeviceId, kind: EquipmentKind) {
        self.equipment.insert(id, (kind, EquipmentStatus::Available));
    }

    pub fn set_equipment_status(&mut self, id: &DeviceId, status: EquipmentStatus) {
        if let Some(entry) = self.equipment.get_mut(id) {
            entry.1 = status;
        }
    }

    pub fn pump_power(&self, id: &DeviceId) -> Option<f64> {
        self.pump_power.get(id).copied()
    }

    pub fn line_heater(&self, id: &DeviceId) -> Option<Option<bool>> {
        self.line_heaters.get(id).copied()
    }

    fn require(&self, id: &DeviceId, kind: EquipmentKind) -> Result<(), DispatchError> {
        match self.status(id, kind) {
            EquipmentStatus::Available => Ok(()),
            _ => Err(DispatchError::TargetUnavailable { id: id.to_string() }),
        }
    }
}

impl DemandPort for InMemoryNetwork {
    fn take_demand(&mut self, device: &DeviceId) -> Option<bool> {
        self.pending_demand.remove(device)
    }

    fn set_ack(&mut self, device: &DeviceId, on: bool) {
        self.acks.insert(device.clone(), on);
    }

    fn link_ok(&self, device: &DeviceId) -> bool {
        self.links.get(device).copied().unwrap_or(false)
    }
}

impl OverridePort for InMemoryNetwork {
    fn take_enable_signal(&mut self) -> Option<bool> {
        self.enable_signal.take()
    }

    fn take_override_value(&mut self) -> Option<i32> {
        self.override_value.take()
    }
}

impl ResponsePort for InMemoryNetwork {
    fn write_channel(&mut self, address: &ChannelAddress, value: &ResponseValue) -> Result<(), DispatchError> {
        let slot = self
            .channels
            .get_mut(address)
            .ok_or_else(|| DispatchError::ChannelUnresolved(address.clone()))?;
        debug!("{} <- {}", address, value);
        *slot = Some(value.clone());
        Ok(())
    }
}

impl EquipmentPort for InMemoryNetwork {
    fn status(&self, id: &DeviceId, kind: EquipmentKind) -> EquipmentStatus {
        match self.equipment.get(id) {
            Some((k, status)) if *k == kind => *status,
            _ => EquipmentStatus::Missing,
        }
    }

    fn set_pump_power(&mut self, id: &DeviceId, percent: f64) -> Result<(), DispatchError> {
        self.require(id, EquipmentKind::Pump)?;
        if !(0.0..=100.0).contains(&percent) {
            return Err(DispatchError::ValueRejected {
                target: id.to_string(),
                value: percent.to_string(),
            });
        }
        self.pump_power.insert(id.clone(), percent);
        Ok(())
    }

    fn set_line_heater(&mut self, id: &DeviceId, enable: Option<bool>) -> Result<(), DispatchError> {
        self.require(id, EquipmentKind::LineHeater)?;
        self.line_heaters.insert(id.clone(), enable);
        Ok(())
    }
}
