//! Port traits: the hexagonal boundary between coordination logic and the
//! heat network.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CommunicationCoordinator (domain)
//! ```
//!
//! Driven adapters (device signals, shared equipment, event sinks, config
//! storage) implement these traits.  The
//! [`CommunicationCoordinator`](super::service::CommunicationCoordinator)
//! consumes them via generics, so the core never touches a bus directly.
//!
//! All lookups are repeated every cycle.  An adapter must never cache a
//! failed lookup as permanent.

use std::time::Instant;

use crate::config::CoordinatorConfig;
use crate::dispatch::{ChannelAddress, ResponseValue};
use crate::error::{ConfigError, DispatchError};
use crate::request::DeviceId;
use crate::timer::TimerKind;

// ───────────────────────────────────────────────────────────────
// Demand port (decentralized consumers ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Demand inputs and acknowledgement outputs of decentralized devices.
pub trait DemandPort {
    /// Read-and-clear the device's pending demand write.
    ///
    /// `None` means nothing was written since the last read.
    fn take_demand(&mut self, device: &DeviceId) -> Option<bool>;

    /// Publish the acknowledgement for a device.
    fn set_ack(&mut self, device: &DeviceId, on: bool);

    /// Whether the device's link to the coordinator is currently healthy.
    /// Unknown devices report `false`.
    fn link_ok(&self, device: &DeviceId) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Override port (safety / test component → domain)
// ───────────────────────────────────────────────────────────────

/// Exceptional-state inputs, each read-and-cleared once per cycle.
pub trait OverridePort {
    fn take_enable_signal(&mut self) -> Option<bool>;
    fn take_override_value(&mut self) -> Option<i32>;
}

// ───────────────────────────────────────────────────────────────
// Response port (domain → arbitrary writable channels)
// ───────────────────────────────────────────────────────────────

pub trait ResponsePort {
    /// Write `value` to the channel's next-write slot.
    ///
    /// Fails with [`DispatchError::ChannelUnresolved`] when the channel does
    /// not exist right now.
    fn write_channel(&mut self, address: &ChannelAddress, value: &ResponseValue) -> Result<(), DispatchError>;
}

// ───────────────────────────────────────────────────────────────
// Equipment port (domain → shared pump / line heater)
// ───────────────────────────────────────────────────────────────

/// Kind of shared equipment a method action may address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentKind {
    Pump,
    LineHeater,
}

/// Result of a component lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentStatus {
    Available,
    /// Present but currently disabled; look again next cycle.
    Disabled,
    /// Unknown id or wrong component type.
    Missing,
}

/// Component lookup and write side of shared equipment.  Serialising writes
/// from several coordinators is the adapter's job.
pub trait EquipmentPort {
    fn status(&self, id: &DeviceId, kind: EquipmentKind) -> EquipmentStatus;

    /// Set the pump power level in percent.
    fn set_pump_power(&mut self, id: &DeviceId, percent: f64) -> Result<(), DispatchError>;

    /// Write the line heater enable signal; `None` releases it.
    fn set_line_heater(&mut self, id: &DeviceId, enable: Option<bool>) -> Result<(), DispatchError>;
}

/// Everything a coordinator cycle touches on the network side.
pub trait NetworkPort: DemandPort + OverridePort + ResponsePort + EquipmentPort {}

impl<T: DemandPort + OverridePort + ResponsePort + EquipmentPort> NetworkPort for T {}

// ───────────────────────────────────────────────────────────────
// Named-timer lookup
// ───────────────────────────────────────────────────────────────

/// Maps a configured timer name to a timer kind.
pub trait TimerLookup {
    fn resolve(&self, name: &str) -> Option<TimerKind>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured
/// [`CoordinatorEvent`](super::events::CoordinatorEvent)s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::CoordinatorEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists coordinator configuration.
///
/// Storage failures are reported as [`ConfigError::Source`].
pub trait ConfigPort {
    fn load(&self) -> Result<CoordinatorConfig, ConfigError>;

    /// Persist a configuration (used for the self-healing proposal).
    fn save(&self, config: &CoordinatorConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

pub trait Clock {
    fn now(&self) -> Instant;
}
