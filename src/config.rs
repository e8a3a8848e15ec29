//! Coordinator configuration.
//!
//! The raw [`CoordinatorConfig`] is what operators edit (JSON via
//! `JsonConfigStore`).  [`CoordinatorConfig::validate`] turns it into a
//! typed [`CoordinatorSetup`]; nothing is re-parsed per cycle.
//!
//! Table entry formats:
//!
//! ```text
//! slots:     demandDevice:ackDevice:slotKey:REQUEST_TYPE
//! responses: REQUEST_TYPE:METHOD|CHANNEL_ADDRESS:target:activeValue:passiveValue
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::admission::QueuePolicy;
use crate::app::ports::TimerLookup;
use crate::dispatch::ResponseWrapper;
use crate::error::{ConfigError, TimerError};
use crate::fallback::FallbackPolicy;
use crate::request::{DemandSlot, DeviceId, RequestType, RequestTypeSet, SlotKey};
use crate::timer::TimerKind;

/// Registry id of the upstream keep-alive timer.
pub const KEEP_ALIVE_TIMER_ID: &str = "keep-alive";
/// Registry id of the exceptional-state window.
pub const EXCEPTIONAL_TIMER_ID: &str = "exceptional-state";

const SLOT_FIELDS: usize = 4;
const RESPONSE_FIELDS: usize = 5;

// ---------------------------------------------------------------------------
// Raw configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExceptionalStateConfig {
    pub enabled: bool,
    /// Named timer kind for the override window.
    pub timer: String,
    /// Window length in cycles or seconds.
    pub timeout: u32,
}

impl Default for ExceptionalStateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timer: "TimerByCycles".into(),
            timeout: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub id: String,

    // --- Admission ---
    /// Concurrency cap (>= 1).
    pub max_concurrent: u32,
    pub queue_policy: String,
    /// Commissioning bypass of the cap.
    pub force_all: bool,

    // --- Liveness ---
    /// Named timer kind of the keep-alive.
    pub keep_alive_timer: String,
    /// Keep-alive threshold in cycles or seconds.
    pub keep_alive: u32,
    /// DEFAULT, HEAT, OPEN or CLOSE.
    pub fallback: String,
    pub exceptional_state: ExceptionalStateConfig,

    // --- Tables ---
    pub request_types: Vec<String>,
    pub slots: Vec<String>,
    pub responses: Vec<String>,

    // --- Shared equipment ---
    pub pump_id: Option<String>,
    pub line_heater_id: Option<String>,

    /// While pending, request reconfiguration every this many cycles.
    pub reconfigure_interval_cycles: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            id: "communication0".into(),
            max_concurrent: 3,
            queue_policy: "FIFO".into(),
            force_all: false,
            keep_alive_timer: "TimerByCycles".into(),
            keep_alive: 300,
            fallback: "DEFAULT".into(),
            exceptional_state: ExceptionalStateConfig::default(),
            request_types: Vec::new(),
            slots: Vec::new(),
            responses: Vec::new(),
            pump_id: None,
            line_heater_id: None,
            reconfigure_interval_cycles: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed setup
// ---------------------------------------------------------------------------

/// A timer to register at setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSpec {
    pub id: &'static str,
    pub kind: TimerKind,
    pub threshold: u32,
}

/// Validated, typed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSetup {
    pub id: String,
    pub max_concurrent: u32,
    pub queue_policy: QueuePolicy,
    pub force_all: bool,
    pub keep_alive: TimerSpec,
    pub fallback: FallbackPolicy,
    /// `None` when exceptional handling is disabled.
    pub exceptional: Option<TimerSpec>,
    pub types: RequestTypeSet,
    pub slots: Vec<DemandSlot>,
    pub responses: Vec<(RequestType, ResponseWrapper)>,
    pub pump: Option<DeviceId>,
    pub line_heater: Option<DeviceId>,
    pub reconfigure_interval_cycles: u32,
}

// ---------------------------------------------------------------------------
// Entry parsing
// ---------------------------------------------------------------------------

fn fields(entry: &str, expected: usize) -> Result<Vec<&str>, ConfigError> {
    let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
    if parts.len() != expected {
        return Err(ConfigError::WrongArity {
            entry: entry.to_string(),
            expected,
            found: parts.len(),
        });
    }
    Ok(parts)
}

/// Parse `demandDevice:ackDevice:slotKey:REQUEST_TYPE`.
pub fn parse_slot_entry(entry: &str, types: &RequestTypeSet) -> Result<DemandSlot, ConfigError> {
    let f = fields(entry, SLOT_FIELDS)?;
    let slot_key: SlotKey = f[2]
        .parse()
        .map_err(|_| ConfigError::InvalidSlotKey(f[2].to_string()))?;
    Ok(DemandSlot {
        slot_key,
        demand: DeviceId::new(f[0])?,
        ack: DeviceId::new(f[1])?,
        request_type: types.resolve(f[3])?,
    })
}

/// Parse `REQUEST_TYPE:METHOD|CHANNEL_ADDRESS:target:activeValue:passiveValue`.
pub fn parse_response_entry(
    entry: &str,
    types: &RequestTypeSet,
) -> Result<(RequestType, ResponseWrapper), ConfigError> {
    let f = fields(entry, RESPONSE_FIELDS)?;
    let request_type = types.resolve(f[0])?;
    let wrapper = ResponseWrapper::parse(f[1], f[2], f[3], f[4])?;
    Ok((request_type, wrapper))
}

/// The type tag of an entry, without validating the rest.
fn entry_tag(entry: &str, index: usize) -> Option<&str> {
    entry.split(':').nth(index).map(str::trim).filter(|t| !t.is_empty())
}

fn timer_spec(
    id: &'static str,
    name: &str,
    threshold: u32,
    lookup: &dyn TimerLookup,
) -> Result<TimerSpec, ConfigError> {
    let kind = lookup
        .resolve(name)
        .ok_or_else(|| ConfigError::UnknownTimer(name.to_string()))?;
    if threshold == 0 {
        return Err(TimerError::InvalidThreshold { id: id.to_string() }.into());
    }
    Ok(TimerSpec { id, kind, threshold })
}

fn optional_id(raw: Option<&str>) -> Result<Option<DeviceId>, ConfigError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(DeviceId::new)
        .transpose()
}

impl CoordinatorConfig {
    /// Request types referenced by the tables, in first-seen order.
    pub fn referenced_types(&self) -> Result<RequestTypeSet, ConfigError> {
        let slot_tags = self.slots.iter().filter_map(|e| entry_tag(e, 3));
        let response_tags = self.responses.iter().filter_map(|e| entry_tag(e, 0));
        RequestTypeSet::from_tags(slot_tags.chain(response_tags))
    }

    /// Validate into a typed setup.
    pub fn validate(&self, lookup: &dyn TimerLookup) -> Result<CoordinatorSetup, ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent(0));
        }
        let queue_policy = QueuePolicy::parse(&self.queue_policy)?;
        let fallback = FallbackPolicy::parse(&self.fallback)?;
        let keep_alive = timer_spec(KEEP_ALIVE_TIMER_ID, &self.keep_alive_timer, self.keep_alive, lookup)?;
        let exceptional = if self.exceptional_state.enabled {
            Some(timer_spec(
                EXCEPTIONAL_TIMER_ID,
                &self.exceptional_state.timer,
                self.exceptional_state.timeout,
                lookup,
            )?)
        } else {
            None
        };

        let types = RequestTypeSet::from_tags(self.request_types.iter().map(String::as_str))?;

        let mut slots = Vec::with_capacity(self.slots.len());
        let mut seen = BTreeSet::new();
        let mut seen_acks = BTreeSet::new();
        for entry in &self.slots {
            let slot = parse_slot_entry(entry, &types)?;
            if !seen.insert(slot.demand.clone()) {
                return Err(ConfigError::DuplicateDemandDevice(slot.demand.to_string()));
            }
            if !seen_acks.insert(slot.ack.clone()) {
                return Err(ConfigError::DuplicateAckDevice(slot.ack.to_string()));
            }
            slots.push(slot);
        }

        let responses = self
            .responses
            .iter()
            .map(|e| parse_response_entry(e, &types))
            .collect::<Result<Vec<_>, _>>()?;

        let expected = self.referenced_types()?;
        if expected.len() != types.len() {
            return Err(ConfigError::RequestTypeMismatch {
                declared: types.len(),
                expected: expected.len(),
            });
        }

        Ok(CoordinatorSetup {
            id: self.id.clone(),
            max_concurrent: self.max_concurrent,
            queue_policy,
            force_all: self.force_all,
            keep_alive,
            fallback,
            exceptional,
            types,
            slots,
            responses,
            pump: optional_id(self.pump_id.as_deref())?,
            line_heater: optional_id(self.line_heater_id.as_deref())?,
            reconfigure_interval_cycles: self.reconfigure_interval_cycles.max(1),
        })
    }

    /// Self-healing proposal: declare exactly the types the tables use.
    ///
    /// Returns `None` when healing would not change anything.
    pub fn healed(&self) -> Option<Self> {
        let referenced = self.referenced_types().ok()?;
        let tags: Vec<String> = referenced.iter().map(ToString::to_string).collect();
        let current = RequestTypeSet::from_tags(self.request_types.iter().map(String::as_str)).ok();
        if current.as_ref() == Some(&referenced) && tags.len() == self.request_types.len() {
            return None;
        }
        let mut healed = self.clone();
        healed.request_types = tags;
        Some(healed)
    }
}
