//! Bounded-concurrency admission of demanding slot keys.
//!
//! Each cycle the coordinator folds the sampled demand of every
//! [`DemandSlot`] into one boolean per [`SlotKey`] and calls
//! [`RequestAdmissionController::admit`].  At most `max_concurrent` keys are
//! admitted; the rest wait in arrival order.  An admitted key only leaves
//! when its own demand clears.  Newcomers never displace an occupant.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::error::ConfigError;
use crate::request::{DemandSlot, DeviceId, RequestType, SlotKey};

/// Demand sampled this cycle, per demand device.
pub type DemandSample = BTreeMap<DeviceId, bool>;

/// How the next free position is chosen among waiting keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Longest continuously demanding key first.
    #[default]
    Fifo,
}

impl QueuePolicy {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "FIFO" => Ok(Self::Fifo),
            _ => Err(ConfigError::UnknownQueuePolicy(name.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fifo => "FIFO",
        }
    }
}

/// Outcome of one admission round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    /// Admitted keys in admission order.
    pub admitted: Vec<SlotKey>,
    /// Demanding keys denied this cycle, in queue order.
    pub waiting: Vec<SlotKey>,
    /// The commissioning bypass was in effect.
    pub forced: bool,
}

impl Admission {
    pub fn is_admitted(&self, key: SlotKey) -> bool {
        self.admitted.contains(&key)
    }

    pub fn admitted_count(&self) -> usize {
        self.admitted.len()
    }
}

#[derive(Debug, Clone)]
pub struct RequestAdmissionController {
    slots: BTreeMap<SlotKey, Vec<DemandSlot>>,
    /// Occupants, in the order they were admitted.
    admitted: Vec<SlotKey>,
    /// Demanding keys without a position, in arrival order.
    waiting: Vec<SlotKey>,
    max_concurrent: u32,
    policy: QueuePolicy,
    forcing: bool,
}

impl RequestAdmissionController {
    pub fn new(max_concurrent: u32, policy: QueuePolicy) -> Result<Self, ConfigError> {
        if max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent(0));
        }
        Ok(Self {
            slots: BTreeMap::new(),
            admitted: Vec::new(),
            waiting: Vec::new(),
            max_concurrent,
            policy,
            forcing: false,
        })
    }

    // ── Slot membership ───────────────────────────────────────

    pub fn add_slot(&mut self, slot: DemandSlot) {
        self.slots.entry(slot.slot_key).or_default().push(slot);
    }

    /// Remove a whole branch.  Its position, if any, is freed.
    pub fn remove_slot_key(&mut self, key: SlotKey) -> Option<Vec<DemandSlot>> {
        self.admitted.retain(|k| *k != key);
        self.waiting.retain(|k| *k != key);
        self.slots.remove(&key)
    }

    /// Take over the occupancy and queue of a controller being replaced.
    /// Keys without a slot here are dropped; order is kept.
    pub fn carry_over(&mut self, previous: &Self) {
        self.admitted = previous
            .admitted
            .iter()
            .copied()
            .filter(|k| self.slots.contains_key(k))
            .collect();
        self.waiting = previous
            .waiting
            .iter()
            .copied()
            .filter(|k| self.slots.contains_key(k))
            .collect();
    }

    pub fn slots(&self) -> impl Iterator<Item = &DemandSlot> {
        self.slots.values().flatten()
    }

    pub fn slot_keys(&self) -> impl Iterator<Item = SlotKey> + '_ {
        self.slots.keys().copied()
    }

    pub fn demand_devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.slots().map(|s| &s.demand)
    }

    pub fn ack_devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.slots().map(|s| &s.ack)
    }

    // ── Runtime settings ──────────────────────────────────────

    pub fn max_concurrent(&self) -> u32 {
        self.max_concurrent
    }

    /// Change the cap.  Existing occupants are kept even when over the new cap.
    pub fn set_max_concurrent(&mut self, max_concurrent: u32) -> Result<(), ConfigError> {
        if max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent(0));
        }
        if max_concurrent != self.max_concurrent {
            info!(
                "Max concurrent {} -> {} ({} admitted)",
                self.max_concurrent,
                max_concurrent,
                self.admitted.len()
            );
        }
        self.max_concurrent = max_concurrent;
        Ok(())
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    pub fn forcing(&self) -> bool {
        self.forcing
    }

    /// Commissioning bypass: every demanding key is admitted, cap ignored.
    pub fn set_forcing(&mut self, forcing: bool) {
        if forcing != self.forcing {
            info!("Forcing {}", if forcing { "enabled" } else { "disabled" });
        }
        self.forcing = forcing;
    }

    pub fn admitted(&self) -> &[SlotKey] {
        &self.admitted
    }

    pub fn waiting(&self) -> &[SlotKey] {
        &self.waiting
    }

    // ── Per-cycle operations ──────────────────────────────────

    /// A key demands when any of its slots demands.
    pub fn demand_by_key(&self, sample: &DemandSample) -> BTreeMap<SlotKey, bool> {
        self.slots
            .iter()
            .map(|(key, slots)| {
                let demanding = slots
                    .iter()
                    .any(|s| sample.get(&s.demand).copied().unwrap_or(false));
                (*key, demanding)
            })
            .collect()
    }

    /// Run one admission round.
    pub fn admit(&mut self, demand: &BTreeMap<SlotKey, bool>) -> Admission {
        let demanding = |key: &SlotKey| demand.get(key).copied().unwrap_or(false);

        let before = self.admitted.len();
        self.admitted.retain(demanding);
        if self.admitted.len() != before {
            debug!("{} occupant(s) vacated", before - self.admitted.len());
        }
        self.waiting.retain(demanding);

        for (key, on) in demand {
            if *on && !self.admitted.contains(key) && !self.waiting.contains(key) {
                self.waiting.push(*key);
            }
        }

        match self.policy {
            QueuePolicy::Fifo => {
                while self.admitted.len() < self.max_concurrent as usize && !self.waiting.is_empty()
                {
                    let key = self.waiting.remove(0);
                    self.admitted.push(key);
                }
            }
        }

        if self.forcing {
            let mut admitted = self.admitted.clone();
            admitted.extend(self.waiting.iter().copied());
            return Admission {
                admitted,
                waiting: Vec::new(),
                forced: true,
            };
        }

        Admission {
            admitted: self.admitted.clone(),
            waiting: self.waiting.clone(),
            forced: false,
        }
    }

    /// Acknowledgements for an admission: admitted keys echo each slot's own
    /// demand, every other slot is held off.
    pub fn acks(&self, admission: &Admission, sample: &DemandSample) -> Vec<(DeviceId, bool)> {
        self.slots()
            .map(|s| {
                let on = admission.is_admitted(s.slot_key)
                    && sample.get(&s.demand).copied().unwrap_or(false);
                (s.ack.clone(), on)
            })
            .collect()
    }

    /// Acknowledgements that echo demand for every slot, ignoring the cap.
    pub fn acks_uncapped(&self, sample: &DemandSample) -> Vec<(DeviceId, bool)> {
        self.slots()
            .map(|s| (s.ack.clone(), sample.get(&s.demand).copied().unwrap_or(false)))
            .collect()
    }

    /// The same value for every acknowledgement.
    pub fn acks_all(&self, on: bool) -> Vec<(DeviceId, bool)> {
        self.slots().map(|s| (s.ack.clone(), on)).collect()
    }

    /// Request types carried by at least one admitted, demanding slot.
    pub fn active_types(&self, admission: &Admission, sample: &DemandSample) -> BTreeSet<RequestType> {
        self.slots()
            .filter(|s| {
                admission.is_admitted(s.slot_key)
                    && sample.get(&s.demand).copied().unwrap_or(false)
            })
            .map(|s| s.request_type.clone())
            .collect()
    }

    /// Forget occupancy and queue (teardown).
    pub fn clear(&mut self) {
        self.admitted.clear();
        self.waiting.clear();
    }
}
