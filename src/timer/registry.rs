//! Per-coordinator set of named watchdog timers.

use std::collections::BTreeMap;
use std::time::Instant;

use log::{debug, info};

use super::{Tick, TimerKind, WatchdogTimer};
use crate::app::ports::TimerLookup;
use crate::error::{ConfigError, TimerError};

// ═══════════════════════════════════════════════════════════════════════════
// Named-timer lookup
// ═══════════════════════════════════════════════════════════════════════════

/// Resolves the stock timer names shipped with every deployment.
///
/// `TimerByCycles` / `cycle-based` / `CYCLES` count coordinator cycles;
/// `TimerByTime` / `time-based` / `TIME` count seconds.  Matching ignores
/// case and surrounding whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTimers;

impl TimerLookup for BuiltinTimers {
    fn resolve(&self, name: &str) -> Option<TimerKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "timerbycycles" | "cycle-based" | "cycles" => Some(TimerKind::Cycles),
            "timerbytime" | "time-based" | "time" => Some(TimerKind::Duration),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════

/// Owns every timer of one coordinator.  Timers are never shared.
///
/// The registry's clock only moves in [`advance`](Self::advance), which the
/// coordinator calls exactly once per invocation.  Cycle timers therefore
/// behave identically no matter how fast the cycles arrive.
#[derive(Debug)]
pub struct TimerRegistry {
    owner: String,
    timers: BTreeMap<String, WatchdogTimer>,
    now: Tick,
}

impl TimerRegistry {
    pub fn new(owner: &str, at: Instant) -> Self {
        Self {
            owner: owner.to_string(),
            timers: BTreeMap::new(),
            now: Tick { cycle: 0, at },
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Start the next cycle.  A clock that runs backwards is ignored.
    pub fn advance(&mut self, at: Instant) {
        self.now.cycle = self.now.cycle.wrapping_add(1);
        if at > self.now.at {
            self.now.at = at;
        }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn cycle(&self) -> u64 {
        self.now.cycle
    }

    /// Register `id`.  Re-registering with identical parameters is a no-op.
    pub fn register(&mut self, id: &str, kind: TimerKind, threshold: u32) -> Result<(), TimerError> {
        if let Some(existing) = self.timers.get(id) {
            if existing.same_parameters(kind, threshold) {
                return Ok(());
            }
            return Err(TimerError::Duplicate { id: id.to_string() });
        }
        let timer = WatchdogTimer::new(id, kind, threshold)?;
        debug!(
            "[{}] timer '{}' registered ({:?}, threshold {})",
            self.owner, id, kind, threshold
        );
        self.timers.insert(id.to_string(), timer);
        Ok(())
    }

    /// Register `id` with the kind the lookup service assigns to `timer_name`.
    pub fn register_named(
        &mut self,
        id: &str,
        timer_name: &str,
        threshold: u32,
        lookup: &dyn TimerLookup,
    ) -> Result<(), ConfigError> {
        let kind = lookup
            .resolve(timer_name)
            .ok_or_else(|| ConfigError::UnknownTimer(timer_name.to_string()))?;
        self.register(id, kind, threshold)?;
        Ok(())
    }

    pub fn reset(&mut self, id: &str) -> Result<(), TimerError> {
        let now = self.now;
        self.timers
            .get_mut(id)
            .map(|t| t.reset(now))
            .ok_or_else(|| TimerError::Unknown { id: id.to_string() })
    }

    pub fn expired(&self, id: &str) -> Result<bool, TimerError> {
        self.timers
            .get(id)
            .map(|t| t.expired(self.now))
            .ok_or_else(|| TimerError::Unknown { id: id.to_string() })
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.timers.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&WatchdogTimer> {
        self.timers.get(id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Keep only the timers `keep` accepts; the rest are dropped.
    /// Kept timers hold on to their last reset.
    pub fn retain(&mut self, mut keep: impl FnMut(&WatchdogTimer) -> bool) {
        let owner = &self.owner;
        self.timers.retain(|id, timer| {
            let kept = keep(timer);
            if !kept {
                debug!("[{}] released timer '{}'", owner, id);
            }
            kept
        });
    }

    /// Drop every timer (teardown).
    pub fn release_all(&mut self) {
        if !self.timers.is_empty() {
            info!("[{}] released {} timer(s)", self.owner, self.timers.len());
        }
        self.timers.clear();
    }
}
