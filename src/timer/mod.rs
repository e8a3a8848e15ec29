//! Watchdog timers: "is this signal still fresh?"
//!
//! A [`WatchdogTimer`] is a named countdown that is either cycle-based
//! (advanced once per coordinator invocation, deterministic and
//! replayable) or duration-based (advanced by wall-clock delta).
//!
//! Expiry is level-triggered: once `threshold` cycles or seconds have
//! elapsed since the last reset, the timer stays expired until it is
//! reset again.  A timer that was never reset is expired, so every
//! signal is stale until proven fresh.

pub mod registry;

pub use registry::{BuiltinTimers, TimerRegistry};

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// How a timer measures elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Counts coordinator cycles.
    Cycles,
    /// Counts wall-clock seconds.
    Duration,
}

/// The registry's notion of "now": the current cycle number and instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub cycle: u64,
    pub at: Instant,
}

/// One named countdown.
#[derive(Debug, Clone)]
pub struct WatchdogTimer {
    id: String,
    kind: TimerKind,
    /// Cycles for [`TimerKind::Cycles`], seconds for [`TimerKind::Duration`].
    threshold: u32,
    last_reset: Option<Tick>,
}

impl WatchdogTimer {
    pub fn new(id: &str, kind: TimerKind, threshold: u32) -> Result<Self, TimerError> {
        if threshold == 0 {
            return Err(TimerError::InvalidThreshold { id: id.to_string() });
        }
        Ok(Self {
            id: id.to_string(),
            kind,
            threshold,
            last_reset: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Mark `now` as the last fresh point.
    pub fn reset(&mut self, now: Tick) {
        self.last_reset = Some(now);
    }

    /// Forget the last fresh point; the timer reads as expired afterwards.
    pub fn invalidate(&mut self) {
        self.last_reset = None;
    }

    /// True once `threshold` has elapsed since the last reset.
    pub fn expired(&self, now: Tick) -> bool {
        let Some(mark) = self.last_reset else {
            return true;
        };
        match self.kind {
            TimerKind::Cycles => {
                now.cycle.saturating_sub(mark.cycle) >= u64::from(self.threshold)
            }
            TimerKind::Duration => {
                now.at.saturating_duration_since(mark.at)
                    >= Duration::from_secs(u64::from(self.threshold))
            }
        }
    }

    /// Same kind and threshold, i.e. re-registering is a no-op.
    fn same_parameters(&self, kind: TimerKind, threshold: u32) -> bool {
        self.kind == kind && self.threshold == threshold
    }
}
