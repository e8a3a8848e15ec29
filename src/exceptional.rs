//! Exceptional-state override.
//!
//! An external safety or test component can take over every consumer by
//! writing `true` to the enable signal at least once per timer window.  While
//! the gate is active, the override value alone decides the outcome:
//! `0` forces everything off, anything above forces everything on (and may
//! scale the pump set point).  Normal admission is skipped for that cycle.

use log::{debug, info};

use crate::error::TimerError;
use crate::timer::TimerRegistry;

/// Upper bound of the override value (percent).
pub const MAX_OVERRIDE: u8 = 100;

/// Signals sampled (read-and-cleared) from the override inputs this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideSignal {
    /// Fresh write on the enable input, if any.
    pub enable: Option<bool>,
    /// Fresh write on the value input, if any.
    pub value: Option<i32>,
}

/// The active override for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Override {
    value: u8,
}

impl Override {
    pub fn new(value: i32) -> Self {
        Self {
            value: clamp_percent(value),
        }
    }

    pub fn value(self) -> u8 {
        self.value
    }

    /// `false` means force everything off.
    pub fn forces_on(self) -> bool {
        self.value > 0
    }

    /// Scale a set point by `value / 100`.
    pub fn scale(self, set_point: f64) -> f64 {
        set_point * f64::from(self.value) / f64::from(MAX_OVERRIDE)
    }
}

fn clamp_percent(value: i32) -> u8 {
    value.clamp(0, i32::from(MAX_OVERRIDE)) as u8
}

#[derive(Debug, Clone)]
pub struct ExceptionalStateGate {
    timer_id: String,
    override_value: u8,
    active_before: bool,
}

impl ExceptionalStateGate {
    /// `timer_id` must already be registered in the registry passed to
    /// [`evaluate`](Self::evaluate).
    pub fn new(timer_id: &str) -> Self {
        Self {
            timer_id: timer_id.to_string(),
            override_value: MAX_OVERRIDE,
            active_before: false,
        }
    }

    pub fn timer_id(&self) -> &str {
        &self.timer_id
    }

    pub fn override_value(&self) -> u8 {
        self.override_value
    }

    pub fn is_active(&self) -> bool {
        self.active_before
    }

    /// Decide whether the override holds this cycle.
    ///
    /// A fresh `true` resets the window; a fresh `false` ends it at once.
    /// Without a fresh write the override persists until the timer expires.
    pub fn evaluate(
        &mut self,
        signal: OverrideSignal,
        timers: &mut TimerRegistry,
    ) -> Result<Option<Override>, TimerError> {
        if let Some(value) = signal.value {
            let clamped = clamp_percent(value);
            if clamped != self.override_value {
                debug!("exceptional value {} -> {}", self.override_value, clamped);
            }
            self.override_value = clamped;
        }

        let was_active = self.active_before;
        let active = match signal.enable {
            Some(true) => {
                timers.reset(&self.timer_id)?;
                true
            }
            Some(false) => false,
            None => self.active_before && !timers.expired(&self.timer_id)?,
        };
        self.active_before = active;

        if active != was_active {
            if active {
                info!("Exceptional state entered (value {})", self.override_value);
            } else {
                info!("Exceptional state left");
            }
        }

        Ok(active.then(|| Override {
            value: self.override_value,
        }))
    }

    /// Forget any active override (teardown).
    pub fn clear(&mut self) {
        self.active_before = false;
    }
}
