//! Coordinator lifecycle and per-cycle modes.
//!
//! ```text
//!            start()             config valid
//!   Idle ─────────────▶ ConfigPending ─────────────▶ Operational
//!    ▲                       ▲                            │
//!    │      shutdown()       │     UpdateConfig (bad)     │
//!    └───────────────────────┴────────────────────────────┘
//! ```
//!
//! Inside `Operational` every cycle resolves to exactly one [`CycleMode`],
//! and the control decision is tagged with a [`ControlMode`] whose variants
//! are ordered by priority: exceptional override beats forcing beats normal
//! admission.

use core::fmt;

use log::info;

use crate::exceptional::Override;

// ---------------------------------------------------------------------------
// Lifecycle states
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CoordinatorState {
    #[default]
    Idle = 0,
    ConfigPending = 1,
    Operational = 2,
}

impl CoordinatorState {
    pub const COUNT: usize = 3;

    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::ConfigPending => "ConfigPending",
            Self::Operational => "Operational",
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Allowed transitions, indexed `[from][to]`.
const ALLOWED: [[bool; CoordinatorState::COUNT]; CoordinatorState::COUNT] = [
    // to:  Idle   Pending Operational
    [false, true, false], // from Idle
    [true, false, true],  // from ConfigPending
    [true, true, false],  // from Operational
];

// ---------------------------------------------------------------------------
// Per-cycle tags
// ---------------------------------------------------------------------------

/// Which branch an operational cycle took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    ExceptionalActive,
    LinkFresh,
    LinkStale,
}

impl fmt::Display for CycleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExceptionalActive => "exceptional",
            Self::LinkFresh => "fresh",
            Self::LinkStale => "stale",
        })
    }
}

/// How admission was decided, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Safety/test override; demand is ignored.
    Exceptional(Override),
    /// Commissioning bypass of the concurrency cap.
    Forcing,
    Normal,
}

impl ControlMode {
    /// Lower is stronger.
    pub fn priority(self) -> u8 {
        match self {
            Self::Exceptional(_) => 0,
            Self::Forcing => 1,
            Self::Normal => 2,
        }
    }

    /// Pick the strongest applicable mode.
    pub fn select(exceptional: Option<Override>, forcing: bool) -> Self {
        match (exceptional, forcing) {
            (Some(o), _) => Self::Exceptional(o),
            (None, true) => Self::Forcing,
            (None, false) => Self::Normal,
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exceptional(o) => write!(f, "exceptional({})", o.value()),
            Self::Forcing => f.write_str("forcing"),
            Self::Normal => f.write_str("normal"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle engine
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Lifecycle {
    current: CoordinatorState,
    /// Cycles spent in the current state.
    cycles_in_state: u64,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> CoordinatorState {
        self.current
    }

    pub fn cycles_in_state(&self) -> u64 {
        self.cycles_in_state
    }

    pub fn tick(&mut self) {
        self.cycles_in_state = self.cycles_in_state.wrapping_add(1);
    }

    /// Move to `next` if the table allows it.  Returns whether it moved.
    pub fn transition(&mut self, next: CoordinatorState) -> bool {
        if next == self.current || !ALLOWED[self.current as usize][next as usize] {
            return false;
        }
        info!("Coordinator transition: {} -> {}", self.current, next);
        self.current = next;
        self.cycles_in_state = 0;
        true
    }
}
