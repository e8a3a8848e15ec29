//! Outbound coordinator events.
//!
//! The [`CommunicationCoordinator`](super::service::CommunicationCoordinator)
//! emits these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them: log them, feed
//! a dashboard, forward them upstream.

use std::collections::BTreeMap;

use crate::error::{ConfigError, DispatchError};
use crate::fallback::FallbackPolicy;
use crate::fsm::{ControlMode, CoordinatorState, CycleMode};
use crate::request::{RequestType, SlotKey};

/// Structured events emitted by the coordinator.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// The coordinator has started (carries its id).
    Started(String),

    /// The lifecycle moved between states.
    StateChanged {
        from: CoordinatorState,
        to: CoordinatorState,
    },

    /// A slot key received a position.
    Admitted(SlotKey),

    /// An occupant vacated its position.
    Released(SlotKey),

    /// A slot key started waiting for a position.
    Queued(SlotKey),

    /// The keep-alive expired and the fallback policy took over.
    FallbackEngaged(FallbackPolicy),

    /// The keep-alive is fresh again after a fallback.
    LinkRestored,

    ExceptionalEntered { value: u8 },
    ExceptionalLeft,

    /// A response action could not be applied this cycle.
    ActionFailed {
        request_type: RequestType,
        error: DispatchError,
    },

    /// The configuration was rejected; the coordinator is pending.
    ConfigRejected(ConfigError),

    /// A pending coordinator asked for a new configuration.  `healed` is
    /// true when it applied its own self-healing proposal.
    ReconfigurationRequested { healed: bool },

    /// Per-cycle status snapshot.
    Telemetry(CoordinatorStatus),

    /// Teardown finished.
    Stopped,
}

/// Result of one coordinator invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// `None` when no operational cycle ran (idle or pending).
    pub mode: Option<CycleMode>,
    pub admitted: usize,
    /// Contained per-action failures.
    pub failures: Vec<DispatchError>,
    /// The configuration changed during this invocation.
    pub reconfigured: bool,
}

/// Point-in-time view of the coordinator for dashboards and logs.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorStatus {
    pub id: String,
    pub state: CoordinatorState,
    pub cycle: u64,
    pub mode: Option<CycleMode>,
    pub control: Option<ControlMode>,
    pub admitted: Vec<SlotKey>,
    pub waiting: Vec<SlotKey>,
    /// Active flag per configured request type.
    pub active_types: BTreeMap<RequestType, bool>,
    pub max_concurrent: u32,
    pub forcing: bool,
    pub fallback: FallbackPolicy,
}

impl CoordinatorStatus {
    pub fn admitted_count(&self) -> usize {
        self.admitted.len()
    }

    /// One human-readable line.
    pub fn summary(&self) -> String {
        let mode = self.mode.map_or_else(|| "-".to_string(), |m| m.to_string());
        let control = self.control.map_or_else(|| "-".to_string(), |c| c.to_string());
        let active: Vec<&str> = self
            .active_types
            .iter()
            .filter(|(_, on)| **on)
            .map(|(t, _)| t.as_str())
            .collect();
        format!(
            "{} {} link={} control={} admitted {}/{} {:?} waiting {:?} active [{}] fallback={}{}",
            self.id,
            self.state,
            mode,
            control,
            self.admitted.len(),
            self.max_concurrent,
            self.admitted,
            self.waiting,
            active.join(","),
            self.fallback,
            if self.forcing { " FORCING" } else { "" },
        )
    }
}
