//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every coordinator event as one log
//! line.  A dashboard or upstream adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::CoordinatorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`CoordinatorEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &CoordinatorEvent) {
        match event {
            CoordinatorEvent::Telemetry(status) => {
                info!("TELEM | {}", status.summary());
            }
            CoordinatorEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            CoordinatorEvent::Started(id) => {
                info!("START | {}", id);
            }
            CoordinatorEvent::Stopped => {
                info!("STOP  | teardown complete");
            }
            CoordinatorEvent::Admitted(key) => {
                info!("SLOT  | {} admitted", key);
            }
            CoordinatorEvent::Released(key) => {
                info!("SLOT  | {} released", key);
            }
            CoordinatorEvent::Queued(key) => {
                info!("SLOT  | {} queued", key);
            }
            CoordinatorEvent::FallbackEngaged(policy) => {
                warn!("LINK  | stale, fallback {}", policy);
            }
            CoordinatorEvent::LinkRestored => {
                info!("LINK  | fresh");
            }
            CoordinatorEvent::ExceptionalEntered { value } => {
                warn!("EXCPT | override active, value={}", value);
            }
            CoordinatorEvent::ExceptionalLeft => {
                info!("EXCPT | override released");
            }
            CoordinatorEvent::ActionFailed { request_type, error } => {
                warn!("ACTN  | {}: {}", request_type, error);
            }
            CoordinatorEvent::ConfigRejected(e) => {
                warn!("CONF  | rejected: {}", e);
            }
            CoordinatorEvent::ReconfigurationRequested { healed } => {
                info!("CONF  | reconfiguration requested (healed={})", healed);
            }
        }
    }
}
