//! Inbound commands and cycle notifications.
//!
//! Commands represent runtime writes from the outside world (dashboards,
//! the upstream master, commissioning tools) that the
//! [`CommunicationCoordinator`](super::service::CommunicationCoordinator)
//! interprets between cycles.

use crate::config::CoordinatorConfig;
use crate::fallback::FallbackPolicy;

/// Commands that external adapters can send into the coordinator.
#[derive(Debug, Clone)]
pub enum CoordinatorCommand {
    /// Change the concurrency cap.  Only future admissions are affected.
    SetMaxConcurrent(u32),

    /// Toggle the commissioning bypass of the cap.
    SetForcing(bool),

    /// Change the policy applied while the link is stale.
    SetFallback(FallbackPolicy),

    /// Replace the configuration and rebuild the setup.
    UpdateConfig(Box<CoordinatorConfig>),
}

/// Phase of the external control cycle being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTopic {
    /// Before pending writes are applied.
    BeforeWrite,
    /// After downstream controllers have run.
    AfterControllers,
}
