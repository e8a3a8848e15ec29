//! Application core: coordination logic behind port traits.
//!
//! The [`service::CommunicationCoordinator`] composes timers, the
//! exceptional-state gate, admission and dispatch.  All interaction with
//! devices happens through the traits in [`ports`], so the whole cycle is
//! testable with an in-memory network.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
