//! Heat-network communication coordinator.
//!
//! Liveness-gated admission and dispatch for decentralized heat consumers:
//! watchdog timers decide whether signals are fresh, an exceptional-state
//! gate can override everything, and the admission controller caps how
//! many consumers draw from the shared heat source at once.
//!
//! The pure modules (`timer`, `exceptional`, `admission`, `dispatch`,
//! `fallback`) carry no I/O.  [`app::service::CommunicationCoordinator`]
//! wires them together behind the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod admission;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod exceptional;
pub mod fallback;
pub mod fsm;
pub mod request;
pub mod timer;

pub mod adapters;
