//! Unified error types for the heat-network coordinator.
//!
//! One umbrella `Error` enum that every subsystem converts into, with a
//! dedicated enum per concern.  Configuration errors are fatal at setup
//! (the coordinator stays in `ConfigPending`); timer and dispatch errors
//! are contained per cycle and never escape `CommunicationCoordinator::tick`.

use core::fmt;

use crate::dispatch::ChannelAddress;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Static configuration is malformed or inconsistent.
    Config(ConfigError),
    /// A watchdog timer operation failed.
    Timer(TimerError),
    /// A response action could not be applied.
    Dispatch(DispatchError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A table entry has the wrong number of `:`-separated fields.
    WrongArity {
        entry: String,
        expected: usize,
        found: usize,
    },
    /// A request type tag is not in the declared set.
    UnknownRequestType(String),
    /// The action kind is neither `METHOD` nor `CHANNEL_ADDRESS`.
    UnknownActionKind(String),
    /// The method name is not a supported method target.
    UnknownMethod(String),
    /// A channel address is not of the form `Component/Channel`.
    InvalidChannelAddress(String),
    /// A slot key is not a non-negative integer.
    InvalidSlotKey(String),
    /// A device or component identifier is empty or too long.
    InvalidIdentifier(String),
    /// A tag exceeds the fixed tag capacity or is empty.
    InvalidTag(String),
    /// A named timer could not be resolved to a timer kind.
    UnknownTimer(String),
    /// The fallback policy name is not recognised.
    UnknownFallback(String),
    /// The queueing policy name is not recognised.
    UnknownQueuePolicy(String),
    /// The concurrency cap must be at least 1.
    InvalidMaxConcurrent(u32),
    /// The declared request types do not match the ones the tables use.
    RequestTypeMismatch { declared: usize, expected: usize },
    /// The same demand device is configured twice.
    DuplicateDemandDevice(String),
    /// The same acknowledgement device is configured twice.
    DuplicateAckDevice(String),
    /// A timer could not be registered.
    Timer(TimerError),
    /// The configuration source could not be read or parsed.
    Source(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongArity {
                entry,
                expected,
                found,
            } => write!(
                f,
                "entry '{entry}' has {found} fields, expected {expected}"
            ),
            Self::UnknownRequestType(t) => write!(f, "unknown request type '{t}'"),
            Self::UnknownActionKind(k) => write!(f, "unknown action kind '{k}'"),
            Self::UnknownMethod(m) => write!(f, "unknown method '{m}'"),
            Self::InvalidChannelAddress(a) => write!(f, "invalid channel address '{a}'"),
            Self::InvalidSlotKey(k) => write!(f, "invalid slot key '{k}'"),
            Self::InvalidIdentifier(id) => write!(f, "invalid identifier '{id}'"),
            Self::InvalidTag(t) => write!(f, "invalid tag '{t}'"),
            Self::UnknownTimer(t) => write!(f, "unknown timer '{t}'"),
            Self::UnknownFallback(p) => write!(f, "unknown fallback policy '{p}'"),
            Self::UnknownQueuePolicy(p) => write!(f, "unknown queue policy '{p}'"),
            Self::InvalidMaxConcurrent(n) => {
                write!(f, "max concurrent must be >= 1, got {n}")
            }
            Self::RequestTypeMismatch { declared, expected } => write!(
                f,
                "{declared} request types declared, tables require {expected}"
            ),
            Self::DuplicateDemandDevice(d) => write!(f, "demand device '{d}' configured twice"),
            Self::DuplicateAckDevice(d) => write!(f, "ack device '{d}' configured twice"),
            Self::Timer(e) => write!(f, "{e}"),
            Self::Source(msg) => write!(f, "config source: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The id is already registered with a different kind or threshold.
    Duplicate { id: String },
    /// No timer is registered under this id.
    Unknown { id: String },
    /// A threshold of zero would make a fresh timer expired.
    InvalidThreshold { id: String },
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { id } => {
                write!(f, "timer '{id}' already registered with other parameters")
            }
            Self::Unknown { id } => write!(f, "timer '{id}' is not registered"),
            Self::InvalidThreshold { id } => write!(f, "timer '{id}' needs a threshold >= 1"),
        }
    }
}

impl std::error::Error for TimerError {}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

impl From<TimerError> for ConfigError {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The target channel does not exist (yet).
    ChannelUnresolved(ChannelAddress),
    /// A method target is missing or currently disabled.
    TargetUnavailable { id: String },
    /// The target refused the value (wrong type or out of range).
    ValueRejected { target: String, value: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelUnresolved(addr) => write!(f, "channel {addr} cannot be resolved"),
            Self::TargetUnavailable { id } => write!(f, "target '{id}' unavailable"),
            Self::ValueRejected { target, value } => {
                write!(f, "target '{target}' rejected value '{value}'")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
