//! Response dispatch: what each request type does when it turns on or off.
//!
//! Every configured [`RequestType`] owns a list of [`ResponseWrapper`]s.
//! [`ResponseDispatcher::plan`] is pure: it turns the set of active request
//! types into a [`DispatchPlan`] in which every type appears exactly once,
//! either with its active or its passive invocations.  The coordinator
//! applies the plan through its ports.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ConfigError;
use crate::exceptional::Override;
use crate::request::{MAX_ID_LEN, RequestType, RequestTypeSet};

// ---------------------------------------------------------------------------
// Values and targets
// ---------------------------------------------------------------------------

/// A value written by a response action.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseValue {
    /// Release the target (no value).
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ResponseValue {
    /// `"null"` → Null, `"true"/"false"` → Bool, numeric → Number, else Text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("null") {
            return Self::Null;
        }
        if raw.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) => Some(*n != 0.0),
            Self::Text(t) => t.parse().ok(),
            Self::Null => None,
        }
    }
}

impl fmt::Display for ResponseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

/// `Component/Channel` address of a writable channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelAddress {
    component: heapless::String<MAX_ID_LEN>,
    channel: heapless::String<MAX_ID_LEN>,
}

impl ChannelAddress {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidChannelAddress(raw.to_string());
        let (component, channel) = raw.trim().split_once('/').ok_or_else(invalid)?;
        let (component, channel) = (component.trim(), channel.trim());
        if component.is_empty() || channel.is_empty() || channel.contains('/') {
            return Err(invalid());
        }
        let mut c = heapless::String::new();
        c.push_str(component).map_err(|()| invalid())?;
        let mut ch = heapless::String::new();
        ch.push_str(channel).map_err(|()| invalid())?;
        Ok(Self {
            component: c,
            channel: ch,
        })
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.channel)
    }
}

/// Built-in method targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Write the value to the log.
    LogInfo,
    /// Set the shared pump's power level (percent).
    ActivatePump,
    /// Write the line heater's enable signal; `null` releases it.
    ActivateLineHeater,
}

impl MethodKind {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "LOG_INFO" => Ok(Self::LogInfo),
            "ACTIVATE_PUMP" => Ok(Self::ActivatePump),
            "ACTIVATE_LINEHEATER" | "ACTIVATE_LINE_HEATER" => Ok(Self::ActivateLineHeater),
            _ => Err(ConfigError::UnknownMethod(name.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ResponseWrapper
// ---------------------------------------------------------------------------

/// One configured action with its active and passive value.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseWrapper {
    Method {
        method: MethodKind,
        active: ResponseValue,
        passive: ResponseValue,
    },
    Channel {
        address: ChannelAddress,
        active: ResponseValue,
        passive: ResponseValue,
    },
}

impl ResponseWrapper {
    /// Build from the `kind:target:active:passive` tail of a response entry.
    pub fn parse(kind: &str, target: &str, active: &str, passive: &str) -> Result<Self, ConfigError> {
        let active = ResponseValue::parse(active);
        let passive = ResponseValue::parse(passive);
        match kind.trim().to_ascii_uppercase().as_str() {
            "METHOD" => Ok(Self::Method {
                method: MethodKind::parse(target)?,
                active,
                passive,
            }),
            "CHANNEL_ADDRESS" | "CHANNEL" => Ok(Self::Channel {
                address: ChannelAddress::parse(target)?,
                active,
                passive,
            }),
            _ => Err(ConfigError::UnknownActionKind(kind.to_string())),
        }
    }

    fn invocation(&self, active: bool, scale: Option<Override>) -> Invocation {
        match self {
            Self::Method {
                method,
                active: on,
                passive: off,
            } => {
                let value = if active { on.clone() } else { off.clone() };
                let value = match (active, method, scale, value) {
                    (true, MethodKind::ActivatePump, Some(o), ResponseValue::Number(n)) => {
                        ResponseValue::Number(o.scale(n))
                    }
                    (_, _, _, v) => v,
                };
                Invocation::Method {
                    method: *method,
                    value,
                }
            }
            Self::Channel {
                address,
                active: on,
                passive: off,
            } => Invocation::Channel {
                address: address.clone(),
                value: if active { on.clone() } else { off.clone() },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A single side effect for the coordinator to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Method { method: MethodKind, value: ResponseValue },
    Channel { address: ChannelAddress, value: ResponseValue },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEntry {
    pub request_type: RequestType,
    pub active: bool,
    pub invocations: Vec<Invocation>,
}

/// One entry per configured request type, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchPlan {
    pub entries: Vec<DispatchEntry>,
}

impl DispatchPlan {
    pub fn is_active(&self, request_type: &RequestType) -> bool {
        self.entries
            .iter()
            .any(|e| e.active && &e.request_type == request_type)
    }

    pub fn active_types(&self) -> BTreeMap<RequestType, bool> {
        self.entries
            .iter()
            .map(|e| (e.request_type.clone(), e.active))
            .collect()
    }

    pub fn invocations(&self) -> impl Iterator<Item = &Invocation> {
        self.entries.iter().flat_map(|e| e.invocations.iter())
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ResponseDispatcher {
    types: RequestTypeSet,
    table: BTreeMap<RequestType, Vec<ResponseWrapper>>,
}

impl ResponseDispatcher {
    pub fn new(types: RequestTypeSet) -> Self {
        Self {
            types,
            table: BTreeMap::new(),
        }
    }

    /// Attach a wrapper to a declared request type.
    pub fn add(&mut self, request_type: RequestType, wrapper: ResponseWrapper) -> Result<(), ConfigError> {
        if !self.types.contains(&request_type) {
            return Err(ConfigError::UnknownRequestType(request_type.to_string()));
        }
        self.table.entry(request_type).or_default().push(wrapper);
        Ok(())
    }

    pub fn types(&self) -> &RequestTypeSet {
        &self.types
    }

    pub fn wrappers(&self, request_type: &RequestType) -> &[ResponseWrapper] {
        self.table.get(request_type).map_or(&[][..], Vec::as_slice)
    }

    pub fn wrapper_count(&self) -> usize {
        self.table.values().map(Vec::len).sum()
    }

    /// Plan for the given active types.  `scale` only affects active pump
    /// set points.
    pub fn plan(&self, active: &BTreeSet<RequestType>, scale: Option<Override>) -> DispatchPlan {
        let entries = self
            .types
            .iter()
            .map(|ty| {
                let on = active.contains(ty);
                DispatchEntry {
                    request_type: ty.clone(),
                    active: on,
                    invocations: self
                        .wrappers(ty)
                        .iter()
                        .map(|w| w.invocation(on, scale))
                        .collect(),
                }
            })
            .collect();
        DispatchPlan { entries }
    }

    /// Plan with every type in the same state.
    pub fn plan_uniform(&self, active: bool, scale: Option<Override>) -> DispatchPlan {
        let all: BTreeSet<RequestType> = if active {
            self.types.iter().cloned().collect()
        } else {
            BTreeSet::new()
        };
        self.plan(&all, scale)
    }
}
