//! Request vocabulary shared by admission and dispatch.
//!
//! A [`DemandSlot`] is one decentralized consumer's demand/acknowledgement
//! pair.  Slots sharing a [`SlotKey`] belong to the same physical branch and
//! are admitted or denied together.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum length of a request type tag.
pub const MAX_TAG_LEN: usize = 24;
/// Maximum length of a device or component identifier.
pub const MAX_ID_LEN: usize = 48;

/// Identifier of one physical branch (at most one admitted occupant).
pub type SlotKey = u32;

fn fixed<const N: usize>(s: &str) -> Option<heapless::String<N>> {
    if s.is_empty() {
        return None;
    }
    let mut out = heapless::String::new();
    out.push_str(s).ok()?;
    Some(out)
}

// ---------------------------------------------------------------------------
// RequestType
// ---------------------------------------------------------------------------

/// Opaque, configured request tag such as `HEAT` or `MORE_HEAT`.
///
/// Tags are trimmed and upper-cased on construction, so `" heat"` and
/// `"HEAT"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestType(heapless::String<MAX_TAG_LEN>);

impl RequestType {
    pub fn new(tag: &str) -> Result<Self, ConfigError> {
        let normalised = tag.trim().to_ascii_uppercase();
        fixed(&normalised)
            .map(Self)
            .ok_or_else(|| ConfigError::InvalidTag(tag.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The configured request types, iterable in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTypeSet {
    types: Vec<RequestType>,
}

impl RequestTypeSet {
    /// Build a set from tags, dropping duplicates but keeping first-seen order.
    pub fn from_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Result<Self, ConfigError> {
        let mut set = Self::default();
        for tag in tags {
            set.insert(RequestType::new(tag)?);
        }
        Ok(set)
    }

    pub fn insert(&mut self, request_type: RequestType) -> bool {
        if self.types.contains(&request_type) {
            return false;
        }
        self.types.push(request_type);
        true
    }

    pub fn contains(&self, request_type: &RequestType) -> bool {
        self.types.contains(request_type)
    }

    /// Parse `tag` and require that it was declared.
    pub fn resolve(&self, tag: &str) -> Result<RequestType, ConfigError> {
        let request_type = RequestType::new(tag)?;
        if self.contains(&request_type) {
            Ok(request_type)
        } else {
            Err(ConfigError::UnknownRequestType(request_type.to_string()))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ---------------------------------------------------------------------------
// DeviceId
// ---------------------------------------------------------------------------

/// Identifier of an external device or component (e.g. `Rest0`, `Pump0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(heapless::String<MAX_ID_LEN>);

impl DeviceId {
    pub fn new(id: &str) -> Result<Self, ConfigError> {
        fixed(id.trim())
            .map(Self)
            .ok_or_else(|| ConfigError::InvalidIdentifier(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// DemandSlot
// ---------------------------------------------------------------------------

/// One consumer's demand input and acknowledgement output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandSlot {
    pub slot_key: SlotKey,
    /// Device whose signal carries the demand.
    pub demand: DeviceId,
    /// Device that receives the acknowledgement.
    pub ack: DeviceId,
    pub request_type: RequestType,
}
