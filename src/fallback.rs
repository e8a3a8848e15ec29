//! Behaviour while the upstream link is stale.
//!
//! The heating side fails open: the default policy turns everything on so a
//! lost master never leaves consumers cold.

use core::fmt;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Every acknowledgement on, every request type active.
    #[default]
    Default,
    /// Acknowledgements follow demand with the cap bypassed, every request
    /// type active.
    Heat,
    /// Every acknowledgement on, request types passive.
    Open,
    /// Every acknowledgement off, request types passive.
    Close,
}

/// How acknowledgements are driven under a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckRule {
    AllOn,
    AllOff,
    FollowDemand,
}

/// What a fallback policy asks the coordinator to do this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackDecision {
    pub acks: AckRule,
    pub types_active: bool,
}

impl FallbackPolicy {
    /// `UNDEFINED` (and an empty name) map to [`FallbackPolicy::Default`].
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "DEFAULT" | "UNDEFINED" | "" => Ok(Self::Default),
            "HEAT" => Ok(Self::Heat),
            "OPEN" => Ok(Self::Open),
            "CLOSE" => Ok(Self::Close),
            _ => Err(ConfigError::UnknownFallback(name.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Heat => "HEAT",
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
        }
    }

    pub fn decide(self) -> FallbackDecision {
        match self {
            Self::Default => FallbackDecision {
                acks: AckRule::AllOn,
                types_active: true,
            },
            Self::Heat => FallbackDecision {
                acks: AckRule::FollowDemand,
                types_active: true,
            },
            Self::Open => FallbackDecision {
                acks: AckRule::AllOn,
                types_active: false,
            },
            Self::Close => FallbackDecision {
                acks: AckRule::AllOff,
                types_active: false,
            },
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
