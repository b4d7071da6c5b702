//! Tracked health domains.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A tracked health domain. Each domain has its own entries, preference and
/// anchor, and none of them is ever read or written across domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Weight,
    Sleep,
    Hydration,
}

impl Domain {
    /// Every domain, in a fixed order.
    pub const ALL: [Domain; 3] = [Domain::Weight, Domain::Sleep, Domain::Hydration];

    /// Stable lowercase name, used for storage keys and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Sleep => "sleep",
            Self::Hydration => "hydration",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weight" => Ok(Self::Weight),
            "sleep" => Ok(Self::Sleep),
            "hydration" => Ok(Self::Hydration),
            other => Err(crate::Error::UnknownDomain(other.to_string())),
        }
    }
}
