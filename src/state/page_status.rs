/// Page status definitions for recorded page results
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the outcome of processing a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// Page was fetched, parsed and extracted
    Success,

    /// Page failed permanently or exhausted its retries
    Failed,

    /// Page hit a transient failure and is being attempted again
    Retrying,
}

impl PageStatus {
    /// Returns true if this is a terminal status (no further attempts)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Retrying)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "retrying" => Some(Self::Retrying),
            _ => None,
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
