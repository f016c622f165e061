//! Trigger text matching

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an output chunk is compared against the trigger text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
    /// The chunk equals the trigger text byte for byte
    Exact,
    /// The chunk contains the trigger text
    Contains,
    /// The chunk starts with the trigger text
    StartsWith,
    /// The chunk ends with the trigger text, ignoring trailing whitespace
    EndsWith,
}

impl MatchMode {
    /// Every mode, in the order offered to users
    pub const ALL: [MatchMode; 4] = [
        MatchMode::Exact,
        MatchMode::Contains,
        MatchMode::StartsWith,
        MatchMode::EndsWith,
    ];

    /// The persisted tag for this mode
    pub fn tag(self) -> &'static str {
        match self {
            MatchMode::Exact => "exact",
            MatchMode::Contains => "contains",
            MatchMode::StartsWith => "startsWith",
            MatchMode::EndsWith => "endsWith",
        }
    }

    /// Parse a persisted tag; unknown tags yield `None`
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.tag() == tag)
    }

    /// Evaluate one chunk of output against the trigger text
    pub fn matches(self, chunk: &str, trigger: &str) -> bool {
        match self {
            MatchMode::Exact => chunk == trigger,
            MatchMode::Contains => chunk.contains(trigger),
            MatchMode::StartsWith => chunk.starts_with(trigger),
            // Chunks usually carry their line terminator; trimming covers "\n" and "\r\n".
            MatchMode::EndsWith => chunk.ends_with(trigger) || chunk.trim_end().ends_with(trigger),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error for a tag that names no [`MatchMode`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown match mode '{0}'")]
pub struct UnknownMatchMode(pub String);

impl FromStr for MatchMode {
    type Err = UnknownMatchMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| UnknownMatchMode(s.to_string()))
    }
}

/// Evaluate a chunk with an optional mode; no mode never matches
pub fn matches(mode: Option<MatchMode>, chunk: &str, trigger: &str) -> bool {
    mode.is_some_and(|mode| mode.matches(chunk, trigger))
}

/// Evaluate a chunk with a raw persisted tag; unknown tags never match
pub fn matches_tag(tag: &str, chunk: &str, trigger: &str) -> bool {
    matches(MatchMode::from_tag(tag), chunk, trigger)
}
