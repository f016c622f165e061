//! Trigger specification

use crate::matcher::{self, MatchMode};
use serde::{Deserialize, Serialize};

/// The condition a gate waits for: a match mode and the text to look for
///
/// A missing mode is a valid value (for example a task saved without a
/// condition) and never matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Comparison strategy
    pub mode: Option<MatchMode>,
    /// Text looked for in the output; may be empty
    #[serde(default)]
    pub text: String,
}

impl TriggerSpec {
    /// Create a trigger with the given mode and text
    pub fn new(mode: MatchMode, text: impl Into<String>) -> Self {
        Self {
            mode: Some(mode),
            text: text.into(),
        }
    }

    /// Whether a single output chunk satisfies this trigger
    pub fn is_satisfied_by(&self, chunk: &str) -> bool {
        matcher::matches(self.mode, chunk, &self.text)
    }
}

impl Default for TriggerSpec {
    /// New tasks start with an exact match on empty text
    fn default() -> Self {
        Self::new(MatchMode::Exact, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_exact_empty() {
        let spec = TriggerSpec::default();
        assert_eq!(spec.mode, Some(MatchMode::Exact));
        assert!(spec.is_satisfied_by(""));
        assert!(!spec.is_satisfied_by("x"));
    }

    #[test]
    fn test_missing_mode_is_fail_closed() {
        let spec = TriggerSpec {
            mode: None,
            text: String::new(),
        };
        assert!(!spec.is_satisfied_by("anything"));
        assert!(!spec.is_satisfied_by(""));
    }
}
