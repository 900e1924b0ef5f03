//! Completion trigger matching.
//!
//! A submission whose name is on the configured allow-list force-completes
//! the session. This is a cosmetic operator shortcut for live events, not an
//! access control mechanism: anyone who knows a trigger name can use it.

use crate::config::TriggerConfig;

/// Decides whether a submitted name is a completion trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionMatcher {
    exact: Vec<String>,
    /// Stored lowercased.
    case_insensitive: Vec<String>,
}

impl CompletionMatcher {
    /// Build a matcher from exact tokens and case-insensitive keywords.
    pub fn new<E, C>(exact: E, case_insensitive: C) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            exact: exact.into_iter().map(Into::into).collect(),
            case_insensitive: case_insensitive
                .into_iter()
                .map(|keyword| keyword.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Build a matcher from the `triggers` config section.
    pub fn from_config(config: &TriggerConfig) -> Self {
        Self::new(config.exact.iter().cloned(), &config.case_insensitive)
    }

    /// Whether `name` force-completes the session.
    pub fn is_completion_trigger(&self, name: &str) -> bool {
        if self.exact.iter().any(|token| token == name) {
            return true;
        }
        if self.case_insensitive.is_empty() {
            return false;
        }
        let lowered = name.to_lowercase();
        self.case_insensitive.iter().any(|keyword| *keyword == lowered)
    }
}
