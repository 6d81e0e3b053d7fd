//! Corrective action vocabulary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A corrective action a controller may request for the next window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    /// No change.
    Hold,
    /// Raise `update_prob` (more drive).
    PressureUp,
    /// Lower `update_prob` (less drive).
    PressureDown,
    /// Raise `match_threshold` (tighter selection).
    SelectivityUp,
    /// Lower `match_threshold` (looser selection).
    SelectivityDown,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Hold,
        Action::PressureUp,
        Action::PressureDown,
        Action::SelectivityUp,
        Action::SelectivityDown,
    ];

    /// Parse from string (case-insensitive, `-`/`_` separators accepted).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "hold" | "noop" | "none" => Some(Self::Hold),
            "pressureup" => Some(Self::PressureUp),
            "pressuredown" => Some(Self::PressureDown),
            "selectivityup" => Some(Self::SelectivityUp),
            "selectivitydown" => Some(Self::SelectivityDown),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hold => "Hold",
            Self::PressureUp => "PressureUp",
            Self::PressureDown => "PressureDown",
            Self::SelectivityUp => "SelectivityUp",
            Self::SelectivityDown => "SelectivityDown",
        }
    }

    #[must_use]
    pub const fn is_hold(self) -> bool {
        matches!(self, Self::Hold)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A controller's ordered, non-empty action list.
///
/// `Hold` only ever appears alone: it is dropped when mixed with real
/// actions, and an empty list becomes `[Hold]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Action>", into = "Vec<Action>")]
pub struct Decision(Vec<Action>);

impl Decision {
    /// The no-op decision `[Hold]`.
    #[must_use]
    pub fn hold() -> Self {
        Self(vec![Action::Hold])
    }

    #[must_use]
    pub fn single(action: Action) -> Self {
        Self(vec![action])
    }

    /// Normalize an arbitrary list into a decision.
    #[must_use]
    pub fn from_actions(actions: impl IntoIterator<Item = Action>) -> Self {
        let actions: Vec<Action> = actions.into_iter().filter(|a| !a.is_hold()).collect();
        if actions.is_empty() {
            Self::hold()
        } else {
            Self(actions)
        }
    }

    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.0
    }

    /// True when the decision is `[Hold]`.
    #[must_use]
    pub fn is_hold(&self) -> bool {
        self.0.len() == 1 && self.0[0].is_hold()
    }

    /// The decision as an unordered set, for cross-controller comparison.
    #[must_use]
    pub fn as_set(&self) -> BTreeSet<Action> {
        self.0.iter().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact `A+B` label used in reports.
    #[must_use]
    pub fn label(&self) -> String {
        self.0
            .iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl From<Vec<Action>> for Decision {
    fn from(actions: Vec<Action>) -> Self {
        Self::from_actions(actions)
    }
}

impl From<Decision> for Vec<Action> {
    fn from(decision: Decision) -> Self {
        decision.0
    }
}

impl Default for Decision {
    fn default() -> Self {
        Self::hold()
    }
}
