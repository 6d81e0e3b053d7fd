//! Decision-graph controller ("wiring").
//!
//! The graph sees `{summary: window}` and answers with an optional boolean
//! `pass` and an optional `score`. Its output is accepted as-is; the only
//! processing here is score normalization and mapping onto `action_list`.

use std::sync::Arc;

use crate::action::{Action, Decision};
use crate::controller::{Controller, ControllerState};
use crate::external::{DecisionGraph, GraphContext, GraphOutput};
use crate::window::Window;

/// Action list used when the caller supplies none.
pub const DEFAULT_ACTION_LIST: [Action; 4] = [
    Action::PressureUp,
    Action::SelectivityUp,
    Action::SelectivityDown,
    Action::PressureDown,
];

/// Map a raw graph score into `[0, 1]`.
///
/// Scores up to `1.0` are taken as fractions, larger ones as percentages.
/// Non-finite scores are treated as absent.
#[must_use]
pub fn normalize_score(raw: f64) -> Option<f64> {
    if !raw.is_finite() {
        return None;
    }
    let scaled = if raw <= 1.0 { raw } else { raw / 100.0 };
    Some(scaled.clamp(0.0, 1.0))
}

pub struct DiagramInterpreted {
    graph: Arc<dyn DecisionGraph>,
    action_list: Vec<Action>,
}

impl DiagramInterpreted {
    #[must_use]
    pub fn new(graph: Arc<dyn DecisionGraph>) -> Self {
        Self {
            graph,
            action_list: DEFAULT_ACTION_LIST.to_vec(),
        }
    }

    /// Replace the ordered action list the graph output selects from.
    #[must_use]
    pub fn with_action_list(mut self, actions: Vec<Action>) -> Self {
        self.action_list = actions;
        self
    }

    #[must_use]
    pub fn action_list(&self) -> &[Action] {
        &self.action_list
    }

    /// Pick an action from a graph output; `None` means hold.
    #[must_use]
    pub fn select(&self, output: &GraphOutput) -> Option<Action> {
        let len = self.action_list.len();
        if let (Some(pass), 2) = (output.pass, len) {
            return Some(if pass {
                self.action_list[0]
            } else {
                self.action_list[1]
            });
        }
        let score = output.score.and_then(normalize_score)?;
        if len == 0 {
            return None;
        }
        let slot = ((score * len as f64).floor() as usize).min(len - 1);
        Some(self.action_list[slot])
    }
}

impl std::fmt::Debug for DiagramInterpreted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramInterpreted")
            .field("action_list", &self.action_list)
            .finish_non_exhaustive()
    }
}

impl Controller for DiagramInterpreted {
    fn id(&self) -> &str {
        "wiring"
    }

    fn decide(&self, window: &Window, state: &mut ControllerState) -> Decision {
        let context = GraphContext { summary: *window };
        let output = match self.graph.evaluate(&context) {
            Ok(output) => output,
            Err(err) => {
                state.record_fault(format!("decision graph failed: {err}"));
                return Decision::hold();
            }
        };
        if output.pass.is_none() && output.score.is_none() {
            state.record_fault("decision graph returned neither pass nor score");
            return Decision::hold();
        }
        self.select(&output)
            .map_or_else(Decision::hold, |a| Decision::from_actions([a]))
    }
}
