//! Hand-tuned decision tree ("hex").
//!
//! Rules are evaluated in order and the first match wins:
//!
//! ```text
//! 1. Freeze                                      -> PressureUp
//! 2. Magma                                       -> PressureDown, SelectivityUp
//! 3. Ok, structure < 0.4 and selectivity < 0.4   -> SelectivityUp
//! 4. Ok, pressure > 0.7 and selectivity > 0.7    -> PressureDown
//! 5. otherwise                                   -> Hold
//! ```
//!
//! Freeze needs more drive; runaway needs less drive and tighter selection;
//! low-structure, low-selectivity states are pushed toward selection; and
//! over-driven, over-selective states are cooled.

use crate::action::{Action, Decision};
use crate::controller::{Controller, ControllerState};
use crate::window::{Regime, Window};

/// Upper bound (exclusive) on structure for the "push toward selection" rule.
pub const LOW_STRUCTURE: f64 = 0.4;
/// Upper bound (exclusive) on selectivity for the "push toward selection" rule.
pub const LOW_SELECTIVITY: f64 = 0.4;
/// Lower bound (exclusive) on pressure for the cooling rule.
pub const HIGH_PRESSURE: f64 = 0.7;
/// Lower bound (exclusive) on selectivity for the cooling rule.
pub const HIGH_SELECTIVITY: f64 = 0.7;

#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdController;

impl Controller for ThresholdController {
    fn id(&self) -> &str {
        "hex"
    }

    fn decide(&self, window: &Window, _state: &mut ControllerState) -> Decision {
        match window.regime {
            Regime::Freeze => Decision::single(Action::PressureUp),
            Regime::Magma => Decision::from_actions([Action::PressureDown, Action::SelectivityUp]),
            Regime::Ok
                if window.structure < LOW_STRUCTURE && window.selectivity < LOW_SELECTIVITY =>
            {
                Decision::single(Action::SelectivityUp)
            }
            Regime::Ok
                if window.pressure > HIGH_PRESSURE && window.selectivity > HIGH_SELECTIVITY =>
            {
                Decision::single(Action::PressureDown)
            }
            Regime::Ok => Decision::hold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(w: Window) -> Vec<Action> {
        let mut state = ControllerState::new(0);
        ThresholdController.decide(&w, &mut state).actions().to_vec()
    }

    #[test]
    fn freeze_always_pressure_up() {
        for p in [0.0, 0.5, 1.0] {
            for s in [0.0, 0.5, 1.0] {
                for st in [0.0, 1.0] {
                    assert_eq!(
                        decide(Window::new(Regime::Freeze, p, s, st, 0.0)),
                        vec![Action::PressureUp]
                    );
                }
            }
        }
    }

    #[test]
    fn magma_cools_and_tightens() {
        assert_eq!(
            decide(Window::new(Regime::Magma, 0.1, 0.1, 0.1, 1.0)),
            vec![Action::PressureDown, Action::SelectivityUp]
        );
    }

    #[test]
    fn ok_low_structure_low_selectivity_tightens() {
        assert_eq!(
            decide(Window::new(Regime::Ok, 0.9, 0.39, 0.1, 0.3)),
            vec![Action::SelectivityUp]
        );
    }

    #[test]
    fn ok_boundaries_are_strict() {
        // structure == 0.4 does not satisfy `< 0.4`.
        assert_eq!(
            decide(Window::new(Regime::Ok, 0.5, 0.2, 0.4, 0.3)),
            vec![Action::Hold]
        );
        // pressure == 0.7 does not satisfy `> 0.7`.
        assert_eq!(
            decide(Window::new(Regime::Ok, 0.7, 0.9, 0.9, 0.3)),
            vec![Action::Hold]
        );
    }

    #[test]
    fn ok_overdriven_cools() {
        assert_eq!(
            decide(Window::new(Regime::Ok, 0.8, 0.8, 0.9, 0.3)),
            vec![Action::PressureDown]
        );
    }

    #[test]
    fn rule_three_precedes_rule_four() {
        // Cannot satisfy both (selectivity < 0.4 and > 0.7), so check ordering
        // via a window that only rule 3 matches despite high pressure.
        assert_eq!(
            decide(Window::new(Regime::Ok, 0.95, 0.1, 0.1, 0.3)),
            vec![Action::SelectivityUp]
        );
    }
}
