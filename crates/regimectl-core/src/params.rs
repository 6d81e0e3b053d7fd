//! Control parameters and the bounded parameter adapter.
//!
//! ## Update law
//!
//! Each non-`Hold` action moves one field by a fixed step, folded left to
//! right and clamped after every step:
//!
//! ```text
//! PressureUp       update_prob     <- clamp(update_prob + 0.1, 0.05, 1.0)
//! PressureDown     update_prob     <- clamp(update_prob - 0.1, 0.05, 1.0)
//! SelectivityUp    match_threshold <- clamp(match_threshold + 0.1, 0.0, 1.0)
//! SelectivityDown  match_threshold <- clamp(match_threshold - 0.1, 0.0, 1.0)
//! ```
//!
//! ## Defaults
//!
//! A field absent from the initial configuration is seeded with `0.5`
//! ([`DEFAULT_UPDATE_PROB`], [`DEFAULT_MATCH_THRESHOLD`]) before the first
//! window. Both defaults sit at the middle of their range so the first
//! correction in either direction has the same headroom.

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Lower bound for `update_prob`.
pub const UPDATE_PROB_MIN: f64 = 0.05;
/// Upper bound for `update_prob`.
pub const UPDATE_PROB_MAX: f64 = 1.0;
/// Lower bound for `match_threshold`.
pub const MATCH_THRESHOLD_MIN: f64 = 0.0;
/// Upper bound for `match_threshold`.
pub const MATCH_THRESHOLD_MAX: f64 = 1.0;

/// Step applied per action.
pub const STEP: f64 = 0.1;

/// Seed for an absent `update_prob`.
pub const DEFAULT_UPDATE_PROB: f64 = 0.5;
/// Seed for an absent `match_threshold`.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

/// Deltas at or below this magnitude count as "no observable effect".
const APPLIED_EPS: f64 = 1e-12;

/// The two continuous knobs the controllers steer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlParams {
    pub update_prob: f64,
    pub match_threshold: f64,
}

impl ControlParams {
    /// Build params, clamping both fields into range.
    #[must_use]
    pub fn new(update_prob: f64, match_threshold: f64) -> Self {
        Self {
            update_prob: clamp_update(update_prob),
            match_threshold: clamp_match(match_threshold),
        }
    }

    /// Fill absent fields with the documented defaults, then clamp.
    #[must_use]
    pub fn resolve(partial: PartialParams) -> Self {
        Self::new(
            partial.update_prob.unwrap_or(DEFAULT_UPDATE_PROB),
            partial.match_threshold.unwrap_or(DEFAULT_MATCH_THRESHOLD),
        )
    }

    /// True when both fields are within their bounds.
    #[must_use]
    pub fn in_bounds(&self) -> bool {
        (UPDATE_PROB_MIN..=UPDATE_PROB_MAX).contains(&self.update_prob)
            && (MATCH_THRESHOLD_MIN..=MATCH_THRESHOLD_MAX).contains(&self.match_threshold)
    }
}

impl Default for ControlParams {
    fn default() -> Self {
        Self::resolve(PartialParams::default())
    }
}

/// Initial parameters as they appear in configuration; either field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_prob: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_threshold: Option<f64>,
}

impl From<ControlParams> for PartialParams {
    fn from(p: ControlParams) -> Self {
        Self {
            update_prob: Some(p.update_prob),
            match_threshold: Some(p.match_threshold),
        }
    }
}

/// Outcome of folding one decision into the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adaptation {
    pub params_before: ControlParams,
    pub params_after: ControlParams,
    pub delta_update: f64,
    pub delta_match: f64,
    /// At least one delta is non-zero after clamping.
    pub applied: bool,
}

impl Adaptation {
    /// Describe the move from `before` to `after`, whatever produced it.
    #[must_use]
    pub fn between(before: ControlParams, after: ControlParams) -> Self {
        let delta_update = after.update_prob - before.update_prob;
        let delta_match = after.match_threshold - before.match_threshold;
        Self {
            params_before: before,
            params_after: after,
            delta_update,
            delta_match,
            applied: delta_update.abs() > APPLIED_EPS || delta_match.abs() > APPLIED_EPS,
        }
    }
}

/// Fold `actions` into `before`. `Hold` entries are skipped.
#[must_use]
pub fn adapt(before: ControlParams, actions: &[Action]) -> Adaptation {
    let after = actions
        .iter()
        .filter(|a| !a.is_hold())
        .fold(before, |p, action| step(p, *action));
    Adaptation::between(before, after)
}

fn step(p: ControlParams, action: Action) -> ControlParams {
    match action {
        Action::Hold => p,
        Action::PressureUp => ControlParams {
            update_prob: clamp_update(p.update_prob + STEP),
            ..p
        },
        Action::PressureDown => ControlParams {
            update_prob: clamp_update(p.update_prob - STEP),
            ..p
        },
        Action::SelectivityUp => ControlParams {
            match_threshold: clamp_match(p.match_threshold + STEP),
            ..p
        },
        Action::SelectivityDown => ControlParams {
            match_threshold: clamp_match(p.match_threshold - STEP),
            ..p
        },
    }
}

fn clamp_update(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(UPDATE_PROB_MIN, UPDATE_PROB_MAX)
    } else {
        DEFAULT_UPDATE_PROB
    }
}

fn clamp_match(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(MATCH_THRESHOLD_MIN, MATCH_THRESHOLD_MAX)
    } else {
        DEFAULT_MATCH_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn pressure_up_at_ceiling_is_not_applied() {
        let before = ControlParams::new(1.0, 0.5);
        let a = adapt(before, &[Action::PressureUp]);
        assert_eq!(a.params_after, before);
        assert_eq!(a.delta_update, 0.0);
        assert!(!a.applied);
    }

    #[test]
    fn pressure_down_floors_at_minimum() {
        let before = ControlParams::new(0.1, 0.5);
        let a = adapt(before, &[Action::PressureDown, Action::PressureDown]);
        assert!((a.params_after.update_prob - UPDATE_PROB_MIN).abs() < EPS);
        assert!(a.applied);
    }

    #[test]
    fn selectivity_moves_by_one_step() {
        let before = ControlParams::new(0.5, 0.3);
        let a = adapt(before, &[Action::SelectivityUp]);
        assert!((a.params_after.match_threshold - 0.4).abs() < EPS);
        assert!((a.delta_match - 0.1).abs() < EPS);
        assert_eq!(a.delta_update, 0.0);
    }

    #[test]
    fn fold_is_left_to_right_with_clamping_per_step() {
        // 0.95 + 0.1 clamps to 1.0, then -0.1 gives 0.9 (not 0.95).
        let before = ControlParams::new(0.95, 0.5);
        let a = adapt(before, &[Action::PressureUp, Action::PressureDown]);
        assert!((a.params_after.update_prob - 0.9).abs() < EPS);
    }

    #[test]
    fn hold_only_is_a_no_op() {
        let before = ControlParams::new(0.7, 0.2);
        let a = adapt(before, &[Action::Hold]);
        assert_eq!(a.params_after, before);
        assert!(!a.applied);
    }

    #[test]
    fn up_then_down_residue_is_not_applied() {
        let before = ControlParams::new(0.5, 0.5);
        let a = adapt(before, &[Action::SelectivityUp, Action::SelectivityDown]);
        assert!(!a.applied);
    }

    #[test]
    fn resolve_fills_documented_defaults() {
        let p = ControlParams::resolve(PartialParams::default());
        assert_eq!(p.update_prob, DEFAULT_UPDATE_PROB);
        assert_eq!(p.match_threshold, DEFAULT_MATCH_THRESHOLD);

        let p = ControlParams::resolve(PartialParams {
            update_prob: Some(3.0),
            match_threshold: None,
        });
        assert_eq!(p.update_prob, 1.0);
        assert_eq!(p.match_threshold, DEFAULT_MATCH_THRESHOLD);
    }

    #[test]
    fn long_random_sequences_stay_in_bounds() {
        let mut p = ControlParams::new(0.05, 0.0);
        let mut x: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..10_000 {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            let action = Action::ALL[(x % Action::ALL.len() as u64) as usize];
            p = adapt(p, &[action]).params_after;
            assert!(p.in_bounds(), "out of bounds: {p:?}");
        }
    }

    #[test]
    fn non_finite_inputs_fall_back_to_defaults() {
        let p = ControlParams::new(f64::NAN, f64::INFINITY);
        assert_eq!(p.update_prob, DEFAULT_UPDATE_PROB);
        assert_eq!(p.match_threshold, DEFAULT_MATCH_THRESHOLD);
    }
}
