//! Per-window disagreement between two controllers.
//!
//! Two runs are comparable only when they share the seed and the disturbance
//! schedule, so any difference in decisions is down to the controllers (and
//! the trajectories those decisions produced). Decisions are compared as
//! sets: `[PressureDown, SelectivityUp]` and `[SelectivityUp, PressureDown]`
//! agree.

use serde::{Deserialize, Serialize};

use crate::error::ComparisonError;
use crate::run_loop::ControllerRun;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisagreementReport {
    pub left_controller: String,
    pub right_controller: String,
    pub seed: i64,
    pub windows: usize,
    pub mismatches: usize,
    /// `mismatches / windows`; `0.0` for two empty runs.
    pub rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_mismatch: Option<usize>,
}

/// Compare two runs window by window.
pub fn compare_runs(
    left: &ControllerRun,
    right: &ControllerRun,
) -> Result<DisagreementReport, ComparisonError> {
    if left.len() != right.len() {
        return Err(ComparisonError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    if left.seed() != right.seed() {
        return Err(ComparisonError::SeedMismatch {
            left: left.seed(),
            right: right.seed(),
        });
    }
    if left.metadata.schedule_digest != right.metadata.schedule_digest {
        return Err(ComparisonError::ScheduleMismatch);
    }

    let mut mismatches = 0usize;
    let mut first_mismatch = None;
    for (index, (a, b)) in left.windows.iter().zip(&right.windows).enumerate() {
        if a.actions.as_set() != b.actions.as_set() {
            mismatches += 1;
            first_mismatch.get_or_insert(index);
        }
    }
    let windows = left.len();
    let rate = if windows == 0 {
        0.0
    } else {
        mismatches as f64 / windows as f64
    };
    Ok(DisagreementReport {
        left_controller: left.controller_id().to_string(),
        right_controller: right.controller_id().to_string(),
        seed: left.seed(),
        windows,
        mismatches,
        rate,
        first_mismatch,
    })
}

/// Shorthand for [`compare_runs`] returning only the rate.
pub fn disagreement_rate(
    left: &ControllerRun,
    right: &ControllerRun,
) -> Result<f64, ComparisonError> {
    compare_runs(left, right).map(|r| r.rate)
}
