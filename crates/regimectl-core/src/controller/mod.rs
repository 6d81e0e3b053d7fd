//! Controller policies.
//!
//! Every policy maps one [`Window`] to a non-empty [`Decision`] through the
//! [`Controller`] trait, so new strategies plug into the run loop without
//! touching it. Policies are pure with respect to the window; anything they
//! need to remember between windows lives in the caller-owned
//! [`ControllerState`].
//!
//! | id | policy | shape |
//! |---|---|---|
//! | `null` | [`NullController`] | always `Hold` |
//! | `hex` | [`ThresholdController`] | fixed decision tree |
//! | `sigil` | [`SymbolLookup`] | quantize, look up, decode bits |
//! | `wiring` | [`DiagramInterpreted`] | external decision graph |

mod diagram;
mod null;
mod symbol_lookup;
mod threshold;

pub use diagram::{DEFAULT_ACTION_LIST, DiagramInterpreted, normalize_score};
pub use null::NullController;
pub use symbol_lookup::{DECODE_POSITIONS, SymbolLookup, quantize};
pub use threshold::ThresholdController;

use rand_chacha::ChaCha8Rng;

use crate::action::Decision;
use crate::rng::controller_rng;
use crate::window::Window;

/// Caller-owned mutable state handed to a controller on every decision.
#[derive(Debug, Clone)]
pub struct ControllerState {
    /// Deterministic stream for policies that need randomness.
    pub rng: ChaCha8Rng,
    /// Decisions made so far.
    pub decisions: u64,
    /// Decisions that degraded to `Hold` because the policy faulted.
    pub faults: u64,
    last_fault: Option<String>,
}

impl ControllerState {
    /// Fresh state whose stream is derived from the run seed.
    #[must_use]
    pub fn new(run_seed: i64) -> Self {
        Self {
            rng: controller_rng(run_seed),
            decisions: 0,
            faults: 0,
            last_fault: None,
        }
    }

    /// Record a fault for the current decision.
    pub fn record_fault(&mut self, message: impl Into<String>) {
        self.faults += 1;
        self.last_fault = Some(message.into());
    }

    /// Take the fault recorded during the last decision, if any.
    pub fn take_fault(&mut self) -> Option<String> {
        self.last_fault.take()
    }
}

/// A decision policy.
pub trait Controller: Send + Sync {
    /// Stable identifier used in runs, logs and reports.
    fn id(&self) -> &str;

    /// Decide the corrective actions for one window. Never fails: a policy
    /// that cannot decide records a fault in `state` and returns `[Hold]`.
    fn decide(&self, window: &Window, state: &mut ControllerState) -> Decision;
}

/// Run `controller` on `window`, maintaining the decision counter.
pub fn decide_counted(
    controller: &dyn Controller,
    window: &Window,
    state: &mut ControllerState,
) -> Decision {
    state.decisions += 1;
    controller.decide(window, state)
}
