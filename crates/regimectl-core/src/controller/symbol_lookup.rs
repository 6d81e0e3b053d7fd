//! Quantize-and-decode controller ("sigil").
//!
//! `pressure` and `selectivity` are each quantized into four equal-width
//! bins; the pair selects a symbol from the alphabet, and four fixed bit
//! positions of that symbol switch on up to four simultaneous actions.
//!
//! ```text
//! bin(x) = clamp(floor(x * 4), 0, 3)
//! idx    = (bin(pressure) * 4 + bin(selectivity)) mod alphabet_size
//!
//! bit 0 -> PressureUp      bit 4 -> SelectivityUp
//! bit 1 -> PressureDown    bit 5 -> SelectivityDown
//! ```
//!
//! Bit `p` is the `p`-th character of the symbol counted from the left.
//! Positions past the end of a short symbol read as unset.

use std::sync::Arc;

use crate::action::{Action, Decision};
use crate::controller::{Controller, ControllerState};
use crate::error::ConfigError;
use crate::external::SymbolAlphabet;
use crate::window::Window;

/// Number of quantization bins per axis.
pub const BINS: usize = 4;

/// Bit positions decoded, with the action each one switches on, in output order.
pub const DECODE_POSITIONS: [(usize, Action); 4] = [
    (0, Action::PressureUp),
    (1, Action::PressureDown),
    (4, Action::SelectivityUp),
    (5, Action::SelectivityDown),
];

/// Quantize a unit scalar into one of [`BINS`] bins.
#[must_use]
pub fn quantize(x: f64) -> usize {
    if !x.is_finite() || x <= 0.0 {
        return 0;
    }
    // Saturating float-to-int cast; 1.0 lands in the top bin via the clamp.
    ((x * BINS as f64).floor() as usize).min(BINS - 1)
}

pub struct SymbolLookup {
    alphabet: Arc<dyn SymbolAlphabet>,
    alphabet_size: usize,
}

impl SymbolLookup {
    /// Build over `alphabet`, using all of its symbols.
    ///
    /// Fails on an empty alphabet so no run ever starts with a lookup that
    /// cannot resolve.
    pub fn new(alphabet: Arc<dyn SymbolAlphabet>) -> Result<Self, ConfigError> {
        if alphabet.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        let alphabet_size = alphabet.len();
        Ok(Self {
            alphabet,
            alphabet_size,
        })
    }

    /// Restrict lookups to the first `size` symbols.
    pub fn with_alphabet_size(mut self, size: usize) -> Result<Self, ConfigError> {
        if size == 0 || size > self.alphabet.len() {
            return Err(ConfigError::AlphabetSizeOutOfRange {
                requested: size,
                available: self.alphabet.len(),
            });
        }
        self.alphabet_size = size;
        Ok(self)
    }

    #[must_use]
    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    /// Symbol index selected by a window.
    #[must_use]
    pub fn index_for(&self, window: &Window) -> usize {
        (quantize(window.pressure) * BINS + quantize(window.selectivity)) % self.alphabet_size
    }
}

impl std::fmt::Debug for SymbolLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolLookup")
            .field("alphabet_len", &self.alphabet.len())
            .field("alphabet_size", &self.alphabet_size)
            .finish()
    }
}

impl Controller for SymbolLookup {
    fn id(&self) -> &str {
        "sigil"
    }

    fn decide(&self, window: &Window, state: &mut ControllerState) -> Decision {
        let idx = self.index_for(window);
        let Some(bits) = self.alphabet.bits(idx) else {
            state.record_fault(format!("alphabet has no symbol at index {idx}"));
            return Decision::hold();
        };
        let bits = bits.as_bytes();
        Decision::from_actions(
            DECODE_POSITIONS
                .iter()
                .filter(|(pos, _)| bits.get(*pos) == Some(&b'1'))
                .map(|(_, action)| *action),
        )
    }
}
