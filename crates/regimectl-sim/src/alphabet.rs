//! The default 16-sigil alphabet.
//!
//! Indexed by `pressure_bin * 4 + selectivity_bin`. Decoded through bit
//! positions 0, 1, 4 and 5, the table pushes both scalars back toward the
//! middle bins:
//!
//! ```text
//!              sel 0        sel 1   sel 2   sel 3
//! press 0      PU+SU        PU      PU      PU+SD
//! press 1      SU           -       -       SD
//! press 2      SU           -       -       SD
//! press 3      PD+SU        PD      PD      PD+SD
//! ```
//!
//! The remaining four bits of each sigil are free and keep the sigils
//! distinct as automaton rules.

use regimectl_core::SymbolAlphabet;

pub const DEFAULT_SIGILS: [&str; 16] = [
    "10111001", "10010010", "10100001", "10000111", //
    "00111000", "00010011", "00100010", "00110100", //
    "00001011", "00110001", "00010000", "00100110", //
    "01011010", "01100001", "01000011", "01110100", //
];

/// An alphabet over static bit strings.
#[derive(Debug, Clone, Copy)]
pub struct StaticAlphabet(&'static [&'static str]);

impl SymbolAlphabet for StaticAlphabet {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn bits(&self, index: usize) -> Option<&str> {
        self.0.get(index).copied()
    }
}

#[must_use]
pub fn default_alphabet() -> StaticAlphabet {
    StaticAlphabet(&DEFAULT_SIGILS)
}
