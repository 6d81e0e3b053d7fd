//! Reference collaborators for the regimectl control loop.
//!
//! - [`SigilCa`]: ring of 8-bit sigil cells evolved bitplane by bitplane,
//!   each cell using its own sigil as an elementary rule.
//! - [`SummaryFeed`]: reduces automaton metrics to window summaries.
//! - [`default_alphabet`]: the 16-sigil alphabet for the symbol-lookup controller.
//! - [`WiringDiagram`]: JSON decision graphs for the diagram controller.
//!
//! None of these are required by `regimectl-core`; they implement its
//! collaborator traits so the harness can run end to end.

#![forbid(unsafe_code)]

pub mod alphabet;
pub mod ca;
pub mod feed;
pub mod wiring;

pub use alphabet::default_alphabet;
pub use ca::{CaConfig, CaMetrics, SigilCa};
pub use feed::SummaryFeed;
pub use wiring::{WiringDiagram, WiringError};
