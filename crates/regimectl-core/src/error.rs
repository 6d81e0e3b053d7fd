//! Error types for run construction, simulation, decision graphs and run comparison.
//!
//! Controller faults are deliberately absent here: a controller that cannot
//! decide degrades to `Hold` and records the fault on the annotated window, so
//! the run loop never sees it as an error.

use thiserror::Error;

/// Configuration problems detected before any window is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("symbol alphabet is empty")]
    EmptyAlphabet,
    #[error("sigil {index} ('{bits}') is not a binary string")]
    InvalidSigil { index: usize, bits: String },
    #[error("sigil {index} has width {width}, expected {expected}")]
    SigilWidthMismatch {
        index: usize,
        width: usize,
        expected: usize,
    },
    #[error("alphabet size {requested} outside 1..={available}")]
    AlphabetSizeOutOfRange { requested: usize, available: usize },
    #[error("invalid run config: {0}")]
    InvalidRunConfig(String),
    #[error("two lesions scheduled for window {window_index}")]
    DuplicateLesion { window_index: usize },
    #[error(
        "forced params out of range: update_prob {update_prob}, match_threshold {match_threshold}"
    )]
    ForcedParamsOutOfRange {
        update_prob: f64,
        match_threshold: f64,
    },
}

/// Failure reported by a simulation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("simulation state is empty")]
    EmptyState,
    #[error("simulation failed: {0}")]
    Failed(String),
}

/// Failure reported by a decision-graph evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("cycle detected: sorted {sorted} of {total} nodes")]
    Cycle { sorted: usize, total: usize },
    #[error("unknown node '{0}'")]
    UnknownNode(String),
    #[error("unknown component '{component}' on node '{node}'")]
    UnknownComponent { node: String, component: String },
    #[error("node '{node}' needs {expected} input(s), got {actual}")]
    Arity {
        node: String,
        expected: usize,
        actual: usize,
    },
    #[error("node '{node}' expected a {expected} signal")]
    SignalType { node: String, expected: &'static str },
    #[error("graph evaluation failed: {0}")]
    Evaluation(String),
}

/// Errors that abandon a run as a whole.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("window {window_index}: {source}")]
    Simulation {
        window_index: usize,
        #[source]
        source: SimulationError,
    },
    #[error("window {window_index}: window feed produced no observation")]
    EmptyFeed { window_index: usize },
}

/// Reasons two runs cannot be compared window by window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComparisonError {
    #[error("runs have different lengths ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
    #[error("runs use different seeds ({left} vs {right})")]
    SeedMismatch { left: i64, right: i64 },
    #[error("runs use different disturbance schedules")]
    ScheduleMismatch,
}
