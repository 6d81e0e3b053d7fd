//! Windowed regime-control loop.
//!
//! This crate provides:
//! - The observation model: [`Window`], [`Regime`], [`RawWindow`] ingestion with clamping
//! - Controller policies behind the [`Controller`] trait (null, threshold, symbol lookup,
//!   decision-graph)
//! - The bounded parameter adapter over [`ControlParams`]
//! - Scheduled disturbances (lesions and stress overrides)
//! - The [`RunLoop`] state machine producing immutable [`ControllerRun`]s
//! - Run statistics (regime fractions, dwell times, transitions) and the
//!   cross-controller disagreement comparator
//!
//! The simulation engine, window feed, symbol alphabet and decision-graph
//! interpreter are collaborators reached only through the traits in [`external`].

#![forbid(unsafe_code)]

pub mod action;
pub mod alphabet;
pub mod controller;
pub mod disagreement;
pub mod disturbance;
pub mod error;
pub mod external;
pub mod params;
pub mod rng;
pub mod run_loop;
pub mod stats;
pub mod window;

pub use action::{Action, Decision};
pub use alphabet::SigilAlphabet;
pub use controller::{
    Controller, ControllerState, DiagramInterpreted, NullController, SymbolLookup,
    ThresholdController,
};
pub use disagreement::{DisagreementReport, compare_runs, disagreement_rate};
pub use disturbance::{
    DisturbanceSchedule, Lesion, LesionHalf, LesionMode, LesionTarget, ResolvedLesion,
    StressSchedule,
};
pub use error::{ComparisonError, ConfigError, GraphError, RunError, SimulationError};
pub use external::{
    DecisionGraph, GraphContext, GraphOutput, History, SimState, Simulator, SymbolAlphabet,
    WindowFeed,
};
pub use params::{Adaptation, ControlParams, PartialParams, adapt};
pub use run_loop::{
    AnnotatedWindow, ControllerRun, RunConfig, RunLoop, RunMetadata, RunPhase, run_controller,
};
pub use stats::{ActionTally, AggregateStatistics, DwellDistribution, RunStatistics};
pub use window::{RawWindow, Regime, Window};
