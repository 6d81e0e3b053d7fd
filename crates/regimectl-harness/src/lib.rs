//! Sweep harness for regimectl.
//!
//! This crate provides:
//! - JSON sweep configuration with environment overrides
//! - A controller factory over alphabets and wiring diagrams on disk
//! - Parallel multi-seed sweeps with deterministic result order
//! - Seed ranking by inter-controller disagreement
//! - Structured JSONL logging
//! - JSON, Markdown and CSV reports

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod factory;
pub mod report;
pub mod structured_log;
pub mod sweep;

pub use config::{ControllerKind, ControllerSpec, HarnessConfig};
pub use error::HarnessError;
pub use factory::{NamedController, build_controller, build_controllers};
pub use report::ReportFormat;
pub use sweep::{Job, PairDisagreement, Sweep, SweepEntry, SweepFailure, SweepOutcome};
