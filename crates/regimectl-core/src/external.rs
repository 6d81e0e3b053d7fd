//! Contracts for the collaborators the control loop consumes.
//!
//! - [`Simulator`]: advances the simulated state for a window of generations.
//! - [`WindowFeed`]: reduces accumulated histories to window summaries.
//! - [`SymbolAlphabet`]: fixed-width bit strings for the symbol-lookup controller.
//! - [`DecisionGraph`]: externally defined decision graph for the diagram controller.
//!
//! Implementations must be `Send + Sync` to take part in parallel sweeps; the
//! loop itself only ever calls them from one thread per run.

use serde::{Deserialize, Serialize};

use crate::disturbance::ResolvedLesion;
use crate::error::{GraphError, SimulationError};
use crate::params::ControlParams;
use crate::window::{RawWindow, Window};

/// Genotype/phenotype pair a window starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct SimState<G, P> {
    pub genotype: G,
    pub phenotype: P,
}

/// Per-generation histories, one entry per generation in each vector.
#[derive(Debug, Clone, PartialEq)]
pub struct History<G, P, M> {
    pub genotypes: Vec<G>,
    pub phenotypes: Vec<P>,
    pub metrics: Vec<M>,
}

impl<G, P, M> History<G, P, M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            genotypes: Vec::new(),
            phenotypes: Vec::new(),
            metrics: Vec::new(),
        }
    }

    /// Number of generations recorded (length of the metrics history).
    #[must_use]
    pub fn generations(&self) -> usize {
        self.metrics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Append another chunk of history.
    pub fn extend(&mut self, other: Self) {
        self.genotypes.extend(other.genotypes);
        self.phenotypes.extend(other.phenotypes);
        self.metrics.extend(other.metrics);
    }
}

impl<G: Clone, P: Clone, M> History<G, P, M> {
    /// Final genotype/phenotype, the starting point of the next window.
    #[must_use]
    pub fn last_state(&self) -> Option<SimState<G, P>> {
        Some(SimState {
            genotype: self.genotypes.last()?.clone(),
            phenotype: self.phenotypes.last()?.clone(),
        })
    }
}

impl<G, P, M> Default for History<G, P, M> {
    fn default() -> Self {
        Self::new()
    }
}

/// The simulation engine.
///
/// `simulate` is treated as a synchronous, possibly expensive, pure function
/// of `(state, params, generations, seed, lesion)`.
pub trait Simulator: Send + Sync {
    type Genotype: Clone + Send;
    type Phenotype: Clone + Send;
    type Metrics: Clone + Send;

    /// Initial state for window 0, derived from the run seed.
    fn seed_state(&self, seed: i64) -> SimState<Self::Genotype, Self::Phenotype>;

    /// Advance `generations` generations from `state`.
    fn simulate(
        &self,
        state: &SimState<Self::Genotype, Self::Phenotype>,
        params: &ControlParams,
        generations: usize,
        seed: i64,
        lesion: Option<&ResolvedLesion>,
    ) -> Result<History<Self::Genotype, Self::Phenotype, Self::Metrics>, SimulationError>;
}

/// Reduces histories to window summaries.
///
/// The run loop reads only the last element of the returned vector.
pub trait WindowFeed<S: Simulator + ?Sized>: Send + Sync {
    fn windowed_features(
        &self,
        history: &History<S::Genotype, S::Phenotype, S::Metrics>,
        window_length: usize,
        stride: usize,
    ) -> Vec<RawWindow>;
}

/// A finite, ordered alphabet of fixed-width bit strings.
pub trait SymbolAlphabet: Send + Sync {
    fn len(&self) -> usize;

    /// Bit string of the `index`-th symbol (`'0'`/`'1'` characters).
    fn bits(&self, index: usize) -> Option<&str>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Context handed to a decision graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphContext {
    pub summary: Window,
}

/// A decision graph's output contract, accepted as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphOutput {
    #[serde(default)]
    pub pass: Option<bool>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// An externally defined decision graph.
pub trait DecisionGraph: Send + Sync {
    fn evaluate(&self, context: &GraphContext) -> Result<GraphOutput, GraphError>;
}
