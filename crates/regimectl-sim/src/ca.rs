//! Bitplane sigil cellular automaton.
//!
//! ## Model
//!
//! A ring of `width` cells, each holding an 8-bit sigil. A sigil doubles as
//! an elementary CA rule: bit `k` of the byte is the output for the 3-cell
//! neighbourhood `k = L*4 + C*2 + R`. Each generation, every bitplane of a
//! cell is rewritten by the rule of its left neighbour applied to that
//! plane's `(L, C, R)` bits, with wrap-around at the ends.
//!
//! The two control parameters act as follows:
//!
//! - `update_prob`: each unheld cell takes its update with this probability.
//! - `match_threshold`: a cell is *selected* (phenotype bit set, and held on
//!   the next generation) when it agrees with its left neighbour on at least
//!   `(1 - match_threshold) * 8` bit positions. Raising the threshold holds
//!   more cells.
//!
//! ## Per-generation metrics
//!
//! | metric | meaning |
//! |---|---|
//! | `change_rate` | fraction of the `width * 8` bits that flipped |
//! | `entropy` | Shannon entropy of the sigil histogram, normalized to `[0, 1]` |
//! | `phenotype_density` | fraction of selected cells |
//!
//! Lesions are applied at the start of their tick, before that generation's
//! update.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use regimectl_core::{
    ControlParams, History, LesionMode, ResolvedLesion, SimState, SimulationError, Simulator,
};

/// Bits per sigil.
pub const SIGIL_BITS: u32 = 8;

/// Ring width used when the configuration names none.
pub const DEFAULT_WIDTH: usize = 64;

/// ChaCha stream used for the seed state, kept apart from per-window streams.
const SEED_STATE_STREAM: u64 = 0x5345_4544; // "SEED"

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaConfig {
    #[serde(default = "default_width")]
    pub width: usize,
}

fn default_width() -> usize {
    DEFAULT_WIDTH
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
        }
    }
}

/// Metrics of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaMetrics {
    pub change_rate: f64,
    pub entropy: f64,
    pub phenotype_density: f64,
}

/// One bitplane-parallel rule application.
#[must_use]
pub fn step_cell(left: u8, center: u8, right: u8, rule: u8) -> u8 {
    let mut out = 0u8;
    for plane in 0..SIGIL_BITS {
        let idx =
            (((left >> plane) & 1) << 2) | (((center >> plane) & 1) << 1) | ((right >> plane) & 1);
        out |= ((rule >> idx) & 1) << plane;
    }
    out
}

/// Whether `cell` agrees with `left` closely enough to be selected.
#[must_use]
pub fn selected(cell: u8, left: u8, match_threshold: f64) -> bool {
    let agree = SIGIL_BITS - (cell ^ left).count_ones();
    f64::from(agree) >= (1.0 - match_threshold) * f64::from(SIGIL_BITS)
}

fn phenotype(cells: &[u8], match_threshold: f64) -> Vec<bool> {
    let n = cells.len();
    (0..n)
        .map(|i| selected(cells[i], cells[(i + n - 1) % n], match_threshold))
        .collect()
}

/// Normalized Shannon entropy of the sigil histogram.
#[must_use]
pub fn sigil_entropy(cells: &[u8]) -> f64 {
    let n = cells.len();
    if n < 2 {
        return 0.0;
    }
    let mut counts = [0usize; 256];
    for &c in cells {
        counts[usize::from(c)] += 1;
    }
    let total = n as f64;
    let h: f64 = counts
        .iter()
        .filter(|c| **c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    let max = (n.min(256) as f64).log2();
    (h / max).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Default)]
pub struct SigilCa {
    config: CaConfig,
}

impl SigilCa {
    #[must_use]
    pub fn new(config: CaConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.config.width
    }

    fn evolve(
        &self,
        cells: &[u8],
        held: &[bool],
        update_prob: f64,
        rng: &mut ChaCha8Rng,
    ) -> Vec<u8> {
        let n = cells.len();
        (0..n)
            .map(|i| {
                let left = cells[(i + n - 1) % n];
                let right = cells[(i + 1) % n];
                // Draw for every cell so held cells do not shift the stream.
                let fire = rng.r#gen::<f64>() < update_prob;
                if held[i] || !fire {
                    cells[i]
                } else {
                    step_cell(left, cells[i], right, left)
                }
            })
            .collect()
    }
}

fn apply_lesion(
    cells: &mut [u8],
    held: &mut [bool],
    lesion: &ResolvedLesion,
    rng: &mut ChaCha8Rng,
) {
    let range = lesion.half.range(cells.len());
    if lesion.target.hits_genotype() {
        for cell in &mut cells[range.clone()] {
            *cell = match lesion.mode {
                LesionMode::Zero => 0,
                LesionMode::Invert => !*cell,
                LesionMode::Randomize => rng.r#gen::<u8>(),
            };
        }
    }
    if lesion.target.hits_phenotype() {
        for bit in &mut held[range] {
            *bit = match lesion.mode {
                LesionMode::Zero => false,
                LesionMode::Invert => !*bit,
                LesionMode::Randomize => rng.r#gen::<bool>(),
            };
        }
    }
}

impl Simulator for SigilCa {
    type Genotype = Vec<u8>;
    type Phenotype = Vec<bool>;
    type Metrics = CaMetrics;

    fn seed_state(&self, seed: i64) -> SimState<Vec<u8>, Vec<bool>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
        rng.set_stream(SEED_STATE_STREAM);
        SimState {
            genotype: (0..self.config.width).map(|_| rng.r#gen::<u8>()).collect(),
            phenotype: vec![false; self.config.width],
        }
    }

    fn simulate(
        &self,
        state: &SimState<Vec<u8>, Vec<bool>>,
        params: &ControlParams,
        generations: usize,
        seed: i64,
        lesion: Option<&ResolvedLesion>,
    ) -> Result<History<Vec<u8>, Vec<bool>, CaMetrics>, SimulationError> {
        if state.genotype.is_empty() {
            return Err(SimulationError::EmptyState);
        }
        if state.phenotype.len() != state.genotype.len() {
            return Err(SimulationError::Failed(format!(
                "phenotype width {} does not match genotype width {}",
                state.phenotype.len(),
                state.genotype.len()
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
        let mut cells = state.genotype.clone();
        let mut held = state.phenotype.clone();
        let total_bits = (cells.len() * SIGIL_BITS as usize) as f64;
        let mut history = History::new();

        for tick in 0..generations {
            if let Some(l) = lesion.filter(|l| l.tick_offset == tick) {
                apply_lesion(&mut cells, &mut held, l, &mut rng);
            }
            let next = self.evolve(&cells, &held, params.update_prob, &mut rng);
            let flipped: u32 = cells.iter().zip(&next).map(|(a, b)| (a ^ b).count_ones()).sum();
            held = phenotype(&next, params.match_threshold);
            let density = held.iter().filter(|h| **h).count() as f64 / held.len() as f64;
            history.metrics.push(CaMetrics {
                change_rate: f64::from(flipped) / total_bits,
                entropy: sigil_entropy(&next),
                phenotype_density: density,
            });
            cells = next;
            history.genotypes.push(cells.clone());
            history.phenotypes.push(held.clone());
        }
        Ok(history)
    }
}
