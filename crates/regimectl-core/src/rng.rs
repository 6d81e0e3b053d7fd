//! Per-run deterministic random streams.
//!
//! Every run owns its generators; nothing is shared across runs. The run seed
//! feeds a ChaCha8 key, and independent ChaCha streams are carved out for the
//! simulation seeds and for the controller, so the sequence of simulation
//! seeds is identical for any two runs with the same seed, whatever
//! controllers they use.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Stream id for per-window simulation seeds.
const SIMULATION_STREAM: u64 = 0x5349_4D55; // "SIMU"
/// Stream id for controller-owned randomness.
const CONTROLLER_STREAM: u64 = 0x4354_524C; // "CTRL"

fn keyed(seed: i64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    rng.set_stream(stream);
    rng
}

/// Generator of per-window simulation seeds.
#[derive(Debug, Clone)]
pub struct SeedStream {
    rng: ChaCha8Rng,
}

impl SeedStream {
    #[must_use]
    pub fn new(run_seed: i64) -> Self {
        Self {
            rng: keyed(run_seed, SIMULATION_STREAM),
        }
    }

    /// Seed for the next window's simulation call.
    pub fn next_seed(&mut self) -> i64 {
        self.rng.r#gen::<i64>()
    }
}

/// Controller-owned generator for the run.
#[must_use]
pub fn controller_rng(run_seed: i64) -> ChaCha8Rng {
    keyed(run_seed, CONTROLLER_STREAM)
}
