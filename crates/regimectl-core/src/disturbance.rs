//! Scheduled disturbances: lesions and stress overrides.
//!
//! Both mechanisms are purely window-indexed and read-only. A lesion is handed
//! to the simulation call of exactly one window; a stress override replaces the
//! adapter output of every listed window. Indices past the end of the run are
//! accepted and simply never fire.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ConfigError;
use crate::params::ControlParams;

/// What a lesion does to the targeted cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LesionMode {
    /// Clear the cells.
    #[default]
    Zero,
    /// Bitwise-invert the cells.
    Invert,
    /// Overwrite from the simulation's seeded stream.
    Randomize,
}

/// Which layer of the simulated state a lesion touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LesionTarget {
    Genotype,
    Phenotype,
    #[default]
    Both,
}

impl LesionTarget {
    #[must_use]
    pub const fn hits_genotype(self) -> bool {
        matches!(self, Self::Genotype | Self::Both)
    }

    #[must_use]
    pub const fn hits_phenotype(self) -> bool {
        matches!(self, Self::Phenotype | Self::Both)
    }
}

/// Which half of the cell array a lesion touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LesionHalf {
    #[default]
    Left,
    Right,
}

impl LesionHalf {
    /// Cell index range covered in an array of `width` cells.
    #[must_use]
    pub fn range(self, width: usize) -> std::ops::Range<usize> {
        let mid = width / 2;
        match self {
            Self::Left => 0..mid,
            Self::Right => mid..width,
        }
    }
}

/// A lesion as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lesion {
    pub window_index: usize,
    /// Generation offset inside the window; `None` means mid-window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_offset: Option<usize>,
    #[serde(default)]
    pub mode: LesionMode,
    #[serde(default)]
    pub target: LesionTarget,
    #[serde(default)]
    pub half: LesionHalf,
}

impl Lesion {
    /// Resolve against a window length: default tick is `window_length / 2`,
    /// and any offset is clamped into the window.
    #[must_use]
    pub fn resolve(&self, window_length: usize) -> ResolvedLesion {
        let last = window_length.saturating_sub(1);
        let tick = self.tick_offset.unwrap_or(window_length / 2).min(last);
        ResolvedLesion {
            tick_offset: tick,
            mode: self.mode,
            target: self.target,
            half: self.half,
        }
    }
}

/// A lesion ready for one simulation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedLesion {
    pub tick_offset: usize,
    pub mode: LesionMode,
    pub target: LesionTarget,
    pub half: LesionHalf,
}

/// Forced parameters for a set of windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSchedule {
    pub window_indices: BTreeSet<usize>,
    pub forced_params: ControlParams,
}

/// Disturbance configuration for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisturbanceSchedule {
    #[serde(default)]
    lesions: Vec<Lesion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stress: Option<StressSchedule>,
}

impl DisturbanceSchedule {
    /// A schedule that never fires.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a schedule, rejecting two lesions on the same window and forced
    /// params outside the adapter's bounds.
    pub fn new(
        lesions: Vec<Lesion>,
        stress: Option<StressSchedule>,
    ) -> Result<Self, ConfigError> {
        let schedule = Self { lesions, stress };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Re-check invariants (used after deserialization).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for lesion in &self.lesions {
            if !seen.insert(lesion.window_index) {
                return Err(ConfigError::DuplicateLesion {
                    window_index: lesion.window_index,
                });
            }
        }
        if let Some(stress) = &self.stress {
            let forced = stress.forced_params;
            if !forced.in_bounds() {
                return Err(ConfigError::ForcedParamsOutOfRange {
                    update_prob: forced.update_prob,
                    match_threshold: forced.match_threshold,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn lesions(&self) -> &[Lesion] {
        &self.lesions
    }

    #[must_use]
    pub fn stress(&self) -> Option<&StressSchedule> {
        self.stress.as_ref()
    }

    /// Lesion for `window_index`, resolved against `window_length`.
    #[must_use]
    pub fn lesion_for(&self, window_index: usize, window_length: usize) -> Option<ResolvedLesion> {
        self.lesions
            .iter()
            .find(|l| l.window_index == window_index)
            .map(|l| l.resolve(window_length))
    }

    /// Forced params for `window_index`, if it is stressed.
    #[must_use]
    pub fn stress_for(&self, window_index: usize) -> Option<ControlParams> {
        self.stress
            .as_ref()
            .filter(|s| s.window_indices.contains(&window_index))
            .map(|s| s.forced_params)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lesions.is_empty() && self.stress.as_ref().is_none_or(|s| s.window_indices.is_empty())
    }

    /// SHA-256 over a canonical form of the schedule (lesions sorted by window).
    ///
    /// Two runs are comparable window by window only when their digests match.
    #[must_use]
    pub fn digest(&self) -> String {
        let lesions: BTreeMap<usize, &Lesion> =
            self.lesions.iter().map(|l| (l.window_index, l)).collect();
        let canonical = serde_json::json!({
            "lesions": lesions.values().collect::<Vec<_>>(),
            "stress": self.stress,
        });
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        hex_encode(&hasher.finalize())
    }
}

fn hex_encode(buf: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(buf.len() * 2);
    for b in buf {
        write!(out, "{b:02x}").ok();
    }
    out
}
