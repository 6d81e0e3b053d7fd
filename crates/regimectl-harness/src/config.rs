//! Harness configuration.
//!
//! A sweep is described by one JSON file:
//!
//! ```text
//! {
//!   "windows": 40, "window_length": 16, "stride": 16,
//!   "seeds": [1, 2, 3],
//!   "initial": {"update_prob": 0.5},
//!   "controllers": [
//!     {"kind": "null"},
//!     {"kind": "hex"},
//!     {"kind": "sigil", "alphabet_size": 12},
//!     {"kind": "wiring", "diagram_path": "diagrams/freeze_guard.json",
//!      "action_list": ["PressureUp", "PressureDown"], "label": "guard"}
//!   ],
//!   "disturbances": {"lesions": [...], "stress": {...}},
//!   "simulator": {"width": 64},
//!   "feed": {"freeze_below": 0.05, "magma_above": 0.45},
//!   "workers": 4
//! }
//! ```
//!
//! Relative paths resolve against the config file's directory. The
//! environment may override part of the run shape:
//!
//! | variable | effect |
//! |---|---|
//! | `REGIMECTL_WINDOWS` | window count |
//! | `REGIMECTL_SEEDS` | seed list, e.g. `1,2,0x10` or `0..8` |
//! | `REGIMECTL_WORKERS` | worker threads |
//!
//! Unparseable override values are ignored.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use regimectl_core::{ConfigError, DisturbanceSchedule, PartialParams, RunConfig};
use regimectl_sim::{CaConfig, SummaryFeed};

use crate::error::HarnessError;

pub const ENV_WINDOWS: &str = "REGIMECTL_WINDOWS";
pub const ENV_SEEDS: &str = "REGIMECTL_SEEDS";
pub const ENV_WORKERS: &str = "REGIMECTL_WORKERS";

/// Which controller to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ControllerKind {
    Null,
    Hex,
    Sigil {
        /// JSON array of bit strings; the built-in alphabet when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alphabet_path: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alphabet_size: Option<usize>,
    },
    Wiring {
        diagram_path: PathBuf,
        /// Action names, parsed loosely.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action_list: Option<Vec<String>>,
    },
}

impl ControllerKind {
    /// Controller id the built controller reports.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Hex => "hex",
            Self::Sigil { .. } => "sigil",
            Self::Wiring { .. } => "wiring",
        }
    }
}

/// One controller entry of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSpec {
    /// Distinguishes two entries of the same kind in reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub kind: ControllerKind,
}

impl ControllerSpec {
    #[must_use]
    pub fn new(kind: ControllerKind) -> Self {
        Self { label: None, kind }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.kind.id())
    }
}

/// Full sweep configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_windows")]
    pub windows: usize,
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    /// Feed stride; `window_length` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<usize>,
    #[serde(default = "default_seeds")]
    pub seeds: Vec<i64>,
    #[serde(default)]
    pub initial: PartialParams,
    #[serde(default = "default_controllers")]
    pub controllers: Vec<ControllerSpec>,
    #[serde(default)]
    pub disturbances: DisturbanceSchedule,
    #[serde(default)]
    pub simulator: CaConfig,
    #[serde(default)]
    pub feed: SummaryFeed,
    /// Worker threads; available parallelism when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Directory relative paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_windows() -> usize {
    20
}

fn default_window_length() -> usize {
    16
}

fn default_seeds() -> Vec<i64> {
    vec![0]
}

fn default_controllers() -> Vec<ControllerSpec> {
    vec![
        ControllerSpec::new(ControllerKind::Null),
        ControllerSpec::new(ControllerKind::Hex),
        ControllerSpec::new(ControllerKind::Sigil {
            alphabet_path: None,
            alphabet_size: None,
        }),
    ]
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            windows: default_windows(),
            window_length: default_window_length(),
            stride: None,
            seeds: default_seeds(),
            initial: PartialParams::default(),
            controllers: default_controllers(),
            disturbances: DisturbanceSchedule::none(),
            simulator: CaConfig::default(),
            feed: SummaryFeed::default(),
            workers: None,
            base_dir: PathBuf::from("."),
        }
    }
}

impl HarnessConfig {
    /// Parse and validate a config whose relative paths resolve against `base_dir`.
    pub fn from_json_str(json: &str, base_dir: &Path) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        config.base_dir = base_dir.to_path_buf();
        Ok(config)
    }

    /// Load a config file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let mut config =
            Self::from_json_str(&text, &base_dir).map_err(|source| HarnessError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup` (keyed by the `REGIMECTL_*` names).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(windows) = lookup(ENV_WINDOWS).and_then(|raw| parse_count(&raw)) {
            self.windows = windows;
        }
        if let Some(seeds) = lookup(ENV_SEEDS).and_then(|raw| parse_seed_list(&raw)) {
            self.seeds = seeds;
        }
        if let Some(workers) = lookup(ENV_WORKERS).and_then(|raw| parse_count(&raw)) {
            self.workers = Some(workers);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run_config(0).validate()?;
        self.disturbances.validate()?;
        if self.seeds.is_empty() {
            return Err(ConfigError::InvalidRunConfig("no seeds configured".into()));
        }
        if self.controllers.is_empty() {
            return Err(ConfigError::InvalidRunConfig(
                "no controllers configured".into(),
            ));
        }
        let mut seeds = BTreeSet::new();
        if let Some(seed) = self.seeds.iter().find(|&&seed| !seeds.insert(seed)) {
            return Err(ConfigError::InvalidRunConfig(format!(
                "seed {seed} listed twice"
            )));
        }
        let mut labels = BTreeSet::new();
        if let Some(spec) = self.controllers.iter().find(|c| !labels.insert(c.label())) {
            return Err(ConfigError::InvalidRunConfig(format!(
                "controller label '{}' used twice",
                spec.label()
            )));
        }
        if self.simulator.width == 0 {
            return Err(ConfigError::InvalidRunConfig(
                "simulator width must be > 0".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride.unwrap_or(self.window_length)
    }

    /// Run shape for one seed.
    #[must_use]
    pub fn run_config(&self, seed: i64) -> RunConfig {
        RunConfig::new(self.windows, self.window_length, self.stride(), seed)
            .with_initial(self.initial)
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers
            .or_else(|| std::thread::available_parallelism().ok().map(usize::from))
            .unwrap_or(1)
            .max(1)
    }

    /// Resolve a config-relative path.
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Parse a seed: decimal (optionally negative) or `0x` hex, `_` separators allowed.
///
/// Hex seeds are read as 64-bit patterns and may come out negative.
#[must_use]
pub fn parse_seed(raw: &str) -> Option<i64> {
    let s = raw.trim().replace('_', "");
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok().map(|v| v as i64)
    } else {
        s.parse::<i64>().ok()
    }
}

/// Parse `a,b,c` or a half-open range `lo..hi`. Empty or invalid input yields `None`.
#[must_use]
pub fn parse_seed_list(raw: &str) -> Option<Vec<i64>> {
    let raw = raw.trim();
    if let Some((lo, hi)) = raw.split_once("..") {
        let (lo, hi) = (parse_seed(lo)?, parse_seed(hi)?);
        return (lo < hi).then(|| (lo..hi).collect());
    }
    let seeds: Option<Vec<i64>> = raw
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_seed)
        .collect();
    seeds.filter(|s| !s.is_empty())
}

fn parse_count(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_object_takes_defaults() {
        let config = HarnessConfig::from_json_str("{}", Path::new("/cfg")).unwrap();
        assert_eq!(config.windows, 20);
        assert_eq!(config.stride(), 16);
        assert_eq!(config.seeds, vec![0]);
        assert_eq!(config.controllers.len(), 3);
        assert_eq!(config.simulator.width, 64);
        assert!(config.disturbances.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn controller_specs_parse_by_kind() {
        let json = r#"{
            "controllers": [
                {"kind": "hex"},
                {"kind": "sigil", "alphabet_size": 8},
                {"kind": "wiring", "diagram_path": "d.json", "action_list": ["pressure-up", "Hold"], "label": "guard"}
            ]
        }"#;
        let config = HarnessConfig::from_json_str(json, Path::new("/cfg")).unwrap();
        assert_eq!(config.controllers[0].label(), "hex");
        assert_eq!(
            config.controllers[1].kind,
            ControllerKind::Sigil {
                alphabet_path: None,
                alphabet_size: Some(8)
            }
        );
        assert_eq!(config.controllers[2].label(), "guard");
        assert_eq!(config.controllers[2].kind.id(), "wiring");
        assert_eq!(
            config.resolve_path(Path::new("d.json")),
            PathBuf::from("/cfg/d.json")
        );
    }

    #[test]
    fn unknown_controller_kind_is_rejected() {
        let json = r#"{"controllers": [{"kind": "oracle"}]}"#;
        assert!(HarnessConfig::from_json_str(json, Path::new(".")).is_err());
    }

    #[test]
    fn validation_rejects_empty_shapes() {
        let mut config = HarnessConfig {
            stride: Some(0),
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
        config.stride = None;
        config.seeds.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_lesions_fail_validation() {
        let json = r#"{"disturbances": {"lesions": [{"window_index": 3}, {"window_index": 3}]}}"#;
        let config = HarnessConfig::from_json_str(json, Path::new(".")).unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateLesion { window_index: 3 })
        );
    }

    #[test]
    fn forced_params_out_of_range_fail_validation() {
        let json = r#"{"disturbances": {"stress": {
            "window_indices": [1],
            "forced_params": {"update_prob": 5.0, "match_threshold": -2.0}
        }}}"#;
        let config = HarnessConfig::from_json_str(json, Path::new(".")).unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigError::ForcedParamsOutOfRange {
                update_prob: 5.0,
                match_threshold: -2.0
            })
        );
    }

    #[test]
    fn repeated_controller_labels_fail_validation() {
        let json = r#"{"controllers": [{"kind": "sigil"}, {"kind": "sigil", "alphabet_size": 1}]}"#;
        let config = HarnessConfig::from_json_str(json, Path::new(".")).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'sigil' used twice"), "{err}");

        let relabelled = r#"{"controllers": [
            {"kind": "sigil"},
            {"kind": "sigil", "alphabet_size": 1, "label": "sigil-1"}
        ]}"#;
        let config = HarnessConfig::from_json_str(relabelled, Path::new(".")).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn repeated_seeds_fail_validation() {
        let json = r#"{"seeds": [1, 2, 1]}"#;
        let config = HarnessConfig::from_json_str(json, Path::new(".")).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("seed 1 listed twice"), "{err}");
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = [
            (ENV_WINDOWS, "7"),
            (ENV_SEEDS, "1, 2,0x10"),
            (ENV_WORKERS, "zero"),
        ]
        .into_iter()
        .collect();
        let mut config = HarnessConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.windows, 7);
        assert_eq!(config.seeds, vec![1, 2, 16]);
        assert_eq!(config.workers, None);

        config.apply_overrides(|key| (key == ENV_WINDOWS).then(|| "0".to_string()));
        assert_eq!(config.windows, 7);
    }

    #[test]
    fn seed_lists_and_ranges() {
        assert_eq!(parse_seed_list("0..4"), Some(vec![0, 1, 2, 3]));
        assert_eq!(parse_seed_list("-2,5"), Some(vec![-2, 5]));
        assert_eq!(parse_seed_list("4..4"), None);
        assert_eq!(parse_seed_list(""), None);
        assert_eq!(parse_seed_list("1,x"), None);
        assert_eq!(parse_seed("0xDEAD_BEEF"), Some(0xDEAD_BEEF));
    }
}
