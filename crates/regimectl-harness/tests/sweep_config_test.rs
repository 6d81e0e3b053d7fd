//! Integration test: the shipped sweep configs load, run and log cleanly.

use std::path::{Path, PathBuf};

use regimectl_core::Action;
use regimectl_harness::report::{self, ReportFormat};
use regimectl_harness::structured_log::{LogEmitter, validate_log_file};
use regimectl_harness::{HarnessConfig, Sweep};

fn configs_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("configs")
}

fn load(name: &str) -> HarnessConfig {
    HarnessConfig::load(&configs_dir().join(name)).expect("config loads")
}

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("regimectl-{}", std::process::id()))
        .join(name)
}

#[test]
fn default_sweep_config_runs_every_controller() {
    let mut config = load("sweep.json");
    config.windows = 6;
    config.seeds = vec![1, 2];
    let outcome = Sweep::new(&config).expect("controllers build").run();

    assert!(outcome.all_passed(), "{:?}", outcome.failures);
    assert_eq!(
        outcome.labels,
        vec!["null", "hex", "sigil", "sigil-wide", "wiring", "freeze-guard"]
    );
    assert_eq!(outcome.entries.len(), 12);
    for entry in &outcome.entries {
        assert_eq!(entry.run.len(), 6);
        assert_eq!(entry.run.faults(), 0, "{}", entry.label);
    }

    // The freeze guard only ever pushes pressure up, and only on frozen windows.
    for seed in [1, 2] {
        let run = outcome.run("freeze-guard", seed).expect("run present");
        for w in &run.windows {
            if w.chose(Action::PressureUp) {
                assert_eq!(w.regime(), regimectl_core::Regime::Freeze);
            } else {
                assert!(w.actions.is_hold());
            }
        }
    }
}

#[test]
fn lesion_recovery_config_applies_disturbances() {
    let config = load("lesion_recovery.json");
    assert_eq!(config.stride(), config.window_length);
    let outcome = Sweep::new(&config).expect("controllers build").run();
    assert!(outcome.all_passed(), "{:?}", outcome.failures);

    for entry in &outcome.entries {
        let run = &entry.run;
        let lesioned: Vec<usize> = run
            .windows
            .iter()
            .filter(|w| w.lesioned)
            .map(|w| w.window_index)
            .collect();
        assert_eq!(lesioned, vec![10, 20], "{}", entry.label);
        for index in [14, 15] {
            let w = &run.windows[index];
            assert!(w.stressed);
            assert_eq!(w.params_after.update_prob, 1.0);
            assert_eq!(w.params_after.match_threshold, 0.0);
        }
    }

    // Same seed and schedule: every pair of controllers is comparable.
    let ranked = outcome.rank_seeds("null", "cooler").expect("labels exist");
    assert_eq!(ranked.len(), 2);
    assert!(ranked[0].rate >= ranked[1].rate);
}

#[test]
fn logged_sweep_produces_a_valid_log_file() {
    let mut config = load("lesion_recovery.json");
    config.windows = 12;
    let sweep = Sweep::new(&config).expect("controllers build");
    let path = scratch("sweep.log.jsonl");
    let mut log = LogEmitter::to_file(&path, "sweep-it").expect("log file");
    let outcome = sweep.run_logged(&mut log).expect("sweep logs");
    drop(log);

    let (lines, errors) = validate_log_file(&path).expect("log readable");
    assert!(errors.is_empty(), "{errors:?}");
    // sweep_start + per run (1 lesion + 1 completion) + sweep_complete
    assert_eq!(lines, 2 + outcome.entries.len() * 2);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn reports_render_in_every_format() {
    let mut config = load("sweep.json");
    config.windows = 4;
    config.seeds = vec![7];
    let outcome = Sweep::new(&config).expect("controllers build").run();
    for format in [ReportFormat::Json, ReportFormat::Markdown, ReportFormat::Csv] {
        let body = report::render_sweep(&outcome, format).expect("renders");
        assert!(!body.is_empty(), "{}", format.as_str());
    }
    let csv = report::render_sweep_csv(&outcome);
    assert_eq!(csv.lines().count(), 1 + outcome.labels.len());
}

#[test]
fn missing_config_file_is_reported_with_its_path() {
    let err = HarnessConfig::load(&configs_dir().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"), "{err}");
}
