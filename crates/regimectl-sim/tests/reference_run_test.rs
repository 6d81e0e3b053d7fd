//! Integration test: every controller against the reference automaton and feed.

use std::sync::Arc;

use regimectl_core::{
    Controller, ControlParams, DiagramInterpreted, DisturbanceSchedule, Lesion, LesionHalf,
    LesionMode, LesionTarget, NullController, RunConfig, RunStatistics, SymbolLookup,
    ThresholdController, compare_runs, run_controller,
};
use regimectl_sim::{CaConfig, SigilCa, SummaryFeed, WiringDiagram, default_alphabet};

const SCORE_BY_ACTIVITY: &str = r#"{
    "meta": {"id": "activity-score"},
    "diagram": {
        "nodes": [
            {"id": "a", "component": "input-activity"},
            {"id": "w", "component": "weighted-sum", "weights": [2.0]},
            {"id": "output", "component": "output-score"}
        ],
        "edges": [
            {"from": "a", "to": "w"},
            {"from": "w", "to": "output"}
        ]
    }
}"#;

fn controllers() -> Vec<Box<dyn Controller>> {
    let diagram = WiringDiagram::from_json(SCORE_BY_ACTIVITY).expect("valid diagram");
    vec![
        Box::new(NullController),
        Box::new(ThresholdController),
        Box::new(SymbolLookup::new(Arc::new(default_alphabet())).expect("non-empty")),
        Box::new(DiagramInterpreted::new(Arc::new(diagram))),
    ]
}

fn config(seed: i64) -> RunConfig {
    RunConfig::new(10, 12, 12, seed)
}

#[test]
fn all_controllers_complete_within_bounds() {
    let sim = SigilCa::new(CaConfig { width: 32 });
    let feed = SummaryFeed::default();
    let schedule = DisturbanceSchedule::none();
    for controller in controllers() {
        let run = run_controller(config(3), &sim, &feed, controller.as_ref(), &schedule)
            .expect("run completes");
        assert_eq!(run.len(), 10);
        assert_eq!(run.faults(), 0, "{}", controller.id());
        for w in &run.windows {
            assert!(!w.actions.is_empty());
            assert!(w.params_after.in_bounds());
            assert_eq!(w.window.len(), 12);
        }
        let stats = RunStatistics::from_run(&run);
        let total = stats.fraction_freeze + stats.fraction_magma + stats.fraction_ok;
        assert!((total - 1.0).abs() < 1e-9);
    }
}

#[test]
fn runs_are_reproducible() {
    let sim = SigilCa::default();
    let feed = SummaryFeed::default();
    let schedule = DisturbanceSchedule::none();
    let a = run_controller(config(17), &sim, &feed, &ThresholdController, &schedule)
        .expect("run completes");
    let b = run_controller(config(17), &sim, &feed, &ThresholdController, &schedule)
        .expect("run completes");
    assert_eq!(a, b);
}

#[test]
fn null_controller_never_drifts() {
    let sim = SigilCa::default();
    let feed = SummaryFeed::default();
    let schedule = DisturbanceSchedule::none();
    let run = run_controller(config(5), &sim, &feed, &NullController, &schedule)
        .expect("run completes");
    assert!(run.windows.iter().all(|w| w.params_after == ControlParams::default()));
}

#[test]
fn controller_compared_with_itself_agrees() {
    let sim = SigilCa::default();
    let feed = SummaryFeed::default();
    let schedule = DisturbanceSchedule::none();
    let alphabet = Arc::new(default_alphabet());
    let left = SymbolLookup::new(alphabet.clone()).expect("non-empty");
    let right = SymbolLookup::new(alphabet).expect("non-empty");
    let a = run_controller(config(9), &sim, &feed, &left, &schedule).expect("run completes");
    let b = run_controller(config(9), &sim, &feed, &right, &schedule).expect("run completes");
    let report = compare_runs(&a, &b).expect("comparable");
    assert_eq!(report.rate, 0.0);
}

#[test]
fn lesion_perturbs_only_from_its_window_on() {
    let sim = SigilCa::new(CaConfig { width: 48 });
    let feed = SummaryFeed::default();
    let clean = DisturbanceSchedule::none();
    let lesioned = DisturbanceSchedule::new(
        vec![Lesion {
            window_index: 4,
            tick_offset: None,
            mode: LesionMode::Zero,
            target: LesionTarget::Both,
            half: LesionHalf::Left,
        }],
        None,
    )
    .expect("valid");

    let a = run_controller(config(2), &sim, &feed, &NullController, &clean).expect("clean run");
    let b = run_controller(config(2), &sim, &feed, &NullController, &lesioned)
        .expect("lesioned run");
    assert_eq!(a.windows[..4], b.windows[..4]);
    assert!(b.windows[4].lesioned);
    assert_ne!(a.windows[4].window, b.windows[4].window);
    assert!(compare_runs(&a, &b).is_err(), "different schedules are not comparable");
}
