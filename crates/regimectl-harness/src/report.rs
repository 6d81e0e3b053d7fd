//! JSON, Markdown and CSV renderings of runs, sweeps and seed rankings.

use std::fmt::Write as _;

use serde::Serialize;

use regimectl_core::{
    Action, AggregateStatistics, ControllerRun, DisagreementReport, Regime, RunStatistics,
};

use crate::sweep::SweepOutcome;

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
    Csv,
}

impl ReportFormat {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Csv => "csv",
        }
    }
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    Ok(body)
}

// ---------------------------------------------------------------------------
// Single run
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunReport<'a> {
    statistics: RunStatistics,
    run: &'a ControllerRun,
}

pub fn render_run(run: &ControllerRun, format: ReportFormat) -> Result<String, serde_json::Error> {
    Ok(match format {
        ReportFormat::Json => to_json(&RunReport {
            statistics: RunStatistics::from_run(run),
            run,
        })?,
        ReportFormat::Markdown => render_run_markdown(run),
        ReportFormat::Csv => render_run_csv(run),
    })
}

#[must_use]
pub fn render_run_markdown(run: &ControllerRun) -> String {
    let stats = RunStatistics::from_run(run);
    let meta = &run.metadata;
    let mut out = String::new();

    writeln!(out, "# Run: {} (seed {})", meta.controller_id, meta.seed).ok();
    writeln!(out).ok();
    writeln!(
        out,
        "- Shape: windows={} window_length={} stride={}",
        meta.windows, meta.window_length, meta.stride
    )
    .ok();
    writeln!(
        out,
        "- Initial params: update_prob={:.2} match_threshold={:.2}",
        meta.initial_params.update_prob, meta.initial_params.match_threshold
    )
    .ok();
    writeln!(out, "- Schedule digest: `{}`", meta.schedule_digest).ok();
    writeln!(out, "- Controller faults: {}", run.faults()).ok();
    writeln!(out).ok();

    writeln!(out, "## Statistics").ok();
    writeln!(out).ok();
    writeln!(out, "| Regime | Fraction | Mean dwell |").ok();
    writeln!(out, "|---|---:|---:|").ok();
    for regime in Regime::ALL {
        writeln!(
            out,
            "| {regime} | {:.3} | {} |",
            stats.fraction(regime),
            fmt_opt(stats.avg_dwell(regime))
        )
        .ok();
    }
    writeln!(out).ok();
    writeln!(
        out,
        "Transitions: {}, regime classes: {}",
        stats.regime_transitions, stats.regime_classes
    )
    .ok();
    writeln!(out).ok();

    writeln!(out, "## Windows").ok();
    writeln!(out).ok();
    writeln!(
        out,
        "| # | Regime | Pressure | Select. | Struct. | Activity | Actions | update_prob | match_threshold | Flags |"
    )
    .ok();
    writeln!(out, "|---:|---|---:|---:|---:|---:|---|---:|---:|---|").ok();
    for w in &run.windows {
        let mut flags = Vec::new();
        if w.applied {
            flags.push("applied");
        }
        if w.stressed {
            flags.push("stressed");
        }
        if w.lesioned {
            flags.push("lesioned");
        }
        if w.fault.is_some() {
            flags.push("fault");
        }
        writeln!(
            out,
            "| {} | {} | {:.3} | {:.3} | {:.3} | {:.3} | {} | {:.2} | {:.2} | {} |",
            w.window_index,
            w.regime(),
            w.window.pressure,
            w.window.selectivity,
            w.window.structure,
            w.window.activity,
            w.actions.label(),
            w.params_after.update_prob,
            w.params_after.match_threshold,
            flags.join(" ")
        )
        .ok();
    }
    out
}

/// One row per window.
#[must_use]
pub fn render_run_csv(run: &ControllerRun) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "controller_id,seed,window_index,regime,pressure,selectivity,structure,activity,actions,\
         update_before,update_after,match_before,match_after,applied,stressed,lesioned,fault"
    )
    .ok();
    for w in &run.windows {
        writeln!(
            out,
            "{},{},{},{},{:.6},{:.6},{:.6},{:.6},{},{:.6},{:.6},{:.6},{:.6},{},{},{},{}",
            csv_field(run.controller_id()),
            run.seed(),
            w.window_index,
            w.regime(),
            w.window.pressure,
            w.window.selectivity,
            w.window.structure,
            w.window.activity,
            w.actions.label(),
            w.params_before.update_prob,
            w.params_after.update_prob,
            w.params_before.match_threshold,
            w.params_after.match_threshold,
            w.applied,
            w.stressed,
            w.lesioned,
            csv_field(w.fault.as_deref().unwrap_or(""))
        )
        .ok();
    }
    out
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

pub fn render_sweep(
    outcome: &SweepOutcome,
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    Ok(match format {
        ReportFormat::Json => to_json(outcome)?,
        ReportFormat::Markdown => render_sweep_markdown(outcome),
        ReportFormat::Csv => render_sweep_csv(outcome),
    })
}

#[must_use]
pub fn render_sweep_markdown(outcome: &SweepOutcome) -> String {
    let mut out = String::new();

    writeln!(out, "# Regime-Control Sweep").ok();
    writeln!(out).ok();
    writeln!(out, "- Controllers: {}", outcome.labels.join(", ")).ok();
    writeln!(
        out,
        "- Seeds: {}",
        outcome
            .seeds
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    )
    .ok();
    writeln!(
        out,
        "- Runs: {} completed, {} failed",
        outcome.entries.len(),
        outcome.failures.len()
    )
    .ok();
    writeln!(out, "- Fingerprint: `{}`", outcome.fingerprint).ok();
    writeln!(out).ok();

    writeln!(out, "## Regimes").ok();
    writeln!(out).ok();
    writeln!(
        out,
        "| Controller | Runs | Freeze | Magma | Ok | Freeze exit | Magma exit | Ok streak | Transitions |"
    )
    .ok();
    writeln!(out, "|---|---:|---:|---:|---:|---:|---:|---:|---:|").ok();
    for label in &outcome.labels {
        if let Some(agg) = outcome.aggregate.get(label) {
            render_aggregate_row(&mut out, label, agg);
        }
    }
    writeln!(out).ok();

    writeln!(out, "## Actions").ok();
    writeln!(out).ok();
    writeln!(
        out,
        "| Controller | Hold | P+ | P- | S+ | S- | Applied | Stressed | Lesioned | Faults |"
    )
    .ok();
    writeln!(out, "|---|---:|---:|---:|---:|---:|---:|---:|---:|---:|").ok();
    for label in &outcome.labels {
        if let Some(agg) = outcome.aggregate.get(label) {
            let t = &agg.actions;
            writeln!(
                out,
                "| {label} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                t.count(Action::Hold),
                t.count(Action::PressureUp),
                t.count(Action::PressureDown),
                t.count(Action::SelectivityUp),
                t.count(Action::SelectivityDown),
                t.applied,
                t.stressed,
                t.lesioned,
                t.faulted
            )
            .ok();
        }
    }
    writeln!(out).ok();

    if !outcome.disagreement.is_empty() {
        writeln!(out, "## Disagreement").ok();
        writeln!(out).ok();
        writeln!(out, "| Left | Right | Seeds | Mean rate | Max rate |").ok();
        writeln!(out, "|---|---|---:|---:|---:|").ok();
        for pair in &outcome.disagreement {
            writeln!(
                out,
                "| {} | {} | {} | {:.3} | {:.3} |",
                pair.left, pair.right, pair.seeds, pair.mean_rate, pair.max_rate
            )
            .ok();
        }
        writeln!(out).ok();
    }

    if !outcome.failures.is_empty() {
        writeln!(out, "## Failures").ok();
        writeln!(out).ok();
        for failure in &outcome.failures {
            writeln!(
                out,
                "- `{}` seed {}: {}",
                failure.label, failure.seed, failure.error
            )
            .ok();
        }
    }
    out
}

fn render_aggregate_row(out: &mut String, label: &str, agg: &AggregateStatistics) {
    writeln!(
        out,
        "| {label} | {} | {:.3} | {:.3} | {:.3} | {} | {} | {} | {} |",
        agg.runs,
        agg.mean_fraction_freeze,
        agg.mean_fraction_magma,
        agg.mean_fraction_ok,
        fmt_opt(agg.avg_freeze_exit),
        fmt_opt(agg.avg_magma_exit),
        fmt_opt(agg.avg_ok_streak),
        agg.regime_transitions
    )
    .ok();
}

/// One row per run.
#[must_use]
pub fn render_sweep_csv(outcome: &SweepOutcome) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "label,controller_id,seed,windows,fraction_freeze,fraction_magma,fraction_ok,\
         avg_freeze_exit,avg_magma_exit,avg_ok_streak,regime_transitions,regime_classes,\
         faults,final_update_prob,final_match_threshold"
    )
    .ok();
    for entry in &outcome.entries {
        let s = &entry.statistics;
        let last = entry.run.final_params();
        writeln!(
            out,
            "{},{},{},{},{:.6},{:.6},{:.6},{},{},{},{},{},{},{:.6},{:.6}",
            csv_field(&entry.label),
            csv_field(entry.run.controller_id()),
            entry.run.seed(),
            s.windows,
            s.fraction_freeze,
            s.fraction_magma,
            s.fraction_ok,
            csv_opt(s.avg_freeze_exit),
            csv_opt(s.avg_magma_exit),
            csv_opt(s.avg_ok_streak),
            s.regime_transitions,
            s.regime_classes,
            entry.run.faults(),
            last.update_prob,
            last.match_threshold
        )
        .ok();
    }
    out
}

// ---------------------------------------------------------------------------
// Disagreement
// ---------------------------------------------------------------------------

pub fn render_ranking(
    ranked: &[DisagreementReport],
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    Ok(match format {
        ReportFormat::Json => to_json(&ranked)?,
        ReportFormat::Markdown => render_ranking_markdown(ranked),
        ReportFormat::Csv => render_ranking_csv(ranked),
    })
}

#[must_use]
pub fn render_ranking_markdown(ranked: &[DisagreementReport]) -> String {
    let mut out = String::new();
    let title = ranked.first().map_or_else(
        || "(no comparable seeds)".to_string(),
        |r| format!("{} vs {}", r.left_controller, r.right_controller),
    );
    writeln!(out, "# Seed Ranking: {title}").ok();
    writeln!(out).ok();
    writeln!(out, "| Rank | Seed | Rate | Mismatches | Windows | First mismatch |").ok();
    writeln!(out, "|---:|---:|---:|---:|---:|---:|").ok();
    for (rank, r) in ranked.iter().enumerate() {
        writeln!(
            out,
            "| {} | {} | {:.3} | {} | {} | {} |",
            rank + 1,
            r.seed,
            r.rate,
            r.mismatches,
            r.windows,
            r.first_mismatch
                .map_or_else(|| "-".to_string(), |i| i.to_string())
        )
        .ok();
    }
    out
}

#[must_use]
pub fn render_ranking_csv(ranked: &[DisagreementReport]) -> String {
    let mut out = String::new();
    writeln!(out, "rank,left,right,seed,rate,mismatches,windows,first_mismatch").ok();
    for (rank, r) in ranked.iter().enumerate() {
        writeln!(
            out,
            "{},{},{},{},{:.6},{},{},{}",
            rank + 1,
            csv_field(&r.left_controller),
            csv_field(&r.right_controller),
            r.seed,
            r.rate,
            r.mismatches,
            r.windows,
            r.first_mismatch.map(|i| i.to_string()).unwrap_or_default()
        )
        .ok();
    }
    out
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn csv_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
