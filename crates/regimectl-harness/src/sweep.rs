//! Parallel multi-seed sweeps.
//!
//! Every `(seed, controller)` pair is one job. Jobs are drained from a shared
//! queue by a scoped worker pool; each job owns its simulator state and RNG
//! streams, so workers share nothing mutable beyond the queue and the result
//! list. Results are sorted by `(seed, label)` before anything reads them,
//! which keeps reports, logs and the sweep fingerprint independent of
//! scheduling.

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use regimectl_core::{
    AggregateStatistics, ControllerRun, DisagreementReport, RunError, RunStatistics,
    compare_runs, run_controller,
};
use regimectl_sim::SigilCa;

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::factory::{NamedController, build_controllers};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};

/// One `(seed, controller)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub seed: i64,
    /// Index into the sweep's controllers.
    pub controller: usize,
}

/// A finished run with its label and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub label: String,
    pub duration_ms: u64,
    pub statistics: RunStatistics,
    pub run: ControllerRun,
}

/// A run that was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub label: String,
    pub seed: i64,
    pub error: String,
}

/// Mean and worst disagreement of one controller pair across seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDisagreement {
    pub left: String,
    pub right: String,
    pub seeds: usize,
    pub mean_rate: f64,
    pub max_rate: f64,
}

/// Everything a sweep produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    /// Controller labels in configuration order.
    pub labels: Vec<String>,
    pub seeds: Vec<i64>,
    pub entries: Vec<SweepEntry>,
    pub failures: Vec<SweepFailure>,
    /// Per label, over every seed.
    pub aggregate: BTreeMap<String, AggregateStatistics>,
    pub disagreement: Vec<PairDisagreement>,
    /// SHA-256 over the serialized runs.
    pub fingerprint: String,
}

impl SweepOutcome {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn run(&self, label: &str, seed: i64) -> Option<&ControllerRun> {
        self.entries
            .iter()
            .find(|e| e.label == label && e.run.seed() == seed)
            .map(|e| &e.run)
    }

    fn runs_for<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a ControllerRun> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.label == label)
            .map(|e| &e.run)
    }

    fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Compare two controllers on one seed. Reports carry sweep labels.
    pub fn compare(
        &self,
        left: &str,
        right: &str,
        seed: i64,
    ) -> Result<Option<DisagreementReport>, HarnessError> {
        for label in [left, right] {
            if !self.has_label(label) {
                return Err(HarnessError::UnknownController(label.to_string()));
            }
        }
        let (Some(a), Some(b)) = (self.run(left, seed), self.run(right, seed)) else {
            return Ok(None);
        };
        let mut report = compare_runs(a, b)?;
        report.left_controller = left.to_string();
        report.right_controller = right.to_string();
        Ok(Some(report))
    }

    /// Seeds ordered by how much `left` and `right` disagree on them:
    /// highest rate first, ties by ascending seed. Seeds where either run
    /// failed are skipped.
    pub fn rank_seeds(
        &self,
        left: &str,
        right: &str,
    ) -> Result<Vec<DisagreementReport>, HarnessError> {
        let mut ranked = Vec::new();
        for &seed in &self.seeds {
            if let Some(report) = self.compare(left, right, seed)? {
                ranked.push(report);
            }
        }
        ranked.sort_by(|a, b| b.rate.total_cmp(&a.rate).then(a.seed.cmp(&b.seed)));
        Ok(ranked)
    }
}

/// A configured sweep, ready to run.
pub struct Sweep<'a> {
    config: &'a HarnessConfig,
    controllers: Vec<NamedController>,
    simulator: SigilCa,
}

impl<'a> Sweep<'a> {
    /// Validate `config` and build its controllers.
    pub fn new(config: &'a HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        let controllers = build_controllers(config)?;
        Ok(Self::with_controllers(config, controllers))
    }

    /// Sweep over already-built controllers; `config.controllers` is ignored.
    #[must_use]
    pub fn with_controllers(config: &'a HarnessConfig, controllers: Vec<NamedController>) -> Self {
        Self {
            config,
            controllers,
            simulator: SigilCa::new(config.simulator),
        }
    }

    #[must_use]
    pub fn controllers(&self) -> &[NamedController] {
        &self.controllers
    }

    /// Seed-major job list.
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.config
            .seeds
            .iter()
            .flat_map(|&seed| {
                (0..self.controllers.len()).map(move |controller| Job { seed, controller })
            })
            .collect()
    }

    /// Run a single job on the calling thread.
    pub fn run_job(&self, job: Job) -> Result<ControllerRun, RunError> {
        let named = &self.controllers[job.controller];
        run_controller(
            self.config.run_config(job.seed),
            &self.simulator,
            &self.config.feed,
            named.controller.as_ref(),
            &self.config.disturbances,
        )
    }

    /// Run the controller labelled `label` on `seed`, on the calling thread.
    pub fn run_one(&self, label: &str, seed: i64) -> Result<ControllerRun, HarnessError> {
        let controller = self
            .controllers
            .iter()
            .position(|c| c.label == label)
            .ok_or_else(|| HarnessError::UnknownController(label.to_string()))?;
        self.run_job(Job { seed, controller })
            .map_err(|source| HarnessError::Run {
                controller: label.to_string(),
                seed,
                source,
            })
    }

    pub fn run(&self) -> SweepOutcome {
        let jobs = self.jobs();
        let workers = self.config.worker_count().min(jobs.len()).max(1);
        let total = jobs.len();
        let queue = Mutex::new(jobs.into_iter().collect::<VecDeque<_>>());
        let results: Mutex<Vec<(Job, u64, Result<ControllerRun, RunError>)>> =
            Mutex::new(Vec::with_capacity(total));

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let next = queue.lock().pop_front();
                        let Some(job) = next else { break };
                        let started = Instant::now();
                        let result = self.run_job(job);
                        let elapsed = started.elapsed().as_millis() as u64;
                        results.lock().push((job, elapsed, result));
                    }
                });
            }
        });

        let mut results = results.into_inner();
        results.sort_by(|(a, _, _), (b, _, _)| {
            a.seed
                .cmp(&b.seed)
                .then_with(|| {
                    self.controllers[a.controller]
                        .label
                        .cmp(&self.controllers[b.controller].label)
                })
                .then(a.controller.cmp(&b.controller))
        });
        self.collect(results)
    }

    fn collect(&self, results: Vec<(Job, u64, Result<ControllerRun, RunError>)>) -> SweepOutcome {
        let labels: Vec<String> = self.controllers.iter().map(|c| c.label.clone()).collect();
        let mut entries = Vec::new();
        let mut failures = Vec::new();
        for (job, duration_ms, result) in results {
            let label = labels[job.controller].clone();
            match result {
                Ok(run) => entries.push(SweepEntry {
                    label,
                    duration_ms,
                    statistics: RunStatistics::from_run(&run),
                    run,
                }),
                Err(err) => failures.push(SweepFailure {
                    label,
                    seed: job.seed,
                    error: err.to_string(),
                }),
            }
        }

        let mut outcome = SweepOutcome {
            labels,
            seeds: self.config.seeds.clone(),
            entries,
            failures,
            aggregate: BTreeMap::new(),
            disagreement: Vec::new(),
            fingerprint: String::new(),
        };
        outcome.aggregate = outcome
            .labels
            .iter()
            .map(|label| {
                let stats = AggregateStatistics::from_runs(outcome.runs_for(label));
                (label.clone(), stats)
            })
            .collect();
        outcome.disagreement = pairwise(&outcome);
        outcome.fingerprint = fingerprint(&outcome.entries);
        outcome
    }

    /// Run the sweep and log it to `log`.
    pub fn run_logged(&self, log: &mut LogEmitter) -> Result<SweepOutcome, HarnessError> {
        log.set_job("sweep");
        log.emit_entry(
            LogEntry::new("", LogLevel::Info, "sweep_start").with_details(serde_json::json!({
                "jobs": self.config.seeds.len() * self.controllers.len(),
                "workers": self.config.worker_count(),
                "seeds": self.config.seeds,
                "controllers": self.controllers.iter().map(|c| c.label.as_str()).collect::<Vec<_>>(),
                "windows": self.config.windows,
                "window_length": self.config.window_length,
                "stride": self.config.stride(),
                "schedule_digest": self.config.disturbances.digest(),
            })),
        )?;

        let started = Instant::now();
        let outcome = self.run();

        for entry in &outcome.entries {
            log_entry(log, entry)?;
        }
        for failure in &outcome.failures {
            log.set_job(format!("{}-s{}", failure.label, failure.seed));
            log.emit_entry(
                LogEntry::new("", LogLevel::Error, "run_failed")
                    .with_run(&failure.label, failure.seed)
                    .with_outcome(Outcome::Error)
                    .with_details(serde_json::json!({"error": failure.error})),
            )?;
        }

        log.set_job("sweep");
        let outcome_tag = if outcome.all_passed() {
            Outcome::Pass
        } else {
            Outcome::Fail
        };
        log.emit_entry(
            LogEntry::new("", LogLevel::Info, "sweep_complete")
                .with_outcome(outcome_tag)
                .with_duration_ms(started.elapsed().as_millis() as u64)
                .with_details(serde_json::json!({
                    "runs": outcome.entries.len(),
                    "failures": outcome.failures.len(),
                    "fingerprint": outcome.fingerprint,
                })),
        )?;
        log.flush()?;
        Ok(outcome)
    }
}

fn log_entry(log: &mut LogEmitter, entry: &SweepEntry) -> std::io::Result<()> {
    let run = &entry.run;
    log.set_job(format!("{}-s{}", entry.label, run.seed()));

    for w in &run.windows {
        let base = |level, event: &str| {
            LogEntry::new("", level, event)
                .with_run(&entry.label, run.seed())
                .with_window(w.window_index, w.regime(), w.actions.actions())
        };
        if let Some(fault) = &w.fault {
            log.emit_entry(
                base(LogLevel::Warn, "controller_fault")
                    .with_details(serde_json::json!({"fault": fault})),
            )?;
        }
        if w.lesioned {
            log.emit_entry(base(LogLevel::Info, "window_lesioned"))?;
        }
        if w.stressed {
            log.emit_entry(base(LogLevel::Info, "window_stressed").with_details(
                serde_json::json!({
                    "params_before": w.params_before,
                    "params_after": w.params_after,
                }),
            ))?;
        }
    }

    let faults = run.faults();
    let level = if faults > 0 {
        LogLevel::Warn
    } else {
        LogLevel::Info
    };
    log.emit_entry(
        LogEntry::new("", level, "run_complete")
            .with_run(&entry.label, run.seed())
            .with_outcome(Outcome::Pass)
            .with_duration_ms(entry.duration_ms)
            .with_details(serde_json::json!({
                "controller_id": run.controller_id(),
                "windows": run.len(),
                "faults": faults,
                "statistics": entry.statistics,
                "final_params": run.final_params(),
            })),
    )
}

fn pairwise(outcome: &SweepOutcome) -> Vec<PairDisagreement> {
    let mut pairs = Vec::new();
    for (i, left) in outcome.labels.iter().enumerate() {
        for right in &outcome.labels[i + 1..] {
            let rates: Vec<f64> = outcome
                .seeds
                .iter()
                .filter_map(|&seed| {
                    let (a, b) = (outcome.run(left, seed)?, outcome.run(right, seed)?);
                    compare_runs(a, b).ok().map(|r| r.rate)
                })
                .collect();
            if rates.is_empty() {
                continue;
            }
            pairs.push(PairDisagreement {
                left: left.clone(),
                right: right.clone(),
                seeds: rates.len(),
                mean_rate: rates.iter().sum::<f64>() / rates.len() as f64,
                max_rate: rates.iter().copied().fold(0.0, f64::max),
            });
        }
    }
    pairs
}

fn fingerprint(entries: &[SweepEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.label.as_bytes());
        // Serializing plain data into a Vec cannot fail.
        let body = serde_json::to_vec(&entry.run).unwrap_or_default();
        hasher.update(&body);
    }
    format!("{:x}", hasher.finalize())
}
