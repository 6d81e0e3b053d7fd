//! The windowed control loop.
//!
//! ## State machine
//!
//! ```text
//! Initializing ──step──▶ Running(0) ──step──▶ Running(1) ─ … ─▶ Done
//! ```
//!
//! One [`RunLoop::step`] processes exactly one window:
//!
//! 1. resolve the lesion scheduled for this index, if any;
//! 2. simulate `window_length` generations from the carried-forward state
//!    with the current params and the next seed from the simulation stream;
//! 3. append the chunk to the combined history and read the newest window
//!    from the feed;
//! 4. ask the controller for a decision;
//! 5. fold the decision into the params, or apply the stress override;
//! 6. record an [`AnnotatedWindow`] and carry params and state forward.
//!
//! The loop runs exactly `windows` iterations. There is no convergence exit,
//! so dwell-time statistics stay comparable across controllers. A simulation
//! failure abandons the whole run; a controller fault never does.

use serde::{Deserialize, Serialize};

use crate::action::{Action, Decision};
use crate::controller::{Controller, ControllerState, decide_counted};
use crate::disturbance::DisturbanceSchedule;
use crate::error::{ConfigError, RunError, SimulationError};
use crate::external::{History, SimState, Simulator, WindowFeed};
use crate::params::{Adaptation, ControlParams, PartialParams, adapt};
use crate::rng::SeedStream;
use crate::window::{Regime, Window};

/// Shape and seed of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of windows to run.
    pub windows: usize,
    /// Generations per window (`W`).
    pub window_length: usize,
    /// Feed stride (`S`).
    pub stride: usize,
    pub seed: i64,
    /// Initial params; absent fields take the documented defaults.
    #[serde(default)]
    pub initial: PartialParams,
}

impl RunConfig {
    #[must_use]
    pub fn new(windows: usize, window_length: usize, stride: usize, seed: i64) -> Self {
        Self {
            windows,
            window_length,
            stride,
            seed,
            initial: PartialParams::default(),
        }
    }

    #[must_use]
    pub fn with_initial(mut self, initial: PartialParams) -> Self {
        self.initial = initial;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.windows == 0 {
            return Err(ConfigError::InvalidRunConfig("windows must be > 0".into()));
        }
        if self.window_length == 0 {
            return Err(ConfigError::InvalidRunConfig(
                "window_length must be > 0".into(),
            ));
        }
        if self.stride == 0 {
            return Err(ConfigError::InvalidRunConfig("stride must be > 0".into()));
        }
        Ok(())
    }
}

/// Where a [`RunLoop`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    Initializing,
    /// Next window to process.
    Running { window_index: usize },
    Done,
}

/// One processed window with everything the loop did about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedWindow {
    pub window_index: usize,
    #[serde(flatten)]
    pub window: Window,
    pub actions: Decision,
    pub params_before: ControlParams,
    pub params_after: ControlParams,
    pub delta_update: f64,
    pub delta_match: f64,
    pub applied: bool,
    pub stressed: bool,
    pub lesioned: bool,
    /// Controller fault that degraded this decision to `Hold`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    pub controller_id: String,
}

impl AnnotatedWindow {
    #[must_use]
    pub fn regime(&self) -> Regime {
        self.window.regime
    }

    /// True when the controller chose `action` for this window.
    #[must_use]
    pub fn chose(&self, action: Action) -> bool {
        self.actions.actions().contains(&action)
    }
}

/// Identifying data for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub controller_id: String,
    pub seed: i64,
    pub windows: usize,
    pub window_length: usize,
    pub stride: usize,
    pub initial_params: ControlParams,
    /// [`DisturbanceSchedule::digest`] of the schedule the run used.
    pub schedule_digest: String,
}

/// A completed run. Never mutated after the loop ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerRun {
    pub metadata: RunMetadata,
    pub windows: Vec<AnnotatedWindow>,
}

impl ControllerRun {
    #[must_use]
    pub fn controller_id(&self) -> &str {
        &self.metadata.controller_id
    }

    #[must_use]
    pub fn seed(&self) -> i64 {
        self.metadata.seed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Regime of every window, in order.
    #[must_use]
    pub fn regimes(&self) -> Vec<Regime> {
        self.windows.iter().map(AnnotatedWindow::regime).collect()
    }

    /// Windows whose decision degraded because of a controller fault.
    #[must_use]
    pub fn faults(&self) -> usize {
        self.windows.iter().filter(|w| w.fault.is_some()).count()
    }

    /// Params carried out of the last window.
    #[must_use]
    pub fn final_params(&self) -> ControlParams {
        self.windows
            .last()
            .map_or(self.metadata.initial_params, |w| w.params_after)
    }
}

/// Drives one controller through one run.
///
/// Owns every piece of per-run mutable state; collaborators are borrowed
/// read-only and may be shared with other loops on other threads.
pub struct RunLoop<'a, S: Simulator, F: WindowFeed<S>> {
    config: RunConfig,
    simulator: &'a S,
    feed: &'a F,
    controller: &'a dyn Controller,
    schedule: &'a DisturbanceSchedule,
    phase: RunPhase,
    initial_params: ControlParams,
    params: ControlParams,
    state: Option<SimState<S::Genotype, S::Phenotype>>,
    history: History<S::Genotype, S::Phenotype, S::Metrics>,
    seeds: SeedStream,
    controller_state: ControllerState,
    windows: Vec<AnnotatedWindow>,
}

impl<'a, S: Simulator, F: WindowFeed<S>> RunLoop<'a, S, F> {
    /// Validate the configuration and prepare a loop in `Initializing`.
    pub fn new(
        config: RunConfig,
        simulator: &'a S,
        feed: &'a F,
        controller: &'a dyn Controller,
        schedule: &'a DisturbanceSchedule,
    ) -> Result<Self, RunError> {
        config.validate()?;
        schedule.validate()?;
        let params = ControlParams::resolve(config.initial);
        Ok(Self {
            seeds: SeedStream::new(config.seed),
            controller_state: ControllerState::new(config.seed),
            windows: Vec::with_capacity(config.windows),
            config,
            simulator,
            feed,
            controller,
            schedule,
            phase: RunPhase::Initializing,
            initial_params: params,
            params,
            state: None,
            history: History::new(),
        })
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Params the next window will simulate with.
    #[must_use]
    pub fn params(&self) -> ControlParams {
        self.params
    }

    #[must_use]
    pub fn controller_state(&self) -> &ControllerState {
        &self.controller_state
    }

    #[must_use]
    pub fn history(&self) -> &History<S::Genotype, S::Phenotype, S::Metrics> {
        &self.history
    }

    #[must_use]
    pub fn windows(&self) -> &[AnnotatedWindow] {
        &self.windows
    }

    /// Process the next window. Returns `Ok(None)` once the loop is `Done`.
    pub fn step(&mut self) -> Result<Option<&AnnotatedWindow>, RunError> {
        let window_index = match self.phase {
            RunPhase::Done => return Ok(None),
            RunPhase::Initializing => {
                self.state = Some(self.simulator.seed_state(self.config.seed));
                0
            }
            RunPhase::Running { window_index } => window_index,
        };
        self.phase = RunPhase::Running { window_index };

        let Some(state) = self.state.as_ref() else {
            return Err(RunError::Simulation {
                window_index,
                source: SimulationError::EmptyState,
            });
        };

        let lesion = self
            .schedule
            .lesion_for(window_index, self.config.window_length);
        let sim_seed = self.seeds.next_seed();
        let chunk = self
            .simulator
            .simulate(
                state,
                &self.params,
                self.config.window_length,
                sim_seed,
                lesion.as_ref(),
            )
            .map_err(|source| RunError::Simulation {
                window_index,
                source,
            })?;
        let next_state = chunk.last_state().ok_or(RunError::Simulation {
            window_index,
            source: SimulationError::EmptyState,
        })?;
        self.history.extend(chunk);

        let raw = self
            .feed
            .windowed_features(&self.history, self.config.window_length, self.config.stride)
            .pop()
            .ok_or(RunError::EmptyFeed { window_index })?;
        let window = Window::ingest(&raw);

        let decision = decide_counted(self.controller, &window, &mut self.controller_state);
        let fault = self.controller_state.take_fault();

        let forced = self.schedule.stress_for(window_index);
        let adaptation = match forced {
            Some(forced) => Adaptation::between(self.params, forced),
            None => adapt(self.params, decision.actions()),
        };

        self.params = adaptation.params_after;
        self.state = Some(next_state);
        self.phase = if window_index + 1 >= self.config.windows {
            RunPhase::Done
        } else {
            RunPhase::Running {
                window_index: window_index + 1,
            }
        };

        self.windows.push(AnnotatedWindow {
            window_index,
            window,
            actions: decision,
            params_before: adaptation.params_before,
            params_after: adaptation.params_after,
            delta_update: adaptation.delta_update,
            delta_match: adaptation.delta_match,
            applied: adaptation.applied,
            stressed: forced.is_some(),
            lesioned: lesion.is_some(),
            fault,
            controller_id: self.controller.id().to_string(),
        });
        Ok(self.windows.last())
    }

    /// The finished run, or `None` if the loop has not reached `Done`.
    #[must_use]
    pub fn finish(self) -> Option<ControllerRun> {
        if self.phase != RunPhase::Done {
            return None;
        }
        Some(ControllerRun {
            metadata: RunMetadata {
                controller_id: self.controller.id().to_string(),
                seed: self.config.seed,
                windows: self.config.windows,
                window_length: self.config.window_length,
                stride: self.config.stride,
                initial_params: self.initial_params,
                schedule_digest: self.schedule.digest(),
            },
            windows: self.windows,
        })
    }

    /// Step until `Done` and return the run.
    pub fn run(mut self) -> Result<ControllerRun, RunError> {
        while self.step()?.is_some() {}
        self.finish().ok_or(RunError::Config(ConfigError::InvalidRunConfig(
            "run loop stopped before completion".into(),
        )))
    }
}

/// Build a loop and run it to completion.
pub fn run_controller<S: Simulator, F: WindowFeed<S>>(
    config: RunConfig,
    simulator: &S,
    feed: &F,
    controller: &dyn Controller,
    schedule: &DisturbanceSchedule,
) -> Result<ControllerRun, RunError> {
    RunLoop::new(config, simulator, feed, controller, schedule)?.run()
}
