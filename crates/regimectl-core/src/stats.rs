//! Regime statistics over finished runs.
//!
//! A run's regime sequence is partitioned into maximal segments of identical
//! regime. Fractions count windows, dwell averages count segments:
//!
//! ```text
//! [F, F, O, O, M, O]  ->  segments (F,2) (O,2) (M,1) (O,1)
//! fraction_freeze = 2/6   avg_freeze_exit = 2.0
//! fraction_ok     = 3/6   avg_ok_streak   = 1.5
//! fraction_magma  = 1/6   avg_magma_exit  = 1.0
//! regime_transitions = 3  regime_classes  = 3
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::run_loop::ControllerRun;
use crate::window::Regime;

/// Maximal runs of identical regime, in order.
#[must_use]
pub fn segments(regimes: &[Regime]) -> Vec<(Regime, usize)> {
    let mut out: Vec<(Regime, usize)> = Vec::new();
    for &regime in regimes {
        match out.last_mut() {
            Some((last, len)) if *last == regime => *len += 1,
            _ => out.push((regime, 1)),
        }
    }
    out
}

/// Read-only statistics of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub windows: usize,
    pub fraction_freeze: f64,
    pub fraction_magma: f64,
    pub fraction_ok: f64,
    /// Mean Freeze segment length; absent when the run never froze.
    pub avg_freeze_exit: Option<f64>,
    pub avg_magma_exit: Option<f64>,
    pub avg_ok_streak: Option<f64>,
    pub regime_transitions: usize,
    pub regime_classes: usize,
}

impl RunStatistics {
    #[must_use]
    pub fn from_run(run: &ControllerRun) -> Self {
        Self::from_regimes(&run.regimes())
    }

    #[must_use]
    pub fn from_regimes(regimes: &[Regime]) -> Self {
        let n = regimes.len();
        let mut counts = [0usize; 3];
        for r in regimes {
            counts[r.index()] += 1;
        }
        let fraction = |r: Regime| {
            if n == 0 {
                0.0
            } else {
                counts[r.index()] as f64 / n as f64
            }
        };

        let segs = segments(regimes);
        let mut seg_total = [0usize; 3];
        let mut seg_count = [0usize; 3];
        for (r, len) in &segs {
            seg_total[r.index()] += len;
            seg_count[r.index()] += 1;
        }
        let dwell = |r: Regime| {
            let i = r.index();
            (seg_count[i] > 0).then(|| seg_total[i] as f64 / seg_count[i] as f64)
        };

        Self {
            windows: n,
            fraction_freeze: fraction(Regime::Freeze),
            fraction_magma: fraction(Regime::Magma),
            fraction_ok: fraction(Regime::Ok),
            avg_freeze_exit: dwell(Regime::Freeze),
            avg_magma_exit: dwell(Regime::Magma),
            avg_ok_streak: dwell(Regime::Ok),
            regime_transitions: segs.len().saturating_sub(1),
            regime_classes: counts.iter().filter(|c| **c > 0).count(),
        }
    }

    #[must_use]
    pub fn fraction(&self, regime: Regime) -> f64 {
        match regime {
            Regime::Freeze => self.fraction_freeze,
            Regime::Magma => self.fraction_magma,
            Regime::Ok => self.fraction_ok,
        }
    }

    #[must_use]
    pub fn avg_dwell(&self, regime: Regime) -> Option<f64> {
        match regime {
            Regime::Freeze => self.avg_freeze_exit,
            Regime::Magma => self.avg_magma_exit,
            Regime::Ok => self.avg_ok_streak,
        }
    }
}

/// Segment length -> number of segments of that length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DwellDistribution(BTreeMap<usize, usize>);

impl DwellDistribution {
    pub fn record(&mut self, length: usize) {
        *self.0.entry(length).or_insert(0) += 1;
    }

    #[must_use]
    pub fn segments(&self) -> usize {
        self.0.values().sum()
    }

    /// Windows covered by all recorded segments.
    #[must_use]
    pub fn windows(&self) -> usize {
        self.0.iter().map(|(len, n)| len * n).sum()
    }

    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        let segs = self.segments();
        (segs > 0).then(|| self.windows() as f64 / segs as f64)
    }

    #[must_use]
    pub fn max(&self) -> Option<usize> {
        self.0.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// How often each action and each disturbance showed up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTally {
    /// Windows whose decision contained each action.
    pub chosen: BTreeMap<Action, usize>,
    /// Windows whose params actually moved.
    pub applied: usize,
    pub stressed: usize,
    pub lesioned: usize,
    pub faulted: usize,
}

impl ActionTally {
    pub fn record_run(&mut self, run: &ControllerRun) {
        for w in &run.windows {
            for action in w.actions.as_set() {
                *self.chosen.entry(action).or_insert(0) += 1;
            }
            self.applied += usize::from(w.applied);
            self.stressed += usize::from(w.stressed);
            self.lesioned += usize::from(w.lesioned);
            self.faulted += usize::from(w.fault.is_some());
        }
    }

    #[must_use]
    pub fn count(&self, action: Action) -> usize {
        self.chosen.get(&action).copied().unwrap_or(0)
    }
}

/// Statistics pooled over many runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    pub runs: usize,
    pub windows: usize,
    /// Mean of per-run fractions.
    pub mean_fraction_freeze: f64,
    pub mean_fraction_magma: f64,
    pub mean_fraction_ok: f64,
    /// Mean segment length over all segments of all runs.
    pub avg_freeze_exit: Option<f64>,
    pub avg_magma_exit: Option<f64>,
    pub avg_ok_streak: Option<f64>,
    pub regime_transitions: usize,
    pub dwell: BTreeMap<Regime, DwellDistribution>,
    pub actions: ActionTally,
}

impl AggregateStatistics {
    #[must_use]
    pub fn from_runs<'a>(runs: impl IntoIterator<Item = &'a ControllerRun>) -> Self {
        let mut count = 0usize;
        let mut windows = 0usize;
        let mut fractions = [0.0f64; 3];
        let mut transitions = 0usize;
        let mut dwell: BTreeMap<Regime, DwellDistribution> = Regime::ALL
            .iter()
            .map(|r| (*r, DwellDistribution::default()))
            .collect();
        let mut actions = ActionTally::default();

        for run in runs {
            let regimes = run.regimes();
            let stats = RunStatistics::from_regimes(&regimes);
            count += 1;
            windows += stats.windows;
            transitions += stats.regime_transitions;
            for r in Regime::ALL {
                fractions[r.index()] += stats.fraction(r);
            }
            for (r, len) in segments(&regimes) {
                dwell.entry(r).or_default().record(len);
            }
            actions.record_run(run);
        }

        let mean = |r: Regime| {
            if count == 0 {
                0.0
            } else {
                fractions[r.index()] / count as f64
            }
        };
        let pooled = |r: Regime| dwell.get(&r).and_then(DwellDistribution::mean);

        Self {
            runs: count,
            windows,
            mean_fraction_freeze: mean(Regime::Freeze),
            mean_fraction_magma: mean(Regime::Magma),
            mean_fraction_ok: mean(Regime::Ok),
            avg_freeze_exit: pooled(Regime::Freeze),
            avg_magma_exit: pooled(Regime::Magma),
            avg_ok_streak: pooled(Regime::Ok),
            regime_transitions: transitions,
            dwell,
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Regime::{Freeze, Magma};

    const OK: Regime = Regime::Ok;

    const EPS: f64 = 1e-12;

    #[test]
    fn reference_sequence() {
        let s = RunStatistics::from_regimes(&[Freeze, Freeze, OK, OK, Magma, OK]);
        assert!((s.fraction_freeze - 2.0 / 6.0).abs() < EPS);
        assert!((s.fraction_ok - 3.0 / 6.0).abs() < EPS);
        assert!((s.fraction_magma - 1.0 / 6.0).abs() < EPS);
        assert_eq!(s.regime_transitions, 3);
        assert_eq!(s.regime_classes, 3);
        assert_eq!(s.avg_freeze_exit, Some(2.0));
        assert_eq!(s.avg_magma_exit, Some(1.0));
        assert_eq!(s.avg_ok_streak, Some(1.5));
    }

    #[test]
    fn transitions_match_direct_enumeration() {
        let seq = [OK, Magma, Magma, Freeze, OK, OK, OK, Freeze, Freeze, Magma];
        let direct = seq.windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(RunStatistics::from_regimes(&seq).regime_transitions, direct);
    }

    #[test]
    fn fractions_sum_to_one() {
        let seq = [Magma, OK, Freeze, OK, OK, Magma, Magma];
        let s = RunStatistics::from_regimes(&seq);
        let total = s.fraction_freeze + s.fraction_magma + s.fraction_ok;
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn absent_regime_has_no_dwell() {
        let s = RunStatistics::from_regimes(&[OK, OK, OK]);
        assert_eq!(s.avg_freeze_exit, None);
        assert_eq!(s.avg_magma_exit, None);
        assert_eq!(s.avg_ok_streak, Some(3.0));
        assert_eq!(s.regime_classes, 1);
        assert_eq!(s.regime_transitions, 0);
    }

    #[test]
    fn empty_sequence_is_all_zero() {
        let s = RunStatistics::from_regimes(&[]);
        assert_eq!(s.windows, 0);
        assert_eq!(s.fraction_ok, 0.0);
        assert_eq!(s.regime_transitions, 0);
        assert_eq!(s.regime_classes, 0);
        assert_eq!(s.avg_ok_streak, None);
    }

    #[test]
    fn dwell_distribution_pools_segments() {
        let mut d = DwellDistribution::default();
        for len in [2, 2, 5, 1] {
            d.record(len);
        }
        assert_eq!(d.segments(), 4);
        assert_eq!(d.windows(), 10);
        assert_eq!(d.mean(), Some(2.5));
        assert_eq!(d.max(), Some(5));
        assert_eq!(d.iter().collect::<Vec<_>>(), vec![(1, 1), (2, 2), (5, 1)]);
    }

    #[test]
    fn aggregate_over_no_runs() {
        let agg = AggregateStatistics::from_runs(std::iter::empty());
        assert_eq!(agg.runs, 0);
        assert_eq!(agg.mean_fraction_ok, 0.0);
        assert_eq!(agg.avg_ok_streak, None);
    }
}
