//! Window summaries over automaton metrics.
//!
//! Windows are `[k*S, k*S + W)` for every `k` that fits the history. A
//! history shorter than `W` yields one window over all of it.
//!
//! ```text
//! activity    = mean change_rate
//! pressure    = mean entropy
//! selectivity = mean phenotype_density
//! structure   = 4 * activity * (1 - activity)
//! regime      = Freeze if activity < freeze_below
//!               Magma  if activity > magma_above
//!               Ok     otherwise
//! ```
//!
//! `structure` peaks at `activity = 0.5` and vanishes at both extremes.

use serde::{Deserialize, Serialize};

use regimectl_core::{History, RawWindow, Regime, WindowFeed};

use crate::ca::{CaMetrics, SigilCa};

pub const DEFAULT_FREEZE_BELOW: f64 = 0.05;
pub const DEFAULT_MAGMA_ABOVE: f64 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryFeed {
    #[serde(default = "default_freeze_below")]
    pub freeze_below: f64,
    #[serde(default = "default_magma_above")]
    pub magma_above: f64,
}

fn default_freeze_below() -> f64 {
    DEFAULT_FREEZE_BELOW
}

fn default_magma_above() -> f64 {
    DEFAULT_MAGMA_ABOVE
}

impl Default for SummaryFeed {
    fn default() -> Self {
        Self {
            freeze_below: DEFAULT_FREEZE_BELOW,
            magma_above: DEFAULT_MAGMA_ABOVE,
        }
    }
}

impl SummaryFeed {
    #[must_use]
    pub fn classify(&self, activity: f64) -> Regime {
        if activity < self.freeze_below {
            Regime::Freeze
        } else if activity > self.magma_above {
            Regime::Magma
        } else {
            Regime::Ok
        }
    }

    /// Summarize `metrics[start..end]`.
    #[must_use]
    pub fn summarize(&self, metrics: &[CaMetrics], start: usize, end: usize) -> RawWindow {
        let slice = &metrics[start..end];
        if slice.is_empty() {
            return RawWindow {
                start,
                end,
                ..RawWindow::default()
            };
        }
        let n = slice.len() as f64;
        let mean = |f: fn(&CaMetrics) -> f64| slice.iter().map(f).sum::<f64>() / n;
        let activity = mean(|m| m.change_rate);
        RawWindow {
            start,
            end,
            regime: Some(self.classify(activity)),
            pressure: Some(mean(|m| m.entropy)),
            selectivity: Some(mean(|m| m.phenotype_density)),
            structure: Some(4.0 * activity * (1.0 - activity)),
            activity: Some(activity),
        }
    }

    /// Window spans for a history of `total` generations.
    #[must_use]
    pub fn spans(total: usize, window_length: usize, stride: usize) -> Vec<(usize, usize)> {
        if total == 0 {
            return Vec::new();
        }
        if window_length == 0 || total < window_length {
            return vec![(0, total)];
        }
        let stride = stride.max(1);
        (0..=(total - window_length) / stride)
            .map(|k| (k * stride, k * stride + window_length))
            .collect()
    }
}

impl WindowFeed<SigilCa> for SummaryFeed {
    fn windowed_features(
        &self,
        history: &History<Vec<u8>, Vec<bool>, CaMetrics>,
        window_length: usize,
        stride: usize,
    ) -> Vec<RawWindow> {
        Self::spans(history.generations(), window_length, stride)
            .into_iter()
            .map(|(start, end)| self.summarize(&history.metrics, start, end))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(change: &[f64]) -> History<Vec<u8>, Vec<bool>, CaMetrics> {
        let mut h = History::new();
        for &c in change {
            h.genotypes.push(vec![0]);
            h.phenotypes.push(vec![false]);
            h.metrics.push(CaMetrics {
                change_rate: c,
                entropy: 0.5,
                phenotype_density: 0.25,
            });
        }
        h
    }

    #[test]
    fn spans_fit_history() {
        assert_eq!(SummaryFeed::spans(10, 4, 3), vec![(0, 4), (3, 7), (6, 10)]);
        assert_eq!(SummaryFeed::spans(9, 4, 4), vec![(0, 4), (4, 8)]);
        assert_eq!(SummaryFeed::spans(3, 4, 4), vec![(0, 3)]);
        assert!(SummaryFeed::spans(0, 4, 4).is_empty());
    }

    #[test]
    fn regimes_follow_activity() {
        let feed = SummaryFeed::default();
        assert_eq!(feed.classify(0.0), Regime::Freeze);
        assert_eq!(feed.classify(0.049), Regime::Freeze);
        assert_eq!(feed.classify(0.05), Regime::Ok);
        assert_eq!(feed.classify(0.45), Regime::Ok);
        assert_eq!(feed.classify(0.46), Regime::Magma);
    }

    #[test]
    fn last_window_summarizes_newest_generations() {
        let feed = SummaryFeed::default();
        let h = metrics(&[0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.5, 0.5]);
        let windows = feed.windowed_features(&h, 4, 4);
        assert_eq!(windows.len(), 2);
        let first = &windows[0];
        assert_eq!(first.regime, Some(Regime::Freeze));
        assert_eq!(first.structure, Some(0.0));
        let last = windows.last().expect("two windows");
        assert_eq!((last.start, last.end), (4, 8));
        assert_eq!(last.activity, Some(0.5));
        assert_eq!(last.structure, Some(1.0));
        assert_eq!(last.regime, Some(Regime::Magma));
        assert_eq!(last.pressure, Some(0.5));
        assert_eq!(last.selectivity, Some(0.25));
    }
}
