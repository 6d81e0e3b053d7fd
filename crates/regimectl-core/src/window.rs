//! Window observations.
//!
//! A [`Window`] is the only view a controller gets of the simulated system:
//! a regime tag plus four normalized scalars. Feeds hand over [`RawWindow`]s,
//! which are clamped on ingestion so every window that reaches a controller
//! satisfies the range invariant.

use serde::{Deserialize, Serialize};

/// Qualitative behavioral regime of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    /// Too little activity.
    Freeze,
    /// Runaway activity.
    Magma,
    /// Acceptable range.
    Ok,
}

impl Regime {
    pub const ALL: [Regime; 3] = [Regime::Freeze, Regime::Magma, Regime::Ok];

    /// Parse a feed label (case-insensitive). Unknown labels yield `None`.
    #[must_use]
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "freeze" | "frozen" | "cold" => Some(Self::Freeze),
            "magma" | "chaotic" | "chaos" | "hot" => Some(Self::Magma),
            "ok" | "eoc" | "edge" | "edge-of-chaos" => Some(Self::Ok),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Freeze => "freeze",
            Self::Magma => "magma",
            Self::Ok => "ok",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Freeze => 0,
            Self::Magma => 1,
            Self::Ok => 2,
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Window summary as produced by a feed, before ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWindow {
    /// First generation covered (inclusive).
    #[serde(default)]
    pub start: usize,
    /// Last generation covered (exclusive).
    #[serde(default)]
    pub end: usize,
    #[serde(default)]
    pub regime: Option<Regime>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub selectivity: Option<f64>,
    #[serde(default)]
    pub structure: Option<f64>,
    #[serde(default)]
    pub activity: Option<f64>,
}

/// One ingested observation covering generations `[start, end)`.
///
/// All scalars are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub regime: Regime,
    pub pressure: f64,
    pub selectivity: f64,
    pub structure: f64,
    pub activity: f64,
}

impl Window {
    /// Build a window, clamping every scalar into `[0, 1]`.
    #[must_use]
    pub fn new(
        regime: Regime,
        pressure: f64,
        selectivity: f64,
        structure: f64,
        activity: f64,
    ) -> Self {
        Self {
            start: 0,
            end: 0,
            regime,
            pressure: unit(Some(pressure)),
            selectivity: unit(Some(selectivity)),
            structure: unit(Some(structure)),
            activity: unit(Some(activity)),
        }
    }

    /// Set the generation span.
    #[must_use]
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end.max(start);
        self
    }

    /// Ingest a feed window. Missing or non-finite scalars become `0.0`;
    /// a missing regime is read as [`Regime::Ok`].
    #[must_use]
    pub fn ingest(raw: &RawWindow) -> Self {
        Self {
            start: raw.start,
            end: raw.end.max(raw.start),
            regime: raw.regime.unwrap_or(Regime::Ok),
            pressure: unit(raw.pressure),
            selectivity: unit(raw.selectivity),
            structure: unit(raw.structure),
            activity: unit(raw.activity),
        }
    }

    /// Number of generations covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

impl From<RawWindow> for Window {
    fn from(raw: RawWindow) -> Self {
        Self::ingest(&raw)
    }
}

fn unit(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_clamps_out_of_range_scalars() {
        let raw = RawWindow {
            regime: Some(Regime::Magma),
            pressure: Some(1.7),
            selectivity: Some(-0.3),
            structure: Some(0.25),
            activity: Some(42.0),
            ..RawWindow::default()
        };
        let w = Window::ingest(&raw);
        assert_eq!(w.regime, Regime::Magma);
        assert_eq!(w.pressure, 1.0);
        assert_eq!(w.selectivity, 0.0);
        assert_eq!(w.structure, 0.25);
        assert_eq!(w.activity, 1.0);
    }

    #[test]
    fn ingest_defaults_missing_and_non_finite_to_zero() {
        let raw = RawWindow {
            pressure: Some(f64::NAN),
            selectivity: Some(f64::INFINITY),
            ..RawWindow::default()
        };
        let w = Window::ingest(&raw);
        assert_eq!(w.regime, Regime::Ok);
        assert_eq!(w.pressure, 0.0);
        assert_eq!(w.selectivity, 0.0);
        assert_eq!(w.structure, 0.0);
        assert_eq!(w.activity, 0.0);
    }

    #[test]
    fn regime_labels_parse_loosely() {
        assert_eq!(Regime::from_label("Frozen"), Some(Regime::Freeze));
        assert_eq!(Regime::from_label(" chaotic "), Some(Regime::Magma));
        assert_eq!(Regime::from_label("EoC"), Some(Regime::Ok));
        assert_eq!(Regime::from_label("unknown"), None);
    }

    #[test]
    fn span_never_inverts() {
        let w = Window::new(Regime::Ok, 0.5, 0.5, 0.5, 0.5).with_span(10, 4);
        assert_eq!(w.start, 10);
        assert_eq!(w.end, 10);
        assert!(w.is_empty());
    }

    #[test]
    fn raw_window_deserializes_with_missing_fields() {
        let raw: RawWindow =
            serde_json::from_str(r#"{"regime":"freeze","pressure":0.2}"#).expect("valid json");
        let w = Window::from(raw);
        assert_eq!(w.regime, Regime::Freeze);
        assert_eq!(w.pressure, 0.2);
        assert_eq!(w.activity, 0.0);
    }
}
