//! Wiring-diagram decision graphs.
//!
//! A wiring diagram is a small Boolean/real circuit over the window summary:
//!
//! ```json
//! {
//!   "meta": {"id": "cool-when-hot"},
//!   "diagram": {
//!     "nodes": [
//!       {"id": "act", "component": "input-activity"},
//!       {"id": "hot", "component": "threshold", "value": 0.4},
//!       {"id": "out", "component": "output-pass"}
//!     ],
//!     "edges": [
//!       {"from": "act", "to": "hot"},
//!       {"from": "hot", "to": "out"}
//!     ],
//!     "output": "out"
//!   }
//! }
//! ```
//!
//! ## Components
//!
//! | component | inputs | output |
//! |---|---|---|
//! | `input-pressure`, `input-selectivity`, `input-structure`, `input-activity` | 0 | real |
//! | `input-freeze`, `input-magma`, `input-ok` | 0 | bool (regime flag) |
//! | `constant` | 0 | `value` (bool or real) |
//! | `bit-and`, `bit-or`, `bit-xor` (ports `a`, `b`) | 2 | bool |
//! | `bit-not` | 1 | bool |
//! | `threshold` | 1 real | `input > value` |
//! | `weighted-sum` | n | `bias + Σ weights[i] * input[i]` (bools count as 0/1) |
//! | `output-pass` | 1 bool | graph `pass` |
//! | `output-score` | 1 real | graph `score` |
//!
//! Nodes are evaluated in topological order (Kahn's algorithm, ties broken
//! by declaration order). Binary gates read their `a`/`b` ports when both
//! are wired, otherwise their first two inputs in edge order.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimectl_core::{DecisionGraph, GraphContext, GraphError, GraphOutput, Regime, Window};

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("wiring json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WiringMeta {
    #[serde(default = "unknown_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

fn unknown_id() -> String {
    "unknown".to_string()
}

impl Default for WiringMeta {
    fn default() -> Self {
        Self {
            id: unknown_id(),
            formula: None,
        }
    }
}

/// A constant's value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Real(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default, rename = "to-port", skip_serializing_if = "Option::is_none")]
    pub to_port: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default = "default_output")]
    pub output: String,
}

fn default_output() -> String {
    "output".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Signal {
    Bool(bool),
    Real(f64),
}

impl Signal {
    fn as_bool(self, node: &str) -> Result<bool, GraphError> {
        match self {
            Self::Bool(b) => Ok(b),
            Self::Real(_) => Err(GraphError::SignalType {
                node: node.to_string(),
                expected: "boolean",
            }),
        }
    }

    fn as_real(self, node: &str) -> Result<f64, GraphError> {
        match self {
            Self::Real(x) => Ok(x),
            Self::Bool(_) => Err(GraphError::SignalType {
                node: node.to_string(),
                expected: "real",
            }),
        }
    }

    fn as_weight_input(self) -> f64 {
        match self {
            Self::Bool(b) => f64::from(u8::from(b)),
            Self::Real(x) => x,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    Input(Field),
    RegimeFlag(Regime),
    Constant,
    And,
    Or,
    Xor,
    Not,
    Threshold,
    WeightedSum,
    OutputPass,
    OutputScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Pressure,
    Selectivity,
    Structure,
    Activity,
}

impl Field {
    fn read(self, w: &Window) -> f64 {
        match self {
            Self::Pressure => w.pressure,
            Self::Selectivity => w.selectivity,
            Self::Structure => w.structure,
            Self::Activity => w.activity,
        }
    }
}

impl Component {
    fn parse(raw: &str) -> Option<Self> {
        Some(match raw.trim().to_ascii_lowercase().as_str() {
            "input-pressure" => Self::Input(Field::Pressure),
            "input-selectivity" => Self::Input(Field::Selectivity),
            "input-structure" => Self::Input(Field::Structure),
            "input-activity" => Self::Input(Field::Activity),
            "input-freeze" => Self::RegimeFlag(Regime::Freeze),
            "input-magma" => Self::RegimeFlag(Regime::Magma),
            "input-ok" => Self::RegimeFlag(Regime::Ok),
            "constant" => Self::Constant,
            "bit-and" | "and" => Self::And,
            "bit-or" | "or" => Self::Or,
            "bit-xor" | "xor" => Self::Xor,
            "bit-not" | "not" => Self::Not,
            "threshold" => Self::Threshold,
            "weighted-sum" => Self::WeightedSum,
            "output-pass" => Self::OutputPass,
            "output-score" => Self::OutputScore,
            _ => return None,
        })
    }

    const fn arity(self) -> Option<usize> {
        match self {
            Self::Input(_) | Self::RegimeFlag(_) | Self::Constant => Some(0),
            Self::And | Self::Or | Self::Xor => Some(2),
            Self::Not | Self::Threshold | Self::OutputPass | Self::OutputScore => Some(1),
            Self::WeightedSum => None,
        }
    }
}

/// A validated wiring diagram, ready to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct WiringDiagram {
    meta: WiringMeta,
    diagram: Diagram,
    order: Vec<usize>,
    components: Vec<Component>,
    /// Per node: `(source node, to-port)` in edge order.
    inputs: Vec<Vec<(usize, Option<String>)>>,
    output: usize,
}

#[derive(Deserialize)]
struct WiringFile {
    #[serde(default)]
    meta: WiringMeta,
    diagram: Diagram,
}

impl WiringDiagram {
    /// Parse and validate a diagram file.
    pub fn from_json(json: &str) -> Result<Self, WiringError> {
        let file: WiringFile = serde_json::from_str(json)?;
        Self::new(file.meta, file.diagram).map_err(WiringError::from)
    }

    /// Validate a diagram: known components, known edge endpoints, no
    /// cycles, arities satisfied, output node present.
    pub fn new(meta: WiringMeta, diagram: Diagram) -> Result<Self, GraphError> {
        let index: BTreeMap<&str, usize> = diagram
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let components = diagram
            .nodes
            .iter()
            .map(|n| {
                Component::parse(&n.component).ok_or_else(|| GraphError::UnknownComponent {
                    node: n.id.clone(),
                    component: n.component.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let lookup = |id: &str| {
            index
                .get(id)
                .copied()
                .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
        };

        let mut inputs: Vec<Vec<(usize, Option<String>)>> =
            vec![Vec::new(); diagram.nodes.len()];
        let mut adjacent: Vec<Vec<usize>> = vec![Vec::new(); diagram.nodes.len()];
        let mut in_degree = vec![0usize; diagram.nodes.len()];
        for edge in &diagram.edges {
            let from = lookup(&edge.from)?;
            let to = lookup(&edge.to)?;
            inputs[to].push((from, edge.to_port.clone()));
            adjacent[from].push(to);
            in_degree[to] += 1;
        }

        let mut queue: VecDeque<usize> = (0..diagram.nodes.len())
            .filter(|i| in_degree[*i] == 0)
            .collect();
        let mut order = Vec::with_capacity(diagram.nodes.len());
        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &next in &adjacent[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }
        if order.len() != diagram.nodes.len() {
            return Err(GraphError::Cycle {
                sorted: order.len(),
                total: diagram.nodes.len(),
            });
        }

        for (i, component) in components.iter().enumerate() {
            let actual = inputs[i].len();
            let ok = match component.arity() {
                Some(0) => actual == 0,
                Some(expected) => actual >= expected,
                None => actual >= 1,
            };
            if !ok {
                return Err(GraphError::Arity {
                    node: diagram.nodes[i].id.clone(),
                    expected: component.arity().unwrap_or(1),
                    actual,
                });
            }
        }

        let output = lookup(&diagram.output)?;
        Ok(Self {
            meta,
            order,
            components,
            inputs,
            output,
            diagram,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    #[must_use]
    pub fn meta(&self) -> &WiringMeta {
        &self.meta
    }

    #[must_use]
    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    fn binary_operands(
        &self,
        node: usize,
        values: &[Option<Signal>],
    ) -> Result<(bool, bool), GraphError> {
        let id = &self.diagram.nodes[node].id;
        let inputs = &self.inputs[node];
        let port = |name: &str| {
            inputs
                .iter()
                .find(|(_, p)| p.as_deref() == Some(name))
                .map(|(src, _)| *src)
        };
        let (a, b) = match (port("a"), port("b")) {
            (Some(a), Some(b)) => (a, b),
            _ => (inputs[0].0, inputs[1].0),
        };
        Ok((
            read(values, a, id)?.as_bool(id)?,
            read(values, b, id)?.as_bool(id)?,
        ))
    }

    fn eval_node(
        &self,
        node: usize,
        window: &Window,
        values: &[Option<Signal>],
    ) -> Result<Signal, GraphError> {
        let spec = &self.diagram.nodes[node];
        let id = spec.id.as_str();
        let first = || {
            self.inputs[node]
                .first()
                .map(|(src, _)| *src)
                .ok_or_else(|| GraphError::Arity {
                    node: id.to_string(),
                    expected: 1,
                    actual: 0,
                })
        };
        Ok(match self.components[node] {
            Component::Input(field) => Signal::Real(field.read(window)),
            Component::RegimeFlag(regime) => Signal::Bool(window.regime == regime),
            Component::Constant => match spec.value {
                Some(Literal::Bool(b)) => Signal::Bool(b),
                Some(Literal::Real(x)) => Signal::Real(x),
                None => {
                    return Err(GraphError::Evaluation(format!(
                        "constant node '{id}' has no value"
                    )));
                }
            },
            Component::And => {
                let (a, b) = self.binary_operands(node, values)?;
                Signal::Bool(a && b)
            }
            Component::Or => {
                let (a, b) = self.binary_operands(node, values)?;
                Signal::Bool(a || b)
            }
            Component::Xor => {
                let (a, b) = self.binary_operands(node, values)?;
                Signal::Bool(a ^ b)
            }
            Component::Not => Signal::Bool(!read(values, first()?, id)?.as_bool(id)?),
            Component::Threshold => {
                let limit = match spec.value {
                    Some(Literal::Real(x)) => x,
                    _ => {
                        return Err(GraphError::Evaluation(format!(
                            "threshold node '{id}' needs a real value"
                        )));
                    }
                };
                Signal::Bool(read(values, first()?, id)?.as_real(id)? > limit)
            }
            Component::WeightedSum => {
                let mut total = spec.bias;
                for (k, (src, _)) in self.inputs[node].iter().enumerate() {
                    let w = spec.weights.get(k).copied().unwrap_or(1.0);
                    total += w * read(values, *src, id)?.as_weight_input();
                }
                Signal::Real(total)
            }
            Component::OutputPass => Signal::Bool(read(values, first()?, id)?.as_bool(id)?),
            Component::OutputScore => Signal::Real(read(values, first()?, id)?.as_real(id)?),
        })
    }

    /// Evaluate against a window summary.
    pub fn evaluate_window(&self, window: &Window) -> Result<GraphOutput, GraphError> {
        let mut values: Vec<Option<Signal>> = vec![None; self.diagram.nodes.len()];
        for &node in &self.order {
            values[node] = Some(self.eval_node(node, window, &values)?);
        }
        let id = &self.diagram.nodes[self.output].id;
        Ok(match read(&values, self.output, id)? {
            Signal::Bool(pass) => GraphOutput {
                pass: Some(pass),
                score: None,
            },
            Signal::Real(score) => GraphOutput {
                pass: None,
                score: Some(score),
            },
        })
    }
}

fn read(values: &[Option<Signal>], src: usize, node: &str) -> Result<Signal, GraphError> {
    values
        .get(src)
        .copied()
        .flatten()
        .ok_or_else(|| GraphError::Evaluation(format!("node '{node}' read an unevaluated input")))
}

impl DecisionGraph for WiringDiagram {
    fn evaluate(&self, context: &GraphContext) -> Result<GraphOutput, GraphError> {
        self.evaluate_window(&context.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOT: &str = r#"{
        "meta": {"id": "cool-when-hot"},
        "diagram": {
            "nodes": [
                {"id": "act", "component": "input-activity"},
                {"id": "hot", "component": "threshold", "value": 0.4},
                {"id": "out", "component": "output-pass"}
            ],
            "edges": [
                {"from": "act", "to": "hot"},
                {"from": "hot", "to": "out"}
            ],
            "output": "out"
        }
    }"#;

    fn window(regime: Regime, activity: f64) -> Window {
        Window::new(regime, 0.2, 0.7, 0.5, activity)
    }

    #[test]
    fn threshold_to_pass() {
        let d = WiringDiagram::from_json(HOT).expect("valid");
        assert_eq!(d.id(), "cool-when-hot");
        let hot = d.evaluate_window(&window(Regime::Ok, 0.6)).expect("eval");
        let cold = d.evaluate_window(&window(Regime::Ok, 0.1)).expect("eval");
        assert_eq!(hot.pass, Some(true));
        assert_eq!(cold.pass, Some(false));
        assert_eq!(hot.score, None);
    }

    #[test]
    fn weighted_sum_to_score() {
        let json = r#"{
            "diagram": {
                "nodes": [
                    {"id": "p", "component": "input-pressure"},
                    {"id": "s", "component": "input-selectivity"},
                    {"id": "m", "component": "input-magma"},
                    {"id": "sum", "component": "weighted-sum", "weights": [0.5, 0.5, 0.25], "bias": 0.1},
                    {"id": "output", "component": "output-score"}
                ],
                "edges": [
                    {"from": "p", "to": "sum"},
                    {"from": "s", "to": "sum"},
                    {"from": "m", "to": "sum"},
                    {"from": "sum", "to": "output"}
                ]
            }
        }"#;
        let d = WiringDiagram::from_json(json).expect("valid");
        assert_eq!(d.id(), "unknown");
        let out = d.evaluate_window(&window(Regime::Magma, 0.5)).expect("eval");
        // 0.1 + 0.5*0.2 + 0.5*0.7 + 0.25*1
        let score = out.score.expect("score");
        assert!((score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn ports_select_operands() {
        // a = freeze flag, b = constant true; xor with ports wired in reverse edge order.
        let json = r#"{
            "diagram": {
                "nodes": [
                    {"id": "f", "component": "input-freeze"},
                    {"id": "t", "component": "constant", "value": true},
                    {"id": "x", "component": "bit-xor"},
                    {"id": "n", "component": "bit-not"},
                    {"id": "output", "component": "output-pass"}
                ],
                "edges": [
                    {"from": "t", "to": "x", "to-port": "b"},
                    {"from": "f", "to": "x", "to-port": "a"},
                    {"from": "x", "to": "n"},
                    {"from": "n", "to": "output"}
                ]
            }
        }"#;
        let d = WiringDiagram::from_json(json).expect("valid");
        // not(freeze xor true) == freeze
        let frozen = d.evaluate_window(&window(Regime::Freeze, 0.0)).expect("eval");
        let ok = d.evaluate_window(&window(Regime::Ok, 0.3)).expect("eval");
        assert_eq!(frozen.pass, Some(true));
        assert_eq!(ok.pass, Some(false));
    }

    #[test]
    fn cycle_is_rejected() {
        let json = r#"{
            "diagram": {
                "nodes": [
                    {"id": "a", "component": "bit-not"},
                    {"id": "b", "component": "bit-not"},
                    {"id": "output", "component": "output-pass"}
                ],
                "edges": [
                    {"from": "a", "to": "b"},
                    {"from": "b", "to": "a"},
                    {"from": "b", "to": "output"}
                ]
            }
        }"#;
        let err = WiringDiagram::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            WiringError::Graph(GraphError::Cycle { sorted: 0, total: 3 })
        ));
    }

    #[test]
    fn unknown_references_are_rejected() {
        let json = r#"{
            "diagram": {
                "nodes": [{"id": "output", "component": "output-pass"}],
                "edges": [{"from": "ghost", "to": "output"}]
            }
        }"#;
        assert!(matches!(
            WiringDiagram::from_json(json),
            Err(WiringError::Graph(GraphError::UnknownNode(id))) if id == "ghost"
        ));

        let json = r#"{"diagram": {"nodes": [{"id": "output", "component": "flux-capacitor"}]}}"#;
        assert!(matches!(
            WiringDiagram::from_json(json),
            Err(WiringError::Graph(GraphError::UnknownComponent { .. }))
        ));
    }

    #[test]
    fn arity_is_checked() {
        let json = r#"{
            "diagram": {
                "nodes": [
                    {"id": "f", "component": "input-freeze"},
                    {"id": "output", "component": "bit-and"}
                ],
                "edges": [{"from": "f", "to": "output"}]
            }
        }"#;
        assert!(matches!(
            WiringDiagram::from_json(json),
            Err(WiringError::Graph(GraphError::Arity { expected: 2, actual: 1, .. }))
        ));
    }

    #[test]
    fn signal_type_mismatch_fails_evaluation() {
        let json = r#"{
            "diagram": {
                "nodes": [
                    {"id": "p", "component": "input-pressure"},
                    {"id": "output", "component": "output-pass"}
                ],
                "edges": [{"from": "p", "to": "output"}]
            }
        }"#;
        let d = WiringDiagram::from_json(json).expect("structurally valid");
        let err = d.evaluate_window(&window(Regime::Ok, 0.3)).unwrap_err();
        assert!(matches!(err, GraphError::SignalType { expected: "boolean", .. }));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(
            WiringDiagram::from_json("{not json"),
            Err(WiringError::Json(_))
        ));
    }
}
