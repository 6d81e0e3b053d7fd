//! Builds controllers from [`ControllerSpec`]s.
//!
//! Alphabets and decision graphs are read once per controller entry and
//! shared by every run of that controller.

use std::path::Path;
use std::sync::Arc;

use regimectl_core::{
    Action, Controller, DiagramInterpreted, NullController, SigilAlphabet, SymbolAlphabet,
    SymbolLookup, ThresholdController,
};
use regimectl_sim::{WiringDiagram, default_alphabet};

use crate::config::{ControllerKind, ControllerSpec, HarnessConfig};
use crate::error::HarnessError;

/// A built controller and the label reports use for it.
#[derive(Clone)]
pub struct NamedController {
    pub label: String,
    pub controller: Arc<dyn Controller>,
}

impl std::fmt::Debug for NamedController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedController")
            .field("label", &self.label)
            .field("id", &self.controller.id())
            .finish()
    }
}

impl NamedController {
    #[must_use]
    pub fn new(label: impl Into<String>, controller: Arc<dyn Controller>) -> Self {
        Self {
            label: label.into(),
            controller,
        }
    }
}

/// Build every controller of `config`, in configuration order.
pub fn build_controllers(config: &HarnessConfig) -> Result<Vec<NamedController>, HarnessError> {
    config
        .controllers
        .iter()
        .map(|spec| build_controller(spec, config))
        .collect()
}

pub fn build_controller(
    spec: &ControllerSpec,
    config: &HarnessConfig,
) -> Result<NamedController, HarnessError> {
    let controller: Arc<dyn Controller> = match &spec.kind {
        ControllerKind::Null => Arc::new(NullController),
        ControllerKind::Hex => Arc::new(ThresholdController),
        ControllerKind::Sigil {
            alphabet_path,
            alphabet_size,
        } => {
            let alphabet: Arc<dyn SymbolAlphabet> = match alphabet_path {
                Some(path) => Arc::new(load_alphabet(&config.resolve_path(path))?),
                None => Arc::new(default_alphabet()),
            };
            let lookup = SymbolLookup::new(alphabet)?;
            match alphabet_size {
                Some(size) => Arc::new(lookup.with_alphabet_size(*size)?),
                None => Arc::new(lookup),
            }
        }
        ControllerKind::Wiring {
            diagram_path,
            action_list,
        } => {
            let diagram = load_diagram(&config.resolve_path(diagram_path))?;
            let controller = DiagramInterpreted::new(Arc::new(diagram));
            match action_list {
                Some(names) => Arc::new(controller.with_action_list(parse_actions(names)?)),
                None => Arc::new(controller),
            }
        }
    };
    Ok(NamedController::new(spec.label(), controller))
}

pub fn load_alphabet(path: &Path) -> Result<SigilAlphabet, HarnessError> {
    let text = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
    Ok(SigilAlphabet::from_json(&text)?)
}

pub fn load_diagram(path: &Path) -> Result<WiringDiagram, HarnessError> {
    let text = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
    WiringDiagram::from_json(&text).map_err(|source| HarnessError::Wiring {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse action names loosely; any unknown name is an error.
pub fn parse_actions(names: &[String]) -> Result<Vec<Action>, HarnessError> {
    names
        .iter()
        .map(|name| {
            Action::from_str_loose(name).ok_or_else(|| HarnessError::UnknownAction(name.clone()))
        })
        .collect()
}
