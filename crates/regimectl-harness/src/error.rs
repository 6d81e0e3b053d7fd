use std::path::PathBuf;

use thiserror::Error;

use regimectl_core::{ComparisonError, ConfigError, RunError};
use regimectl_sim::WiringError;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: invalid json: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("controller '{controller}' seed {seed}: {source}")]
    Run {
        controller: String,
        seed: i64,
        #[source]
        source: RunError,
    },
    #[error(transparent)]
    Comparison(#[from] ComparisonError),
    #[error("decision graph {}: {source}", path.display())]
    Wiring {
        path: PathBuf,
        #[source]
        source: WiringError,
    },
    #[error("unknown controller '{0}'")]
    UnknownController(String),
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("structured log: {0}")]
    Log(#[from] std::io::Error),
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
