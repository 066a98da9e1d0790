use std::path::PathBuf;
use std::time::Duration;

use arcstr::ArcStr;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RamgenError {
    #[error("invalid configuration for `{param}`: {reason}")]
    Config { param: &'static str, reason: String },

    #[error("pin {pin} exceeds macro height ({top} > {height})")]
    Placement {
        pin: ArcStr,
        top: Decimal,
        height: Decimal,
    },

    #[error("malformed characterization result: {0}")]
    Characterization(String),

    #[error("command `{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("command `{command}` exited with status {status}")]
    Command { command: String, status: String },

    #[error("could not parse {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RamgenError {
    pub(crate) fn config(param: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            param,
            reason: reason.into(),
        }
    }

    /// Whether this error stems from an illegal macro or technology description.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Whether this error is a placement-capacity failure.
    pub fn is_placement(&self) -> bool {
        matches!(self, Self::Placement { .. })
    }
}

pub type Result<T> = std::result::Result<T, RamgenError>;
