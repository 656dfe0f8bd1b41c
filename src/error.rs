//! Error types shared across the evaluation pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"design.battery_capacities"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A batch of configuration errors reported together.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigErrors(pub Vec<ConfigError>);

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// Failure raised by a planner while loading a window or solving it.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planning window [{t_start}, {t_start}+{tau}) exceeds {time_steps} time steps")]
    WindowOutOfRange {
        t_start: usize,
        tau: usize,
        time_steps: usize,
    },
    #[error("planner is not ready: {0}")]
    NotReady(String),
    #[error("infeasible window starting at step {t_start}: {reason}")]
    Infeasible { t_start: usize, reason: String },
    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// Failure raised by an environment while being constructed or stepped.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("expected {expected} building actions, got {got}")]
    ActionShape { expected: usize, got: usize },
    #[error("environment already finished after {0} steps")]
    Finished(usize),
    #[error("invalid environment setup: {0}")]
    Setup(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Failure while writing or reading a schema artifact.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("cannot write schema \"{}\": {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot read schema \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed schema \"{}\": {source}", path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Top-level error for one design evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("{0}")]
    Config(ConfigErrors),
    #[error("observation layout mismatch: column {index} is \"{found}\", expected \"{expected}\"")]
    Layout {
        index: usize,
        expected: &'static str,
        found: String,
    },
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error(transparent)]
    Environment(#[from] EnvError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("inconsistent energy series: {0}")]
    Series(String),
}

impl From<Vec<ConfigError>> for EvalError {
    fn from(errors: Vec<ConfigError>) -> Self {
        EvalError::Config(ConfigErrors(errors))
    }
}

impl From<ConfigError> for EvalError {
    fn from(error: ConfigError) -> Self {
        EvalError::Config(ConfigErrors(vec![error]))
    }
}
