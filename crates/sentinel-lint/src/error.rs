use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a rule file into a [`Record`](crate::Record).
///
/// The display text of each variant is what ends up in the report, so the
/// wording here is user-facing.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Permission denied reading file: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("YAML parsing error at line {line}, column {column}: {problem}")]
    Syntax {
        line: usize,
        column: usize,
        problem: String,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(String),

    #[error("YAML file must contain a dictionary at root level, got {0}")]
    NotAMapping(&'static str),

    #[error("File is empty or contains only comments: {}", .0.display())]
    Empty(PathBuf),

    #[error("Error loading YAML file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading `.sentinel-lint.yml` or a query schema file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid lint config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid schema file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid severity '{severity}' for validator '{validator}' in lint config")]
    InvalidSeverity { validator: String, severity: String },
}

/// A validator could not finish inspecting a record.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("{0}")]
    Failed(String),

    #[error("panicked: {0}")]
    Panicked(String),
}

/// Errors surfaced by a query engine.
#[derive(Debug, Error)]
pub enum QueryEngineError {
    #[error("query engine unavailable: {0}")]
    Unavailable(String),

    #[error("invalid schema: {0}")]
    Schema(String),

    #[error("semantic context was built by a different engine")]
    ForeignContext,

    #[error("{0}")]
    Engine(String),
}

/// Top-level error for library entry points that touch the filesystem.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
