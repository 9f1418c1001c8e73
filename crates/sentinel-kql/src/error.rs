use thiserror::Error;

/// Errors raised while building a schema for semantic analysis.
#[derive(Debug, Error)]
pub enum KqlError {
    #[error("Unknown scalar type '{0}'")]
    UnknownType(String),

    #[error("Duplicate table '{0}'")]
    DuplicateTable(String),

    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Invalid name: {0}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, KqlError>;
