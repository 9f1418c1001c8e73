use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity of a validation finding. Only errors fail a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single finding produced by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Location of the offending value, e.g.
    /// `entityMappings[2].fieldMappings[0].columnName`.
    pub field: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, field: Option<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            field,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(field) = &self.field {
            write!(f, " (field: {field})")?;
        }
        Ok(())
    }
}

pub(crate) fn err(message: impl Into<String>, field: impl Into<String>) -> Diagnostic {
    Diagnostic::new(Severity::Error, message, Some(field.into()))
}

pub(crate) fn warning(message: impl Into<String>, field: impl Into<String>) -> Diagnostic {
    Diagnostic::new(Severity::Warning, message, Some(field.into()))
}

/// A diagnostic attributed to the validator (or loader) that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub validator: String,
    pub severity: Severity,
    pub message: String,
    pub field: Option<String>,
}

impl Finding {
    pub fn new(validator: impl Into<String>, diagnostic: Diagnostic) -> Self {
        Finding {
            validator: validator.into(),
            severity: diagnostic.severity,
            message: diagnostic.message,
            field: diagnostic.field,
        }
    }
}

/// Everything found in one rule file.
///
/// Pass/fail is derived from `errors` on every call, so it cannot drift
/// out of sync with the findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub path: PathBuf,
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
}

impl Outcome {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Outcome {
            path: path.into(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// File the finding under errors or warnings by its severity.
    pub fn push(&mut self, finding: Finding) {
        match finding.severity {
            Severity::Error => self.errors.push(finding),
            Severity::Warning => self.warnings.push(finding),
        }
    }

    pub fn add_error(&mut self, validator: &str, message: impl Into<String>) {
        self.push(Finding::new(
            validator,
            Diagnostic::new(Severity::Error, message, None),
        ));
    }

    pub fn errors(&self) -> &[Finding] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}
