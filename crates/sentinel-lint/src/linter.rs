use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::{LintConfig, QueryConfig};
use crate::diagnostic::{Finding, Outcome, Severity};
use crate::error::{ConfigError, LoadError, Result, ValidatorError};
use crate::query::{EngineState, QuerySchema, load_engine};
use crate::record::{Record, load_record_file, scan_record_files};
use crate::siblings::SiblingIndex;
use crate::validator::{LintContext, Validator};
use crate::validators::{QueryValidator, builtin_validators};

/// Validator name that load failures are attributed to.
pub const LOADER: &str = "YAML Parser";

struct Active {
    validator: Box<dyn Validator>,
    severity: Option<Severity>,
}

/// Runs the configured validators over records and collects outcomes.
///
/// Every file attempted yields exactly one [`Outcome`]. A load failure
/// stops that file's validators; a validator that fails or panics becomes
/// a single error and the remaining validators still run.
pub struct Linter {
    validators: Vec<Active>,
    notices: Vec<String>,
}

impl Linter {
    /// Built-in validators plus the KQL validator when the shared engine
    /// is available.
    pub fn new(config: &LintConfig) -> Result<Self> {
        Self::with_engine(config, load_engine())
    }

    pub fn with_engine(config: &LintConfig, engine: &EngineState) -> Result<Self> {
        let mut validators = builtin_validators();
        let mut notices = Vec::new();

        if config.query.enabled {
            match engine {
                EngineState::Ready(engine) => {
                    let context = match semantic_schema(&config.query)? {
                        Some(schema) => match engine.prepare(&schema) {
                            Ok(context) => Some(context),
                            Err(e) => {
                                log::warn!("semantic query analysis disabled: {e}");
                                notices.push(format!("KQL semantic validation disabled. Reason: {e}"));
                                None
                            }
                        },
                        None => None,
                    };
                    validators.push(Box::new(QueryValidator::new(Arc::clone(engine), context)));
                }
                EngineState::Unavailable(reason) => {
                    notices.push(format!("KQL validation disabled. Reason: {reason}"));
                }
            }
        }

        let mut linter = Self::with_validators(validators, config);
        linter.notices = notices;
        Ok(linter)
    }

    /// Use exactly these validators, in order, minus any the config disables.
    pub fn with_validators(validators: Vec<Box<dyn Validator>>, config: &LintConfig) -> Self {
        let validators = validators
            .into_iter()
            .filter(|v| {
                let disabled = config.is_disabled(v.as_ref());
                if disabled {
                    log::debug!("validator disabled: {}", v.name());
                }
                !disabled
            })
            .map(|validator| Active {
                severity: config.severity_override(validator.as_ref()),
                validator,
            })
            .collect();
        Linter {
            validators,
            notices: Vec::new(),
        }
    }

    /// One-time messages for the operator, e.g. why query validation is off.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Display names of the validators that will run, in order.
    pub fn validator_names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|a| a.validator.name()).collect()
    }

    /// Run every validator against an already loaded record.
    pub fn lint_record(
        &self,
        path: &Path,
        record: &Record,
        siblings: Option<&SiblingIndex>,
    ) -> Outcome {
        let mut outcome = Outcome::new(path);
        let ctx = LintContext { path, siblings };

        for active in &self.validators {
            let validator = active.validator.as_ref();
            let result = panic::catch_unwind(AssertUnwindSafe(|| validator.validate(record, &ctx)))
                .unwrap_or_else(|payload| Err(ValidatorError::Panicked(panic_message(&*payload))));

            match result {
                Ok(diagnostics) => {
                    for mut diagnostic in diagnostics {
                        if let Some(severity) = active.severity {
                            diagnostic.severity = severity;
                        }
                        outcome.push(Finding::new(validator.name(), diagnostic));
                    }
                }
                Err(e) => {
                    log::warn!("{} failed on {}: {e}", validator.name(), path.display());
                    outcome.add_error(validator.name(), format!("Validator crashed: {e}"));
                }
            }
        }
        outcome
    }

    /// Lint one file on its own. With no siblings there is no uniqueness check.
    pub fn lint_file(&self, path: &Path) -> Outcome {
        self.lint_loaded(path, load_record_file(path), None)
    }

    /// Lint a batch. Each file is read once, and identifiers are checked for
    /// uniqueness across every file that loads.
    pub fn lint_files(&self, paths: &[PathBuf]) -> RunReport {
        let loaded: Vec<_> = paths.iter().map(|p| (p, load_record_file(p))).collect();

        let siblings = SiblingIndex::from_loaded(
            loaded
                .iter()
                .filter_map(|(path, record)| record.as_ref().ok().map(|r| (path.as_path(), r))),
        );

        let outcomes = loaded
            .into_iter()
            .map(|(path, record)| self.lint_loaded(path, record, Some(&siblings)))
            .collect();
        RunReport { outcomes }
    }

    /// Lint every `.yml`/`.yaml` file under `dir`, in sorted path order.
    pub fn lint_directory(&self, dir: &Path) -> Result<RunReport> {
        let files = scan_record_files(dir)?;
        log::info!("found {} rule files in {}", files.len(), dir.display());
        Ok(self.lint_files(&files))
    }

    fn lint_loaded(
        &self,
        path: &Path,
        record: std::result::Result<Record, LoadError>,
        siblings: Option<&SiblingIndex>,
    ) -> Outcome {
        log::debug!("linting {}", path.display());
        match record {
            Ok(record) => self.lint_record(path, &record, siblings),
            Err(e) => {
                let mut outcome = Outcome::new(path);
                outcome.add_error(LOADER, e.to_string());
                outcome
            }
        }
    }
}

fn semantic_schema(query: &QueryConfig) -> std::result::Result<Option<QuerySchema>, ConfigError> {
    match &query.schema {
        Some(path) => QuerySchema::load(path).map(Some),
        None if query.default_schema => Ok(Some(QuerySchema::sentinel_default())),
        None => Ok(None),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// Run report
// =============================================================================

/// Outcomes of one run, in the order files were given.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_files: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl RunReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(Outcome::passed)
    }

    pub fn summary(&self) -> Summary {
        let passed = self.outcomes.iter().filter(|o| o.passed()).count();
        Summary {
            total_files: self.outcomes.len(),
            passed,
            failed: self.outcomes.len() - passed,
            total_errors: self.outcomes.iter().map(Outcome::error_count).sum(),
            total_warnings: self.outcomes.iter().map(Outcome::warning_count).sum(),
        }
    }
}

impl From<Outcome> for RunReport {
    fn from(outcome: Outcome) -> Self {
        RunReport {
            outcomes: vec![outcome],
        }
    }
}
