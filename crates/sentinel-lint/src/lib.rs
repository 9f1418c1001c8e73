//! # sentinel-lint
//!
//! Validation engine for Microsoft Sentinel analytics rules written in YAML.
//!
//! Each rule file is loaded into a [`Record`] and passed through an ordered
//! list of independent [`Validator`]s:
//!
//! - **Identifier**: `id` is a GUID, unique across the batch
//! - **Schema**: required fields present, declared types respected
//! - **Sentinel constraints**: enums, ranges, lengths, MITRE tactics and
//!   techniques, alert templates, incident grouping
//! - **Entities**: entity types and strong identifiers, with case checks
//! - **ASIM naming**: advisory checks on mapped column names
//! - **Timing**: `queryFrequency` / `queryPeriod` consistency
//! - **KQL**: syntax, optional schema-aware semantics, and entity columns
//!   present in the query output (behind the `kql` feature)
//!
//! Findings are collected per file into an [`Outcome`]; only errors fail a
//! file. A validator that fails internally is reported as one error and
//! never stops the rest of the run.
//!
//! ## Quick Start
//!
//! ```rust
//! use sentinel_lint::{LintConfig, Linter, Record};
//!
//! let record: Record = r#"
//! id: 6f3a9c1e-2b4d-4e8f-9a7c-1d2e3f4a5b6c
//! name: Suspicious sign-in
//! queryFrequency: 10m
//! queryPeriod: 5m
//! "#
//! .parse()
//! .unwrap();
//!
//! let linter = Linter::with_validators(
//!     sentinel_lint::validators::builtin_validators(),
//!     &LintConfig::default(),
//! );
//! let outcome = linter.lint_record(std::path::Path::new("rule.yaml"), &record, None);
//! assert!(!outcome.passed());
//! assert!(outcome.errors().iter().any(|f| f.validator == "Timing Validator"));
//! ```

pub mod config;
pub mod diagnostic;
pub mod duration;
pub mod error;
#[cfg(feature = "kql")]
pub mod kusto;
pub mod linter;
pub mod query;
pub mod record;
pub mod siblings;
pub mod tables;
pub mod validator;
pub mod validators;

pub use config::{LintConfig, QueryConfig};
pub use diagnostic::{Diagnostic, Finding, Outcome, Severity};
pub use duration::{DurationError, DurationUnit, RuleDuration};
pub use error::{ConfigError, Error, LoadError, QueryEngineError, Result, ValidatorError};
#[cfg(feature = "kql")]
pub use kusto::KustoEngine;
pub use linter::{LOADER, Linter, RunReport, Summary};
pub use query::{
    EngineState, QueryAnalysis, QueryDiagnostic, QueryEngine, QuerySchema, SemanticContext,
    load_engine,
};
pub use record::{Record, load_record_file, parse_record, scan_record_files};
pub use siblings::SiblingIndex;
pub use validator::{LintContext, Validator};
