//! The query-parsing capability consumed by the KQL validator.
//!
//! The linter never talks to a parser directly. It asks [`load_engine`] for
//! the process-wide [`EngineState`], which is resolved once and cached:
//! either a ready [`QueryEngine`] or the reason none is available. An
//! unavailable engine only disables query validation, never the run.

use std::any::Any;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::diagnostic::Severity;
use crate::error::{ConfigError, QueryEngineError};
use crate::tables::schema::{DEFAULT_DATABASE, SENTINEL_TABLES};

// =============================================================================
// Engine contract
// =============================================================================

/// A diagnostic located by byte offset in the query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDiagnostic {
    pub severity: Severity,
    pub message: String,
    pub start: usize,
    pub length: usize,
}

/// What an engine reports for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryAnalysis {
    pub diagnostics: Vec<QueryDiagnostic>,
    /// Names of the columns the query produces. `None` when the engine
    /// cannot infer them.
    pub output_columns: Option<BTreeSet<String>>,
}

impl QueryAnalysis {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Engine-specific, prepared form of a [`QuerySchema`].
///
/// Only the engine that built a context can read it back.
pub struct SemanticContext(Box<dyn Any + Send + Sync>);

impl SemanticContext {
    pub fn new<T: Any + Send + Sync>(inner: T) -> Self {
        SemanticContext(Box::new(inner))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for SemanticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SemanticContext(..)")
    }
}

pub trait QueryEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Syntax diagnostics and schema-free output columns.
    fn parse(&self, text: &str) -> Result<QueryAnalysis, QueryEngineError>;

    /// Turn a table schema into a context for [`analyze`](Self::analyze).
    fn prepare(&self, schema: &QuerySchema) -> Result<SemanticContext, QueryEngineError>;

    /// Syntax and semantic diagnostics, with output columns resolved
    /// against the schema.
    fn analyze(
        &self,
        text: &str,
        context: &SemanticContext,
    ) -> Result<QueryAnalysis, QueryEngineError>;
}

// =============================================================================
// Schema files
// =============================================================================

/// Tables and typed columns for semantic analysis.
///
/// JSON layout:
///
/// ```json
/// {"database": "SecurityDB",
///  "tables": {"SecurityEvent": {"columns": {"Computer": "string"}}}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySchema {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub tables: BTreeMap<String, TableSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

impl QuerySchema {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Common Sentinel tables with their usual column types.
    pub fn sentinel_default() -> Self {
        let tables = SENTINEL_TABLES
            .iter()
            .map(|(table, columns)| {
                let columns = columns
                    .iter()
                    .map(|(c, ty)| (c.to_string(), ty.to_string()))
                    .collect();
                (table.to_string(), TableSchema { columns })
            })
            .collect();
        QuerySchema {
            database: default_database(),
            tables,
        }
    }
}

// =============================================================================
// Process-wide engine
// =============================================================================

/// Result of the one-time engine initialization.
#[derive(Clone)]
pub enum EngineState {
    Ready(Arc<dyn QueryEngine>),
    Unavailable(String),
}

impl fmt::Debug for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Ready(engine) => write!(f, "Ready({})", engine.name()),
            EngineState::Unavailable(reason) => write!(f, "Unavailable({reason:?})"),
        }
    }
}

/// The shared engine, initialized on first call and never retried.
pub fn load_engine() -> &'static EngineState {
    static ENGINE: OnceLock<EngineState> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let state = init_engine();
        match &state {
            EngineState::Ready(engine) => log::debug!("query engine ready: {}", engine.name()),
            EngineState::Unavailable(reason) => {
                log::warn!("query engine unavailable: {reason}")
            }
        }
        state
    })
}

#[cfg(feature = "kql")]
fn init_engine() -> EngineState {
    EngineState::Ready(Arc::new(crate::kusto::KustoEngine))
}

#[cfg(not(feature = "kql"))]
fn init_engine() -> EngineState {
    EngineState::Unavailable("built without the `kql` feature".to_string())
}
