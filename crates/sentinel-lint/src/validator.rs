use std::path::Path;

use crate::diagnostic::Diagnostic;
use crate::error::ValidatorError;
use crate::record::Record;
use crate::siblings::SiblingIndex;

/// Per-record context handed to every validator.
#[derive(Debug, Clone, Copy)]
pub struct LintContext<'a> {
    /// File the record was loaded from.
    pub path: &'a Path,
    /// Every other record in the batch, for cross-file checks. `None` when
    /// a single file is linted on its own.
    pub siblings: Option<&'a SiblingIndex>,
}

impl<'a> LintContext<'a> {
    pub fn new(path: &'a Path) -> Self {
        LintContext {
            path,
            siblings: None,
        }
    }

    pub fn with_siblings(mut self, siblings: &'a SiblingIndex) -> Self {
        self.siblings = Some(siblings);
        self
    }
}

/// One independent concern checked against every record.
///
/// Validators must not assume any field exists or has the right type. A
/// missing optional field produces no diagnostic, and a malformed one ends
/// the checks that depend on it. Diagnostics are returned in document order.
pub trait Validator: Send + Sync {
    /// Display name used to attribute findings, e.g. `"Timing Validator"`.
    fn name(&self) -> &'static str;

    /// Short id accepted by `--disable` and the lint config, e.g. `"timing"`.
    fn id(&self) -> &'static str;

    fn validate(
        &self,
        record: &Record,
        ctx: &LintContext<'_>,
    ) -> Result<Vec<Diagnostic>, ValidatorError>;

    /// Whether `key` (a display name or short id, any case) names this validator.
    fn matches(&self, key: &str) -> bool {
        key.eq_ignore_ascii_case(self.id()) || key.eq_ignore_ascii_case(self.name())
    }
}
