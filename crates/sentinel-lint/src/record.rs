//! Rule records and the I/O primitives that produce them.
//!
//! A [`Record`] is the parsed YAML mapping of one analytics rule. Nothing
//! about its shape is trusted: validators only reach into it through the
//! accessors here, which return `None` rather than fail when a key is
//! missing, null, or of an unexpected type.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_yaml::{Mapping, Value};

use crate::error::LoadError;

/// One parsed analytics rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    root: Mapping,
}

impl Record {
    pub fn new(root: Mapping) -> Self {
        Record { root }
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Whether the key is written in the document, even with a null value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// Top-level value. A null value counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.root, key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_seq(&self, key: &str) -> Option<&serde_yaml::Sequence> {
        self.get(key).and_then(Value::as_sequence)
    }

    pub fn get_mapping(&self, key: &str) -> Option<&Mapping> {
        self.get(key).and_then(Value::as_mapping)
    }

    /// Resolve a dot-separated path such as
    /// `incidentConfiguration.groupingConfiguration.enabled`.
    ///
    /// Returns `None` as soon as a segment is missing, null, or its parent
    /// is not a mapping.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = lookup(current.as_mapping()?, part)?;
        }
        Some(current)
    }
}

impl FromStr for Record {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, LoadError> {
        parse_record(s, Path::new("<input>"))
    }
}

// =============================================================================
// Value helpers
// =============================================================================

/// Mapping lookup that treats an explicit null like a missing key.
pub fn lookup<'a>(m: &'a Mapping, key: &str) -> Option<&'a Value> {
    match m.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Tagged(tagged)) if tagged.value.is_null() => None,
        Some(v) => Some(v),
    }
}

/// Strip YAML tags so `!Foo value` is inspected as `value`.
pub fn untagged(v: &Value) -> &Value {
    match v {
        Value::Tagged(tagged) => untagged(&tagged.value),
        other => other,
    }
}

/// Name of the value's runtime type, as rule authors see it in messages.
pub fn type_name(v: &Value) -> &'static str {
    match untagged(v) {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "dict",
        Value::Tagged(_) => unreachable!("untagged never returns a tagged value"),
    }
}

/// Whether a value counts as "set": not null, not `false`, not zero, and
/// not an empty string, list or mapping.
pub fn is_truthy(v: &Value) -> bool {
    match untagged(v) {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(s) => !s.is_empty(),
        Value::Mapping(m) => !m.is_empty(),
        Value::Tagged(_) => unreachable!("untagged never returns a tagged value"),
    }
}

/// Text of a scalar value, or `None` for sequences and mappings.
pub fn scalar_text(v: &Value) -> Option<String> {
    match untagged(v) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Null => Some("None".to_string()),
        _ => None,
    }
}

/// Render any value for inclusion in a message.
pub fn display_value(v: &Value) -> String {
    scalar_text(v).unwrap_or_else(|| {
        serde_json::to_string(untagged(v)).unwrap_or_else(|_| type_name(v).to_string())
    })
}

// =============================================================================
// Loading
// =============================================================================

/// Read and parse one rule file.
pub fn load_record_file(path: &Path) -> Result<Record, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => LoadError::PermissionDenied(path.to_path_buf()),
        _ => LoadError::Io(e),
    })?;
    parse_record(&content, path)
}

/// Parse rule text. `source` is only used in error messages.
pub fn parse_record(text: &str, source: &Path) -> Result<Record, LoadError> {
    if is_blank_document(text) {
        return Err(LoadError::Empty(source.to_path_buf()));
    }
    let value: Value = serde_yaml::from_str(text).map_err(syntax_error)?;
    match value {
        Value::Mapping(root) => Ok(Record::new(root)),
        Value::Null => Err(LoadError::Empty(source.to_path_buf())),
        other => Err(LoadError::NotAMapping(type_name(&other))),
    }
}

fn is_blank_document(text: &str) -> bool {
    text.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

fn syntax_error(e: serde_yaml::Error) -> LoadError {
    let text = e.to_string();
    match e.location() {
        Some(loc) => {
            // serde_yaml appends its own " at line N column M"
            let problem = text
                .rsplit_once(" at line ")
                .map_or(text.as_str(), |(head, _)| head)
                .to_string();
            LoadError::Syntax {
                line: loc.line(),
                column: loc.column(),
                problem,
            }
        }
        None => LoadError::Yaml(text),
    }
}

/// Recursively collect `.yml`/`.yaml` files under `dir`, sorted by path.
///
/// Hidden files and directories (including `.sentinel-lint.yml`) are
/// skipped, and canonical paths are tracked so a symlink cycle cannot loop
/// forever.
pub fn scan_record_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut visited = HashSet::new();

    fn walk(
        dir: &Path,
        files: &mut Vec<PathBuf>,
        visited: &mut HashSet<PathBuf>,
    ) -> std::io::Result<()> {
        let canonical = match dir.canonicalize() {
            Ok(p) => p,
            Err(_) => return Ok(()),
        };
        if !visited.insert(canonical) {
            return Ok(());
        }

        let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.path());

        for entry in entries {
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                continue;
            }
            if path.is_dir() {
                walk(&path, files, visited)?;
            } else if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yml" | "yaml")
            ) {
                files.push(path);
            }
        }
        Ok(())
    }

    walk(dir, &mut files, &mut visited)?;
    files.sort();
    Ok(files)
}
