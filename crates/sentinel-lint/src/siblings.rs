//! Batch-wide index of rule identifiers for the uniqueness check.
//!
//! Each file in a batch is loaded once and its `id` recorded here, so the
//! identifier validator can look up collisions without re-reading every
//! sibling for every record.

use std::path::{Path, PathBuf};

use crate::record::{Record, scalar_text};

#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    canonical: Option<PathBuf>,
    /// Trimmed, lowercased `id`.
    id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SiblingIndex {
    entries: Vec<Entry>,
}

/// Trim and lowercase an identifier for comparison.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

impl SiblingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every loaded record of a batch. Files that failed to load are
    /// never passed in; their own outcome reports the failure.
    pub fn from_loaded<'a>(loaded: impl IntoIterator<Item = (&'a Path, &'a Record)>) -> Self {
        let mut index = SiblingIndex::new();
        for (path, record) in loaded {
            index.insert(path, record);
        }
        log::debug!("sibling index holds {} records", index.len());
        index
    }

    /// Add an already loaded record.
    pub fn insert(&mut self, path: &Path, record: &Record) {
        self.entries.push(Entry {
            path: path.to_path_buf(),
            canonical: path.canonicalize().ok(),
            id: record
                .get("id")
                .and_then(scalar_text)
                .map(|id| normalize_id(&id)),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Other files whose `id` equals `id` after trimming and lowercasing.
    ///
    /// `current` is excluded, compared by canonical path when both sides
    /// resolve and by the literal path otherwise.
    pub fn duplicates_of(&self, id: &str, current: &Path) -> Vec<&Path> {
        let wanted = normalize_id(id);
        let current_canonical = current.canonicalize().ok();
        self.entries
            .iter()
            .filter(|e| match (&e.canonical, &current_canonical) {
                (Some(a), Some(b)) => a != b,
                _ => e.path != current,
            })
            .filter(|e| e.id.as_deref() == Some(wanted.as_str()))
            .map(|e| e.path.as_path())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(yaml: &str) -> Record {
        yaml.parse().unwrap()
    }

    #[test]
    fn matches_are_trimmed_and_case_insensitive() {
        let mut index = SiblingIndex::new();
        index.insert(Path::new("a.yaml"), &record("id: ' ABC '"));
        index.insert(Path::new("b.yaml"), &record("id: abc"));
        index.insert(Path::new("c.yaml"), &record("id: other"));

        let dups = index.duplicates_of("Abc", Path::new("b.yaml"));
        assert_eq!(dups, [Path::new("a.yaml")]);
    }

    #[test]
    fn records_without_id_never_match() {
        let mut index = SiblingIndex::new();
        index.insert(Path::new("a.yaml"), &record("name: x"));
        assert!(index.duplicates_of("x", Path::new("b.yaml")).is_empty());
    }

    #[test]
    fn from_loaded_indexes_every_record() {
        let a = record("id: one");
        let b = record("name: no id");
        let index =
            SiblingIndex::from_loaded([(Path::new("a.yaml"), &a), (Path::new("b.yaml"), &b)]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.duplicates_of("ONE", Path::new("c.yaml")), [Path::new("a.yaml")]);
    }

    #[test]
    fn self_is_excluded_by_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rule.yaml");
        std::fs::write(&path, "id: x").unwrap();
        let index = SiblingIndex::from_loaded([(path.as_path(), &record("id: x"))]);

        let dotted = dir.path().join(".").join("rule.yaml");
        assert!(index.duplicates_of("x", &dotted).is_empty());
    }
}
