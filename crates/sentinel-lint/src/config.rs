use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diagnostic::Severity;
use crate::error::ConfigError;
use crate::validator::Validator;

pub const CONFIG_FILE_NAMES: [&str; 2] = [".sentinel-lint.yml", ".sentinel-lint.yaml"];

/// Which validators run and how their findings are classified.
///
/// Loaded from `.sentinel-lint.yml` and merged with command-line flags.
/// Validators are named by display name or short id, in any case.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LintConfig {
    /// Validators to skip entirely (e.g. `"asim"`).
    pub disabled_validators: HashSet<String>,
    /// Force every finding of a validator to one severity.
    pub severity_overrides: HashMap<String, Severity>,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryConfig {
    /// Run the KQL validator when an engine is available.
    pub enabled: bool,
    /// JSON table schema enabling semantic analysis.
    pub schema: Option<PathBuf>,
    /// Use the built-in Sentinel tables when no schema file is given.
    pub default_schema: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            enabled: true,
            schema: None,
            default_schema: false,
        }
    }
}

/// Raw YAML shape for `.sentinel-lint.yml`.
#[derive(Debug, Default, Deserialize)]
struct RawLintConfig {
    #[serde(default)]
    disabled_validators: Vec<String>,
    #[serde(default)]
    severity_overrides: HashMap<String, String>,
    #[serde(default)]
    query: RawQueryConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RawQueryConfig {
    enabled: Option<bool>,
    schema: Option<PathBuf>,
    #[serde(default)]
    default_schema: bool,
}

impl LintConfig {
    /// Load a config file. A relative `query.schema` is resolved against
    /// the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        // A file with only comments is a valid, empty config.
        let raw: RawLintConfig = match serde_yaml::from_str::<serde_yaml::Value>(&content)? {
            serde_yaml::Value::Null => RawLintConfig::default(),
            value => serde_yaml::from_value(value)?,
        };

        let mut severity_overrides = HashMap::new();
        for (validator, sev) in &raw.severity_overrides {
            let sev = match sev.to_ascii_lowercase().as_str() {
                "error" => Severity::Error,
                "warning" => Severity::Warning,
                _ => {
                    return Err(ConfigError::InvalidSeverity {
                        validator: validator.clone(),
                        severity: sev.clone(),
                    });
                }
            };
            severity_overrides.insert(validator.clone(), sev);
        }

        let base = path.parent().unwrap_or(Path::new("."));
        Ok(LintConfig {
            disabled_validators: raw.disabled_validators.into_iter().collect(),
            severity_overrides,
            query: QueryConfig {
                enabled: raw.query.enabled.unwrap_or(true),
                schema: raw.query.schema.map(|s| base.join(s)),
                default_schema: raw.query.default_schema,
            },
        })
    }

    /// Walk up from `start_path` to find the nearest `.sentinel-lint.yml`.
    pub fn find_in_ancestors(start_path: &Path) -> Option<PathBuf> {
        let dir = if start_path.is_file() {
            start_path.parent()?
        } else {
            start_path
        };

        let mut current = dir;
        loop {
            for name in CONFIG_FILE_NAMES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            current = current.parent()?;
        }
    }

    /// Merge another config into this one (e.g. CLI flags into file config).
    /// Query validation stays enabled only if both allow it.
    pub fn merge(&mut self, other: &LintConfig) {
        self.disabled_validators
            .extend(other.disabled_validators.iter().cloned());
        for (validator, sev) in &other.severity_overrides {
            self.severity_overrides.insert(validator.clone(), *sev);
        }
        self.query.enabled &= other.query.enabled;
        if let Some(schema) = &other.query.schema {
            self.query.schema = Some(schema.clone());
        }
        self.query.default_schema |= other.query.default_schema;
    }

    pub fn is_disabled(&self, validator: &dyn Validator) -> bool {
        self.disabled_validators
            .iter()
            .any(|key| validator.matches(key))
    }

    /// The forced severity for `validator`. When several keys name the same
    /// validator (`timing` and `Timing Validator`) and disagree, `error` wins.
    pub fn severity_override(&self, validator: &dyn Validator) -> Option<Severity> {
        let found: Vec<Severity> = self
            .severity_overrides
            .iter()
            .filter(|(key, _)| validator.matches(key))
            .map(|(_, sev)| *sev)
            .collect();
        match found.as_slice() {
            [] => None,
            [sev] => Some(*sev),
            _ if found.contains(&Severity::Error) => {
                if found.contains(&Severity::Warning) {
                    log::warn!(
                        "conflicting severity overrides for {}; using error",
                        validator.name()
                    );
                }
                Some(Severity::Error)
            }
            _ => Some(Severity::Warning),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::validators::{AsimFieldValidator, TimingValidator};

    fn write_config(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join(".sentinel-lint.yml");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
disabled_validators: [asim]
severity_overrides:
  Timing Validator: warning
query:
  enabled: true
  schema: schemas/sentinel.json
"#,
        );
        let config = LintConfig::load(&path).unwrap();
        assert!(config.is_disabled(&AsimFieldValidator));
        assert!(!config.is_disabled(&TimingValidator));
        assert_eq!(
            config.severity_override(&TimingValidator),
            Some(Severity::Warning)
        );
        assert_eq!(
            config.query.schema,
            Some(dir.path().join("schemas/sentinel.json"))
        );
    }

    #[test]
    fn validator_names_match_any_case() {
        let mut config = LintConfig::default();
        config.disabled_validators.insert("ASIM FIELD VALIDATOR".into());
        assert!(config.is_disabled(&AsimFieldValidator));
    }

    #[test]
    fn conflicting_overrides_resolve_to_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "severity_overrides:\n  timing: warning\n  Timing Validator: error\n  asim: warning\n  ASIM: Warning\n",
        );
        let config = LintConfig::load(&path).unwrap();
        assert_eq!(config.severity_override(&TimingValidator), Some(Severity::Error));
        assert_eq!(
            config.severity_override(&AsimFieldValidator),
            Some(Severity::Warning)
        );
    }

    #[test]
    fn empty_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = LintConfig::load(&write_config(dir.path(), "# nothing\n")).unwrap();
        assert!(config.disabled_validators.is_empty());
        assert!(config.query.enabled);
    }

    #[test]
    fn invalid_severity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "severity_overrides:\n  timing: fatal\n");
        let err = LintConfig::load(&path).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid severity 'fatal' for validator 'timing' in lint config"
        );
    }

    #[test]
    fn find_in_ancestors_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "disabled_validators: []\n");
        let nested = dir.path().join("rules/identity");
        fs::create_dir_all(&nested).unwrap();
        let rule = nested.join("rule.yaml");
        fs::write(&rule, "id: x\n").unwrap();

        assert_eq!(LintConfig::find_in_ancestors(&rule), Some(path.clone()));
        assert_eq!(LintConfig::find_in_ancestors(&nested), Some(path));
    }

    #[test]
    fn merge_combines_flags() {
        let mut file = LintConfig::default();
        file.disabled_validators.insert("asim".into());
        let mut cli = LintConfig::default();
        cli.disabled_validators.insert("timing".into());
        cli.query.enabled = false;
        cli.query.schema = Some("s.json".into());

        file.merge(&cli);
        assert_eq!(file.disabled_validators.len(), 2);
        assert!(!file.query.enabled);
        assert_eq!(file.query.schema, Some(PathBuf::from("s.json")));

        // A later enabled=true does not re-enable.
        file.merge(&LintConfig::default());
        assert!(!file.query.enabled);
    }
}
