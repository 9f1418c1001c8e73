mod report;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use sentinel_lint::{EngineState, LintConfig, Linter, QuerySchema, RunReport, load_engine};

#[derive(Parser)]
#[command(name = "sentinel-lint")]
#[command(about = "Validate Microsoft Sentinel analytics rules in YAML format")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Console,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint a rule file, or every rule in a directory (recursive)
    ///
    /// Exits with status 1 when any file has errors. Warnings never fail
    /// a run.
    Lint {
        /// Path to a rule file or a directory of rules
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Console)]
        output: OutputFormat,

        /// Show warnings in console output
        #[arg(short, long)]
        verbose: bool,

        /// Skip KQL validation of the `query` field
        #[arg(long)]
        no_query_validation: bool,

        /// JSON table schema enabling semantic KQL checks
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Use the built-in Sentinel tables for semantic KQL checks
        #[arg(long)]
        default_schema: bool,

        /// Path to a .sentinel-lint.yml config file (default: auto-discover)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Disable a validator by name or id (can be specified multiple times)
        #[arg(long = "disable")]
        disabled: Vec<String>,
    },

    /// Parse a KQL query and print diagnostics and output columns as JSON
    Query {
        /// The query text, or `-` to read it from stdin
        query: String,

        /// JSON table schema for semantic analysis
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Analyze against the built-in Sentinel tables
        #[arg(long)]
        default_schema: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Lint {
            path,
            output,
            verbose,
            no_query_validation,
            schema,
            default_schema,
            config,
            disabled,
        } => {
            let mut overrides = LintConfig::default();
            overrides.disabled_validators.extend(disabled);
            overrides.query.enabled = !no_query_validation;
            overrides.query.schema = schema;
            overrides.query.default_schema = default_schema;
            cmd_lint(path, output, verbose, config, overrides)
        }
        Commands::Query {
            query,
            schema,
            default_schema,
        } => cmd_query(query, schema, default_schema),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_lint(
    path: PathBuf,
    output: OutputFormat,
    verbose: bool,
    config_path: Option<PathBuf>,
    overrides: LintConfig,
) {
    if !path.exists() {
        let kind = if looks_like_rule_file(&path) {
            "File"
        } else {
            "Directory"
        };
        eprintln!("ERROR: {kind} not found: {}", path.display());
        process::exit(1);
    }

    let mut config = load_lint_config(config_path.as_deref(), &path);
    config.merge(&overrides);

    let linter = match Linter::new(&config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: Failed to set up linter: {e}");
            process::exit(1);
        }
    };
    for notice in linter.notices() {
        eprintln!("WARNING: {notice}");
    }
    if config.query.enabled && matches!(load_engine(), EngineState::Unavailable(_)) {
        eprintln!("Rebuild with the `kql` feature, or pass --no-query-validation to silence this.");
    }

    let report = if path.is_dir() {
        match linter.lint_directory(&path) {
            Ok(report) => {
                if report.is_empty() {
                    eprintln!("No YAML files found in {}", path.display());
                }
                report
            }
            Err(e) => {
                eprintln!("ERROR: Failed to scan {}: {e}", path.display());
                process::exit(1);
            }
        }
    } else {
        RunReport::from(linter.lint_file(&path))
    };

    let result = match output {
        OutputFormat::Console => report::write_console(&mut io::stdout().lock(), &report, verbose),
        OutputFormat::Json => report::write_json(&mut io::stdout().lock(), &report),
    };
    if let Err(e) = result {
        eprintln!("ERROR: Failed to write report: {e}");
        process::exit(1);
    }

    if !report.passed() {
        process::exit(1);
    }
}

fn cmd_query(query: String, schema: Option<PathBuf>, default_schema: bool) {
    let query = if query == "-" {
        let mut input = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut input) {
            eprintln!("Error reading stdin: {e}");
            process::exit(1);
        }
        input
    } else {
        query
    };

    let schema = match schema {
        Some(path) => match QuerySchema::load(&path) {
            Ok(s) => Some(s),
            Err(e) => {
                eprintln!("ERROR: Failed to load schema file: {e}");
                process::exit(1);
            }
        },
        None if default_schema => Some(QuerySchema::sentinel_default()),
        None => None,
    };

    let parsed = match schema {
        Some(schema) => match schema.to_database() {
            Ok(db) => sentinel_kql::analyze(&query, &db),
            Err(e) => {
                eprintln!("ERROR: {e}");
                process::exit(1);
            }
        },
        None => sentinel_kql::parse(&query),
    };

    match serde_json::to_string_pretty(&parsed) {
        Ok(j) => println!("{j}"),
        Err(e) => {
            eprintln!("JSON serialization error: {e}");
            process::exit(1);
        }
    }
    if parsed.has_errors() {
        process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn looks_like_rule_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml" | "yaml")
    )
}

/// Load the lint config from an explicit path or by discovery from the
/// linted path. A missing discovered config is not an error.
fn load_lint_config(explicit: Option<&Path>, target: &Path) -> LintConfig {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match LintConfig::find_in_ancestors(target) {
            Some(p) => p,
            None => return LintConfig::default(),
        },
    };
    match LintConfig::load(&path) {
        Ok(config) => {
            log::info!("using lint config {}", path.display());
            config
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            process::exit(1);
        }
    }
}
