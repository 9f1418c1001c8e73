//! Console and JSON rendering of a [`RunReport`].

use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sentinel_lint::{Finding, Outcome, RunReport, Summary};

const RULE: &str = "======================================================================";

pub fn write_console(w: &mut impl Write, report: &RunReport, verbose: bool) -> io::Result<()> {
    let summary = report.summary();

    writeln!(w)?;
    writeln!(w, "{RULE}")?;
    writeln!(w, "SENTINEL DETECTION LINTER - VALIDATION RESULTS")?;
    writeln!(w, "{RULE}")?;
    writeln!(w)?;

    for outcome in &report.outcomes {
        let status = if outcome.passed() { "[PASS]" } else { "[FAIL]" };
        writeln!(w, "{status} {}", file_name(outcome))?;

        for finding in outcome.errors() {
            writeln!(w, "  [ERROR] {}", line(finding))?;
        }
        if verbose {
            for finding in outcome.warnings() {
                writeln!(w, "  [WARN]  {}", line(finding))?;
            }
        }
        if !outcome.passed() || (verbose && outcome.warning_count() > 0) {
            writeln!(w)?;
        }
    }

    writeln!(w, "{RULE}")?;
    writeln!(w, "Summary: {}/{} files passed", summary.passed, summary.total_files)?;
    writeln!(
        w,
        "         {} errors, {} warnings",
        summary.total_errors, summary.total_warnings
    )?;
    writeln!(w, "{RULE}")?;
    writeln!(w)
}

fn file_name(outcome: &Outcome) -> String {
    outcome.path.file_name().map_or_else(
        || outcome.path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    )
}

fn line(finding: &Finding) -> String {
    match &finding.field {
        Some(field) => format!("{}: {} (field: {field})", finding.validator, finding.message),
        None => format!("{}: {}", finding.validator, finding.message),
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    timestamp: String,
    summary: Summary,
    results: Vec<JsonResult<'a>>,
}

#[derive(Serialize)]
struct JsonResult<'a> {
    file: String,
    status: &'static str,
    errors: &'a [Finding],
    warnings: &'a [Finding],
}

pub fn write_json(w: &mut impl Write, report: &RunReport) -> io::Result<()> {
    let out = JsonReport {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        summary: report.summary(),
        results: report
            .outcomes
            .iter()
            .map(|o| JsonResult {
                file: o.path.display().to_string(),
                status: if o.passed() { "passed" } else { "failed" },
                errors: o.errors(),
                warnings: o.warnings(),
            })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *w, &out).map_err(io::Error::other)?;
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_lint::{Diagnostic, Severity};

    fn report() -> RunReport {
        let mut bad = Outcome::new("rules/bad.yaml");
        bad.push(Finding::new(
            "GUID Validator",
            Diagnostic::new(Severity::Error, "Missing required field 'id'", Some("id".into())),
        ));
        bad.push(Finding::new(
            "ASIM Field Validator",
            Diagnostic::new(Severity::Warning, "use SrcIpAddr", None),
        ));
        let mut good = Outcome::new("rules/good.yaml");
        good.push(Finding::new(
            "Entity Validator",
            Diagnostic::new(Severity::Warning, "weak identifier", None),
        ));
        RunReport {
            outcomes: vec![bad, good],
        }
    }

    fn console(verbose: bool) -> String {
        let mut buf = Vec::new();
        write_console(&mut buf, &report(), verbose).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn console_hides_warnings_unless_verbose() {
        let out = console(false);
        assert!(out.contains("[FAIL] bad.yaml\n  [ERROR] GUID Validator: Missing required field 'id' (field: id)\n\n"));
        assert!(out.contains("[PASS] good.yaml\n"));
        assert!(!out.contains("[WARN]"));
        assert!(out.contains("Summary: 1/2 files passed\n         1 errors, 2 warnings\n"));
    }

    #[test]
    fn console_verbose_shows_warnings() {
        let out = console(true);
        assert!(out.contains("  [WARN]  ASIM Field Validator: use SrcIpAddr\n"));
        assert!(out.contains("[PASS] good.yaml\n  [WARN]  Entity Validator: weak identifier\n\n"));
    }

    #[test]
    fn json_shape() {
        let mut buf = Vec::new();
        write_json(&mut buf, &report()).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert!(v["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(v["summary"]["total_files"], 2);
        assert_eq!(v["summary"]["failed"], 1);
        assert_eq!(v["summary"]["total_warnings"], 2);
        assert_eq!(v["results"][0]["status"], "failed");
        assert_eq!(v["results"][0]["errors"][0]["validator"], "GUID Validator");
        assert_eq!(v["results"][0]["errors"][0]["severity"], "error");
        assert_eq!(v["results"][0]["errors"][0]["field"], "id");
        assert_eq!(v["results"][1]["status"], "passed");
        assert!(v["results"][1]["warnings"][0]["field"].is_null());
    }
}
