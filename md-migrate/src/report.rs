//! Per-file report records and their terminal rendering.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use colored::Colorize;
use html_diff_core::{format_summary, format_text, DiffResult, DiffStatus, SourceSpan};
use serde::Serialize;
use thiserror::Error;

use crate::migrate::{AuditEntry, FileMigration, UnitFailure};

/// Migration outcome of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub changed: bool,
    /// Semantic-diff verdict; absent when the file could not be read or written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DiffStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
    pub entries: Vec<AuditEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<UnitFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileRecord {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            changed: false,
            status: None,
            span: None,
            entries: Vec::new(),
            failures: Vec::new(),
            error: Some(error.into()),
        }
    }
}

impl From<FileMigration> for FileRecord {
    fn from(migration: FileMigration) -> Self {
        Self {
            changed: migration.changed,
            status: Some(migration.status),
            span: migration.span,
            entries: migration.entries,
            failures: migration.failures,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationTotals {
    pub files: usize,
    pub changed: usize,
    pub substitutions: usize,
    pub unit_failures: usize,
    pub file_failures: usize,
}

/// Key-ordered migration report for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub totals: MigrationTotals,
    pub files: BTreeMap<String, FileRecord>,
}

/// Comparison outcome of one rendered file pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRecord {
    /// Markdown file the HTML was generated from, when a source map knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DiffStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiffRecord {
    pub fn from_result(result: &DiffResult, source: Option<String>) -> Self {
        Self {
            source,
            status: Some(result.status),
            span: result.span,
            reason: result
                .divergence
                .as_ref()
                .map(|divergence| divergence.reason.to_string()),
            error: None,
        }
    }

    pub fn failed(source: Option<String>, error: impl Into<String>) -> Self {
        Self {
            source,
            status: None,
            span: None,
            reason: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffTotals {
    pub files: usize,
    pub equivalent: usize,
    pub divergent: usize,
    pub failed: usize,
}

/// Key-ordered comparison report for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub totals: DiffTotals,
    pub files: BTreeMap<String, DiffRecord>,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write a report as pretty-printed JSON.
pub fn write_report<T: Serialize>(report: &T, path: &Path) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Render comparison results for terminal output.
pub fn render_results(results: &[DiffResult]) -> String {
    let raw = format_text(results);
    let mut out = Vec::new();

    for line in raw.lines() {
        let colored = if line.starts_with('=') {
            line.green().to_string()
        } else if line.starts_with('~') {
            line.yellow().to_string()
        } else {
            line.to_string()
        };
        out.push(colored);
    }

    out.push(format_summary(results).cyan().to_string());
    out.join("\n")
}

/// Render a migration report: one line per file, audit entries and failures beneath.
pub fn render_migration_report(report: &MigrationReport) -> String {
    let mut out = Vec::new();
    for (file, record) in &report.files {
        if let Some(error) = &record.error {
            out.push(format!("! {file}: {error}").red().to_string());
            continue;
        }
        let line = if record.changed {
            format!("~ {file}").yellow().to_string()
        } else {
            format!("= {file}").green().to_string()
        };
        out.push(line);
        for entry in &record.entries {
            out.push(format!("  line {}: {}", entry.line, entry.token_kind));
        }
        for failure in &record.failures {
            out.push(
                format!(
                    "  line {}: {} kept ({})",
                    failure.line, failure.token_kind, failure.reason
                )
                .magenta()
                .to_string(),
            );
        }
    }

    let totals = &report.totals;
    out.push(
        format!(
            "files={} changed={} substitutions={} unit_failures={} file_failures={}",
            totals.files,
            totals.changed,
            totals.substitutions,
            totals.unit_failures,
            totals.file_failures
        )
        .cyan()
        .to_string(),
    );
    out.join("\n")
}

/// Render a diff report: one line per file pair plus a summary.
pub fn render_diff_report(report: &DiffReport) -> String {
    let mut out = Vec::new();
    for (file, record) in &report.files {
        let source = record
            .source
            .as_deref()
            .map(|source| format!(" <- {source}"))
            .unwrap_or_default();
        let line = match (&record.error, record.status) {
            (Some(error), _) => format!("! {file}{source}: {error}").red().to_string(),
            (None, Some(DiffStatus::Divergent)) => {
                let span = record
                    .span
                    .map(|span| format!(" ({span})"))
                    .unwrap_or_default();
                let reason = record.reason.as_deref().unwrap_or("divergent");
                format!("~ {file}{source}{span}: {reason}")
                    .yellow()
                    .to_string()
            }
            (None, _) => format!("= {file}{source}").green().to_string(),
        };
        out.push(line);
    }

    let totals = &report.totals;
    out.push(
        format!(
            "equivalent={} divergent={} failed={}",
            totals.equivalent, totals.divergent, totals.failed
        )
        .cyan()
        .to_string(),
    );
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use html_diff_core::{DiffStatus, SourceSpan};
    use tempfile::tempdir;

    use super::{
        render_diff_report, render_migration_report, write_report, DiffRecord, DiffReport,
        FileRecord, MigrationReport, MigrationTotals,
    };
    use crate::migrate::AuditEntry;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn migration_report_lists_entries_in_order() {
        plain();
        let mut files = BTreeMap::new();
        files.insert(
            "b.md".to_string(),
            FileRecord {
                changed: true,
                status: Some(DiffStatus::Divergent),
                span: Some(SourceSpan::new(4, 4)),
                entries: vec![
                    AuditEntry {
                        token_kind: "paragraph".to_string(),
                        line: 4,
                    },
                    AuditEntry {
                        token_kind: "list".to_string(),
                        line: 9,
                    },
                ],
                failures: Vec::new(),
                error: None,
            },
        );
        files.insert("a.md".to_string(), FileRecord::failed("unreadable"));
        let report = MigrationReport {
            totals: MigrationTotals {
                files: 2,
                changed: 1,
                substitutions: 2,
                unit_failures: 0,
                file_failures: 1,
            },
            files,
        };

        let text = render_migration_report(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "! a.md: unreadable");
        assert_eq!(lines[1], "~ b.md");
        assert_eq!(lines[2], "  line 4: paragraph");
        assert_eq!(lines[3], "  line 9: list");
        assert!(text.contains("substitutions=2"));
    }

    #[test]
    fn diff_report_shows_source_and_span() {
        plain();
        let mut files = BTreeMap::new();
        files.insert(
            "a.html".to_string(),
            DiffRecord {
                source: Some("docs/a.md".to_string()),
                status: Some(DiffStatus::Divergent),
                span: Some(SourceSpan::new(3, 5)),
                reason: Some("text differs".to_string()),
                error: None,
            },
        );
        let report = DiffReport {
            totals: Default::default(),
            files,
        };
        assert!(render_diff_report(&report)
            .contains("~ a.html <- docs/a.md (lines 3-5): text differs"));
    }

    #[test]
    fn report_json_is_key_ordered() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        let mut report = MigrationReport::default();
        report
            .files
            .insert("z.md".to_string(), FileRecord::failed("x"));
        report
            .files
            .insert("a.md".to_string(), FileRecord::failed("y"));
        write_report(&report, &path).expect("write");

        let json = fs::read_to_string(&path).expect("read");
        let a = json.find("\"a.md\"").expect("a.md");
        let z = json.find("\"z.md\"").expect("z.md");
        assert!(a < z);
    }
}
