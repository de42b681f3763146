//! Parallel drivers over many files.
//!
//! Files are independent units spread over a bounded worker pool. Each file is processed by
//! one worker from start to end, so per-file audit order is document order; only the shared
//! aggregates are locked.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use html_diff_core::{diff_html, Comparator, DiffStatus};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;
use tracing::{info, warn};

use crate::migrate::{FileMigration, Migrator};
use crate::report::{
    DiffRecord, DiffReport, DiffTotals, FileRecord, MigrationReport, MigrationTotals,
};
use crate::source_map::{lookup_source, KeyValueMap};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] ThreadPoolBuildError),
}

/// One markdown file to migrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationJob {
    /// Report key, usually the path relative to the input root.
    pub id: String,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// One pair of rendered HTML files to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffJob {
    pub id: String,
    pub first: PathBuf,
    pub second: PathBuf,
}

fn pool(workers: usize) -> Result<ThreadPool, BatchError> {
    Ok(ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()?)
}

/// Migrate every job, writing outputs and collecting a report.
///
/// Unreadable or unwritable files become failed records; nothing aborts the batch.
pub fn run_batch(
    jobs: &[MigrationJob],
    migrator: &Migrator<'_>,
    workers: usize,
) -> Result<MigrationReport, BatchError> {
    let pool = pool(workers)?;
    let files = Mutex::new(BTreeMap::new());
    let changed = AtomicUsize::new(0);
    let substitutions = AtomicUsize::new(0);
    let unit_failures = AtomicUsize::new(0);
    let file_failures = AtomicUsize::new(0);

    info!(files = jobs.len(), workers, "migration batch started");
    pool.install(|| {
        jobs.par_iter().for_each(|job| {
            let record = match migrate_job(job, migrator) {
                Ok(migration) => {
                    if migration.changed {
                        changed.fetch_add(1, Ordering::Relaxed);
                    }
                    substitutions.fetch_add(migration.entries.len(), Ordering::Relaxed);
                    unit_failures.fetch_add(migration.failures.len(), Ordering::Relaxed);
                    FileRecord::from(migration)
                }
                Err(err) => {
                    warn!(file = %job.id, error = %err, "file skipped");
                    file_failures.fetch_add(1, Ordering::Relaxed);
                    FileRecord::failed(err.to_string())
                }
            };
            files
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(job.id.clone(), record);
        });
    });

    let report = MigrationReport {
        totals: MigrationTotals {
            files: jobs.len(),
            changed: changed.into_inner(),
            substitutions: substitutions.into_inner(),
            unit_failures: unit_failures.into_inner(),
            file_failures: file_failures.into_inner(),
        },
        files: files.into_inner().unwrap_or_else(PoisonError::into_inner),
    };
    info!(
        files = report.totals.files,
        changed = report.totals.changed,
        substitutions = report.totals.substitutions,
        "migration batch finished"
    );
    Ok(report)
}

fn migrate_job(job: &MigrationJob, migrator: &Migrator<'_>) -> io::Result<FileMigration> {
    let markdown = fs::read_to_string(&job.input)?;
    let migration = migrator.migrate_file(&job.id, &markdown);
    if migration.changed || job.output != job.input {
        if let Some(parent) = job.output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&job.output, &migration.output)?;
    }
    Ok(migration)
}

/// Compare every pair and collect a report.
pub fn run_diff_batch(
    jobs: &[DiffJob],
    comparator: &Comparator<'_>,
    source_map: &KeyValueMap,
    workers: usize,
) -> Result<DiffReport, BatchError> {
    let pool = pool(workers)?;
    let files = Mutex::new(BTreeMap::new());
    let equivalent = AtomicUsize::new(0);
    let divergent = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    info!(files = jobs.len(), workers, "diff batch started");
    pool.install(|| {
        jobs.par_iter().for_each(|job| {
            let source = lookup_source(source_map, &job.id).map(str::to_string);
            let record = match read_pair(job) {
                Ok((first, second)) => {
                    let result = diff_html(job.id.as_str(), &first, &second, comparator);
                    match result.status {
                        DiffStatus::Equivalent => equivalent.fetch_add(1, Ordering::Relaxed),
                        DiffStatus::Divergent => divergent.fetch_add(1, Ordering::Relaxed),
                    };
                    DiffRecord::from_result(&result, source)
                }
                Err(err) => {
                    warn!(file = %job.id, error = %err, "pair skipped");
                    failed.fetch_add(1, Ordering::Relaxed);
                    DiffRecord::failed(source, err.to_string())
                }
            };
            files
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(job.id.clone(), record);
        });
    });

    let report = DiffReport {
        totals: DiffTotals {
            files: jobs.len(),
            equivalent: equivalent.into_inner(),
            divergent: divergent.into_inner(),
            failed: failed.into_inner(),
        },
        files: files.into_inner().unwrap_or_else(PoisonError::into_inner),
    };
    info!(
        equivalent = report.totals.equivalent,
        divergent = report.totals.divergent,
        "diff batch finished"
    );
    Ok(report)
}

fn read_pair(job: &DiffJob) -> io::Result<(String, String)> {
    let first = fs::read_to_string(&job.first)?;
    let second = fs::read_to_string(&job.second)?;
    Ok((first, second))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use html_diff_core::{default_rules, Comparator, DiffStatus};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::{run_batch, run_diff_batch, DiffJob, MigrationJob};
    use crate::migrate::Migrator;
    use crate::render::{MarkdownRenderer, RenderError};
    use crate::serialize::{SerializeError, TokenSerializer};
    use crate::source_map::KeyValueMap;

    struct Echo {
        skip: Option<char>,
    }

    impl MarkdownRenderer for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn render(&self, markdown: &str, _file: &str) -> Result<String, RenderError> {
            let text: String = markdown
                .trim()
                .chars()
                .filter(|c| Some(*c) != self.skip)
                .collect();
            Ok(format!("<p>{text}</p>"))
        }
    }

    struct Unpercent;

    impl TokenSerializer for Unpercent {
        fn serialize(&self, source: &str) -> Result<String, SerializeError> {
            Ok(source.replace('%', ""))
        }
    }

    #[test]
    fn batch_migrates_files_in_parallel() {
        let dir = tempdir().expect("tempdir");
        let out = dir.path().join("out");
        let mut jobs = Vec::new();
        for i in 0..8 {
            let input = dir.path().join(format!("f{i}.md"));
            let body = if i % 2 == 0 { "a%\n\nb\n" } else { "a\n\nb\n" };
            fs::write(&input, body).expect("write");
            jobs.push(MigrationJob {
                id: format!("f{i}.md"),
                input,
                output: out.join(format!("f{i}.md")),
            });
        }
        jobs.push(MigrationJob {
            id: "missing.md".to_string(),
            input: dir.path().join("missing.md"),
            output: out.join("missing.md"),
        });

        let rules = default_rules();
        let legacy = Echo { skip: None };
        let replacement = Echo { skip: Some('%') };
        let migrator = Migrator::new(&legacy, &replacement, &Unpercent, Comparator::new(&rules));
        let report = run_batch(&jobs, &migrator, 4).expect("batch");

        assert_eq!(report.totals.files, 9);
        assert_eq!(report.totals.changed, 4);
        assert_eq!(report.totals.substitutions, 4);
        assert_eq!(report.totals.file_failures, 1);
        assert!(report.files["missing.md"].error.is_some());
        assert_eq!(
            fs::read_to_string(out.join("f0.md")).expect("read"),
            "a\n\nb\n"
        );
        assert_eq!(
            fs::read_to_string(out.join("f1.md")).expect("read"),
            "a\n\nb\n"
        );
    }

    #[test]
    fn diff_batch_uses_source_map() {
        let dir = tempdir().expect("tempdir");
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::create_dir_all(&first).expect("mkdir");
        fs::create_dir_all(&second).expect("mkdir");
        fs::write(first.join("a.html"), "<p>same</p>").expect("write");
        fs::write(second.join("a.html"), "<p>\n  same\n</p>").expect("write");
        fs::write(first.join("b.html"), "<p>old</p>").expect("write");
        fs::write(second.join("b.html"), "<p>new</p>").expect("write");

        let jobs: Vec<DiffJob> = ["a.html", "b.html", "c.html"]
            .into_iter()
            .map(|id| DiffJob {
                id: id.to_string(),
                first: first.join(id),
                second: second.join(id),
            })
            .collect();
        let mut map = KeyValueMap::new();
        map.insert("b.html".to_string(), "docs/b.md".to_string());

        let rules = default_rules();
        let report =
            run_diff_batch(&jobs, &Comparator::new(&rules), &map, 2).expect("diff batch");
        assert_eq!(report.totals.equivalent, 1);
        assert_eq!(report.totals.divergent, 1);
        assert_eq!(report.totals.failed, 1);
        assert_eq!(report.files["b.html"].status, Some(DiffStatus::Divergent));
        assert_eq!(report.files["b.html"].source.as_deref(), Some("docs/b.md"));
    }
}
