use std::path::Path;

use anyhow::{bail, Context, Result};
use html_diff_core::{default_rules, Comparator, CompareOptions};
use md_migrate::batch::{run_diff_batch, DiffJob};
use md_migrate::report::{render_diff_report, write_report};
use md_migrate::settings::Settings;
use md_migrate::source_map::{load_key_value_map, KeyValueMap};
use tracing::debug;

use crate::cli::{DiffArgs, OutputFormat};

pub fn run_diff(args: DiffArgs, settings: &Settings) -> Result<()> {
    for dir in [&args.first_dir, &args.second_dir] {
        if !dir.is_dir() {
            bail!("not a directory: {}", dir.display());
        }
    }
    let source_map = match &args.source_map {
        Some(path) => load_key_value_map(path)
            .with_context(|| format!("failed to load source map {}", path.display()))?,
        None => KeyValueMap::new(),
    };

    // A single targeted case runs on one worker so its logs stay readable.
    let (jobs, workers) = match &args.file {
        Some(file) => {
            let id = report_key(file);
            let job = DiffJob {
                id,
                first: args.first_dir.join(file),
                second: args.second_dir.join(file),
            };
            if !job.first.is_file() {
                bail!("not a file: {}", job.first.display());
            }
            (vec![job], 1)
        }
        None => (
            collect_pairs(&args.first_dir, &args.second_dir)?,
            args.jobs.unwrap_or(settings.batch.jobs),
        ),
    };
    debug!(pairs = jobs.len(), workers, "comparing rendered trees");

    let rules = default_rules();
    let comparator = Comparator::with_options(
        &rules,
        CompareOptions {
            compare_attributes: settings.compare.attributes && !args.no_attributes,
        },
    );
    let report = run_diff_batch(&jobs, &comparator, &source_map, workers)?;

    if let Some(path) = &args.report {
        write_report(&report, path)?;
    }
    match args.format {
        OutputFormat::Text => println!("{}", render_diff_report(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if args.strict && report.totals.divergent > 0 {
        bail!(
            "diff failed in strict mode: {} divergent files",
            report.totals.divergent
        );
    }
    Ok(())
}

fn collect_pairs(first_dir: &Path, second_dir: &Path) -> Result<Vec<DiffJob>> {
    let pattern = first_dir.join("**").join("*.html");
    let pattern = pattern.to_string_lossy();
    let mut jobs = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("bad pattern {pattern}"))? {
        let first = entry.context("failed to list rendered files")?;
        let relative = first
            .strip_prefix(first_dir)
            .with_context(|| format!("{} is outside {}", first.display(), first_dir.display()))?
            .to_path_buf();
        jobs.push(DiffJob {
            id: report_key(&relative),
            second: second_dir.join(&relative),
            first,
        });
    }
    Ok(jobs)
}

fn report_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
