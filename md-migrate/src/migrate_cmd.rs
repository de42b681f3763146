use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use html_diff_core::{default_rules, Comparator, CompareOptions};
use md_migrate::batch::{run_batch, MigrationJob};
use md_migrate::migrate::{Granularity, Migrator};
use md_migrate::render::{LegacyRenderer, ReplacementRenderer};
use md_migrate::report::{render_migration_report, write_report};
use md_migrate::resolve::{MapResolver, RetryingResolver};
use md_migrate::serialize::MdastSerializer;
use md_migrate::settings::Settings;
use md_migrate::source_map::{load_key_value_map, KeyValueMap};

use crate::cli::MigrateArgs;
use crate::path_guard;

pub fn run_migrate(args: MigrateArgs, settings: &Settings) -> Result<()> {
    let inputs = expand_inputs(&args.inputs)?;
    if inputs.is_empty() {
        bail!("no markdown files matched the given inputs");
    }
    ensure_unique_ids(&inputs)?;

    let jobs: Vec<MigrationJob> = inputs
        .into_iter()
        .map(|(id, input)| {
            let output = match &args.output_dir {
                Some(dir) => dir.join(&id),
                None => input.clone(),
            };
            MigrationJob { id, input, output }
        })
        .collect();
    if !args.in_place {
        let pairs: Vec<(&Path, &Path)> = jobs
            .iter()
            .map(|job| (job.input.as_path(), job.output.as_path()))
            .collect();
        path_guard::ensure_not_overwriting(&pairs)?;
    }

    let xrefs = match &args.xref_map {
        Some(path) => load_key_value_map(path)
            .with_context(|| format!("failed to load xref map {}", path.display()))?,
        None => KeyValueMap::new(),
    };
    let resolver = RetryingResolver::new(
        MapResolver::new(xrefs),
        settings.resolver.attempts,
        Duration::from_millis(settings.resolver.backoff_ms),
    );
    let legacy = LegacyRenderer::new(resolver);
    let replacement = ReplacementRenderer;
    let serializer = MdastSerializer;

    let rules = default_rules();
    let comparator = Comparator::with_options(
        &rules,
        CompareOptions {
            compare_attributes: settings.compare.attributes,
        },
    );
    let granularity = args
        .granularity
        .map(Granularity::from)
        .unwrap_or(settings.batch.granularity);
    let migrator =
        Migrator::new(&legacy, &replacement, &serializer, comparator).with_granularity(granularity);

    let workers = args.jobs.unwrap_or(settings.batch.jobs);
    let report = run_batch(&jobs, &migrator, workers)?;

    if let Some(path) = &args.report {
        write_report(&report, path)?;
    }
    println!("{}", render_migration_report(&report));
    Ok(())
}

/// Resolve inputs to `(report key, path)` pairs.
///
/// Directories contribute every `.md` file beneath them, keyed relative to the directory.
/// Files and glob matches are keyed by their path as given, or by file name when absolute.
fn expand_inputs(inputs: &[String]) -> Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let pattern = path.join("**").join("*.md");
            for file in glob_files(&pattern.to_string_lossy())? {
                let relative = file.strip_prefix(path).unwrap_or(&file);
                out.push((report_key(relative), file.clone()));
            }
        } else if path.is_file() {
            out.push((file_key(path), path.to_path_buf()));
        } else if input.contains(['*', '?', '[']) {
            for file in glob_files(input)? {
                out.push((file_key(&file), file));
            }
        } else {
            bail!("input not found: {input}");
        }
    }
    out.sort_by(|a, b| a.1.cmp(&b.1));
    out.dedup_by(|a, b| a.1 == b.1);
    Ok(out)
}

/// Report keys double as output paths, so two inputs may not share one.
fn ensure_unique_ids(inputs: &[(String, PathBuf)]) -> Result<()> {
    let mut seen: BTreeMap<&str, &Path> = BTreeMap::new();
    for (id, path) in inputs {
        if let Some(previous) = seen.insert(id.as_str(), path.as_path()) {
            bail!(
                "inputs {} and {} both map to {id}; migrate them in separate runs",
                previous.display(),
                path.display()
            );
        }
    }
    Ok(())
}

fn glob_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern).with_context(|| format!("bad pattern {pattern}"))? {
        let path = entry.context("failed to list markdown files")?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn file_key(path: &Path) -> String {
    if path.is_absolute() {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| report_key(path))
    } else {
        report_key(path.strip_prefix(".").unwrap_or(path))
    }
}

fn report_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
