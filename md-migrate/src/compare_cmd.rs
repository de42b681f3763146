use std::fs;

use anyhow::{bail, Context, Result};
use html_diff_core::{default_rules, diff_html, format_json, Comparator, CompareOptions};
use md_migrate::report::render_results;
use md_migrate::settings::Settings;

use crate::cli::{CompareArgs, OutputFormat};

pub fn run_compare(args: CompareArgs, settings: &Settings) -> Result<()> {
    let first = fs::read_to_string(&args.first)
        .with_context(|| format!("failed to read {}", args.first.display()))?;
    let second = fs::read_to_string(&args.second)
        .with_context(|| format!("failed to read {}", args.second.display()))?;

    let rules = default_rules();
    let comparator = Comparator::with_options(
        &rules,
        CompareOptions {
            compare_attributes: settings.compare.attributes && !args.no_attributes,
        },
    );
    let result = diff_html(
        args.first.display().to_string(),
        &first,
        &second,
        &comparator,
    );
    let equivalent = result.is_equivalent();
    let results = [result];

    match args.format {
        OutputFormat::Text => println!("{}", render_results(&results)),
        OutputFormat::Json => println!("{}", format_json(&results)),
    }

    if args.strict && !equivalent {
        bail!("compare failed: renderings diverge");
    }
    Ok(())
}
