use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use md_migrate::migrate::Granularity;

#[derive(Parser, Debug)]
#[command(name = "md-migrate")]
#[command(about = "Compare markdown renderer output and migrate sources between renderers")]
pub struct Cli {
    /// Optional settings TOML file.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,
    /// Log debug events to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Compare two rendered HTML fragments.
    Compare(CompareArgs),
    /// Compare two directories of rendered HTML file by file.
    Diff(DiffArgs),
    /// Migrate markdown files, keeping every unit that renders equivalently.
    Migrate(MigrateArgs),
}

#[derive(Parser, Debug)]
pub struct CompareArgs {
    pub first: PathBuf,
    pub second: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Compare tag names and text only.
    #[arg(long)]
    pub no_attributes: bool,
    /// Exit with an error when the fragments diverge.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct DiffArgs {
    pub first_dir: PathBuf,
    pub second_dir: PathBuf,
    /// TOML `[map]` of rendered file to markdown source, used in reports.
    #[arg(long)]
    pub source_map: Option<PathBuf>,
    /// Write the JSON report here.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Worker count.
    #[arg(long)]
    pub jobs: Option<usize>,
    /// Compare only this file, relative to both directories.
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[arg(long)]
    pub no_attributes: bool,
    /// Exit with an error when any pair diverges.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Markdown files, directories or glob patterns.
    #[arg(required = true)]
    pub inputs: Vec<String>,
    /// Write migrated files under this directory.
    #[arg(long, required_unless_present = "in_place", conflicts_with = "in_place")]
    pub output_dir: Option<PathBuf>,
    /// Rewrite input files in place.
    #[arg(long)]
    pub in_place: bool,
    /// Write the JSON report here.
    #[arg(long)]
    pub report: Option<PathBuf>,
    #[arg(long)]
    pub jobs: Option<usize>,
    #[arg(long, value_enum)]
    pub granularity: Option<GranularityArg>,
    /// TOML `[map]` of cross-reference uid to URL.
    #[arg(long)]
    pub xref_map: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum GranularityArg {
    Token,
    File,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Token => Granularity::Token,
            GranularityArg::File => Granularity::File,
        }
    }
}
