use anyhow::{Context, Result};
use clap::Parser;
use md_migrate::settings::{load_settings, Settings};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod cli;
mod compare_cmd;
mod diff_cmd;
mod migrate_cmd;
mod path_guard;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match &cli.settings {
        Some(path) => load_settings(path)
            .with_context(|| format!("failed to load settings {}", path.display()))?,
        None => Settings::default(),
    };

    match cli.command {
        Command::Compare(args) => compare_cmd::run_compare(args, &settings),
        Command::Diff(args) => diff_cmd::run_diff(args, &settings),
        Command::Migrate(args) => migrate_cmd::run_migrate(args, &settings),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
        .init();
}
