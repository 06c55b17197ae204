use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tabmodel::config::Config;
use tabmodel::scenario::{Action, Scenario};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

const VERSION: &str = concat!(
    env!("TABMODEL_BUILD_VERSION"),
    " (",
    compile_time::datetime_str!(),
    ")",
);

/// Drive the tab model with a scripted scenario
#[derive(Parser, Debug)]
#[command(
    version = VERSION,
    about,
    after_long_help = "Examples:\n\
        \x20 tabmodel scenario.json                    Run a scenario and print the final state\n\
        \x20 tabmodel scenario.json --compact          Print the state on a single line\n\
        \x20 tabmodel scenario.json --config cfg.json  Use an explicit config file"
)]
struct Cli {
    /// JSON array of actions to apply
    #[arg()]
    scenario: PathBuf,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the snapshot without pretty formatting
    #[arg(long)]
    compact: bool,
}

const DEFAULT_LOGLEVEL: &str = if cfg!(debug_assertions) {
    "debug"
} else {
    "info"
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    if let Ok(dotenv) = dotenvy::dotenv() {
        eprintln!("Loaded .env file from: {}", dotenv.display());
    }
    init_tracing();

    let config = match &cli.config {
        Some(path) => Config::load_from(path).context("Failed to load config")?,
        None => Config::load(),
    };
    tracing::debug!(?config, "Configuration ready");

    let actions = Action::load_list(&cli.scenario)
        .with_context(|| format!("Failed to load scenario {}", cli.scenario.display()))?;
    tracing::info!(actions = actions.len(), "Running scenario");

    let mut scenario = Scenario::new(&config);
    let snapshot = scenario.run(&actions).context("Scenario aborted")?;

    let output = if cli.compact {
        serde_json::to_string(&snapshot)
    } else {
        serde_json::to_string_pretty(&snapshot)
    }
    .context("Failed to serialize snapshot")?;
    println!("{output}");
    Ok(())
}

fn init_tracing() {
    let env_filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOGLEVEL));

    // stdout carries the snapshot, so logs go to stderr
    let fmt_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry()
        .with(env_filter_layer)
        .with(fmt_layer);

    // On macOS, also log to Console.app via oslog
    #[cfg(target_os = "macos")]
    let registry = registry.with(tracing_oslog::OsLogger::new("dev.tabmodel", "default"));

    registry.init();
}
