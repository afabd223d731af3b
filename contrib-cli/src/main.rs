//! contrib - browse the published contribution catalog
//!
//! Thin host around `contrib_core`: loads the listing config, refreshes the
//! catalog and prints what the listing knows.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

mod catalog_cli;

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "contrib",
    about = "Browse libraries, modes and tools from the contribution catalog",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: catalog_cli::CatalogSubcommand,

    /// Catalog URL or local path (overrides the configured catalog)
    #[clap(long, global = true)]
    catalog: Option<String>,

    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,
}

fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level);

    cli.command.execute(cli.catalog.as_deref()).await
}
