use clap::Parser;
use keystone_core::ConfigLoader;
use std::path::PathBuf;

mod commands;
mod execute;

use commands::Commands;

#[derive(Parser)]
#[command(name = "keystone")]
#[command(about = "Inspect and maintain keystone cache entries and lock records", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $KEYSTONE_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { keystone_utils::tracing::DEFAULT_FILTER };
    keystone_utils::tracing::init_with(filter).map_err(|e| eyre::eyre!(e))?;

    let config = match &cli.config {
        Some(path) => ConfigLoader::apply_env(ConfigLoader::load_from_path(path)?, |name| {
            std::env::var(name).ok()
        })?,
        None => ConfigLoader::load()?,
    };
    tracing::debug!(source = ?config.source, "configuration loaded");

    cli.command.execute(config).await
}
