//! pgferry CLI - MySQL/SQLite to PostgreSQL migration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pgferry::{Config, MigrateError, Migrator};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pgferry")]
#[command(about = "MySQL/SQLite to PostgreSQL migration tool")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Path to the migration TOML config file
    config: Option<PathBuf>,

    /// Path to the migration TOML config file (alternative to the positional)
    #[arg(long = "config", value_name = "PATH")]
    config_flag: Option<PathBuf>,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the build version
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("pgferry {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    setup_logging(&cli.verbosity);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e.format_detailed());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), MigrateError> {
    // The positional path takes precedence over --config.
    let config_path = cli.config.or(cli.config_flag).ok_or_else(|| {
        MigrateError::Config(
            "config file required: pgferry <config.toml> or pgferry --config <config.toml>"
                .to_string(),
        )
    })?;

    let config = Config::load(&config_path)?;
    info!("loaded configuration from {}", config_path.display());

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let migrator = Migrator::new(config)?;
    migrator.run(cancel).await
}

fn setup_logging(verbosity: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling...");
            cancel.cancel();
        }
    });
}
