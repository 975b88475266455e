//! twinsync - bidirectional file and directory synchronization
//!
//! Keeps configured pairs of files or directory trees continuously mirrored
//! in both directions: reconciles them on startup, then watches both sides
//! and propagates every change to the other.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use twinsync_config::{Config, ConfigLoader, LoggingConfig};
use twinsync_engine::SyncEngine;

/// twinsync - bidirectional file and directory synchronization
#[derive(Parser)]
#[command(
    name = "twinsync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Bidirectional file and directory synchronization daemon",
    long_about = "twinsync keeps pairs of files or directory trees mirrored in both\n\
                  directions: changes on either side are propagated to the other,\n\
                  with debounced event handling and feedback-loop suppression."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - warnings and errors only
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the synchronization daemon until interrupted
    Run,
    /// Load and validate the configuration, then print the mapping table
    Check,
    /// Write a commented default configuration file
    InitConfig {
        /// Where to write the configuration
        #[arg(default_value = "twinsync.yaml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run => {
            let config = load_config(&cli)?;
            let _guard = init_logging(&cli, &config.logging)?;
            run(config).await
        }
        Commands::Check => {
            let config = load_config(&cli)?;
            let _guard = init_logging(&cli, &LoggingConfig::default())?;
            check(&config)
        }
        Commands::InitConfig { path } => {
            let _guard = init_logging(&cli, &LoggingConfig::default())?;
            init_config(path)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("failed to load '{}'", path.display())),
        None => ConfigLoader::load_default().context("failed to load configuration"),
    }
}

async fn run(config: Config) -> Result<()> {
    let mut engine = SyncEngine::with_config(config);
    engine.start().await?;

    info!("twinsync running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    let status = engine.status();
    engine.stop().await;

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn check(config: &Config) -> Result<()> {
    println!("Base directories:");
    for (key, dir) in &config.base_dirs {
        println!("  {key}: {}", dir.display());
    }
    println!("Mappings:");
    for mapping in config.mappings() {
        let summary = mapping.summary();
        println!(
            "  [{}] {} ({} -> {})",
            summary.kind, summary.name, summary.source, summary.target
        );
    }
    println!("Configuration OK");
    Ok(())
}

fn init_config(path: &PathBuf) -> Result<()> {
    if path.exists() {
        bail!("'{}' already exists, refusing to overwrite", path.display());
    }
    std::fs::write(path, ConfigLoader::default_config_yaml())
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn init_logging(
    cli: &Cli,
    logging: &LoggingConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_level = if cli.quiet {
        "warn".to_string()
    } else if cli.debug || cli.verbose {
        "debug".to_string()
    } else {
        logging.level.clone()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false));

    match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory '{}'", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "sync.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}
