//! topomap - live Kubernetes topology graphs
//!
//! Ingests namespace-partitioned topology snapshots, lays them out as a
//! layered DAG, and emits renderer-ready JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use topomap::cli::{self, ConfigSubcommand, ViewArgs};
use topomap::config::ConfigLoader;

/// topomap - live Kubernetes topology graphs
#[derive(Parser, Debug)]
#[command(name = "topomap")]
#[command(about = "Lay out Kubernetes topology snapshots as renderer-ready graphs", long_about = None)]
struct Args {
    /// Enable debug logging to a temp file
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Lay out one payload and print the render model as JSON
    Render {
        /// Payload file, or "-" for stdin
        input: String,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Print the namespace index of a payload
    Namespaces {
        /// Payload file, or "-" for stdin
        input: String,
    },
    /// Stream newline-delimited payloads and print a render model per message
    Replay {
        /// Newline-delimited JSON file, or "-" for stdin
        input: String,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = cli::init_logging(args.debug);
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    match args.command {
        Command::Config { subcommand } => cli::handle_config_command(subcommand),
        Command::Version => {
            cli::display_version();
            Ok(())
        }
        Command::Render { input, view } => {
            let config = load_config()?;
            cli::handle_render(&input, &view, &config)
        }
        Command::Namespaces { input } => {
            let config = load_config()?;
            cli::handle_namespaces(&input, &config)
        }
        Command::Replay { input, view } => {
            let config = load_config()?;
            cli::handle_replay(&input, &view, &config).await
        }
    }
}

fn load_config() -> Result<topomap::config::Config> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    ConfigLoader::validate(&config)?;
    tracing::debug!(
        "Configuration loaded: engine={}, direction={}, defaultNamespace={}",
        config.layout.engine,
        config.layout.direction,
        config.default_namespace
    );
    Ok(config)
}
