//! Neutryx script runner.
//!
//! Command-line entry point for the payoff language.
//!
//! # Commands
//!
//! - `neutryx-script run` - evaluate the configured script and print its NPV
//! - `neutryx-script step` - execute the script one statement at a time
//! - `neutryx-script dates` - list the simulation dates the script needs
//! - `neutryx-script price --portfolio <file> --library <file>` - price a
//!   portfolio of scripted trades
//!
//! Market, Monte Carlo parameters, model choice, script and trade data come
//! from one TOML file (`--config`, default `script.toml`).

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;

/// Neutryx payoff script runner
#[derive(Parser)]
#[command(name = "neutryx-script")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "script.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

/// Report format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON document
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the configured script
    Run {
        /// Override the number of Monte Carlo paths
        #[arg(short, long)]
        samples: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Execute the script statement by statement, printing the context
    Step {
        /// Override the number of Monte Carlo paths
        #[arg(short, long)]
        samples: Option<usize>,
    },

    /// List the simulation dates required by the script
    Dates,

    /// Price a portfolio of scripted trades
    Price {
        /// Path to the portfolio file (`[[trade]]` tables)
        #[arg(short, long)]
        portfolio: String,

        /// Path to the script library (`[[script]]` tables)
        #[arg(short, long)]
        library: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    debug!(config = %cli.config, "loading configuration");
    let config = config::RunConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run { samples, format } => commands::run::run(&config, samples, format),
        Commands::Step { samples } => commands::step::run(&config, samples),
        Commands::Dates => commands::dates::run(&config),
        Commands::Price {
            portfolio,
            library,
            format,
        } => commands::price::run(&config, &portfolio, &library, format),
    }
}
