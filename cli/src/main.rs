//! CLI for deepprofile
//!
//! Commands:
//! - profile: Run a job under Nsight Systems and summarize the trace
//! - analyze: Dump records from an existing SQLite export
//! - occupancy: Compute block/grid occupancy against a recorded device

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "deepprofile")]
#[command(about = "deepprofile - GPU profiling harness for Nsight Systems", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job under the tracer
    Profile(commands::profile::ProfileArgs),

    /// Print records from a trace export as JSON
    Analyze(commands::analyze::AnalyzeArgs),

    /// Compute occupancy for a launch configuration
    Occupancy(commands::occupancy::OccupancyArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.command {
        Commands::Profile(args) => commands::profile::run(args).await,
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Occupancy(args) => commands::occupancy::run(args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
