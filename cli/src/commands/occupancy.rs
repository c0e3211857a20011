//! Occupancy command implementation

use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use deepprofile_gpu::NsightAnalyzer;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct OccupancyArgs {
    /// SQLite export holding the device table
    pub database: PathBuf,

    /// Device id as recorded by the tracer
    #[arg(short, long, default_value_t = 0)]
    pub device: i64,

    /// Threads per block (product of the block dimensions)
    #[arg(short, long)]
    pub blocks: u64,

    /// Blocks per grid (product of the grid dimensions)
    #[arg(short, long)]
    pub grids: u64,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: OccupancyArgs) -> Result<()> {
    let analyzer = NsightAnalyzer::open(&args.database)
        .with_context(|| format!("Failed to open trace: {}", args.database.display()))?;

    let limits = analyzer.device_limits(args.device)?;
    let occupancy = analyzer
        .compute_occupancy(args.device, args.blocks, args.grids)
        .context("Failed to compute occupancy")?;

    if args.json {
        return output::print_json(&occupancy);
    }

    output::info(&format!(
        "Device {}: max block {} threads, max grid {} blocks",
        args.device,
        limits.max_block_dim.volume(),
        limits.max_grid_dim.volume()
    ));
    println!("  block occupancy: {:.6}", occupancy.block_occupancy);
    println!("  grid occupancy:  {:.6}", occupancy.grid_occupancy);
    if occupancy.block_occupancy > 1.0 || occupancy.grid_occupancy > 1.0 {
        output::warning("Launch exceeds the device limits");
    }
    Ok(())
}
