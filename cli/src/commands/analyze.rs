//! Analyze command implementation

use crate::output;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use deepprofile_gpu::NsightAnalyzer;
use deepprofile_shared::types::trace::TimeRange;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Table {
    /// NVTX ranges and marks
    Nvtx,
    /// Kernel launches with resolved names
    Kernels,
    /// Device properties
    Gpus,
    /// User-level generic events
    Generic,
    /// Per-kernel block/grid occupancy
    Occupancy,
    /// Everything above in one document
    Report,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// SQLite export to read
    pub database: PathBuf,

    /// Which records to print
    #[arg(short, long, value_enum, default_value_t = Table::Report)]
    pub table: Table,

    /// Keep only events inside START:END (nanoseconds, inclusive)
    #[arg(short, long, value_name = "START:END")]
    pub range: Option<TimeRange>,

    /// Only events inside the recorded `run` range
    #[arg(long, conflicts_with = "range")]
    pub run_only: bool,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let analyzer = NsightAnalyzer::open(&args.database)
        .with_context(|| format!("Failed to open trace: {}", args.database.display()))?;

    let value = collect(&analyzer, &args)?;
    match &args.output {
        Some(path) => {
            output::write_json(&value, path)?;
            output::success(&format!("Wrote {}", path.display()));
        }
        None => output::print_json(&value)?,
    }
    Ok(())
}

fn collect(analyzer: &NsightAnalyzer, args: &AnalyzeArgs) -> Result<Value> {
    let range = if args.run_only {
        let run = analyzer.run_range()?;
        if run.is_none() {
            output::warning("No `run` range recorded; reading the whole trace");
        }
        run
    } else {
        args.range
    };

    if range.is_some() && matches!(args.table, Table::Gpus | Table::Generic | Table::Report) {
        output::warning("Range filter does not apply to this table");
    }

    let value = match args.table {
        Table::Nvtx => serde_json::to_value(analyzer.nvtx_events(range)?)?,
        Table::Kernels => serde_json::to_value(analyzer.cupti_kernel_events(range)?)?,
        Table::Gpus => serde_json::to_value(analyzer.gpu_info()?)?,
        Table::Generic => serde_json::to_value(analyzer.generic_events()?)?,
        Table::Occupancy => serde_json::to_value(analyzer.kernel_occupancies(range)?)?,
        Table::Report => serde_json::to_value(analyzer.report()?)?,
    };
    Ok(value)
}
