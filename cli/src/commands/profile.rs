//! Profile command implementation

use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use deepprofile_gpu::{Launcher, LauncherConfig, NsightAnalyzer};
use deepprofile_shared::types::job::ProfileJob;
use deepprofile_shared::utils::{parse_duration, parse_key_value, parse_value};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Kernels listed in the summary before it is cut short
const SUMMARY_KERNELS: usize = 20;

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Registered job to run (built-ins: noop, sleep, exec)
    pub job: String,

    /// Positional job arguments, read as JSON when they parse
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Keyword argument as key=value (repeatable)
    #[arg(short, long = "kwarg", value_name = "KEY=VALUE")]
    pub kwargs: Vec<String>,

    /// Launcher configuration file (TOML)
    #[arg(short, long, env = "DEEPPROFILE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tracer executable
    #[arg(long)]
    pub tracer: Option<PathBuf>,

    /// Runner executable that hosts the job
    #[arg(long)]
    pub runner: Option<PathBuf>,

    /// Kill the tracer after this long (e.g., "90s", "10m")
    #[arg(long)]
    pub timeout: Option<String>,

    /// Write the full trace report as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Copy the SQLite export here before it is cleaned up
    #[arg(long)]
    pub keep: Option<PathBuf>,
}

pub async fn run(args: ProfileArgs) -> Result<()> {
    let config = launcher_config(&args)?;
    let job = build_job(&args)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]")?);
    spinner.set_message(format!("Profiling `{}`", job.function));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let started = Instant::now();
    let result = Launcher::new(config).run(&job).await;
    spinner.finish_and_clear();
    let session = result.context("Profiling run failed")?;

    output::success(&format!(
        "Traced `{}` in {:.1}s",
        job.function,
        started.elapsed().as_secs_f64()
    ));

    {
        let analyzer = session.analyzer()?;
        summarize(&analyzer)?;

        if let Some(path) = &args.json {
            output::write_json(&analyzer.report()?, path)?;
            output::success(&format!("Report written to {}", path.display()));
        }
    }

    if let Some(path) = &args.keep {
        session
            .persist_copy(path)
            .with_context(|| format!("Failed to keep trace at {}", path.display()))?;
        output::success(&format!("Trace kept at {}", path.display()));
    }

    session.close().context("Failed to remove trace files")?;
    Ok(())
}

fn launcher_config(args: &ProfileArgs) -> Result<LauncherConfig> {
    let mut config = match &args.config {
        Some(path) => LauncherConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => LauncherConfig::default(),
    };

    if let Some(tracer) = &args.tracer {
        config.tracer = tracer.clone();
    }
    if let Some(runner) = &args.runner {
        config.runner = runner.clone();
    }
    if let Some(timeout) = &args.timeout {
        let timeout = parse_duration(timeout).context("Failed to parse timeout")?;
        config.timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
    }

    Ok(config)
}

fn build_job(args: &ProfileArgs) -> Result<ProfileJob> {
    let mut job = ProfileJob::new(&args.job);
    job.args = args.args.iter().map(|raw| parse_value(raw)).collect();
    for pair in &args.kwargs {
        let (key, value) = parse_key_value(pair)?;
        job.kwargs.insert(key, value);
    }
    Ok(job)
}

fn summarize(analyzer: &NsightAnalyzer) -> Result<()> {
    match analyzer.run_range()? {
        Some(range) => output::info(&format!(
            "Run range {} ({:.3} ms)",
            range,
            range.duration_ns() as f64 / 1e6
        )),
        None => output::warning("No `run` range recorded; was the NVTX library found?"),
    }

    let nvtx = analyzer.nvtx_events(None)?;
    let gpus = analyzer.gpu_info()?;
    output::info(&format!("{} NVTX events, {} devices", nvtx.len(), gpus.len()));

    let kernels = match analyzer.kernel_occupancies(None) {
        Ok(kernels) => kernels,
        Err(e) => {
            output::warning(&format!("Occupancy unavailable: {}", e));
            return Ok(());
        }
    };
    if kernels.is_empty() {
        output::warning("No kernel launches recorded");
        return Ok(());
    }

    output::info(&format!("{} kernel launches", kernels.len()));
    for kernel in kernels.iter().take(SUMMARY_KERNELS) {
        println!(
            "  {:<40} dev {} {:>10} ns  block {:>6.3}  grid {:>6.3}",
            kernel.name,
            kernel.device_id,
            kernel.end - kernel.start,
            kernel.occupancy.block_occupancy,
            kernel.occupancy.grid_occupancy,
        );
    }
    if kernels.len() > SUMMARY_KERNELS {
        println!("  ... {} more", kernels.len() - SUMMARY_KERNELS);
    }

    Ok(())
}
