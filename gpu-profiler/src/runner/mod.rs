//! Runner side of a profiling run
//!
//! The runner is the process the tracer wraps. It reads a [`ProfileJob`] from
//! the payload file named by `--runfile`, looks the function up in a
//! [`JobRegistry`], and executes it inside the NVTX range [`RUN_RANGE`].
//!
//! The shipped `deepprofile-runner` binary only knows the built-in jobs.
//! Programs with their own workloads build a runner of their own:
//!
//! ```rust,ignore
//! fn main() -> std::process::ExitCode {
//!     let mut registry = JobRegistry::with_builtins();
//!     registry.register("matmul", |job| {
//!         let n: u64 = job.kwarg("n")?.unwrap_or(1024);
//!         my_kernels::matmul(n);
//!         Ok(())
//!     });
//!     deepprofile_gpu::runner::main_with(registry)
//! }
//! ```

pub mod builtin;

use crate::error::{JobError, ProfileError, Result};
use crate::nvtx;
use clap::Parser;
use deepprofile_shared::types::job::{ProfileJob, RUN_RANGE};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Flag naming the payload file
pub const RUNFILE_FLAG: &str = "--runfile";

/// A function the runner can execute by name
pub type JobFn = Box<dyn Fn(&ProfileJob) -> std::result::Result<(), JobError> + Send + Sync>;

/// Functions available to the runner, keyed by name
#[derive(Default)]
pub struct JobRegistry {
    jobs: BTreeMap<String, JobFn>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in jobs
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register a job, replacing any job with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&ProfileJob) -> std::result::Result<(), JobError> + Send + Sync + 'static,
    {
        self.jobs.insert(name.into(), Box::new(f));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Registered job names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    /// Execute `job` inside the `run` NVTX range
    pub fn execute(&self, job: &ProfileJob) -> Result<()> {
        let f = self
            .jobs
            .get(&job.function)
            .ok_or_else(|| ProfileError::UnknownJob(job.function.clone()))?;

        info!("Running job {}", job.function);
        let _range = nvtx::push_range(RUN_RANGE);
        f(job).map_err(|source| ProfileError::JobFailed {
            name: job.function.clone(),
            source,
        })
    }
}

/// Read the job written by the launcher
pub fn read_payload(path: &Path) -> Result<ProfileJob> {
    let bytes = std::fs::read(path)?;
    Ok(ProfileJob::from_payload(&bytes)?)
}

/// Load the payload at `path` and execute it
pub fn run_payload(registry: &JobRegistry, path: &Path) -> Result<()> {
    let job = read_payload(path)?;
    registry.execute(&job)
}

#[derive(Parser, Debug)]
#[command(name = "deepprofile-runner")]
#[command(about = "Executes one profile job inside the tracer", long_about = None)]
#[command(version)]
struct RunnerArgs {
    /// Payload file written by the launcher
    #[arg(long)]
    runfile: PathBuf,
}

/// Entry point for runner binaries
pub fn main_with(registry: JobRegistry) -> ExitCode {
    let args = RunnerArgs::parse();

    init_tracing();

    match run_payload(&registry, &args.runfile) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_execute_registered_job() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut registry = JobRegistry::new();
        registry.register("count", move |job| {
            let step: u32 = job.kwarg("step")?.unwrap_or(1);
            counter.fetch_add(step, Ordering::Relaxed);
            Ok(())
        });

        let job = ProfileJob::new("count").with_kwarg("step", 3).unwrap();
        registry.execute(&job).unwrap();
        registry.execute(&job).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn test_unknown_job() {
        let registry = JobRegistry::new();
        let err = registry.execute(&ProfileJob::new("missing")).unwrap_err();
        assert!(matches!(err, ProfileError::UnknownJob(name) if name == "missing"));
    }

    #[test]
    fn test_job_failure_is_wrapped() {
        let mut registry = JobRegistry::new();
        registry.register("fail", |_| Err("boom".into()));

        let err = registry.execute(&ProfileJob::new("fail")).unwrap_err();
        assert!(matches!(err, ProfileError::JobFailed { ref name, .. } if name == "fail"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_run_payload_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, ProfileJob::new("noop").to_payload().unwrap()).unwrap();

        let registry = JobRegistry::with_builtins();
        run_payload(&registry, &path).unwrap();
    }

    #[test]
    fn test_run_payload_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = run_payload(&JobRegistry::with_builtins(), &path).unwrap_err();
        assert!(matches!(err, ProfileError::Serialization(_)));

        let err = run_payload(&JobRegistry::with_builtins(), &dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, ProfileError::Io(_)));
    }

    #[test]
    fn test_runner_args() {
        let args = RunnerArgs::try_parse_from(["deepprofile-runner", RUNFILE_FLAG, "/tmp/job.json"])
            .unwrap();
        assert_eq!(args.runfile, PathBuf::from("/tmp/job.json"));

        assert!(RunnerArgs::try_parse_from(["deepprofile-runner"]).is_err());
        assert!(
            RunnerArgs::try_parse_from(["deepprofile-runner", "--runfile", "a", "--other"]).is_err()
        );
    }
}
