//! GPU profiling harness
//!
//! Runs a job out of process under Nsight Systems and reads back the
//! SQLite export:
//!
//! - [`launcher`] writes the job payload, starts the tracer around the runner
//!   binary and hands back a [`TraceSession`] that owns the output
//! - [`runner`] is the traced side: it executes a registered job inside the
//!   NVTX range `run`
//! - [`analyzer`] queries the export (NVTX ranges, kernel launches, devices,
//!   generic events, occupancy)

pub mod analyzer;
pub mod config;
pub mod error;
pub mod launcher;
pub mod nvtx;
pub mod runner;

pub use analyzer::{NsightAnalyzer, Record, TraceReport};
pub use config::LauncherConfig;
pub use error::{ProfileError, Result};
pub use launcher::{Launcher, TraceSession};
pub use runner::JobRegistry;

use deepprofile_shared::types::job::ProfileJob;

/// Run `job` under the tracer with `config`.
///
/// The returned session removes the trace output when dropped.
pub async fn run(config: LauncherConfig, job: &ProfileJob) -> Result<TraceSession> {
    Launcher::new(config).run(job).await
}
