//! Runner executed inside the tracer
//!
//! Reads the job payload named by `--runfile` and executes one of the
//! built-in jobs inside the NVTX range `run`.

use deepprofile_gpu::runner::{self, JobRegistry};
use std::process::ExitCode;

fn main() -> ExitCode {
    runner::main_with(JobRegistry::with_builtins())
}
