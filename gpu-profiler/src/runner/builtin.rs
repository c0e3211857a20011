//! Jobs known to the shipped runner

use super::JobRegistry;
use crate::error::JobError;
use deepprofile_shared::types::job::ProfileJob;
use serde_json::Value;
use std::process::Command;
use std::time::Duration;
use tracing::info;

pub fn register_all(registry: &mut JobRegistry) {
    registry
        .register("noop", noop)
        .register("sleep", sleep)
        .register("exec", exec);
}

/// Does nothing; useful to measure tracer overhead
fn noop(_job: &ProfileJob) -> Result<(), JobError> {
    Ok(())
}

/// Sleep for `ms` milliseconds (keyword, or first positional argument)
fn sleep(job: &ProfileJob) -> Result<(), JobError> {
    let ms: u64 = match job.kwarg("ms")? {
        Some(ms) => ms,
        None => job.arg(0)?.ok_or("sleep requires `ms`")?,
    };
    std::thread::sleep(Duration::from_millis(ms));
    Ok(())
}

/// Run a command inside the traced process and wait for it.
///
/// Positional arguments are the program followed by its arguments; non-string
/// values are passed in their JSON form.
fn exec(job: &ProfileJob) -> Result<(), JobError> {
    let argv: Vec<String> = job
        .args
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    let (program, rest) = argv.split_first().ok_or("exec requires a program")?;

    info!("Executing {} {:?}", program, rest);
    let status = Command::new(program).args(rest).status()?;
    if !status.success() {
        return Err(format!("`{}` exited with {}", program, status).into());
    }
    Ok(())
}
