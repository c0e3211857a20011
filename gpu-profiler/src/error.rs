//! Error types for launching, running and analyzing traces

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProfileError>;

/// Error returned by a registered job function
pub type JobError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProfileError {
    /// The job or its arguments could not be encoded or decoded
    #[error("failed to (de)serialize profile job: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to launch tracer `{}`: {source}", program.display())]
    TracerSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tracer exited with {status}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}")]
    TracerFailed {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    #[error("tracer did not finish within {0:?} and was killed")]
    TracerTimeout(Duration),

    #[error("expected trace output {} is missing", .0.display())]
    MissingArtifact(PathBuf),

    #[error("trace {} has no `run` NVTX range; could the runner load libnvToolsExt?", .0.display())]
    MissingRunRange(PathBuf),

    #[error("trace query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("{what} {id} not found in trace output")]
    NotFound { what: &'static str, id: i64 },

    #[error("invalid time range: start {start} is after end {end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("device {0} reports a zero maximum launch dimension")]
    DegenerateDevice(i64),

    #[error("unknown job `{0}`")]
    UnknownJob(String),

    #[error("job `{name}` failed: {source}")]
    JobFailed {
        name: String,
        #[source]
        source: JobError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
