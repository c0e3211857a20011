//! Launcher configuration
//!
//! Defaults are taken from `DEEPPROFILE_*` environment variables; a TOML file
//! may override any field.

use crate::error::{ProfileError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the shipped runner binary
pub const RUNNER_BIN: &str = "deepprofile-runner";

/// Trace categories enabled when none are configured
pub const DEFAULT_TRACE: &[&str] = &["cuda", "nvtx", "osrt", "cudnn"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Tracer executable (`nsys`)
    pub tracer: PathBuf,

    /// Runner executable started inside the tracer
    pub runner: PathBuf,

    /// Trace categories passed to `--trace`
    pub trace: Vec<String>,

    /// Enable CPU sampling
    pub sample_cpu: bool,

    /// Track CUDA memory usage
    pub cuda_memory_usage: bool,

    /// Kill the tracer if it runs longer than this (None = wait forever)
    pub timeout_ms: Option<u64>,

    /// Directory for payloads and trace output (None = system temp dir)
    pub temp_dir: Option<PathBuf>,

    /// Additional tracer flags, placed before the traced command
    pub extra_args: Vec<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            tracer: std::env::var_os("DEEPPROFILE_NSYS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("nsys")),
            runner: std::env::var_os("DEEPPROFILE_RUNNER")
                .map(PathBuf::from)
                .unwrap_or_else(default_runner),
            trace: DEFAULT_TRACE.iter().map(|s| s.to_string()).collect(),
            sample_cpu: true,
            cuda_memory_usage: true,
            timeout_ms: std::env::var("DEEPPROFILE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok()),
            temp_dir: std::env::var_os("DEEPPROFILE_TMPDIR").map(PathBuf::from),
            extra_args: Vec::new(),
        }
    }
}

/// The runner installed next to the current executable, else whatever is on PATH
fn default_runner() -> PathBuf {
    std::env::current_exe()
        .ok()
        .map(|exe| exe.with_file_name(RUNNER_BIN))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(RUNNER_BIN))
}

impl LauncherConfig {
    /// Load a configuration file, filling unspecified fields with defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| ProfileError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Temp root used for payloads and output directories
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.trace.is_empty() {
            return Err(ProfileError::InvalidConfig(
                "at least one trace category is required".to_string(),
            ));
        }

        // The runner's `run` range is only recorded with NVTX tracing on
        if !self.trace.iter().any(|t| t == "nvtx") {
            return Err(ProfileError::InvalidConfig(
                "trace categories must include `nvtx`".to_string(),
            ));
        }

        if self.timeout_ms == Some(0) {
            return Err(ProfileError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
