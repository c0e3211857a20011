//! Launcher side of a profiling run
//!
//! [`Launcher::run`] writes the job payload, starts the tracer around the
//! runner binary, waits for it and returns a [`TraceSession`]. The session
//! owns every temporary artifact of the run and removes them when it is
//! closed or dropped. If the run fails, nothing is left behind.

use crate::analyzer::NsightAnalyzer;
use crate::config::LauncherConfig;
use crate::error::{ProfileError, Result};
use crate::runner::RUNFILE_FLAG;
use deepprofile_shared::types::job::ProfileJob;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::{NamedTempFile, TempDir};
use tokio::process::Command;
use tracing::{debug, info};

/// Output prefix handed to the tracer, relative to the session directory
const OUTPUT_STEM: &str = "profile";

/// Starts jobs under the tracer
#[derive(Debug, Clone)]
pub struct Launcher {
    config: LauncherConfig,
}

impl Launcher {
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Tracer arguments for one run
    pub fn tracer_args(&self, output_prefix: &Path, payload: &Path) -> Vec<OsString> {
        let config = &self.config;

        let mut args: Vec<OsString> = vec![
            "profile".into(),
            format!("--trace={}", config.trace.join(",")).into(),
            format!(
                "--sample={}",
                if config.sample_cpu { "cpu" } else { "none" }
            )
            .into(),
            format!("--cuda-memory-usage={}", config.cuda_memory_usage).into(),
            "--force-overwrite=true".into(),
            "--export=sqlite".into(),
            "--show-output=true".into(),
        ];

        let mut output = OsString::from("--output=");
        output.push(output_prefix);
        args.push(output);

        args.extend(config.extra_args.iter().map(OsString::from));

        args.push(config.runner.clone().into_os_string());
        args.push(RUNFILE_FLAG.into());
        args.push(payload.as_os_str().to_owned());
        args
    }

    /// Run `job` under the tracer and return the session owning its output
    pub async fn run(&self, job: &ProfileJob) -> Result<TraceSession> {
        self.config.validate()?;

        let root = self.config.temp_root();
        let payload = write_payload(job, &root)?;
        let output_dir = tempfile::Builder::new()
            .prefix("deepprofile-trace-")
            .tempdir_in(&root)?;

        let output_prefix = output_dir.path().join(OUTPUT_STEM);
        let args = self.tracer_args(&output_prefix, payload.path());

        info!(
            "Profiling job {} with {}",
            job.function,
            self.config.tracer.display()
        );
        debug!("Tracer arguments: {:?}", args);

        let mut cmd = Command::new(&self.config.tracer);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // The tracer leads its own group so the traced command can be killed with it
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| ProfileError::TracerSpawn {
            program: self.config.tracer.clone(),
            source,
        })?;
        let group = ProcessGroup::new(child.id());

        // Dropping the wait future on timeout kills the tracer; dropping
        // `group` then kills whatever it started
        let output = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ProfileError::TracerTimeout(limit))??,
            None => child.wait_with_output().await?,
        };
        group.release();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!("Tracer stdout:\n{}", stdout);
        debug!("Tracer stderr:\n{}", stderr);

        if !output.status.success() {
            return Err(ProfileError::TracerFailed {
                status: output.status,
                stdout,
                stderr,
            });
        }

        let database = output_prefix.with_extension("sqlite");
        if !database.is_file() {
            return Err(ProfileError::MissingArtifact(database));
        }

        if NsightAnalyzer::open(&database)?.run_range()?.is_none() {
            return Err(ProfileError::MissingRunRange(database));
        }

        info!("Trace written to {}", database.display());

        Ok(TraceSession {
            database,
            output_dir,
            payload,
        })
    }
}

fn write_payload(job: &ProfileJob, root: &Path) -> Result<NamedTempFile> {
    let bytes = job.to_payload()?;

    let mut file = tempfile::Builder::new()
        .prefix("deepprofile-job-")
        .suffix(".json")
        .tempfile_in(root)?;
    file.write_all(&bytes)?;
    file.flush()?;

    debug!("Wrote payload {}", file.path().display());
    Ok(file)
}

/// Kills the tracer's process group on drop unless released
struct ProcessGroup {
    id: Option<u32>,
}

impl ProcessGroup {
    fn new(id: Option<u32>) -> Self {
        Self { id }
    }

    /// The tracer exited on its own; leave the group alone
    fn release(mut self) {
        self.id = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };

        #[cfg(unix)]
        {
            // SAFETY: plain syscall; `id` is the group the tracer was spawned into.
            let rc = unsafe { libc::killpg(id as libc::pid_t, libc::SIGKILL) };
            if rc == 0 {
                debug!("Killed tracer process group {}", id);
            } else {
                debug!(
                    "Tracer process group {} already gone: {}",
                    id,
                    std::io::Error::last_os_error()
                );
            }
        }
        #[cfg(not(unix))]
        debug!("Tracer {} stopped; its children are not tracked", id);
    }
}

/// Output of one profiling run.
///
/// The trace directory and the payload file live exactly as long as the
/// session.
#[derive(Debug)]
pub struct TraceSession {
    database: PathBuf,
    output_dir: TempDir,
    payload: NamedTempFile,
}

impl TraceSession {
    /// Path of the SQLite export
    pub fn path(&self) -> &Path {
        &self.database
    }

    /// Directory holding every tracer artifact of the run
    pub fn output_dir(&self) -> &Path {
        self.output_dir.path()
    }

    pub fn payload_path(&self) -> &Path {
        self.payload.path()
    }

    /// Open an analyzer over the export
    pub fn analyzer(&self) -> Result<NsightAnalyzer> {
        NsightAnalyzer::open(&self.database)
    }

    /// Copy the SQLite export somewhere that outlives the session
    pub fn persist_copy(&self, dest: impl AsRef<Path>) -> Result<u64> {
        Ok(std::fs::copy(&self.database, dest)?)
    }

    /// Remove all artifacts, reporting any failure to do so
    pub fn close(self) -> Result<()> {
        let TraceSession {
            output_dir, payload, ..
        } = self;
        let dir = output_dir.path().to_path_buf();
        output_dir.close()?;
        payload.close()?;
        debug!("Removed {}", dir.display());
        Ok(())
    }
}
