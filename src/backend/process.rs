//! Solvers living in external executables.
//!
//! The build entry point runs a toolchain command with the propensity
//! source as its last argument. The run entry point exchanges JSON files
//! with a solver executable:
//!
//! ```text
//! <executable> [args...] <input.json> <output.json>
//! ```
//!
//! `input.json` is the serialized [`SolverInput`]; the solver must write its
//! trajectory to `output.json` as `{"rows", "cols", "data"}` (column-major)
//! and exit with status 0.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use super::{Backend, BoxError, PropensitySource, SolverInput, Trajectory};

/// A backend driven through child processes.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    executable: PathBuf,
    args: Vec<OsString>,
    build_program: Option<OsString>,
    build_args: Vec<OsString>,
    working_dir: Option<PathBuf>,
}

impl ProcessBackend {
    /// Creates a backend whose run entry point is `executable`.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            build_program: None,
            build_args: Vec::new(),
            working_dir: None,
        }
    }

    /// Sets leading arguments for the solver, placed before the input and
    /// output paths (e.g. a script for an interpreter).
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the build command. The propensity source is appended as the
    /// last argument.
    #[must_use]
    pub fn with_build_command<I, S>(mut self, program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.build_program = Some(program.into());
        self.build_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Runs both entry points from `dir`.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn command(&self, program: impl AsRef<std::ffi::OsStr>) -> Command {
        let mut command = Command::new(program);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

/// Turns a finished child process into an error unless it exited cleanly.
fn check_status(what: &str, output: &Output) -> Result<(), BoxError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        Err(format!("{what} exited with {}", output.status).into())
    } else {
        Err(format!("{what} exited with {}: {stderr}", output.status).into())
    }
}

impl Backend for ProcessBackend {
    fn build(&self, source: &PropensitySource) -> Result<(), BoxError> {
        let Some(program) = &self.build_program else {
            return Err("no build command configured".into());
        };
        debug!(program = ?program, source = %source, "spawning build command");
        let output = self
            .command(program)
            .args(&self.build_args)
            .arg(source.as_path())
            .output()
            .map_err(|e| format!("failed to spawn build command {program:?}: {e}"))?;
        check_status("build command", &output)
    }

    fn run(&self, input: &SolverInput<'_>) -> Result<Trajectory, BoxError> {
        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join("input.json");
        let output_path = scratch.path().join("output.json");

        std::fs::write(&input_path, serde_json::to_vec(input)?)?;
        debug!(executable = %self.executable.display(), "spawning solver");
        let output = self
            .command(&self.executable)
            .args(&self.args)
            .arg(&input_path)
            .arg(&output_path)
            .output()
            .map_err(|e| format!("failed to spawn solver {}: {e}", self.executable.display()))?;
        check_status("solver", &output)?;

        let bytes = std::fs::read(&output_path)
            .map_err(|e| format!("solver wrote no trajectory: {e}"))?;
        let trajectory: Trajectory = serde_json::from_slice(&bytes)
            .map_err(|e| format!("unreadable trajectory: {e}"))?;
        Ok(trajectory)
    }
}
