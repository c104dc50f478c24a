//! Solver registry.
//!
//! Maps solver names to backends. Backends are registered once at startup;
//! looking a solver up before any stage has side effects turns a missing
//! backend into a pre-flight error instead of a late invocation failure.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::BackendError;

use super::{
    Backend, BuildArtifact, DispatchSettings, EntryPoints, PropensitySource, SolverInput,
    Trajectory,
};

/// Registry of solver backends, keyed by solver name.
#[derive(Clone, Default)]
pub struct SolverRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl fmt::Debug for SolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverRegistry")
            .field("solvers", &self.names())
            .finish()
    }
}

impl SolverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `backend` under `solver`, replacing any previous one.
    pub fn register(
        &mut self,
        solver: impl Into<String>,
        backend: impl Backend + 'static,
    ) -> Option<Arc<dyn Backend>> {
        let solver = solver.into();
        let previous = self.backends.insert(solver.clone(), Arc::new(backend));
        if previous.is_some() {
            warn!(solver = %solver, "replaced registered backend");
        }
        previous
    }

    /// Registers `backend` under `solver`.
    #[must_use]
    pub fn with(mut self, solver: impl Into<String>, backend: impl Backend + 'static) -> Self {
        self.register(solver, backend);
        self
    }

    pub fn contains(&self, solver: &str) -> bool {
        self.backends.contains_key(solver)
    }

    /// Registered solver names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Resolves `solver` to its backend and entry-point identifiers.
    ///
    /// # Errors
    /// `BackendNotFound` if nothing is registered under `solver`.
    pub fn lookup(
        &self,
        solver: &str,
        settings: &DispatchSettings,
    ) -> Result<Dispatch<'_>, BackendError> {
        let entry_points = EntryPoints::for_solver(solver, settings);
        let backend = self
            .backends
            .get(solver)
            .ok_or_else(|| BackendError::BackendNotFound {
                solver: solver.to_string(),
                entry_point: entry_points.run.clone(),
            })?;
        debug!(
            solver,
            build = %entry_points.build,
            run = %entry_points.run,
            "resolved backend"
        );
        Ok(Dispatch {
            entry_points,
            backend: backend.as_ref(),
        })
    }
}

/// A resolved backend, ready to invoke.
pub struct Dispatch<'r> {
    entry_points: EntryPoints,
    backend: &'r dyn Backend,
}

impl fmt::Debug for Dispatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("entry_points", &self.entry_points)
            .finish_non_exhaustive()
    }
}

impl Dispatch<'_> {
    #[must_use]
    pub const fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    /// Invokes the build entry point.
    ///
    /// # Errors
    /// `BuildFailure` for any failure reported by the backend, including a
    /// backend that has no build entry point.
    pub fn build(&self, source: PropensitySource) -> Result<BuildArtifact, BackendError> {
        debug!(entry_point = %self.entry_points.build, source = %source, "invoking build step");
        self.backend
            .build(&source)
            .map_err(|e| BackendError::BuildFailure {
                entry_point: self.entry_points.build.clone(),
                source_id: source.to_string(),
                reason: e.to_string(),
            })?;
        Ok(BuildArtifact::record(&self.entry_points.build, source))
    }

    /// Invokes the run entry point.
    ///
    /// # Errors
    /// `RunFailure` if the backend fails or returns a trajectory whose
    /// declared shape does not match its data.
    pub fn run(&self, input: &SolverInput<'_>) -> Result<Trajectory, BackendError> {
        debug!(entry_point = %self.entry_points.run, seed = ?input.seed, "invoking run step");
        let trajectory = self
            .backend
            .run(input)
            .map_err(|e| self.run_failure(e.to_string()))?;
        if !trajectory.is_consistent() {
            return Err(self.run_failure(format!(
                "trajectory declares shape {} but holds {} entries",
                trajectory.shape(),
                trajectory.data.len()
            )));
        }
        Ok(trajectory)
    }

    fn run_failure(&self, reason: String) -> BackendError {
        BackendError::RunFailure {
            entry_point: self.entry_points.run.clone(),
            reason,
        }
    }
}
