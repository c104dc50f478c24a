//! Closure-backed solvers.

use std::fmt;

use super::{Backend, BoxError, PropensitySource, SolverInput, Trajectory};

type BuildFn = dyn Fn(&PropensitySource) -> Result<(), BoxError> + Send + Sync;
type RunFn = dyn Fn(&SolverInput<'_>) -> Result<Trajectory, BoxError> + Send + Sync;

/// A backend made of a `{build, run}` function pair.
///
/// The run function is required; without a build function the build entry
/// point fails when invoked.
///
/// # Example
/// ```
/// use simdispatch::backend::{FnBackend, SolverRegistry};
/// use simdispatch::DenseMatrix;
///
/// let registry = SolverRegistry::new().with(
///     "nsm",
///     FnBackend::new(|input| Ok(DenseMatrix::zeros(input.u0.data.len(), input.tspan.len())))
///         .with_build(|_source| Ok(())),
/// );
/// assert!(registry.contains("nsm"));
/// ```
pub struct FnBackend {
    build: Option<Box<BuildFn>>,
    run: Box<RunFn>,
}

impl fmt::Debug for FnBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBackend")
            .field("has_build", &self.build.is_some())
            .finish_non_exhaustive()
    }
}

impl FnBackend {
    /// Creates a backend from its run function.
    pub fn new<R>(run: R) -> Self
    where
        R: Fn(&SolverInput<'_>) -> Result<Trajectory, BoxError> + Send + Sync + 'static,
    {
        Self {
            build: None,
            run: Box::new(run),
        }
    }

    /// Adds a build function.
    #[must_use]
    pub fn with_build<B>(mut self, build: B) -> Self
    where
        B: Fn(&PropensitySource) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.build = Some(Box::new(build));
        self
    }
}

impl Backend for FnBackend {
    fn build(&self, source: &PropensitySource) -> Result<(), BoxError> {
        match &self.build {
            Some(build) => build(source),
            None => Err("backend has no build entry point".into()),
        }
    }

    fn run(&self, input: &SolverInput<'_>) -> Result<Trajectory, BoxError> {
        (self.run)(input)
    }
}
