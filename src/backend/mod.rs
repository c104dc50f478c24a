//! Solver backends and their dispatch.
//!
//! A backend is a pluggable numerical engine exposing two entry points: a
//! build step that compiles a propensity source into it, and a run step
//! that integrates a model and returns a trajectory. Backends are looked up
//! by solver name in a [`SolverRegistry`]; entry-point identifiers are
//! derived from that name by plain concatenation (`build_<solver>`,
//! `run_<solver>`).

mod function;
mod process;
mod registry;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SimulationConfig;
use crate::error::ValidationError;
use crate::matrix::{DenseMatrix, SparseMatrix, EMPTY_DENSE};
use crate::schema::{Field, ReportLevel};
use crate::value::Value;

pub use function::FnBackend;
pub use process::ProcessBackend;
pub use registry::{Dispatch, SolverRegistry};

/// Error type returned by backend entry points.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a run step: one column of copy numbers per output time.
pub type Trajectory = DenseMatrix;

/// Extension appended to a propensity identifier that has none.
pub const DEFAULT_PROPENSITY_EXTENSION: &str = ".c";

/// Naming conventions for backend dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Prefix of build entry-point identifiers.
    pub build_prefix: String,
    /// Prefix of run entry-point identifiers.
    pub run_prefix: String,
    /// Extension appended to extensionless propensity identifiers.
    pub propensity_extension: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            build_prefix: "build_".to_string(),
            run_prefix: "run_".to_string(),
            propensity_extension: DEFAULT_PROPENSITY_EXTENSION.to_string(),
        }
    }
}

/// Entry-point identifiers of one solver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPoints {
    /// Solver name the identifiers were derived from.
    pub solver: String,
    /// Build entry point, `build_prefix + solver`.
    pub build: String,
    /// Run entry point, `run_prefix + solver`.
    pub run: String,
}

impl EntryPoints {
    /// Derives the identifiers for `solver`.
    ///
    /// ```
    /// use simdispatch::backend::{DispatchSettings, EntryPoints};
    ///
    /// let ids = EntryPoints::for_solver("nsm", &DispatchSettings::default());
    /// assert_eq!(ids.build, "build_nsm");
    /// assert_eq!(ids.run, "run_nsm");
    /// ```
    #[must_use]
    pub fn for_solver(solver: &str, settings: &DispatchSettings) -> Self {
        Self {
            solver: solver.to_string(),
            build: format!("{}{solver}", settings.build_prefix),
            run: format!("{}{solver}", settings.run_prefix),
        }
    }
}

/// Identifier of the propensity source handed to a build step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PropensitySource(String);

impl PropensitySource {
    /// Normalizes `id`, appending `extension` if `id` contains no `.`.
    ///
    /// ```
    /// use simdispatch::backend::PropensitySource;
    ///
    /// assert_eq!(PropensitySource::new("mymodel", ".c").as_str(), "mymodel.c");
    /// assert_eq!(PropensitySource::new("mymodel.c", ".c").as_str(), "mymodel.c");
    /// assert_eq!(PropensitySource::new("mymodel.so", ".c").as_str(), "mymodel.so");
    /// ```
    #[must_use]
    pub fn new(id: &str, extension: &str) -> Self {
        if id.contains('.') {
            Self(id.to_string())
        } else {
            Self(format!("{id}{extension}"))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl std::fmt::Display for PropensitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record of a successful build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Build entry point that was invoked.
    pub entry_point: String,
    /// Propensity source it was invoked with.
    pub source: PropensitySource,
    /// BLAKE3 hex digest of the source file, when it is readable.
    pub fingerprint: Option<String>,
    /// When the build finished.
    pub built_at: DateTime<Utc>,
}

impl BuildArtifact {
    pub(crate) fn record(entry_point: &str, source: PropensitySource) -> Self {
        let fingerprint = std::fs::read(source.as_path())
            .ok()
            .map(|bytes| blake3::hash(&bytes).to_hex().to_string());
        Self {
            entry_point: entry_point.to_string(),
            source,
            fingerprint,
            built_at: Utc::now(),
        }
    }
}

/// Ordered parameter set passed to a run entry point.
///
/// Borrowed from the configuration; optional inputs absent from it are
/// passed as empty.
#[derive(Debug, Clone, Serialize)]
pub struct SolverInput<'a> {
    pub tspan: &'a [f64],
    pub u0: &'a DenseMatrix,
    pub diffusion: &'a SparseMatrix,
    pub stoich: &'a SparseMatrix,
    pub dep_graph: &'a SparseMatrix,
    pub vol: &'a [f64],
    pub data: &'a DenseMatrix,
    pub gdata: &'a [f64],
    pub sd: &'a [f64],
    pub report: ReportLevel,
    pub seed: Option<u64>,
    pub solver_args: Vec<Value>,
}

impl<'a> SolverInput<'a> {
    /// Gathers the run parameters from a configuration.
    ///
    /// Only types are checked here; dimensional consistency is the
    /// validator's job and is skipped when `parse` is off.
    pub fn from_config(config: &'a SimulationConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            tspan: required(config, Field::Tspan, Value::as_vector, "a vector")?,
            u0: required(config, Field::U0, Value::as_matrix, "a matrix")?,
            diffusion: required(config, Field::Diffusion, Value::as_sparse, "a sparse matrix")?,
            stoich: required(config, Field::Stoich, Value::as_sparse, "a sparse matrix")?,
            dep_graph: required(config, Field::DepGraph, Value::as_sparse, "a sparse matrix")?,
            vol: required(config, Field::Vol, Value::as_vector, "a vector")?,
            data: optional(config, Field::Data, Value::as_matrix, "a matrix")?.unwrap_or(&EMPTY_DENSE),
            gdata: optional(config, Field::Gdata, Value::as_vector, "a vector")?.unwrap_or(&[]),
            sd: required(config, Field::Sd, Value::as_vector, "a vector")?,
            report: config.report_level()?,
            seed: config.seed()?,
            solver_args: match config.get(Field::SolverArgs) {
                None => Vec::new(),
                Some(value) => value
                    .to_list()
                    .ok_or_else(|| crate::config::type_error(Field::SolverArgs, "a list", value))?,
            },
        })
    }
}

fn optional<'a, T: ?Sized>(
    config: &'a SimulationConfig,
    field: Field,
    read: fn(&'a Value) -> Option<&'a T>,
    expected: &str,
) -> Result<Option<&'a T>, ValidationError> {
    config
        .get(field)
        .map(|value| read(value).ok_or_else(|| crate::config::type_error(field, expected, value)))
        .transpose()
}

fn required<'a, T: ?Sized>(
    config: &'a SimulationConfig,
    field: Field,
    read: fn(&'a Value) -> Option<&'a T>,
    expected: &str,
) -> Result<&'a T, ValidationError> {
    optional(config, field, read, expected)?.ok_or_else(|| ValidationError::missing(field.name()))
}

/// A solver backend.
///
/// Implementations are registered under a solver name in a
/// [`SolverRegistry`]. Errors returned here are wrapped by the dispatcher
/// into `BuildFailure` / `RunFailure` carrying the entry-point identifier.
pub trait Backend: Send + Sync {
    /// Build entry point: compile `source` into the backend.
    ///
    /// Backends without a build step keep the default, which fails when
    /// invoked.
    fn build(&self, source: &PropensitySource) -> Result<(), BoxError> {
        let _ = source;
        Err("backend has no build entry point".into())
    }

    /// Run entry point: integrate the model and return its trajectory.
    fn run(&self, input: &SolverInput<'_>) -> Result<Trajectory, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::tests::small_model;

    #[test]
    fn entry_points_follow_configured_prefixes() {
        let settings = DispatchSettings {
            build_prefix: "compile_".to_string(),
            run_prefix: "exec_".to_string(),
            ..DispatchSettings::default()
        };
        let ids = EntryPoints::for_solver("dfsp", &settings);
        assert_eq!(ids.build, "compile_dfsp");
        assert_eq!(ids.run, "exec_dfsp");
        assert_eq!(ids.solver, "dfsp");
    }

    #[test]
    fn propensity_extension_rule() {
        assert_eq!(PropensitySource::new("mymodel", ".c").as_str(), "mymodel.c");
        assert_eq!(PropensitySource::new("mymodel.c", ".c").as_str(), "mymodel.c");
        assert_eq!(PropensitySource::new("mymodel.so", ".c").as_str(), "mymodel.so");
        assert_eq!(PropensitySource::new("mymodel", ".cpp").as_str(), "mymodel.cpp");
    }

    #[test]
    fn build_artifact_fingerprints_readable_sources() {
        let artifact = BuildArtifact::record("build_nsm", PropensitySource::new("/nonexistent/model", ".c"));
        assert!(artifact.fingerprint.is_none());

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"double rFun1() { return 1.0; }").unwrap();
        let source = PropensitySource::new(file.path().to_str().unwrap(), ".c");
        let artifact = BuildArtifact::record("build_nsm", source);
        assert_eq!(artifact.fingerprint.as_deref().map(str::len), Some(64));
    }

    #[test]
    fn solver_input_follows_configuration() {
        let config = small_model().with(Field::Seed, 99i64).with(Field::Report, 2);
        let input = SolverInput::from_config(&config).unwrap();
        assert_eq!(input.tspan, &[0.0, 0.5, 1.0]);
        assert_eq!(input.u0.shape(), "2x3");
        assert_eq!(input.seed, Some(99));
        assert_eq!(input.report, ReportLevel::Timing);
        assert!(input.data.is_empty());
        assert!(input.gdata.is_empty());
        assert!(input.solver_args.is_empty());
    }

    #[test]
    fn solver_input_defaults_absent_optional_inputs() {
        let mut config = small_model();
        config.remove(Field::Data);
        config.remove(Field::Gdata);
        config.remove(Field::SolverArgs);
        let input = SolverInput::from_config(&config).unwrap();
        assert!(input.data.is_empty());
        assert!(input.gdata.is_empty());
        assert!(input.solver_args.is_empty());
    }

    #[test]
    fn solver_input_requires_core_inputs() {
        let mut config = small_model();
        config.remove(Field::Vol);
        assert_eq!(
            SolverInput::from_config(&config).unwrap_err(),
            ValidationError::missing("vol")
        );

        let config = small_model().with(Field::Tspan, "soon");
        assert_eq!(SolverInput::from_config(&config).unwrap_err().field(), "tspan");
    }

    struct RunOnly;

    impl Backend for RunOnly {
        fn run(&self, input: &SolverInput<'_>) -> Result<Trajectory, BoxError> {
            Ok(DenseMatrix::zeros(input.u0.data.len(), input.tspan.len()))
        }
    }

    #[test]
    fn default_build_entry_point_fails() {
        let err = RunOnly.build(&PropensitySource::new("m", ".c")).unwrap_err();
        assert!(err.to_string().contains("no build entry point"));
    }
}
