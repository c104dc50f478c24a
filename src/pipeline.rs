//! The resolution and dispatch pipeline.
//!
//! One invocation threads a configuration through four stages, each taking
//! the configuration by value and handing a new one on:
//!
//! 1. **Resolve** options, unless the fast path applies (no overrides,
//!    control fields present, `parse` off).
//! 2. **Validate** against the schema, whenever options were resolved.
//! 3. **Build** the backend, if `compile` is on. The backend is looked up
//!    before this stage so a missing solver fails without side effects.
//! 4. **Run** the backend and store its trajectory.
//!
//! Any error aborts the invocation. The input configuration was consumed,
//! so no half-updated configuration is ever returned.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::backend::{
    Backend, BuildArtifact, DispatchSettings, PropensitySource, SolverInput, SolverRegistry,
};
use crate::config::{Overrides, SimulationConfig};
use crate::error::DispatchResult;
use crate::report::{ReportSink, Reporter, TracingSink};
use crate::resolver::resolve;
use crate::schema::ReportLevel;
use crate::stage::{resolve_trigger, ResolveTrigger, Stage, StagePlan};
use crate::validation::{StructuralValidator, Validator};

/// Outcome of one pipeline invocation.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Identifier of this invocation, attached to its log events.
    pub run_id: Uuid,
    /// When the invocation started.
    pub started_at: DateTime<Utc>,
    /// The configuration after the run, with its trajectory set.
    pub config: SimulationConfig,
    /// Why options were resolved; `None` on the fast path.
    pub resolved_by: Option<ResolveTrigger>,
    /// Which gated stages ran.
    pub plan: StagePlan,
    /// The build step's record, if it ran.
    pub artifact: Option<BuildArtifact>,
    /// Wall-clock time of the run step, measured at report level 2 and up.
    pub elapsed: Option<Duration>,
}

/// Resolves configurations and dispatches them to registered solvers.
///
/// # Example
/// ```
/// use simdispatch::backend::FnBackend;
/// use simdispatch::{DenseMatrix, Field, Overrides, Pipeline, SimulationConfig};
///
/// let pipeline = Pipeline::builder()
///     .backend(
///         "nsm",
///         FnBackend::new(|input| Ok(DenseMatrix::zeros(input.u0.data.len(), input.tspan.len()))),
///     )
///     .build();
///
/// let config = SimulationConfig::new().with(Field::Compile, false);
/// let overrides = Overrides::new().set(Field::Seed, 7i64);
/// let err = pipeline.run(config, overrides).unwrap_err();
/// // The default configuration has no time span to run over.
/// assert!(err.is_validation());
/// ```
pub struct Pipeline {
    registry: SolverRegistry,
    validator: Arc<dyn Validator>,
    sink: Arc<dyn ReportSink>,
    settings: DispatchSettings,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline over `registry` with the structural validator and
    /// tracing report sink.
    #[must_use]
    pub fn new(registry: SolverRegistry) -> Self {
        Self::builder().registry(registry).build()
    }

    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    #[must_use]
    pub const fn registry(&self) -> &SolverRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Runs a configuration and returns it with its trajectory set.
    ///
    /// # Errors
    /// Fails fast with the first option, validation, or backend error.
    pub fn run(&self, config: SimulationConfig, overrides: Overrides) -> DispatchResult<SimulationConfig> {
        self.execute(config, &overrides).map(|summary| summary.config)
    }

    /// Runs a configuration and returns the full [`RunSummary`].
    ///
    /// # Errors
    /// Same as [`Pipeline::run`].
    pub fn execute(&self, config: SimulationConfig, overrides: &Overrides) -> DispatchResult<RunSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("pipeline", %run_id);
        let _guard = span.enter();

        let resolved_by = resolve_trigger(&config, overrides)?;
        let config = match resolved_by {
            Some(trigger) => {
                debug!(?trigger, overrides = overrides.len(), "resolving options");
                resolve(Some(&config), overrides)?
            }
            None => {
                debug!("parse off and no overrides; using configuration verbatim");
                config
            }
        };

        let reporter = Reporter::new(config.report_level()?, self.sink.as_ref());
        let plan = StagePlan::for_invocation(resolved_by, &config)?;

        if plan.validate {
            reporter.progress("Parsing...");
            self.validator.validate(&config)?;
        } else {
            reporter.skipped(Stage::Validate);
        }

        let dispatch = self.registry.lookup(config.solver()?, &self.settings)?;

        let artifact = if plan.build {
            let source = PropensitySource::new(config.propensities()?, &self.settings.propensity_extension);
            reporter.progress(format!(
                "Compiling {source} with {}...",
                dispatch.entry_points().build
            ));
            Some(dispatch.build(source)?)
        } else {
            reporter.skipped(Stage::Build);
            None
        };

        let input = SolverInput::from_config(&config)?;
        reporter.emit(
            ReportLevel::Timing,
            format!("Running {}...", dispatch.entry_points().run),
        );
        let (trajectory, elapsed) = reporter.timed(|| dispatch.run(&input));
        let trajectory = trajectory?;
        info!(
            solver = %dispatch.entry_points().solver,
            rows = trajectory.rows,
            cols = trajectory.cols,
            "run step finished"
        );

        Ok(RunSummary {
            run_id,
            started_at,
            config: config.with_trajectory(trajectory),
            resolved_by,
            plan,
            artifact,
            elapsed,
        })
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    registry: SolverRegistry,
    validator: Option<Arc<dyn Validator>>,
    sink: Option<Arc<dyn ReportSink>>,
    settings: DispatchSettings,
}

impl PipelineBuilder {
    /// Uses `registry`, replacing any backends added so far.
    #[must_use]
    pub fn registry(mut self, registry: SolverRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Registers one backend.
    #[must_use]
    pub fn backend(mut self, solver: impl Into<String>, backend: impl Backend + 'static) -> Self {
        self.registry.register(solver, backend);
        self
    }

    /// Replaces the schema validator.
    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Replaces the report sink.
    #[must_use]
    pub fn sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Replaces the naming conventions.
    #[must_use]
    pub fn settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            registry: self.registry,
            validator: self.validator.unwrap_or_else(|| Arc::new(StructuralValidator)),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            settings: self.settings,
        }
    }
}
