//! Stage control.
//!
//! Two toggles in the configuration gate the expensive stages of a run:
//! `parse` gates resolution and schema validation, `compile` gates the
//! backend build step. The toggles are independent. Validation always
//! follows resolution, so overrides or a first-use record are validated
//! even with `parse` off. Turning a stage off is the caller asserting it is
//! unnecessary; the controller does not re-check.

use crate::config::{Overrides, SimulationConfig};
use crate::error::ValidationError;

/// Why resolution runs for an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveTrigger {
    /// Explicit overrides were supplied.
    Overrides,
    /// The prior configuration lacks the pipeline-control fields.
    FirstUse,
    /// The prior configuration has `parse` switched on.
    ParseEnabled,
}

/// Decides whether a prior configuration needs resolving.
///
/// Returns `None` for the fast path: no overrides, control fields present,
/// and `parse` off. The prior is then used verbatim.
///
/// # Errors
/// `InvalidField` if the prior's `parse` field is not a boolean.
pub fn resolve_trigger(
    prior: &SimulationConfig,
    overrides: &Overrides,
) -> Result<Option<ResolveTrigger>, ValidationError> {
    if !overrides.is_empty() {
        return Ok(Some(ResolveTrigger::Overrides));
    }
    if !prior.has_control_fields() {
        return Ok(Some(ResolveTrigger::FirstUse));
    }
    if prior.parse()? {
        return Ok(Some(ResolveTrigger::ParseEnabled));
    }
    Ok(None)
}

/// A stage the controller can skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Schema enforcement.
    Validate,
    /// Backend build step.
    Build,
}

impl Stage {
    /// Message reported when the stage is switched off.
    #[must_use]
    pub const fn skipped_message(self) -> &'static str {
        match self {
            Self::Validate => "Parsing turned off.",
            Self::Build => "Compilation turned off.",
        }
    }
}

/// Which gated stages run for a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StagePlan {
    /// Run the schema validator.
    pub validate: bool,
    /// Run the backend build step.
    pub build: bool,
}

impl StagePlan {
    /// Plans the gated stages for a configuration.
    ///
    /// `trigger` is the outcome of [`resolve_trigger`] for this invocation:
    /// validation runs iff options were resolved. The build step follows
    /// the `compile` toggle of `config`.
    pub fn for_invocation(
        trigger: Option<ResolveTrigger>,
        config: &SimulationConfig,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            validate: trigger.is_some(),
            build: config.compile()?,
        })
    }

    /// Whether `stage` runs under this plan.
    #[must_use]
    pub const fn runs(&self, stage: Stage) -> bool {
        match stage {
            Stage::Validate => self.validate,
            Stage::Build => self.build,
        }
    }

    /// Stages this plan skips, in pipeline order.
    pub fn skipped(&self) -> impl Iterator<Item = Stage> + '_ {
        [Stage::Validate, Stage::Build]
            .into_iter()
            .filter(|s| !self.runs(*s))
    }
}
