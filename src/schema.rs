//! The fixed configuration schema.
//!
//! Every name a configuration may carry is a [`Field`]. Any other name is
//! rejected during resolution, and every field has a default that fills
//! gaps left by the prior configuration and the overrides.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OptionError, ValidationError};
use crate::matrix::{DenseMatrix, SparseMatrix};
use crate::value::Value;

/// Solver used when neither the prior configuration nor the overrides name one.
pub const DEFAULT_SOLVER: &str = "nsm";

/// What a field is for. Determines how the stage controller and the
/// dispatcher treat it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Drives the pipeline itself (solver, toggles, report level, seed).
    Control,
    /// Solver input that must be supplied by the caller.
    Required,
    /// Solver input that defaults to empty.
    Optional,
    /// Written by the run step.
    Result,
    /// Carried through untouched.
    Opaque,
}

/// A schema field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Solver,
    Propensities,
    Report,
    Compile,
    Parse,
    Seed,
    Tspan,
    U0,
    Diffusion,
    Stoich,
    DepGraph,
    Vol,
    Sd,
    Data,
    Gdata,
    SolverArgs,
    Trajectory,
    Vis,
    Extra,
}

impl Field {
    /// Every schema field, in canonical order.
    pub const ALL: [Self; 19] = [
        Self::Solver,
        Self::Propensities,
        Self::Report,
        Self::Compile,
        Self::Parse,
        Self::Seed,
        Self::Tspan,
        Self::U0,
        Self::Diffusion,
        Self::Stoich,
        Self::DepGraph,
        Self::Vol,
        Self::Sd,
        Self::Data,
        Self::Gdata,
        Self::SolverArgs,
        Self::Trajectory,
        Self::Vis,
        Self::Extra,
    ];

    /// Fields whose absence marks a configuration as never resolved.
    ///
    /// `seed` is excluded: it is legitimately unset.
    pub const CONTROL: [Self; 5] = [
        Self::Solver,
        Self::Propensities,
        Self::Report,
        Self::Compile,
        Self::Parse,
    ];

    /// Name used in configuration records.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Solver => "solver",
            Self::Propensities => "propensities",
            Self::Report => "report",
            Self::Compile => "compile",
            Self::Parse => "parse",
            Self::Seed => "seed",
            Self::Tspan => "tspan",
            Self::U0 => "u0",
            Self::Diffusion => "diffusion",
            Self::Stoich => "stoich",
            Self::DepGraph => "dep_graph",
            Self::Vol => "vol",
            Self::Sd => "sd",
            Self::Data => "data",
            Self::Gdata => "gdata",
            Self::SolverArgs => "solver_args",
            Self::Trajectory => "trajectory",
            Self::Vis => "vis",
            Self::Extra => "extra",
        }
    }

    #[must_use]
    pub const fn role(self) -> FieldRole {
        match self {
            Self::Solver
            | Self::Propensities
            | Self::Report
            | Self::Compile
            | Self::Parse
            | Self::Seed => FieldRole::Control,
            Self::Tspan
            | Self::U0
            | Self::Diffusion
            | Self::Stoich
            | Self::DepGraph
            | Self::Vol
            | Self::Sd => FieldRole::Required,
            Self::Data | Self::Gdata | Self::SolverArgs => FieldRole::Optional,
            Self::Trajectory => FieldRole::Result,
            Self::Vis | Self::Extra => FieldRole::Opaque,
        }
    }

    /// Schema default for this field.
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::Solver => Value::String(DEFAULT_SOLVER.to_string()),
            Self::Propensities => Value::String(String::new()),
            Self::Report => Value::Int(0),
            Self::Compile | Self::Parse => Value::Bool(true),
            Self::Tspan | Self::Vol | Self::Sd | Self::Gdata => Value::Vector(Vec::new()),
            Self::U0 | Self::Data => Value::Matrix(DenseMatrix::default()),
            Self::Diffusion | Self::Stoich | Self::DepGraph => {
                Value::Sparse(SparseMatrix::default())
            }
            Self::SolverArgs => Value::List(Vec::new()),
            Self::Seed | Self::Trajectory | Self::Vis | Self::Extra => Value::Null,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| OptionError::unknown(s))
    }
}

/// Report verbosity, from the `report` field.
///
/// Ordered so that a message with threshold `t` is emitted iff
/// `level >= t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ReportLevel {
    /// Level 0: nothing is emitted.
    #[default]
    Quiet,
    /// Level 1: stage progress.
    Stages,
    /// Level 2: stage progress plus run-step timing.
    Timing,
    /// Level 3: reserved for the validator's interactive early exit.
    Interactive,
}

impl ReportLevel {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Quiet => 0,
            Self::Stages => 1,
            Self::Timing => 2,
            Self::Interactive => 3,
        }
    }
}

impl TryFrom<i64> for ReportLevel {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Quiet),
            1 => Ok(Self::Stages),
            2 => Ok(Self::Timing),
            3 => Ok(Self::Interactive),
            other => Err(ValidationError::invalid(
                Field::Report.name(),
                format!("report level {other} is outside 0..=3"),
            )),
        }
    }
}

impl From<ReportLevel> for i64 {
    fn from(level: ReportLevel) -> Self {
        level.as_i64()
    }
}
