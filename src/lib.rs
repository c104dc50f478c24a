//! # simdispatch - option resolution and solver dispatch for spatial stochastic simulations
//!
//! A simulation is described by one configuration record: model inputs
//! (time span, initial state, diffusion and stoichiometry matrices, volumes),
//! pipeline controls (`solver`, `propensities`, `report`, `compile`, `parse`),
//! and, after a run, its trajectory. simdispatch turns such a record into a
//! solver invocation.
//!
//! ## Core Concepts
//!
//! - **Field**: the fixed schema every record is checked against
//! - **Resolution**: three-tier merge of overrides, prior values, and schema defaults
//! - **Stage control**: `parse` gates resolution and validation, `compile` gates the build step
//! - **Backend**: a solver exposing `build_<solver>` and `run_<solver>` entry points
//!
//! ## Usage
//!
//! ```rust
//! use simdispatch::{resolve, Field, Overrides, Value};
//!
//! let overrides = Overrides::from_flat(vec![Value::from("report"), Value::from(2)])?;
//! let config = resolve(None, &overrides)?;
//!
//! assert_eq!(config.get(Field::Report), Some(&Value::Int(2)));
//! assert_eq!(config.solver()?, "nsm");
//! assert!(config.compile()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

// Data model
pub mod error;
pub mod matrix;
pub mod schema;
pub mod value;

// Resolution and stage control
pub mod config;
pub mod resolver;
pub mod stage;
pub mod validation;

// Dispatch
pub mod backend;
pub mod pipeline;
pub mod report;

pub use backend::{Backend, DispatchSettings, FnBackend, ProcessBackend, SolverRegistry};
pub use config::{Overrides, SimulationConfig};
pub use error::{
    BackendError, DispatchError, DispatchResult, FailedStage, OptionError, ValidationError,
};
pub use matrix::{DenseMatrix, SparseMatrix};
pub use pipeline::{Pipeline, PipelineBuilder, RunSummary};
pub use report::{MemorySink, ReportSink, TracingSink};
pub use resolver::resolve;
pub use schema::{Field, ReportLevel};
pub use stage::{ResolveTrigger, StagePlan};
pub use validation::{StructuralValidator, Validator};
pub use value::Value;
