//! Simulation configuration records.
//!
//! A [`SimulationConfig`] is the single entity threaded through the
//! pipeline: a self-describing record mapping field names to [`Value`]s.
//! Records coming from a host may be partial or carry names outside the
//! schema; the resolver rejects those, and a resolved record holds every
//! [`Field`] exactly once.

mod overrides;
mod serialization;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;
use crate::matrix::DenseMatrix;
use crate::schema::{Field, FieldRole, ReportLevel};
use crate::value::Value;

pub use overrides::Overrides;
pub(crate) use overrides::is_identifier;
pub use serialization::{from_json, load, save, to_json_pretty};

/// A named bundle of fields describing one simulation invocation, its
/// controls, and its result.
///
/// # Example
/// ```
/// use simdispatch::{Field, SimulationConfig, Value};
///
/// let config = SimulationConfig::new()
///     .with(Field::Solver, "nsm")
///     .with(Field::Tspan, vec![0.0, 1.0, 2.0]);
///
/// assert_eq!(config.solver().unwrap(), "nsm");
/// assert_eq!(config.get(Field::Tspan), Some(&Value::Vector(vec![0.0, 1.0, 2.0])));
/// ```
///
/// Deserialization reads each field by its schema role: opaque fields keep
/// their JSON exactly and `solver_args` always becomes a list.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SimulationConfig {
    fields: BTreeMap<String, Value>,
}

impl<'de> Deserialize<'de> for SimulationConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(Self {
            fields: raw
                .into_iter()
                .map(|(name, json)| {
                    let value = field_value(&name, json);
                    (name, value)
                })
                .collect(),
        })
    }
}

/// Reads a JSON value for the field called `name`.
///
/// Opaque fields are wrapped untouched (JSON `null` stays [`Value::Null`]);
/// `solver_args` keeps its elements' own types. Every other name, including
/// ones outside the schema, goes through [`Value::infer`].
pub(crate) fn field_value(name: &str, json: serde_json::Value) -> Value {
    match name.parse::<Field>() {
        Ok(field) if field.role() == FieldRole::Opaque && !json.is_null() => Value::Opaque(json),
        Ok(Field::SolverArgs) => match json {
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::infer).collect()),
            other => Value::infer(other),
        },
        _ => Value::infer(json),
    }
}

impl SimulationConfig {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a schema field.
    #[must_use]
    pub fn with(mut self, field: Field, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets a schema field, returning the previous value.
    pub fn insert(&mut self, field: Field, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.name().to_string(), value.into())
    }

    /// Sets a field by raw name.
    ///
    /// The name is not checked here; records built this way are validated
    /// against the schema when resolved.
    pub fn insert_named(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes a schema field.
    pub fn remove(&mut self, field: Field) -> Option<Value> {
        self.fields.remove(field.name())
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.fields.get(field.name())
    }

    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(field.name())
    }

    /// Iterates over the field names present in the record.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns true if every schema field is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        Field::ALL.iter().all(|f| self.contains(*f))
    }

    /// Returns true if the pipeline-control fields are present, i.e. this
    /// record has been through resolution before.
    #[must_use]
    pub fn has_control_fields(&self) -> bool {
        Field::CONTROL.iter().all(|f| self.contains(*f))
    }

    /// Returns the value of a field that must be present.
    pub fn require(&self, field: Field) -> Result<&Value, ValidationError> {
        self.get(field)
            .ok_or_else(|| ValidationError::missing(field.name()))
    }

    fn string_field(&self, field: Field) -> Result<&str, ValidationError> {
        let value = self.require(field)?;
        value
            .as_string()
            .ok_or_else(|| type_error(field, "a string", value))
    }

    fn flag(&self, field: Field) -> Result<bool, ValidationError> {
        let value = self.require(field)?;
        value
            .as_bool()
            .ok_or_else(|| type_error(field, "a boolean", value))
    }

    /// Name of the solver backend to dispatch to.
    pub fn solver(&self) -> Result<&str, ValidationError> {
        self.string_field(Field::Solver)
    }

    /// Identifier of the propensity source compiled by the build step.
    pub fn propensities(&self) -> Result<&str, ValidationError> {
        self.string_field(Field::Propensities)
    }

    /// Whether the build step runs.
    pub fn compile(&self) -> Result<bool, ValidationError> {
        self.flag(Field::Compile)
    }

    /// Whether resolution and validation run.
    pub fn parse(&self) -> Result<bool, ValidationError> {
        self.flag(Field::Parse)
    }

    /// Report level. An absent field reads as the schema default.
    pub fn report_level(&self) -> Result<ReportLevel, ValidationError> {
        let Some(value) = self.get(Field::Report) else {
            return Ok(ReportLevel::default());
        };
        let level = value
            .as_int()
            .ok_or_else(|| type_error(Field::Report, "an integer", value))?;
        ReportLevel::try_from(level)
    }

    /// Random seed, passed through to the solver untouched. `None` when
    /// absent or null.
    pub fn seed(&self) -> Result<Option<u64>, ValidationError> {
        match self.get(Field::Seed) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Int(v)) => u64::try_from(*v).map(Some).map_err(|_| {
                ValidationError::invalid(Field::Seed.name(), format!("seed {v} is negative"))
            }),
            Some(other) => Err(type_error(Field::Seed, "a non-negative integer or null", other)),
        }
    }

    /// Result of the most recent successful run, if any.
    pub fn trajectory(&self) -> Option<&DenseMatrix> {
        self.get(Field::Trajectory).and_then(Value::as_matrix)
    }

    /// Returns this record with the result field replaced.
    #[must_use]
    pub fn with_trajectory(self, trajectory: DenseMatrix) -> Self {
        self.with(Field::Trajectory, trajectory)
    }
}

impl FromIterator<(Field, Value)> for SimulationConfig {
    fn from_iter<I: IntoIterator<Item = (Field, Value)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(f, v)| (f.name().to_string(), v))
                .collect(),
        }
    }
}

pub(crate) fn type_error(field: Field, expected: &str, actual: &Value) -> ValidationError {
    ValidationError::invalid(
        field.name(),
        format!("expected {expected}, found {}", actual.type_name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_readers_report_the_offending_field() {
        let config = SimulationConfig::new()
            .with(Field::Solver, 3)
            .with(Field::Compile, "yes");

        let err = config.solver().unwrap_err();
        assert_eq!(err.field(), "solver");
        assert!(format!("{err}").contains("found int"));

        assert_eq!(config.compile().unwrap_err().field(), "compile");
        assert_eq!(config.parse().unwrap_err(), ValidationError::missing("parse"));
    }

    #[test]
    fn report_level_defaults_when_absent() {
        let config = SimulationConfig::new();
        assert_eq!(config.report_level().unwrap(), ReportLevel::Quiet);

        let config = config.with(Field::Report, 2);
        assert_eq!(config.report_level().unwrap(), ReportLevel::Timing);

        let config = config.with(Field::Report, 9);
        assert!(config.report_level().is_err());
    }

    #[test]
    fn seed_is_optional() {
        let config = SimulationConfig::new();
        assert_eq!(config.seed().unwrap(), None);

        let config = config.with(Field::Seed, Value::Null);
        assert_eq!(config.seed().unwrap(), None);

        let config = config.with(Field::Seed, 42i64);
        assert_eq!(config.seed().unwrap(), Some(42));

        let config = config.with(Field::Seed, -1i64);
        assert!(config.seed().is_err());
    }

    #[test]
    fn control_field_detection() {
        let mut config = SimulationConfig::new();
        assert!(!config.has_control_fields());
        for field in Field::CONTROL {
            config.insert(field, field.default_value());
        }
        assert!(config.has_control_fields());
        assert!(!config.is_complete());
    }

    #[test]
    fn with_trajectory_replaces_result() {
        let config = SimulationConfig::new().with_trajectory(DenseMatrix::zeros(2, 3));
        assert_eq!(config.trajectory().map(DenseMatrix::shape), Some("2x3".to_string()));
    }

    #[test]
    fn raw_names_are_kept_until_resolution() {
        let mut config = SimulationConfig::new();
        config.insert_named("colour", "blue");
        assert_eq!(config.get_named("colour"), Some(&Value::from("blue")));
        assert_eq!(config.names().collect::<Vec<_>>(), vec!["colour"]);
    }
}
