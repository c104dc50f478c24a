//! Typed explicit overrides.
//!
//! Overrides are the highest-precedence tier of option resolution. They are
//! validated at construction, so a held [`Overrides`] value only ever names
//! schema fields.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::OptionError;
use crate::schema::Field;
use crate::value::Value;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_]*$";

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

pub(crate) fn is_identifier(key: &str) -> bool {
    IDENTIFIER
        .get_or_init(|| Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern compiles"))
        .is_match(key)
}

/// Checks a raw override key: it must be an identifier and a schema name.
fn parse_key(key: &str) -> Result<Field, OptionError> {
    if !is_identifier(key) {
        return Err(OptionError::malformed(format!(
            "key {key:?} is not a valid identifier"
        )));
    }
    key.parse()
}

/// Explicit field overrides for one pipeline invocation.
///
/// A key given more than once keeps its last value.
///
/// # Example
/// ```
/// use simdispatch::{Field, Overrides, Value};
///
/// let flat = vec![Value::from("seed"), Value::from(7), Value::from("report"), Value::from(1)];
/// let overrides = Overrides::from_flat(flat).unwrap();
/// assert_eq!(overrides.get(Field::Seed), Some(&Value::Int(7)));
///
/// let odd = vec![Value::from("seed")];
/// assert!(Overrides::from_flat(odd).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overrides {
    values: BTreeMap<Field, Value>,
}

impl Overrides {
    /// Creates an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field.
    #[must_use]
    pub fn set(mut self, field: Field, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets a field, returning the previous override.
    pub fn insert(&mut self, field: Field, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(field, value.into())
    }

    /// Builds overrides from a flat `key, value, key, value, ...` list.
    ///
    /// # Errors
    /// - `MalformedOverrides` if the list has odd length, or a key is not a
    ///   string identifier.
    /// - `UnknownOption` if a key is not a schema field.
    pub fn from_flat<I>(items: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = Value>,
    {
        let items: Vec<Value> = items.into_iter().collect();
        if items.len() % 2 != 0 {
            return Err(OptionError::malformed(format!(
                "expected key/value pairs, got {} elements",
                items.len()
            )));
        }

        let mut overrides = Self::new();
        let mut iter = items.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            let Value::String(key) = key else {
                return Err(OptionError::malformed(format!(
                    "key must be a string, found {}",
                    key.type_name()
                )));
            };
            overrides.insert(parse_key(&key)?, value);
        }
        Ok(overrides)
    }

    /// Builds overrides from `(name, value)` pairs.
    ///
    /// # Errors
    /// Same key checks as [`Overrides::from_flat`].
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut overrides = Self::new();
        for (key, value) in pairs {
            overrides.insert(parse_key(key.as_ref())?, value);
        }
        Ok(overrides)
    }

    /// Parses a `name=<json>` assignment, as given on the command line.
    ///
    /// The right-hand side is read as JSON when it parses, otherwise as a
    /// bare string, so `solver=nsm` and `solver="nsm"` are equivalent.
    pub fn parse_assignment(assignment: &str) -> Result<(Field, Value), OptionError> {
        let Some((key, raw)) = assignment.split_once('=') else {
            return Err(OptionError::malformed(format!(
                "assignment {assignment:?} has no '='"
            )));
        };
        let field = parse_key(key.trim())?;
        let raw = raw.trim();
        let value = serde_json::from_str::<serde_json::Value>(raw)
            .map_or_else(|_| Value::String(raw.to_string()), |json| super::field_value(field.name(), json));
        Ok((field, value))
    }

    /// Builds overrides from `name=<json>` assignments.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for assignment in assignments {
            let (field, value) = Self::parse_assignment(assignment.as_ref())?;
            overrides.insert(field, value);
        }
        Ok(overrides)
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.values.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &Value)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }
}
