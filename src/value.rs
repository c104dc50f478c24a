//! Value types that configuration fields can hold.
//!
//! Values cover the primitives used by pipeline-control fields, the vector
//! and matrix inputs consumed by solvers, and an opaque JSON slot for
//! host-specific data the pipeline never inspects.

use serde::{Deserialize, Serialize};

use crate::matrix::{DenseMatrix, SparseMatrix};

/// Possible values a configuration field can hold.
///
/// Values serialize untagged, so a configuration file is plain JSON:
/// `true`, `3`, `0.5`, `"nsm"`, `[0.0, 1.0]`, or a matrix object.
/// Deserialization tries the variants in declaration order; a JSON array of
/// numbers becomes a [`Value::Vector`], a mixed array a [`Value::List`].
///
/// # Examples
///
/// ```
/// use simdispatch::Value;
///
/// let flag = Value::Bool(true);
/// let level = Value::Int(2);
/// let name = Value::String("nsm".to_string());
///
/// assert!(flag.is_bool());
/// assert_eq!(level.as_int(), Some(2));
/// assert_eq!(name.as_string(), Some("nsm"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Vector(Vec<f64>),
    Sparse(SparseMatrix),
    Matrix(DenseMatrix),
    List(Vec<Value>),
    Opaque(serde_json::Value),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the numeric entries of a vector.
    ///
    /// An empty [`Value::List`] is accepted as an empty vector, since both
    /// serialize to `[]`.
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Vector(v) => Some(v),
            Self::List(v) if v.is_empty() => Some(&[]),
            _ => None,
        }
    }

    pub const fn as_matrix(&self) -> Option<&DenseMatrix> {
        match self {
            Self::Matrix(m) => Some(m),
            _ => None,
        }
    }

    pub const fn as_sparse(&self) -> Option<&SparseMatrix> {
        match self {
            Self::Sparse(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the elements of a list.
    ///
    /// A numeric [`Value::Vector`] is widened element-wise, since a list of
    /// numbers round-trips through JSON as a vector.
    pub fn to_list(&self) -> Option<Vec<Value>> {
        match self {
            Self::List(v) => Some(v.clone()),
            Self::Vector(v) => Some(v.iter().copied().map(Self::Float).collect()),
            _ => None,
        }
    }

    /// Infers a value from a loosely typed JSON literal.
    ///
    /// Used for command-line assignments such as `seed=7` or
    /// `tspan=[0,1,2]`: booleans, integers, floats, strings, and numeric
    /// arrays map to their natural variant; anything else is kept opaque.
    #[must_use]
    pub fn infer(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::String(s),
            other => serde_json::from_value(other.clone()).unwrap_or(Self::Opaque(other)),
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Vector(_) => "vector",
            Self::Sparse(_) => "sparse",
            Self::Matrix(_) => "matrix",
            Self::List(_) => "list",
            Self::Opaque(_) => "opaque",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Vector(v) => write!(f, "vector[{}]", v.len()),
            Self::Sparse(m) => write!(f, "sparse[{}, nnz={}]", m.shape(), m.nnz()),
            Self::Matrix(m) => write!(f, "matrix[{}]", m.shape()),
            Self::List(v) => write!(f, "list[{}]", v.len()),
            Self::Opaque(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

impl From<DenseMatrix> for Value {
    fn from(v: DenseMatrix) -> Self {
        Self::Matrix(v)
    }
}

impl From<SparseMatrix> for Value {
    fn from(v: SparseMatrix) -> Self {
        Self::Sparse(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
