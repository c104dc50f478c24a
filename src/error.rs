//! Error types for simdispatch.
//!
//! All errors are strongly typed using thiserror, one enum per pipeline
//! concern, composed into [`DispatchError`]. Every variant names the
//! offending field or stage so hosts can map failures without parsing
//! message text.

use thiserror::Error;

/// Errors raised while turning caller input into a resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("Malformed override list: {reason}")]
    MalformedOverrides {
        reason: String,
    },

    #[error("Unknown option '{name}'")]
    UnknownOption {
        name: String,
    },
}

impl OptionError {
    /// Creates a malformed-overrides error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedOverrides {
            reason: reason.into(),
        }
    }

    /// Creates an unknown-option error.
    #[must_use]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownOption { name: name.into() }
    }
}

/// Structural validation errors reported by a [`crate::validation::Validator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        field: String,
        reason: String,
    },

    #[error("Field '{field}' has {actual}, expected {expected}")]
    DimensionMismatch {
        field: String,
        expected: String,
        actual: String,
    },
}

impl ValidationError {
    /// Creates a missing-field error.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid-field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the name of the offending field.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::InvalidField { field, .. }
            | Self::DimensionMismatch { field, .. } => field,
        }
    }
}

/// Errors raised while locating or invoking a solver backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("No backend registered for solver '{solver}' (expected entry point '{entry_point}')")]
    BackendNotFound {
        solver: String,
        entry_point: String,
    },

    #[error("Build step '{entry_point}' failed for '{source_id}': {reason}")]
    BuildFailure {
        entry_point: String,
        source_id: String,
        reason: String,
    },

    #[error("Run step '{entry_point}' failed: {reason}")]
    RunFailure {
        entry_point: String,
        reason: String,
    },
}

/// Top-level error type for simdispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Option error: {0}")]
    Option(#[from] OptionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("I/O error on '{path}': {message}")]
    Io {
        path: String,
        message: String,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailedStage {
    /// Override parsing or option resolution.
    Resolve,
    /// Schema enforcement.
    Validate,
    /// Registry lookup or build step.
    Build,
    /// Run step.
    Run,
    /// Anything outside the pipeline stages (file handling, internal).
    Host,
}

impl DispatchError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an I/O error for `path`.
    #[must_use]
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Returns true if this is an option error.
    #[must_use]
    pub const fn is_option(&self) -> bool {
        matches!(self, Self::Option(_))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a backend error.
    #[must_use]
    pub const fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns the pipeline stage this error aborted.
    #[must_use]
    pub const fn stage(&self) -> FailedStage {
        match self {
            Self::Option(_) => FailedStage::Resolve,
            Self::Validation(_) => FailedStage::Validate,
            Self::Backend(e) => match e {
                BackendError::BackendNotFound { .. } | BackendError::BuildFailure { .. } => {
                    FailedStage::Build
                }
                BackendError::RunFailure { .. } => FailedStage::Run,
            },
            Self::Io { .. } | Self::Serialization { .. } | Self::Internal { .. } => {
                FailedStage::Host
            }
        }
    }
}

/// Result type alias for simdispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
