//! Error types for projection operations.
//!
//! All failures surfaced by the engine are represented by the
//! [`ProjectionError`] enum. These errors are:
//! - **Structured**: Each variant has typed fields for error details
//! - **Serializable**: Can be converted to/from JSON
//! - **Attributed**: Shape and accessor names are carried where they are known
//!
//! The engine performs no retries and no silent recovery; every failure is
//! returned synchronously to the immediate caller of the failing operation.

use crate::path::PathParseError;
use serde::{Deserialize, Serialize};

/// Result type alias for projection operations
pub type ProjectionResult<T> = std::result::Result<T, ProjectionError>;

/// Projection engine errors.
///
/// # Categories
///
/// | Category | Variants | Raised at |
/// |----------|----------|-----------|
/// | Shape | `UnsupportedShape` | descriptor build time |
/// | Resolution | `MissingField`, `WrongType` | per record, per accessor |
/// | Evaluation | `ComputedEvaluation` | computed accessor invocation |
/// | Selection | `IncompatibleProjection` | dynamic shape selection, before any fetch |
/// | Wrapping | `UnsupportedConvention` | null-safety wrapping |
/// | Input | `InvalidPath` | field path parsing |
///
/// # Example
///
/// ```ignore
/// match projector.project("NamesOnly", &record) {
///     Ok(view) => { /* read accessors */ }
///     Err(ProjectionError::MissingField { accessor, path, .. }) => {
///         println!("accessor '{}' has no source field '{}'", accessor, path);
///     }
///     Err(e) => println!("error: {}", e),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum ProjectionError {
    // ==================== Shape Errors ====================
    /// Shape's accessor contract cannot be resolved against any strategy.
    ///
    /// Raised at descriptor build time; the shape is unusable until its
    /// definition is corrected.
    #[error("unsupported shape '{shape}': {reason}")]
    UnsupportedShape {
        /// Name of the offending shape
        shape: String,
        /// Why the shape cannot be built
        reason: String,
    },

    // ==================== Resolution Errors ====================
    /// A direct accessor's field is absent from a specific source record.
    ///
    /// Raised at resolution time, per record and per accessor; other rows of
    /// the same batch are unaffected.
    #[error("missing field '{path}' for accessor '{accessor}' on shape '{shape}'")]
    MissingField {
        /// Shape being resolved
        shape: String,
        /// Accessor whose field is absent
        accessor: String,
        /// The field path that did not resolve
        path: String,
    },

    /// A field exists but holds a value of the wrong kind
    #[error("wrong type: expected {expected}, got {actual}")]
    WrongType {
        /// Expected value type
        expected: String,
        /// Actual value type found
        actual: String,
    },

    // ==================== Evaluation Errors ====================
    /// The external expression evaluator failed for a computed accessor.
    ///
    /// Wraps whatever the evaluator reported, attributed to the shape and
    /// accessor whose invocation triggered it. Never retried.
    #[error("computed accessor '{accessor}' on shape '{shape}' failed: {cause}")]
    ComputedEvaluation {
        /// Shape owning the computed accessor
        shape: String,
        /// The accessor that was invoked
        accessor: String,
        /// Message reported by the evaluator
        cause: String,
    },

    // ==================== Selection Errors ====================
    /// A dynamically supplied shape cannot be satisfied by the aggregate.
    ///
    /// Raised at call time, before any fetch is attempted.
    #[error("shape '{shape}' incompatible with aggregate '{aggregate}': missing fields {missing:?}")]
    IncompatibleProjection {
        /// The requested shape
        shape: String,
        /// The aggregate it was requested against
        aggregate: String,
        /// Fields the shape requires that the aggregate does not declare
        missing: Vec<String>,
    },

    // ==================== Wrapping Errors ====================
    /// Unknown null-safety wrapper convention requested
    #[error("unsupported wrapper convention: {convention}")]
    UnsupportedConvention {
        /// The convention name that is not registered
        convention: String,
    },

    // ==================== Input Errors ====================
    /// Field path could not be parsed
    #[error("invalid path: {reason}")]
    InvalidPath {
        /// Why the path failed to parse
        reason: String,
    },
}

impl ProjectionError {
    /// Build an `UnsupportedShape` error
    pub fn unsupported_shape(shape: impl Into<String>, reason: impl Into<String>) -> Self {
        ProjectionError::UnsupportedShape {
            shape: shape.into(),
            reason: reason.into(),
        }
    }

    /// Build a `MissingField` error
    pub fn missing_field(
        shape: impl Into<String>,
        accessor: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        ProjectionError::MissingField {
            shape: shape.into(),
            accessor: accessor.into(),
            path: path.into(),
        }
    }

    /// Build a `WrongType` error
    pub fn wrong_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        ProjectionError::WrongType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Build a `ComputedEvaluation` error
    pub fn computed_evaluation(
        shape: impl Into<String>,
        accessor: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        ProjectionError::ComputedEvaluation {
            shape: shape.into(),
            accessor: accessor.into(),
            cause: cause.into(),
        }
    }

    /// Build an `IncompatibleProjection` error
    pub fn incompatible_projection(
        shape: impl Into<String>,
        aggregate: impl Into<String>,
        missing: Vec<String>,
    ) -> Self {
        ProjectionError::IncompatibleProjection {
            shape: shape.into(),
            aggregate: aggregate.into(),
            missing,
        }
    }

    /// Build an `UnsupportedConvention` error
    pub fn unsupported_convention(convention: impl Into<String>) -> Self {
        ProjectionError::UnsupportedConvention {
            convention: convention.into(),
        }
    }
}

impl From<PathParseError> for ProjectionError {
    fn from(e: PathParseError) -> Self {
        ProjectionError::InvalidPath {
            reason: e.to_string(),
        }
    }
}
