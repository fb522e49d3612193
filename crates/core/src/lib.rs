//! Core types for prism
//!
//! This crate defines the foundational types used throughout the engine:
//! - Value: Unified value enum for record fields and accessor results
//! - Record: Immutable source record, one per fetched aggregate row
//! - FieldPath: Path from a record root to a field (`address.city`)
//! - ProjectionError: Error type hierarchy
//! - Limits: MAX_SHAPE_DEPTH, MAX_ACCESSORS_PER_SHAPE, MAX_PATH_SEGMENTS,
//!   MAX_EVAL_ARGS

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod path;
pub mod record;
pub mod value;

// Re-export commonly used types
pub use error::{ProjectionError, ProjectionResult};
pub use limits::{MAX_ACCESSORS_PER_SHAPE, MAX_EVAL_ARGS, MAX_PATH_SEGMENTS, MAX_SHAPE_DEPTH};
pub use path::{FieldPath, PathParseError, PathSegment};
pub use record::Record;
pub use value::Value;
