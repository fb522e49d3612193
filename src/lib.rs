//! Prism - Projection materialization for repository-style data access
//!
//! Prism turns a fetched record plus a target shape into a partial view of
//! the record: only the shape's accessors are reachable, everything else
//! stays hidden. Shapes come in two flavors, interface-like shapes served by
//! lazy proxy views and constructor-driven value objects materialized
//! eagerly.
//!
//! # Quick Start
//!
//! ```
//! use prism::{Projector, Record, Value};
//!
//! let projector = Projector::new();
//! projector
//!     .describe("NamesOnly", |shape| {
//!         shape.direct_field("firstname").direct_field("lastname")
//!     })
//!     .unwrap();
//!
//! let person = Record::new()
//!     .with("firstname", "Oliver")
//!     .with("lastname", "Matthews")
//!     .with("salary", 90_000i64);
//!
//! let view = projector.project("NamesOnly", &person).unwrap();
//! assert_eq!(view.get("firstname").unwrap(), Value::from("Oliver"));
//! assert!(view.get("salary").is_err());
//! ```
//!
//! # Architecture
//!
//! The [`Projector`] bundles the shape registry and the materializer behind
//! one handle; hosts that need finer control can use those collaborators
//! directly. Computed accessors are delegated to an injected
//! [`ExpressionEvaluator`] - the engine never interprets expression text
//! itself.

// Re-export the public API from prism-engine and the data model from
// prism-core
pub use prism_core::{
    FieldPath, PathParseError, PathSegment, ProjectionError, ProjectionResult, Record, Value,
    MAX_ACCESSORS_PER_SHAPE, MAX_EVAL_ARGS, MAX_PATH_SEGMENTS, MAX_SHAPE_DEPTH,
};
pub use prism_engine::*;
