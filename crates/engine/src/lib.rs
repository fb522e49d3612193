//! Projection materialization engine
//!
//! This crate turns fetched records into shape-limited views:
//! - Shape descriptors: validated, cached metadata for each projection shape
//! - Resolution: per-record binding of accessors to source values
//! - Materialization: lazy proxy views and eager value objects
//! - Dynamic selection: runtime shape arguments checked against aggregates
//!
//! The engine is the only component that knows about:
//! - Closed/open classification and fetch hints
//! - Null-safety wrapper conventions
//! - The expression evaluator seam for computed accessors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod evaluator;
pub mod materializer;
pub mod projector;
pub mod registry;
pub mod resolver;
pub mod selector;
pub mod view;
pub mod wrapper;

pub use descriptor::{
    AccessorKind, AccessorSpec, ConstructorSpec, FetchHint, ShapeBuilder, ShapeDescriptor,
    ShapeName,
};
pub use evaluator::{
    EvalContext, EvalError, ExpressionEvaluator, ExpressionHandle, FnEvaluator,
    UnsupportedEvaluator,
};
pub use materializer::{materialize, Materializer};
pub use projector::Projector;
pub use registry::{AggregateSchema, ShapeRegistry};
pub use resolver::{resolve, ResolvedPlan};
pub use selector::{select, split_shape_arg, QueryArg, ShapeArg};
pub use view::{LazyView, MaterializedView, ValueView};
pub use wrapper::{NullWrapper, WrapperRegistry, OPTION_CONVENTION};
