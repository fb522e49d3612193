//! Dynamic shape selection
//!
//! A repository-style call site may take its projection shape as a runtime
//! argument instead of fixing it statically. The selector validates such an
//! argument against the aggregate the call is declared over, yields the
//! descriptor to project through, and excludes the shape argument from the
//! arguments forwarded to query execution.
//!
//! Validation is eager: an incompatible shape is rejected here, before any
//! fetch is attempted on its behalf.

use crate::descriptor::{AccessorKind, ShapeDescriptor, ShapeName};
use crate::registry::{AggregateSchema, ShapeRegistry};
use prism_core::{ProjectionError, ProjectionResult, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

// =============================================================================
// Arguments
// =============================================================================

/// Runtime shape argument of a dynamic projection call
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeArg {
    /// Request a registered projection shape by name
    Shape(ShapeName),
    /// Request the unprojected aggregate itself
    Aggregate(String),
}

impl ShapeArg {
    /// Request a projection shape
    pub fn shape(name: impl Into<ShapeName>) -> Self {
        ShapeArg::Shape(name.into())
    }

    /// Request the aggregate's own, unprojected view
    pub fn aggregate(name: impl Into<String>) -> Self {
        ShapeArg::Aggregate(name.into())
    }

    /// The requested name, whichever variant carries it
    pub fn name(&self) -> &str {
        match self {
            ShapeArg::Shape(name) => name.as_str(),
            ShapeArg::Aggregate(name) => name,
        }
    }
}

/// One argument of a dynamic repository-style call
///
/// The shape argument is recognized by type, not by position: a
/// [`QueryArg::Shape`] anywhere in the list selects the projection, while
/// every [`QueryArg::Value`] stays a plain query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArg {
    /// A plain value forwarded to query execution
    Value(Value),
    /// The projection shape for this call
    Shape(ShapeArg),
}

impl From<Value> for QueryArg {
    fn from(value: Value) -> Self {
        QueryArg::Value(value)
    }
}

impl From<ShapeArg> for QueryArg {
    fn from(arg: ShapeArg) -> Self {
        QueryArg::Shape(arg)
    }
}

/// Split the shape argument out of a call's argument list
///
/// The first shape-typed argument is consumed by the projection pathway and
/// never forwarded to query execution; the remaining arguments keep their
/// relative order. A call is expected to carry at most one shape argument,
/// so any later one is left in place for downstream validation rather than
/// silently dropped.
pub fn split_shape_arg(args: Vec<QueryArg>) -> (Option<ShapeArg>, Vec<QueryArg>) {
    let mut shape = None;
    let mut rest = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            QueryArg::Shape(requested) if shape.is_none() => shape = Some(requested),
            other => rest.push(other),
        }
    }
    (shape, rest)
}

// =============================================================================
// Selection
// =============================================================================

/// Resolve a runtime shape argument against an aggregate's declared fields
///
/// [`ShapeArg::Aggregate`] naming the schema yields the aggregate's identity
/// shape: one nullable direct accessor per declared field, built on first use
/// and cached in the registry under the aggregate's name. [`ShapeArg::Shape`]
/// must name a registered descriptor whose direct and nested accessors all
/// enter the record through declared fields; computed accessors see the whole
/// record and impose no field requirement.
///
/// # Errors
///
/// [`ProjectionError::IncompatibleProjection`] when the requested shape reads
/// root fields the aggregate does not declare, or when an aggregate request
/// names a different aggregate. [`ProjectionError::UnsupportedShape`] when a
/// shape request names no registered descriptor.
pub fn select(
    schema: &AggregateSchema,
    arg: &ShapeArg,
    registry: &ShapeRegistry,
) -> ProjectionResult<Arc<ShapeDescriptor>> {
    match arg {
        ShapeArg::Aggregate(name) => {
            if name != schema.name() {
                warn!(
                    target: "prism::selector",
                    requested = %name,
                    aggregate = %schema.name(),
                    "rejecting aggregate request for a different aggregate"
                );
                return Err(ProjectionError::incompatible_projection(
                    name.clone(),
                    schema.name(),
                    Vec::new(),
                ));
            }
            identity_descriptor(schema, registry)
        }
        ShapeArg::Shape(name) => {
            let descriptor = registry.lookup(name.as_str()).ok_or_else(|| {
                warn!(
                    target: "prism::selector",
                    shape = %name,
                    aggregate = %schema.name(),
                    "rejecting unregistered runtime shape"
                );
                ProjectionError::unsupported_shape(
                    name.as_str(),
                    "no descriptor registered under this name",
                )
            })?;

            let missing = undeclared_roots(&descriptor, schema);
            if !missing.is_empty() {
                warn!(
                    target: "prism::selector",
                    shape = %name,
                    aggregate = %schema.name(),
                    ?missing,
                    "rejecting incompatible runtime shape"
                );
                return Err(ProjectionError::incompatible_projection(
                    name.as_str(),
                    schema.name(),
                    missing,
                ));
            }

            debug!(
                target: "prism::selector",
                shape = %name,
                aggregate = %schema.name(),
                "runtime shape accepted"
            );
            Ok(descriptor)
        }
    }
}

/// The aggregate's own shape: every declared field, direct and nullable
///
/// Equivalent to handing back the raw record. Cached under the aggregate's
/// name, so repeated identity requests share one descriptor.
fn identity_descriptor(
    schema: &AggregateSchema,
    registry: &ShapeRegistry,
) -> ProjectionResult<Arc<ShapeDescriptor>> {
    registry.describe(schema.name(), |shape| {
        schema
            .fields()
            .fold(shape, |shape, field| shape.direct_field(field).nullable())
    })
}

/// Root fields the shape reads that the schema does not declare, sorted
///
/// Only top-level accessors are checked: a nested accessor's inner paths are
/// relative to its sub-record, so at the aggregate level the nested path's
/// own root is what must be declared.
fn undeclared_roots(descriptor: &ShapeDescriptor, schema: &AggregateSchema) -> Vec<String> {
    let mut missing = BTreeSet::new();
    for spec in descriptor.accessors() {
        let path = match spec.kind() {
            AccessorKind::Direct { path } => path,
            AccessorKind::Nested { path, .. } => path,
            AccessorKind::Computed { .. } => continue,
        };
        if let Some(root) = path.root_field() {
            if !schema.declares_field(root) {
                missing.insert(root.to_string());
            }
        }
    }
    missing.into_iter().collect()
}
