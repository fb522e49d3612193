//! Field resolver
//!
//! Binds a [`ShapeDescriptor`] against one source record and produces a
//! [`ResolvedPlan`]: per accessor, either the snapshotted field value, the
//! expression handle awaiting evaluation, or a recursively resolved child
//! plan. Resolution is pure and deterministic: the same descriptor and
//! record always yield the same plan.
//!
//! Absence policy: a missing source field fails with `MissingField` unless
//! the accessor is nullable (explicitly, or implicitly via a wrapper
//! convention). A field that is present but `Null` always resolves without
//! error; for nested accessors a `Null` child is treated the same as an
//! absent one, since there is no record to project.

use crate::descriptor::{AccessorKind, ShapeDescriptor};
use crate::evaluator::ExpressionHandle;
use prism_core::{ProjectionError, ProjectionResult, Record, Value};
use std::sync::Arc;
use tracing::trace;

/// Per-accessor resolution outcome
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ResolvedBinding {
    /// Snapshot of the source field; `None` when the nullable field is absent
    Direct { value: Option<Value> },
    /// Expression awaiting evaluation against the plan's record context
    Computed { expression: ExpressionHandle },
    /// Recursively resolved child; `None` when the nullable child is absent
    Nested { plan: Option<Arc<ResolvedPlan>> },
}

/// A shape bound to one source record
///
/// Bindings are index-parallel to the descriptor's accessors. The record
/// snapshot is kept only when the shape has computed accessors of its own;
/// it is the evaluation context handed to the expression evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlan {
    shape: Arc<ShapeDescriptor>,
    record: Option<Record>,
    bindings: Vec<ResolvedBinding>,
}

impl ResolvedPlan {
    /// The shape this plan was resolved for
    pub fn shape(&self) -> &Arc<ShapeDescriptor> {
        &self.shape
    }

    /// The record snapshot kept as evaluation context
    ///
    /// `Some` iff the shape has at least one computed accessor.
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    pub(crate) fn binding(&self, index: usize) -> &ResolvedBinding {
        &self.bindings[index]
    }

    pub(crate) fn bindings(&self) -> &[ResolvedBinding] {
        &self.bindings
    }
}

/// Resolve a shape against a source record
///
/// Walks every accessor of the descriptor once. `Direct` accessors snapshot
/// the field value at their path; `Computed` accessors defer to evaluation
/// time; `Nested` accessors recurse into the sub-record at their path.
///
/// # Errors
///
/// - [`ProjectionError::MissingField`] when a non-nullable accessor's field
///   is absent from the record.
/// - [`ProjectionError::WrongType`] when a nested accessor's field holds a
///   non-object value.
pub fn resolve(
    descriptor: &Arc<ShapeDescriptor>,
    record: &Record,
) -> ProjectionResult<ResolvedPlan> {
    trace!(
        target: "prism::resolver",
        shape = %descriptor.name(),
        accessors = descriptor.accessors().len(),
        "resolving record"
    );

    let mut bindings = Vec::with_capacity(descriptor.accessors().len());
    for spec in descriptor.accessors() {
        let binding = match spec.kind() {
            AccessorKind::Direct { path } => match record.at(path) {
                Some(value) => ResolvedBinding::Direct {
                    value: Some(value.clone()),
                },
                None if spec.nullable() => ResolvedBinding::Direct { value: None },
                None => {
                    return Err(ProjectionError::missing_field(
                        descriptor.name().as_str(),
                        spec.name(),
                        path.to_string(),
                    ));
                }
            },
            AccessorKind::Computed { expression } => ResolvedBinding::Computed {
                expression: expression.clone(),
            },
            AccessorKind::Nested { path, shape } => {
                match record.at(path) {
                    Some(Value::Object(fields)) => {
                        let child_record = Record::from(fields.clone());
                        let child = resolve(shape, &child_record)?;
                        ResolvedBinding::Nested {
                            plan: Some(Arc::new(child)),
                        }
                    }
                    // A null child carries no record to project
                    Some(Value::Null) | None if spec.nullable() => {
                        ResolvedBinding::Nested { plan: None }
                    }
                    Some(Value::Null) | None => {
                        return Err(ProjectionError::missing_field(
                            descriptor.name().as_str(),
                            spec.name(),
                            path.to_string(),
                        ));
                    }
                    Some(other) => {
                        return Err(ProjectionError::wrong_type("Object", other.type_name()));
                    }
                }
            }
        };
        bindings.push(binding);
    }

    let record = if descriptor.has_computed_accessor() {
        Some(record.clone())
    } else {
        None
    };

    Ok(ResolvedPlan {
        shape: descriptor.clone(),
        record,
        bindings,
    })
}
