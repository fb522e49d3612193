//! Materialized views
//!
//! A [`MaterializedView`] is what a projection hands back to the caller: the
//! shape's accessor contract bound to one source record. Two materialization
//! strategies exist behind the same surface:
//!
//! - [`ValueView`] is eager. Every accessor was resolved, evaluated and
//!   wrapped at materialization time, then frozen into constructor-ordered
//!   slots. Reads never fail for evaluation reasons and never re-run
//!   anything.
//! - [`LazyView`] is deferred. Accessors resolve on invocation: direct reads
//!   come from the plan snapshot, computed accessors call the expression
//!   evaluator at that moment, and nested child views materialize on first
//!   access and are memoized per view instance.
//!
//! Lazy views are safe to read from many threads at once; the child-view
//! memoization uses idempotent once-initialization, so every reader sees the
//! same child instance.

use crate::descriptor::{AccessorKind, AccessorSpec, ShapeDescriptor, ShapeName};
use crate::evaluator::{EvalContext, ExpressionHandle};
use crate::materializer::Materializer;
use crate::resolver::{ResolvedBinding, ResolvedPlan};
use once_cell::sync::OnceCell;
use prism_core::{ProjectionError, ProjectionResult, Value, MAX_EVAL_ARGS};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

fn unknown_accessor(shape: &ShapeName, accessor: &str) -> ProjectionError {
    ProjectionError::unsupported_shape(shape.as_str(), format!("no accessor named '{}'", accessor))
}

// =============================================================================
// MaterializedView
// =============================================================================

/// A shape's accessor contract bound to one source record
///
/// Produced by the materializer, one per row. Eager for value-object shapes,
/// lazy otherwise; [`is_lazy`](Self::is_lazy) tells which, though callers
/// normally only use the shared accessor surface.
#[derive(Debug)]
pub enum MaterializedView {
    /// Eagerly materialized value object
    Value(ValueView),
    /// Lazy per-accessor resolution
    Lazy(LazyView),
}

impl MaterializedView {
    /// The shape this view satisfies
    pub fn shape(&self) -> &Arc<ShapeDescriptor> {
        match self {
            MaterializedView::Value(view) => view.shape(),
            MaterializedView::Lazy(view) => view.shape(),
        }
    }

    /// Whether accessors resolve at call time rather than up front
    pub fn is_lazy(&self) -> bool {
        matches!(self, MaterializedView::Lazy(_))
    }

    /// Read an accessor without arguments
    pub fn get(&self, accessor: &str) -> ProjectionResult<Value> {
        match self {
            MaterializedView::Value(view) => view.get(accessor),
            MaterializedView::Lazy(view) => view.get(accessor),
        }
    }

    /// Invoke an accessor, passing arguments through to computed evaluation
    ///
    /// Only computed accessors on lazy views accept arguments; everywhere
    /// else a non-empty argument list is a contract error.
    pub fn invoke(&self, accessor: &str, args: &[Value]) -> ProjectionResult<Value> {
        match self {
            MaterializedView::Value(view) => view.invoke(accessor, args),
            MaterializedView::Lazy(view) => view.invoke(accessor, args),
        }
    }

    /// Navigate to a nested accessor's child view
    ///
    /// `Ok(None)` when the nullable child is absent from the source record.
    pub fn nested(&self, accessor: &str) -> ProjectionResult<Option<&MaterializedView>> {
        match self {
            MaterializedView::Value(view) => view.nested(accessor),
            MaterializedView::Lazy(view) => view.nested(accessor),
        }
    }

    /// Accessor names of the underlying shape, in declaration order
    pub fn accessor_names(&self) -> impl Iterator<Item = &str> {
        self.shape().accessor_names()
    }

    /// Snapshot every accessor into an object value
    ///
    /// On a lazy view this resolves each accessor now, so it can fail the
    /// same ways individual accessor calls can.
    pub fn to_value(&self) -> ProjectionResult<Value> {
        match self {
            MaterializedView::Value(view) => Ok(view.to_value()),
            MaterializedView::Lazy(view) => view.to_value(),
        }
    }

    /// Constructor-ordered argument slots of a value-object view
    ///
    /// `None` for lazy views.
    pub fn constructor_args(&self) -> Option<&[Value]> {
        match self {
            MaterializedView::Value(view) => Some(view.constructor_args()),
            MaterializedView::Lazy(_) => None,
        }
    }
}

// =============================================================================
// ValueView
// =============================================================================

/// Eagerly materialized value object
///
/// Accessor values are evaluated once, wrapped, and assembled positionally in
/// the shape's constructor parameter order (declaration order when the shape
/// declares no constructor). The view is immutable from then on.
#[derive(Debug)]
pub struct ValueView {
    shape: Arc<ShapeDescriptor>,
    // Constructor-ordered slots
    values: Vec<Value>,
    // Accessor name -> slot in `values`
    index: FxHashMap<String, usize>,
    // Child views of present nested accessors, by accessor name
    children: FxHashMap<String, MaterializedView>,
}

impl ValueView {
    /// Assemble a view from per-accessor values in declaration order
    pub(crate) fn assemble(
        shape: Arc<ShapeDescriptor>,
        accessor_values: Vec<Value>,
        children: FxHashMap<String, MaterializedView>,
    ) -> ValueView {
        let order: Vec<String> = match shape.constructor() {
            Some(ctor) => ctor.parameters().to_vec(),
            None => shape.accessor_names().map(str::to_string).collect(),
        };

        let mut slots: Vec<Option<Value>> = accessor_values.into_iter().map(Some).collect();
        let mut values = Vec::with_capacity(order.len());
        let mut index = FxHashMap::default();
        for name in order {
            if let Some(value) = shape
                .accessor_position(&name)
                .and_then(|pos| slots[pos].take())
            {
                index.insert(name, values.len());
                values.push(value);
            }
        }

        ValueView {
            shape,
            values,
            index,
            children,
        }
    }

    /// The shape this view satisfies
    pub fn shape(&self) -> &Arc<ShapeDescriptor> {
        &self.shape
    }

    /// Read a frozen accessor value
    pub fn get(&self, accessor: &str) -> ProjectionResult<Value> {
        self.index
            .get(accessor)
            .map(|&slot| self.values[slot].clone())
            .ok_or_else(|| unknown_accessor(self.shape.name(), accessor))
    }

    /// Invoke an accessor; value objects accept no arguments
    pub fn invoke(&self, accessor: &str, args: &[Value]) -> ProjectionResult<Value> {
        if !self.index.contains_key(accessor) {
            return Err(unknown_accessor(self.shape.name(), accessor));
        }
        if !args.is_empty() {
            return Err(ProjectionError::unsupported_shape(
                self.shape.name().as_str(),
                format!("value object accessor '{}' takes no arguments", accessor),
            ));
        }
        self.get(accessor)
    }

    /// Navigate to a nested accessor's child view
    pub fn nested(&self, accessor: &str) -> ProjectionResult<Option<&MaterializedView>> {
        let spec = self
            .shape
            .accessor(accessor)
            .ok_or_else(|| unknown_accessor(self.shape.name(), accessor))?;
        if !matches!(spec.kind(), AccessorKind::Nested { .. }) {
            return Err(ProjectionError::unsupported_shape(
                self.shape.name().as_str(),
                format!("accessor '{}' is not nested", accessor),
            ));
        }
        Ok(self.children.get(accessor))
    }

    /// Constructor-ordered argument slots
    pub fn constructor_args(&self) -> &[Value] {
        &self.values
    }

    /// Snapshot every accessor into an object value
    pub fn to_value(&self) -> Value {
        let mut fields = BTreeMap::new();
        for (name, &slot) in &self.index {
            fields.insert(name.clone(), self.values[slot].clone());
        }
        Value::Object(fields)
    }
}

// =============================================================================
// LazyView
// =============================================================================

/// Lazy proxy view resolving accessors at call time
///
/// Direct accessors read the plan's field snapshots; computed accessors call
/// the expression evaluator on every invocation; nested accessors
/// materialize their child view on first access and return the same instance
/// afterwards. Evaluation failures are surfaced per call and never cached, so
/// a failed computed accessor can succeed on retry against a recovered
/// evaluator.
#[derive(Debug)]
pub struct LazyView {
    plan: Arc<ResolvedPlan>,
    materializer: Materializer,
    // One memoization slot per accessor; only nested slots are ever set
    children: Vec<OnceCell<MaterializedView>>,
}

impl LazyView {
    pub(crate) fn new(plan: Arc<ResolvedPlan>, materializer: Materializer) -> LazyView {
        let children = (0..plan.bindings().len()).map(|_| OnceCell::new()).collect();
        LazyView {
            plan,
            materializer,
            children,
        }
    }

    /// The shape this view satisfies
    pub fn shape(&self) -> &Arc<ShapeDescriptor> {
        self.plan.shape()
    }

    /// Resolve an accessor without arguments
    pub fn get(&self, accessor: &str) -> ProjectionResult<Value> {
        self.invoke(accessor, &[])
    }

    /// Resolve an accessor, passing arguments to computed evaluation
    pub fn invoke(&self, accessor: &str, args: &[Value]) -> ProjectionResult<Value> {
        let shape = self.plan.shape();
        let index = shape
            .accessor_position(accessor)
            .ok_or_else(|| unknown_accessor(shape.name(), accessor))?;
        let spec = &shape.accessors()[index];

        match self.plan.binding(index) {
            ResolvedBinding::Computed { expression } => self.evaluate(spec, expression, args),
            _ if !args.is_empty() => Err(ProjectionError::unsupported_shape(
                shape.name().as_str(),
                format!("accessor '{}' takes no arguments", accessor),
            )),
            ResolvedBinding::Direct { value } => self
                .materializer
                .wrappers()
                .wrap(value.clone(), spec.wrapper()),
            ResolvedBinding::Nested { .. } => {
                let snapshot = match self.child(index)? {
                    Some(view) => Some(view.to_value()?),
                    None => None,
                };
                self.materializer.wrappers().wrap(snapshot, spec.wrapper())
            }
        }
    }

    /// Navigate to a nested accessor's child view
    ///
    /// The child is materialized on first access and memoized for the life
    /// of this view instance; repeated calls return the same child.
    pub fn nested(&self, accessor: &str) -> ProjectionResult<Option<&MaterializedView>> {
        let shape = self.plan.shape();
        let index = shape
            .accessor_position(accessor)
            .ok_or_else(|| unknown_accessor(shape.name(), accessor))?;
        self.child(index)
    }

    /// Snapshot every accessor into an object value
    pub fn to_value(&self) -> ProjectionResult<Value> {
        let mut fields = BTreeMap::new();
        for spec in self.plan.shape().accessors() {
            fields.insert(spec.name().to_string(), self.get(spec.name())?);
        }
        Ok(Value::Object(fields))
    }

    fn child(&self, index: usize) -> ProjectionResult<Option<&MaterializedView>> {
        match self.plan.binding(index) {
            ResolvedBinding::Nested {
                plan: Some(child_plan),
            } => {
                let view = self.children[index]
                    .get_or_try_init(|| self.materializer.materialize_plan(child_plan.clone()))?;
                Ok(Some(view))
            }
            ResolvedBinding::Nested { plan: None } => Ok(None),
            _ => Err(ProjectionError::unsupported_shape(
                self.plan.shape().name().as_str(),
                format!(
                    "accessor '{}' is not nested",
                    self.plan.shape().accessors()[index].name()
                ),
            )),
        }
    }

    fn evaluate(
        &self,
        spec: &AccessorSpec,
        expression: &ExpressionHandle,
        args: &[Value],
    ) -> ProjectionResult<Value> {
        let shape = self.plan.shape().name();
        if args.len() > MAX_EVAL_ARGS {
            return Err(ProjectionError::computed_evaluation(
                shape.as_str(),
                spec.name(),
                format!(
                    "{} arguments exceed the maximum of {}",
                    args.len(),
                    MAX_EVAL_ARGS
                ),
            ));
        }
        let Some(record) = self.plan.record() else {
            return Err(ProjectionError::computed_evaluation(
                shape.as_str(),
                spec.name(),
                "no evaluation context bound",
            ));
        };
        let value = self
            .materializer
            .evaluator()
            .evaluate(expression, EvalContext::new(record, args))
            .map_err(|e| {
                ProjectionError::computed_evaluation(shape.as_str(), spec.name(), e.message())
            })?;
        self.materializer.wrappers().wrap(Some(value), spec.wrapper())
    }
}
