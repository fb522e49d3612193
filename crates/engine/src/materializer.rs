//! Projection materializer
//!
//! The [`Materializer`] turns a resolved plan into a [`MaterializedView`]. It
//! owns the two capabilities accessor resolution needs at view time: the
//! injected expression evaluator for computed accessors and the null-safety
//! wrapper registry. Both are shared behind `Arc`s, so a materializer is
//! cheap to clone and every view it produces carries a handle back to the
//! same capabilities.
//!
//! Strategy selection follows the shape:
//! - value-object shapes (a constructor is declared) materialize eagerly:
//!   every accessor is resolved, evaluated and wrapped now, and failures
//!   surface from the materialization call itself;
//! - interface-like shapes (no constructor) materialize as a [`LazyView`]
//!   that performs each accessor's bound strategy at invocation time.

use crate::descriptor::ShapeDescriptor;
use crate::evaluator::{EvalContext, ExpressionEvaluator, UnsupportedEvaluator};
use crate::resolver::{resolve, ResolvedBinding, ResolvedPlan};
use crate::view::{LazyView, MaterializedView, ValueView};
use crate::wrapper::WrapperRegistry;
use prism_core::{ProjectionError, ProjectionResult, Record, Value};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Turns resolved plans into materialized views
///
/// Configure once, share freely: the evaluator and wrapper registry live
/// behind `Arc`s and are handed to every view the materializer produces.
/// Without an explicit evaluator, computed accessors fail at their call with
/// a configuration message; closed shapes are unaffected.
///
/// # Examples
///
/// ```
/// use prism_engine::{Materializer, ShapeBuilder};
/// use prism_core::{Record, Value};
///
/// let shape = ShapeBuilder::new("NamesOnly")
///     .direct_field("firstname")
///     .build()
///     .unwrap();
/// let record = Record::new().with("firstname", "Oliver").with("age", 31i64);
///
/// let view = Materializer::new().materialize(&shape, &record).unwrap();
/// assert_eq!(view.get("firstname").unwrap(), Value::from("Oliver"));
/// ```
#[derive(Clone)]
pub struct Materializer {
    evaluator: Arc<dyn ExpressionEvaluator>,
    wrappers: Arc<WrapperRegistry>,
}

impl Materializer {
    /// Create a materializer with the default capabilities
    ///
    /// The default evaluator rejects every computed accessor; the wrapper
    /// registry ships with the built-in conventions.
    pub fn new() -> Self {
        Materializer {
            evaluator: Arc::new(UnsupportedEvaluator),
            wrappers: Arc::new(WrapperRegistry::new()),
        }
    }

    /// Replace the expression evaluator
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Replace the wrapper registry
    pub fn with_wrappers(mut self, wrappers: Arc<WrapperRegistry>) -> Self {
        self.wrappers = wrappers;
        self
    }

    /// The configured expression evaluator
    pub fn evaluator(&self) -> &dyn ExpressionEvaluator {
        self.evaluator.as_ref()
    }

    /// The configured wrapper registry
    pub fn wrappers(&self) -> &WrapperRegistry {
        &self.wrappers
    }

    /// Materialize one record through a shape
    ///
    /// Resolves the shape against the record, then builds the view the
    /// shape's kind calls for: an eager value object when a constructor is
    /// declared, a lazy view otherwise.
    ///
    /// # Errors
    ///
    /// Resolution failures ([`ProjectionError::MissingField`],
    /// [`ProjectionError::WrongType`]) surface from this call for both view
    /// kinds. Evaluation and wrapping failures surface from this call only
    /// for value-object shapes; lazy views defer them to the accessor call.
    pub fn materialize(
        &self,
        descriptor: &Arc<ShapeDescriptor>,
        record: &Record,
    ) -> ProjectionResult<MaterializedView> {
        let plan = resolve(descriptor, record)?;
        self.materialize_plan(Arc::new(plan))
    }

    /// Materialize every record of a result set, one view per row
    ///
    /// The iterator is lazy and single-pass: each record is resolved when the
    /// caller advances to it, and a failing row surfaces as an `Err` item
    /// without aborting the rows after it.
    pub fn materialize_iter<'a, I>(
        &'a self,
        descriptor: &'a Arc<ShapeDescriptor>,
        records: I,
    ) -> impl Iterator<Item = ProjectionResult<MaterializedView>> + 'a
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: 'a,
    {
        records
            .into_iter()
            .map(move |record| self.materialize(descriptor, &record))
    }

    /// Materialize an already-resolved plan
    ///
    /// Shared by [`materialize`](Self::materialize) and by lazy views when a
    /// nested child is first accessed.
    pub(crate) fn materialize_plan(
        &self,
        plan: Arc<ResolvedPlan>,
    ) -> ProjectionResult<MaterializedView> {
        let eager = plan.shape().is_value_object();
        trace!(
            target: "prism::materializer",
            shape = %plan.shape().name(),
            eager,
            "materializing view"
        );
        if eager {
            self.materialize_eager(&plan)
        } else {
            Ok(MaterializedView::Lazy(LazyView::new(plan, self.clone())))
        }
    }

    /// Eager path: evaluate every accessor now and freeze the result
    fn materialize_eager(&self, plan: &ResolvedPlan) -> ProjectionResult<MaterializedView> {
        let shape = plan.shape().clone();
        let mut values = Vec::with_capacity(shape.accessors().len());
        let mut children = FxHashMap::default();

        for (position, spec) in shape.accessors().iter().enumerate() {
            let value = match plan.binding(position) {
                ResolvedBinding::Direct { value } => {
                    self.wrappers.wrap(value.clone(), spec.wrapper())?
                }
                ResolvedBinding::Computed { expression } => {
                    // Value objects take no invocation arguments; computed
                    // accessors evaluate once with an empty args binding
                    let record = plan.record().ok_or_else(|| {
                        ProjectionError::computed_evaluation(
                            shape.name().as_str(),
                            spec.name(),
                            "no evaluation context bound",
                        )
                    })?;
                    let value = self
                        .evaluator
                        .evaluate(expression, EvalContext::new(record, &[]))
                        .map_err(|e| {
                            ProjectionError::computed_evaluation(
                                shape.name().as_str(),
                                spec.name(),
                                e.message(),
                            )
                        })?;
                    self.wrappers.wrap(Some(value), spec.wrapper())?
                }
                ResolvedBinding::Nested {
                    plan: Some(child_plan),
                } => {
                    let child = self.materialize_plan(child_plan.clone())?;
                    let snapshot = child.to_value()?;
                    children.insert(spec.name().to_string(), child);
                    self.wrappers.wrap(Some(snapshot), spec.wrapper())?
                }
                ResolvedBinding::Nested { plan: None } => {
                    self.wrappers.wrap(None, spec.wrapper())?
                }
            };
            values.push(value);
        }

        Ok(MaterializedView::Value(ValueView::assemble(
            shape, values, children,
        )))
    }
}

impl Default for Materializer {
    fn default() -> Self {
        Materializer::new()
    }
}

// The evaluator and wrapper registry are trait objects; identify them rather
// than printing them.
impl fmt::Debug for Materializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Materializer").finish_non_exhaustive()
    }
}

/// Convenience free function over a default materializer
///
/// Suits closed shapes, which need neither an evaluator nor custom wrapper
/// conventions. Open shapes materialized this way fail at their computed
/// accessors.
pub fn materialize(
    descriptor: &Arc<ShapeDescriptor>,
    record: &Record,
) -> ProjectionResult<MaterializedView> {
    Materializer::new().materialize(descriptor, record)
}
