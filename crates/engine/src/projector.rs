//! High-level typed entry point for projection
//!
//! The [`Projector`] bundles a shape registry and a materializer behind one
//! handle, so hosts describe shapes, declare aggregates, and project records
//! without wiring the collaborators themselves. Each method delegates to the
//! underlying module; nothing here adds semantics.

use crate::descriptor::{FetchHint, ShapeBuilder, ShapeDescriptor};
use crate::evaluator::ExpressionEvaluator;
use crate::materializer::Materializer;
use crate::registry::{AggregateSchema, ShapeRegistry};
use crate::selector::{select, split_shape_arg, QueryArg, ShapeArg};
use crate::view::MaterializedView;
use crate::wrapper::WrapperRegistry;
use prism_core::{ProjectionError, ProjectionResult, Record};
use std::sync::Arc;

/// One-stop handle over a shape registry and a materializer
///
/// # Examples
///
/// ```
/// use prism_engine::Projector;
/// use prism_core::{Record, Value};
///
/// let projector = Projector::new();
/// projector
///     .describe("NamesOnly", |shape| {
///         shape.direct_field("firstname").direct_field("lastname")
///     })
///     .unwrap();
///
/// let record = Record::new()
///     .with("firstname", "Oliver")
///     .with("lastname", "Matthews")
///     .with("salary", 90_000i64);
///
/// let view = projector.project("NamesOnly", &record).unwrap();
/// assert_eq!(view.get("lastname").unwrap(), Value::from("Matthews"));
/// assert!(view.get("salary").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Projector {
    registry: Arc<ShapeRegistry>,
    materializer: Materializer,
}

impl Projector {
    /// Create a projector over a fresh, private registry
    pub fn new() -> Self {
        Projector {
            registry: Arc::new(ShapeRegistry::new()),
            materializer: Materializer::new(),
        }
    }

    /// Create a projector over an existing registry
    ///
    /// Pass [`ShapeRegistry::global`] to share descriptors process-wide.
    pub fn with_registry(registry: Arc<ShapeRegistry>) -> Self {
        Projector {
            registry,
            materializer: Materializer::new(),
        }
    }

    /// Replace the expression evaluator used for computed accessors
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.materializer = self.materializer.with_evaluator(evaluator);
        self
    }

    /// Replace the null-safety wrapper registry
    pub fn with_wrappers(mut self, wrappers: Arc<WrapperRegistry>) -> Self {
        self.materializer = self.materializer.with_wrappers(wrappers);
        self
    }

    /// The underlying registry
    pub fn registry(&self) -> &Arc<ShapeRegistry> {
        &self.registry
    }

    /// The underlying materializer
    pub fn materializer(&self) -> &Materializer {
        &self.materializer
    }

    // =========================================================================
    // Shape and aggregate registration
    // =========================================================================

    /// Return the descriptor cached under `name`, building it on first use
    ///
    /// # Errors
    ///
    /// Propagates descriptor build validation failures.
    pub fn describe<F>(&self, name: &str, build: F) -> ProjectionResult<Arc<ShapeDescriptor>>
    where
        F: FnOnce(ShapeBuilder) -> ShapeBuilder,
    {
        self.registry.describe(name, build)
    }

    /// Register a pre-built descriptor under its own name
    pub fn register_shape(&self, descriptor: Arc<ShapeDescriptor>) {
        self.registry.register(descriptor);
    }

    /// Declare an aggregate's field set for dynamic selection
    pub fn register_aggregate(&self, schema: AggregateSchema) -> Arc<AggregateSchema> {
        self.registry.register_aggregate(schema)
    }

    // =========================================================================
    // Projection
    // =========================================================================

    /// Project one record through the named shape
    ///
    /// # Errors
    ///
    /// [`ProjectionError::UnsupportedShape`] when no shape is registered
    /// under `name`; otherwise whatever resolution or materialization
    /// reports for the record.
    pub fn project(&self, name: &str, record: &Record) -> ProjectionResult<MaterializedView> {
        let descriptor = self.descriptor(name)?;
        self.materializer.materialize(&descriptor, record)
    }

    /// Project a batch of records through the named shape
    ///
    /// Views come back in input order; each element carries its own result,
    /// so one failing record does not poison the rest of the batch.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::UnsupportedShape`] when no shape is registered
    /// under `name`. Per-record failures surface inside the iterator.
    pub fn project_all<I>(
        &self,
        name: &str,
        records: I,
    ) -> ProjectionResult<impl Iterator<Item = ProjectionResult<MaterializedView>>>
    where
        I: IntoIterator<Item = Record>,
    {
        let descriptor = self.descriptor(name)?;
        let materializer = self.materializer.clone();
        Ok(records
            .into_iter()
            .map(move |record| materializer.materialize(&descriptor, &record)))
    }

    /// Source field paths sufficient to materialize the named shape
    ///
    /// `Some` for closed shapes, `None` for open ones. Intended as a fetch
    /// hint for the persistence collaborator; honoring it is optional.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::UnsupportedShape`] when no shape is registered
    /// under `name`.
    pub fn field_hint(&self, name: &str) -> ProjectionResult<Option<FetchHint>> {
        Ok(self.descriptor(name)?.field_hint())
    }

    // =========================================================================
    // Dynamic selection
    // =========================================================================

    /// Project one record through a runtime-selected shape
    ///
    /// The shape argument is validated against the named aggregate before
    /// the record is touched.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::UnsupportedShape`] when the aggregate is unknown,
    /// plus everything [`select`] and materialization can report.
    pub fn project_dynamic(
        &self,
        aggregate: &str,
        arg: &ShapeArg,
        record: &Record,
    ) -> ProjectionResult<MaterializedView> {
        let schema = self.schema(aggregate)?;
        let descriptor = select(&schema, arg, &self.registry)?;
        self.materializer.materialize(&descriptor, record)
    }

    /// Resolve a dynamic call's shape and strip it from the argument list
    ///
    /// Returns the descriptor to project through and the arguments that
    /// remain for query execution. A call without a shape argument falls
    /// back to the aggregate's identity shape, so the returned descriptor is
    /// always usable.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::UnsupportedShape`] when the aggregate is unknown,
    /// plus everything [`select`] can report about the shape argument.
    pub fn select_for_call(
        &self,
        aggregate: &str,
        args: Vec<QueryArg>,
    ) -> ProjectionResult<(Arc<ShapeDescriptor>, Vec<QueryArg>)> {
        let schema = self.schema(aggregate)?;
        let (shape_arg, rest) = split_shape_arg(args);
        let arg = shape_arg.unwrap_or_else(|| ShapeArg::aggregate(schema.name()));
        let descriptor = select(&schema, &arg, &self.registry)?;
        Ok((descriptor, rest))
    }

    fn descriptor(&self, name: &str) -> ProjectionResult<Arc<ShapeDescriptor>> {
        self.registry.lookup(name).ok_or_else(|| {
            ProjectionError::unsupported_shape(name, "no descriptor registered under this name")
        })
    }

    fn schema(&self, name: &str) -> ProjectionResult<Arc<AggregateSchema>> {
        self.registry.aggregate(name).ok_or_else(|| {
            ProjectionError::unsupported_shape(
                name,
                "no aggregate schema registered under this name",
            )
        })
    }
}

impl Default for Projector {
    fn default() -> Self {
        Projector::new()
    }
}
