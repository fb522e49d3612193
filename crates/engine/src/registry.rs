//! Shape descriptor and aggregate schema registries
//!
//! Descriptors are built once per distinct shape and cached for the process
//! lifetime: the registry is a populate-on-first-use, never-evicted map keyed
//! by shape name. Concurrent first-use races are tolerated: descriptors are
//! immutable and interchangeable, so duplicate builds are wasteful but safe,
//! and all racers converge on whichever insert won.

use crate::descriptor::{ShapeBuilder, ShapeDescriptor, ShapeName};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use prism_core::ProjectionResult;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Process-global default registry.
static GLOBAL_REGISTRY: Lazy<Arc<ShapeRegistry>> = Lazy::new(|| Arc::new(ShapeRegistry::new()));

// =============================================================================
// AggregateSchema
// =============================================================================

/// Declared field set of a persisted aggregate
///
/// The static contract the dynamic shape selector checks runtime shape
/// arguments against: a shape is compatible with an aggregate iff every
/// source field it reads is declared here.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSchema {
    name: String,
    fields: BTreeSet<String>,
}

impl AggregateSchema {
    /// Declare an aggregate and its field set
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AggregateSchema {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The aggregate's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields, in sorted order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Whether the aggregate declares a field
    pub fn declares_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Number of declared fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

// =============================================================================
// ShapeRegistry
// =============================================================================

/// Process-wide cache of shape descriptors and aggregate schemas
///
/// Safe to share and call from any number of threads. The common entry point
/// is [`describe`](Self::describe), which returns the cached descriptor for a
/// name or builds it on first use; [`register`](Self::register) and
/// [`lookup`](Self::lookup) exist for pre-built descriptors.
///
/// Most callers use the process-global instance via
/// [`ShapeRegistry::global`]; fresh instances remain constructible for
/// isolation in tests.
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: DashMap<ShapeName, Arc<ShapeDescriptor>>,
    aggregates: DashMap<String, Arc<AggregateSchema>>,
}

impl ShapeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        ShapeRegistry::default()
    }

    /// The process-global registry
    pub fn global() -> Arc<ShapeRegistry> {
        GLOBAL_REGISTRY.clone()
    }

    /// Return the descriptor cached under `name`, building it on first use
    ///
    /// The builder handed to `build` is already seeded with `name`, so the
    /// built descriptor always lands under the key it was requested by.
    /// Races on first use converge: every caller gets the same `Arc` once an
    /// insert has won; a losing builder's copy is dropped. Build failures are
    /// not cached, so a later call with a corrected closure can succeed.
    ///
    /// # Errors
    ///
    /// Propagates [`ShapeBuilder::build`] validation failures.
    pub fn describe<F>(
        &self,
        name: impl Into<ShapeName>,
        build: F,
    ) -> ProjectionResult<Arc<ShapeDescriptor>>
    where
        F: FnOnce(ShapeBuilder) -> ShapeBuilder,
    {
        let name = name.into();
        if let Some(existing) = self.shapes.get(name.as_str()) {
            trace!(target: "prism::registry", shape = %name, "descriptor cache hit");
            return Ok(existing.clone());
        }
        trace!(target: "prism::registry", shape = %name, "descriptor cache miss");

        // Build outside the map lock; first insert wins under races
        let built = build(ShapeBuilder::new(name.clone())).build()?;
        let entry = self.shapes.entry(name).or_insert(built);
        Ok(entry.value().clone())
    }

    /// Register a pre-built descriptor under its own name
    ///
    /// Replaces any previous registration for the same name.
    pub fn register(&self, descriptor: Arc<ShapeDescriptor>) {
        let name = descriptor.name().clone();
        let replaced = self.shapes.insert(name.clone(), descriptor).is_some();
        if replaced {
            warn!(target: "prism::registry", shape = %name, "shape descriptor replaced");
        } else {
            debug!(target: "prism::registry", shape = %name, "shape descriptor registered");
        }
    }

    /// Look up a descriptor by name
    pub fn lookup(&self, name: &str) -> Option<Arc<ShapeDescriptor>> {
        self.shapes.get(name).map(|entry| entry.clone())
    }

    /// Number of cached descriptors
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Register an aggregate schema, replacing any previous one of the same
    /// name
    pub fn register_aggregate(&self, schema: AggregateSchema) -> Arc<AggregateSchema> {
        let schema = Arc::new(schema);
        let replaced = self
            .aggregates
            .insert(schema.name().to_string(), schema.clone())
            .is_some();
        if replaced {
            warn!(target: "prism::registry", aggregate = %schema.name(), "aggregate schema replaced");
        } else {
            debug!(target: "prism::registry", aggregate = %schema.name(), "aggregate schema registered");
        }
        schema
    }

    /// Look up an aggregate schema by name
    pub fn aggregate(&self, name: &str) -> Option<Arc<AggregateSchema>> {
        self.aggregates.get(name).map(|entry| entry.clone())
    }
}
