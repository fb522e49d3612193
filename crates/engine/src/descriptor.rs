//! Shape descriptors
//!
//! A [`ShapeDescriptor`] is the static metadata of one requested projection
//! shape: its accessors, how each accessor resolves (direct field, computed
//! expression, or nested shape), whether the shape is closed, and the
//! constructor parameter order for value-object shapes.
//!
//! Descriptors are pure metadata: built once per distinct shape through
//! [`ShapeBuilder`], validated at build time, then shared immutably as
//! `Arc<ShapeDescriptor>` for the process lifetime. Nested shapes form an
//! explicit tree resolved once, never re-derived per row.

use crate::evaluator::ExpressionHandle;
use prism_core::{
    FieldPath, ProjectionError, ProjectionResult, MAX_ACCESSORS_PER_SHAPE, MAX_SHAPE_DEPTH,
};
use rustc_hash::FxHashMap;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// ShapeName
// =============================================================================

/// Interned identity of a projection shape
///
/// Cheap to clone and hash; used as the descriptor cache key and carried in
/// error attribution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeName(Arc<str>);

impl ShapeName {
    /// Create a shape name
    pub fn new(name: impl AsRef<str>) -> Self {
        ShapeName(Arc::from(name.as_ref()))
    }

    /// The name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ShapeName {
    fn from(s: &str) -> Self {
        ShapeName::new(s)
    }
}

impl From<String> for ShapeName {
    fn from(s: String) -> Self {
        ShapeName::new(s)
    }
}

impl Borrow<str> for ShapeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ShapeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for ShapeName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

// =============================================================================
// Accessors
// =============================================================================

/// How one accessor resolves against a source record
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorKind {
    /// 1:1 mapping to a source field
    Direct {
        /// Path of the source field
        path: FieldPath,
    },
    /// Evaluated by the external expression evaluator
    Computed {
        /// Expression handed through to the evaluator
        expression: ExpressionHandle,
    },
    /// Resolves a sub-record and projects it through a child shape
    Nested {
        /// Path of the field holding the sub-record
        path: FieldPath,
        /// Shape the sub-record is projected through
        shape: Arc<ShapeDescriptor>,
    },
}

/// One named accessor of a shape
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorSpec {
    name: String,
    kind: AccessorKind,
    nullable: bool,
    wrapper: Option<String>,
}

impl AccessorSpec {
    /// Accessor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolution strategy
    pub fn kind(&self) -> &AccessorKind {
        &self.kind
    }

    /// Whether absence of the source field is tolerated
    ///
    /// A wrapped accessor is implicitly nullable: absence resolves to the
    /// convention's empty representation rather than an error.
    pub fn nullable(&self) -> bool {
        self.nullable || self.wrapper.is_some()
    }

    /// Null-safety wrapper convention, if any
    pub fn wrapper(&self) -> Option<&str> {
        self.wrapper.as_deref()
    }

    /// Whether this accessor is computed
    pub fn is_computed(&self) -> bool {
        matches!(self.kind, AccessorKind::Computed { .. })
    }
}

// =============================================================================
// ConstructorSpec
// =============================================================================

/// Ordered constructor parameters of a value-object shape
///
/// Each parameter names an accessor of the shape; materialization assembles
/// the accessor values positionally in exactly this order. The parameter list
/// must cover every accessor exactly once, checked at descriptor build time.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorSpec {
    parameters: Vec<String>,
}

impl ConstructorSpec {
    /// Create a constructor spec from ordered parameter names
    pub fn new<I, S>(parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConstructorSpec {
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    /// The ordered parameter names
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

// =============================================================================
// FetchHint
// =============================================================================

/// Source field paths a closed shape reads
///
/// Exposed to the persistence collaborator as a query-shaping hint: fetching
/// only these paths is sufficient to materialize the shape. Honoring the hint
/// is optional and never changes materialization correctness.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchHint {
    paths: Vec<FieldPath>,
}

impl FetchHint {
    /// Paths from the aggregate root, nested shapes flattened in
    pub fn paths(&self) -> &[FieldPath] {
        &self.paths
    }

    /// Number of hinted paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the hint names no paths (a shape with no accessors)
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Top-level record fields the hinted paths enter through
    pub fn root_fields(&self) -> BTreeSet<&str> {
        self.paths.iter().filter_map(FieldPath::root_field).collect()
    }
}

// =============================================================================
// ShapeDescriptor
// =============================================================================

/// Static metadata of one projection shape
///
/// Immutable once built; shared as `Arc<ShapeDescriptor>` and cached by
/// shape name in the registry. A descriptor is *closed* iff no accessor,
/// transitively through nested shapes, is computed; closed shapes expose a
/// [`FetchHint`] for upstream field pruning.
#[derive(Debug, PartialEq)]
pub struct ShapeDescriptor {
    name: ShapeName,
    accessors: Vec<AccessorSpec>,
    constructor: Option<ConstructorSpec>,
    closed: bool,
    depth: u32,
    // Accessor name -> position in `accessors`, for O(1) lookup on views
    index: FxHashMap<String, usize>,
}

impl ShapeDescriptor {
    /// The shape's name
    pub fn name(&self) -> &ShapeName {
        &self.name
    }

    /// The shape's accessors, in declaration order
    pub fn accessors(&self) -> &[AccessorSpec] {
        &self.accessors
    }

    /// Accessor names, in declaration order
    pub fn accessor_names(&self) -> impl Iterator<Item = &str> {
        self.accessors.iter().map(AccessorSpec::name)
    }

    /// Look up an accessor by name
    pub fn accessor(&self, name: &str) -> Option<&AccessorSpec> {
        self.index.get(name).map(|&i| &self.accessors[i])
    }

    /// Position of an accessor in declaration order
    pub(crate) fn accessor_position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Constructor spec for value-object shapes
    pub fn constructor(&self) -> Option<&ConstructorSpec> {
        self.constructor.as_ref()
    }

    /// Whether the shape materializes as an eager value object
    pub fn is_value_object(&self) -> bool {
        self.constructor.is_some()
    }

    /// Whether every accessor, transitively, maps 1:1 to source fields
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether any accessor of this shape itself is computed
    ///
    /// Unlike [`is_closed`](Self::is_closed) this does not look through
    /// nested shapes; it decides whether a resolved plan for this shape must
    /// keep the record snapshot as evaluation context.
    pub fn has_computed_accessor(&self) -> bool {
        self.accessors.iter().any(AccessorSpec::is_computed)
    }

    /// Nesting depth of the descriptor tree (a flat shape has depth 1)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Source field paths needed to materialize this shape
    ///
    /// `Some` for closed shapes, listing every `Direct` path with nested
    /// shapes flattened in from the aggregate root. `None` for open shapes:
    /// a computed accessor sees the whole record, so nothing can be pruned.
    pub fn field_hint(&self) -> Option<FetchHint> {
        if !self.closed {
            return None;
        }
        let mut paths = Vec::new();
        let mut seen = BTreeSet::new();
        self.collect_hint_paths(None, &mut paths, &mut seen);
        Some(FetchHint { paths })
    }

    fn collect_hint_paths(
        &self,
        prefix: Option<&FieldPath>,
        out: &mut Vec<FieldPath>,
        seen: &mut BTreeSet<String>,
    ) {
        for spec in &self.accessors {
            match &spec.kind {
                AccessorKind::Direct { path } => {
                    let full = match prefix {
                        Some(p) => p.join(path),
                        None => path.clone(),
                    };
                    if seen.insert(full.to_string()) {
                        out.push(full);
                    }
                }
                AccessorKind::Nested { path, shape } => {
                    let child_prefix = match prefix {
                        Some(p) => p.join(path),
                        None => path.clone(),
                    };
                    shape.collect_hint_paths(Some(&child_prefix), out, seen);
                }
                // Unreachable for closed shapes; nothing to hint regardless
                AccessorKind::Computed { .. } => {}
            }
        }
    }
}

// =============================================================================
// ShapeBuilder
// =============================================================================

enum PendingPath {
    Raw(String),
    Parsed(FieldPath),
}

enum PendingKind {
    Direct(PendingPath),
    Computed(ExpressionHandle),
    Nested(PendingPath, Arc<ShapeDescriptor>),
}

struct PendingAccessor {
    name: String,
    kind: PendingKind,
    nullable: bool,
    wrapper: Option<String>,
}

/// Builder for [`ShapeDescriptor`]s
///
/// The only way to assemble a descriptor. Accessors are added in declaration
/// order; [`nullable`](Self::nullable) and [`wrapped`](Self::wrapped) apply
/// to the most recently added accessor. `build` validates the whole shape:
/// unique accessor names, path syntax, the accessor count limit, the nesting
/// depth limit, and constructor parameter coverage.
///
/// # Examples
///
/// ```
/// use prism_engine::ShapeBuilder;
///
/// let names_only = ShapeBuilder::new("NamesOnly")
///     .direct_field("firstname")
///     .direct_field("lastname")
///     .build()
///     .unwrap();
///
/// assert!(names_only.is_closed());
/// assert_eq!(names_only.depth(), 1);
/// ```
pub struct ShapeBuilder {
    name: ShapeName,
    accessors: Vec<PendingAccessor>,
    constructor: Option<ConstructorSpec>,
    misuse: Option<String>,
}

impl ShapeBuilder {
    /// Start building a shape with the given name
    pub fn new(name: impl Into<ShapeName>) -> Self {
        ShapeBuilder {
            name: name.into(),
            accessors: Vec::new(),
            constructor: None,
            misuse: None,
        }
    }

    /// Add a direct accessor reading the given source field path
    ///
    /// The path is parsed at build time (`address.city`, `emails[0]`).
    pub fn direct(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.accessors.push(PendingAccessor {
            name: name.into(),
            kind: PendingKind::Direct(PendingPath::Raw(path.into())),
            nullable: false,
            wrapper: None,
        });
        self
    }

    /// Add a direct accessor whose name is also its top-level source field
    ///
    /// The common 1:1 case: accessor `firstname` reading field `firstname`.
    /// No path parsing is involved, so any field name is accepted.
    pub fn direct_field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let path = FieldPath::field(name.clone());
        self.accessors.push(PendingAccessor {
            name,
            kind: PendingKind::Direct(PendingPath::Parsed(path)),
            nullable: false,
            wrapper: None,
        });
        self
    }

    /// Add a computed accessor evaluated via the external evaluator
    pub fn computed(
        mut self,
        name: impl Into<String>,
        expression: impl Into<ExpressionHandle>,
    ) -> Self {
        self.accessors.push(PendingAccessor {
            name: name.into(),
            kind: PendingKind::Computed(expression.into()),
            nullable: false,
            wrapper: None,
        });
        self
    }

    /// Add a nested accessor projecting the sub-record at `path` through a
    /// child shape
    pub fn nested(
        mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        shape: Arc<ShapeDescriptor>,
    ) -> Self {
        self.accessors.push(PendingAccessor {
            name: name.into(),
            kind: PendingKind::Nested(PendingPath::Raw(path.into()), shape),
            nullable: false,
            wrapper: None,
        });
        self
    }

    /// Add a nested accessor whose name is also its source field
    pub fn nested_field(mut self, name: impl Into<String>, shape: Arc<ShapeDescriptor>) -> Self {
        let name = name.into();
        let path = FieldPath::field(name.clone());
        self.accessors.push(PendingAccessor {
            name,
            kind: PendingKind::Nested(PendingPath::Parsed(path), shape),
            nullable: false,
            wrapper: None,
        });
        self
    }

    /// Mark the most recently added accessor as nullable
    ///
    /// A nullable accessor resolves absence to the absence marker instead of
    /// failing with a missing-field error.
    pub fn nullable(mut self) -> Self {
        match self.accessors.last_mut() {
            Some(spec) => spec.nullable = true,
            None => self.note_misuse("nullable() called before any accessor"),
        }
        self
    }

    /// Set the null-safety wrapper convention of the most recently added
    /// accessor
    pub fn wrapped(mut self, convention: impl Into<String>) -> Self {
        let convention = convention.into();
        match self.accessors.last_mut() {
            Some(spec) => spec.wrapper = Some(convention),
            None => self.note_misuse("wrapped() called before any accessor"),
        }
        self
    }

    /// Declare the shape as a value object with this constructor parameter
    /// order
    pub fn constructor<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constructor = Some(ConstructorSpec::new(parameters));
        self
    }

    fn note_misuse(&mut self, message: &str) {
        if self.misuse.is_none() {
            self.misuse = Some(message.to_string());
        }
    }

    /// Validate and build the descriptor
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnsupportedShape`] when the shape cannot be
    /// resolved: duplicate or empty accessor names, unparseable field paths,
    /// more than [`MAX_ACCESSORS_PER_SHAPE`] accessors, nesting beyond
    /// [`MAX_SHAPE_DEPTH`], or a constructor that does not cover the
    /// accessors exactly.
    pub fn build(self) -> ProjectionResult<Arc<ShapeDescriptor>> {
        let name = self.name;

        if let Some(misuse) = self.misuse {
            return Err(ProjectionError::unsupported_shape(name.as_str(), misuse));
        }

        if self.accessors.len() > MAX_ACCESSORS_PER_SHAPE {
            return Err(ProjectionError::unsupported_shape(
                name.as_str(),
                format!(
                    "{} accessors exceed the maximum of {}",
                    self.accessors.len(),
                    MAX_ACCESSORS_PER_SHAPE
                ),
            ));
        }

        let mut accessors = Vec::with_capacity(self.accessors.len());
        let mut index = FxHashMap::default();
        let mut closed = true;
        let mut depth = 1u32;

        for pending in self.accessors {
            if pending.name.is_empty() {
                return Err(ProjectionError::unsupported_shape(
                    name.as_str(),
                    "empty accessor name",
                ));
            }
            if let Some(ref wrapper) = pending.wrapper {
                if wrapper.is_empty() {
                    return Err(ProjectionError::unsupported_shape(
                        name.as_str(),
                        format!("accessor '{}': empty wrapper convention", pending.name),
                    ));
                }
            }

            let kind = match pending.kind {
                PendingKind::Direct(path) => AccessorKind::Direct {
                    path: Self::finish_path(&name, &pending.name, path)?,
                },
                PendingKind::Computed(expression) => {
                    closed = false;
                    AccessorKind::Computed { expression }
                }
                PendingKind::Nested(path, shape) => {
                    closed &= shape.is_closed();
                    depth = depth.max(shape.depth() + 1);
                    AccessorKind::Nested {
                        path: Self::finish_path(&name, &pending.name, path)?,
                        shape,
                    }
                }
            };

            let position = accessors.len();
            if index.insert(pending.name.clone(), position).is_some() {
                return Err(ProjectionError::unsupported_shape(
                    name.as_str(),
                    format!("duplicate accessor '{}'", pending.name),
                ));
            }
            accessors.push(AccessorSpec {
                name: pending.name,
                kind,
                nullable: pending.nullable,
                wrapper: pending.wrapper,
            });
        }

        if depth > MAX_SHAPE_DEPTH {
            return Err(ProjectionError::unsupported_shape(
                name.as_str(),
                format!(
                    "nesting depth {} exceeds the maximum of {}",
                    depth, MAX_SHAPE_DEPTH
                ),
            ));
        }

        if let Some(ref ctor) = self.constructor {
            Self::check_constructor(&name, ctor, &index)?;
        }

        debug!(
            target: "prism::descriptor",
            shape = %name,
            accessors = accessors.len(),
            closed,
            depth,
            "shape descriptor built"
        );

        Ok(Arc::new(ShapeDescriptor {
            name,
            accessors,
            constructor: self.constructor,
            closed,
            depth,
            index,
        }))
    }

    fn finish_path(
        shape: &ShapeName,
        accessor: &str,
        path: PendingPath,
    ) -> ProjectionResult<FieldPath> {
        match path {
            PendingPath::Parsed(path) => Ok(path),
            PendingPath::Raw(raw) => raw.parse::<FieldPath>().map_err(|e| {
                ProjectionError::unsupported_shape(
                    shape.as_str(),
                    format!("accessor '{}': {}", accessor, e),
                )
            }),
        }
    }

    fn check_constructor(
        shape: &ShapeName,
        ctor: &ConstructorSpec,
        index: &FxHashMap<String, usize>,
    ) -> ProjectionResult<()> {
        let mut seen = BTreeSet::new();
        for parameter in ctor.parameters() {
            if !index.contains_key(parameter) {
                return Err(ProjectionError::unsupported_shape(
                    shape.as_str(),
                    format!("constructor parameter '{}' names no accessor", parameter),
                ));
            }
            if !seen.insert(parameter.as_str()) {
                return Err(ProjectionError::unsupported_shape(
                    shape.as_str(),
                    format!("duplicate constructor parameter '{}'", parameter),
                ));
            }
        }
        if seen.len() != index.len() {
            let mut uncovered: Vec<&str> = index
                .keys()
                .map(String::as_str)
                .filter(|name| !seen.contains(name))
                .collect();
            uncovered.sort_unstable();
            return Err(ProjectionError::unsupported_shape(
                shape.as_str(),
                format!("constructor does not cover accessors {:?}", uncovered),
            ));
        }
        Ok(())
    }
}
