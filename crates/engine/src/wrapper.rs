//! Null-safety wrapper conventions
//!
//! A wrapper convention decides how an accessor represents presence and
//! absence: a wrapped accessor never surfaces a raw null, it surfaces the
//! convention's empty representation instead. The engine only knows the two
//! constructors every convention must provide, its empty representation and
//! its present-value wrapping.

use parking_lot::RwLock;
use prism_core::{ProjectionError, ProjectionResult, Value};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// Name of the built-in zero-or-one-element convention
pub const OPTION_CONVENTION: &str = "option";

/// A null-safety wrapper convention
///
/// Implementations must be pure: both constructors are called on every
/// accessor resolution and must not observe or mutate shared state.
pub trait NullWrapper: Send + Sync {
    /// The canonical empty representation
    fn empty(&self) -> Value;

    /// Wrap a present, non-null value
    fn of(&self, value: Value) -> Value;
}

/// Built-in convention encoding presence as a zero-or-one-element array
///
/// `[]` for absent, `[value]` for present. Unlike a raw-null encoding this
/// survives nesting: a present `Null` and an absent field stay
/// distinguishable to anything downstream that re-wraps.
struct OptionWrapper;

impl NullWrapper for OptionWrapper {
    fn empty(&self) -> Value {
        Value::Array(Vec::new())
    }

    fn of(&self, value: Value) -> Value {
        Value::Array(vec![value])
    }
}

/// Registry of wrapper conventions, keyed by name
///
/// Ships with the [`OPTION_CONVENTION`] built in. Registration is
/// last-write-wins, so callers can replace the built-in encoding.
pub struct WrapperRegistry {
    conventions: RwLock<FxHashMap<String, Arc<dyn NullWrapper>>>,
}

impl WrapperRegistry {
    /// Create a registry with the built-in conventions
    pub fn new() -> Self {
        let registry = WrapperRegistry {
            conventions: RwLock::new(FxHashMap::default()),
        };
        registry.register(OPTION_CONVENTION, Arc::new(OptionWrapper));
        registry
    }

    /// Register a convention under a name, replacing any previous one
    pub fn register(&self, name: impl Into<String>, wrapper: Arc<dyn NullWrapper>) {
        let name = name.into();
        debug!(target: "prism::wrapper", convention = %name, "wrapper convention registered");
        self.conventions.write().insert(name, wrapper);
    }

    /// Whether a convention name is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.conventions.read().contains_key(name)
    }

    /// Apply a convention to a resolved accessor value
    ///
    /// With no convention the value passes through raw and absence becomes
    /// `Value::Null`, the host absence marker. With a convention, a present
    /// non-null value wraps via `of` and both absence and a present `Null`
    /// map to the convention's empty representation.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::UnsupportedConvention`] when the convention name is
    /// not registered.
    pub fn wrap(&self, value: Option<Value>, convention: Option<&str>) -> ProjectionResult<Value> {
        let Some(name) = convention else {
            return Ok(value.unwrap_or(Value::Null));
        };
        let conventions = self.conventions.read();
        let wrapper = conventions
            .get(name)
            .ok_or_else(|| ProjectionError::unsupported_convention(name))?;
        match value {
            Some(value) if !value.is_null() => Ok(wrapper.of(value)),
            _ => Ok(wrapper.empty()),
        }
    }
}

impl Default for WrapperRegistry {
    fn default() -> Self {
        WrapperRegistry::new()
    }
}
