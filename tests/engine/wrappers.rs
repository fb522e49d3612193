//! Null-safety wrapper conventions on accessors.
//!
//! A wrapped accessor never surfaces a bare null: absence and present nulls
//! map to the convention's empty representation, present values to its
//! wrapped representation. Wrapping implies nullability.

use crate::common::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn optional_names(projector: &Projector) {
    projector
        .describe("OptionalNames", |shape| {
            shape
                .direct_field("firstname")
                .wrapped(OPTION_CONVENTION)
                .direct_field("nickname")
                .wrapped(OPTION_CONVENTION)
        })
        .unwrap();
}

// ============================================================================
// Built-in option convention
// ============================================================================

#[test]
fn present_value_wraps_as_a_singleton() {
    let projector = projector();
    optional_names(&projector);

    let view = projector.project("OptionalNames", &person()).unwrap();
    assert_eq!(
        view.get("firstname").unwrap(),
        Value::Array(vec![Value::from("Oliver")])
    );
}

#[test]
fn absent_value_wraps_as_empty() {
    let projector = projector();
    optional_names(&projector);

    let view = projector.project("OptionalNames", &person()).unwrap();
    assert_eq!(view.get("nickname").unwrap(), Value::Array(vec![]));
}

#[test]
fn present_null_wraps_as_empty_too() {
    let projector = projector();
    optional_names(&projector);

    let record = person().with("nickname", Value::Null);
    let view = projector.project("OptionalNames", &record).unwrap();
    assert_eq!(view.get("nickname").unwrap(), Value::Array(vec![]));
}

#[test]
fn wrapping_implies_nullability() {
    // No explicit nullable() call; the wrapper alone tolerates absence
    let projector = projector();
    projector
        .describe("JustNickname", |shape| {
            shape.direct_field("nickname").wrapped(OPTION_CONVENTION)
        })
        .unwrap();

    assert!(projector.project("JustNickname", &person()).is_ok());
}

#[test]
fn wrapped_computed_accessors_wrap_the_evaluation_result() {
    let projector = projector();
    projector
        .describe("WrappedFullName", |shape| {
            shape.computed("fullName", "fullname").wrapped(OPTION_CONVENTION)
        })
        .unwrap();

    let view = projector.project("WrappedFullName", &person()).unwrap();
    assert_eq!(
        view.get("fullName").unwrap(),
        Value::Array(vec![Value::from("Oliver Matthews")])
    );
}

#[test]
fn wrapped_nested_accessors_wrap_the_child_snapshot() {
    let address_view = ShapeBuilder::new("AddressView")
        .direct_field("city")
        .build()
        .unwrap();
    let projector = projector();
    projector
        .describe("WrappedAddress", |shape| {
            shape
                .nested_field("address", address_view)
                .wrapped(OPTION_CONVENTION)
        })
        .unwrap();

    let view = projector.project("WrappedAddress", &person()).unwrap();
    let expected = Value::Array(vec![Record::new().with("city", "Norwich").to_value()]);
    assert_eq!(view.get("address").unwrap(), expected);

    // Navigation is unaffected by the wrapper
    let child = view.nested("address").unwrap().unwrap();
    assert_eq!(child.get("city").unwrap(), Value::from("Norwich"));
}

// ============================================================================
// Convention registry
// ============================================================================

struct FlaggedWrapper;

impl NullWrapper for FlaggedWrapper {
    fn empty(&self) -> Value {
        Value::Object(BTreeMap::from([(
            "present".to_string(),
            Value::Bool(false),
        )]))
    }

    fn of(&self, value: Value) -> Value {
        Value::Object(BTreeMap::from([
            ("present".to_string(), Value::Bool(true)),
            ("value".to_string(), value),
        ]))
    }
}

#[test]
fn custom_conventions_are_registered_per_wrapper_registry() {
    let wrappers = WrapperRegistry::new();
    assert!(wrappers.is_registered(OPTION_CONVENTION));
    assert!(!wrappers.is_registered("flagged"));

    wrappers.register("flagged", Arc::new(FlaggedWrapper));
    assert!(wrappers.is_registered("flagged"));

    let projector = Projector::new().with_wrappers(Arc::new(wrappers));
    projector
        .describe("Flagged", |shape| {
            shape
                .direct_field("firstname")
                .wrapped("flagged")
                .direct_field("nickname")
                .wrapped("flagged")
        })
        .unwrap();

    let view = projector.project("Flagged", &person()).unwrap();
    assert_eq!(
        view.get("firstname").unwrap(),
        Value::Object(BTreeMap::from([
            ("present".to_string(), Value::Bool(true)),
            ("value".to_string(), Value::from("Oliver")),
        ]))
    );
    assert_eq!(
        view.get("nickname").unwrap(),
        Value::Object(BTreeMap::from([(
            "present".to_string(),
            Value::Bool(false),
        )]))
    );
}

#[test]
fn unknown_convention_fails_the_accessor_on_lazy_views() {
    let projector = projector();
    projector
        .describe("Exotic", |shape| {
            shape.direct_field("firstname").wrapped("galaxy")
        })
        .unwrap();

    // Lazy view: materialization succeeds, the read reports the convention
    let view = projector.project("Exotic", &person()).unwrap();
    let err = view.get("firstname").unwrap_err();
    assert_eq!(
        err,
        ProjectionError::unsupported_convention("galaxy")
    );
}

#[test]
fn unknown_convention_fails_eager_materialization_up_front() {
    let projector = projector();
    projector
        .describe("ExoticDto", |shape| {
            shape
                .direct_field("firstname")
                .wrapped("galaxy")
                .constructor(["firstname"])
        })
        .unwrap();

    let err = projector.project("ExoticDto", &person()).unwrap_err();
    assert_eq!(
        err,
        ProjectionError::unsupported_convention("galaxy")
    );
}

#[test]
fn unwrapped_accessors_pass_values_through() {
    let projector = projector();
    projector
        .describe("Bare", |shape| {
            shape.direct_field("firstname").direct_field("nickname").nullable()
        })
        .unwrap();

    let view = projector.project("Bare", &person()).unwrap();
    assert_eq!(view.get("firstname").unwrap(), Value::from("Oliver"));
    assert_eq!(view.get("nickname").unwrap(), Value::Null);
}
