//! Dynamic projections: the shape arrives as a runtime call argument.
//!
//! The selector validates the requested shape against the aggregate's
//! declared fields before anything is fetched, consumes the shape argument,
//! and forwards the rest of the argument list untouched.

use crate::common::*;

fn dynamic_projector() -> Projector {
    let projector = projector();
    projector.register_aggregate(person_schema());
    projector
        .describe("NamesOnly", |shape| {
            shape.direct_field("firstname").direct_field("lastname")
        })
        .unwrap();
    projector
}

// ============================================================================
// Call-site flow
// ============================================================================

#[test]
fn shape_argument_selects_the_projection_and_is_consumed() {
    let projector = dynamic_projector();
    let args = vec![
        QueryArg::Value(Value::from("Matthews")),
        QueryArg::Shape(ShapeArg::shape("NamesOnly")),
    ];

    let (shape, rest) = projector.select_for_call("Person", args).unwrap();
    assert_eq!(shape.name().as_str(), "NamesOnly");
    // The shape argument never reaches query execution
    assert_eq!(rest, vec![QueryArg::Value(Value::from("Matthews"))]);

    // The fetch happens elsewhere; project the row it returned
    let view = projector.project("NamesOnly", &person()).unwrap();
    assert_eq!(view.get("lastname").unwrap(), Value::from("Matthews"));
    assert!(view.get("salary").is_err());
}

#[test]
fn shape_argument_position_does_not_matter() {
    let projector = dynamic_projector();
    let leading = vec![
        QueryArg::Shape(ShapeArg::shape("NamesOnly")),
        QueryArg::Value(Value::from("Matthews")),
    ];
    let trailing = vec![
        QueryArg::Value(Value::from("Matthews")),
        QueryArg::Shape(ShapeArg::shape("NamesOnly")),
    ];

    let (first_shape, first_rest) = projector.select_for_call("Person", leading).unwrap();
    let (second_shape, second_rest) = projector.select_for_call("Person", trailing).unwrap();
    assert_eq!(first_shape.name(), second_shape.name());
    assert_eq!(first_rest, second_rest);
}

#[test]
fn call_without_shape_argument_gets_the_aggregate_itself() {
    let projector = dynamic_projector();
    let args = vec![QueryArg::Value(Value::from("Matthews"))];

    let (shape, rest) = projector.select_for_call("Person", args).unwrap();
    assert_eq!(shape.name().as_str(), "Person");
    assert_eq!(rest.len(), 1);

    // The identity shape reproduces the record
    let view = projector.project("Person", &person()).unwrap();
    assert_eq!(view.to_value().unwrap(), person().to_value());
}

#[test]
fn aggregate_argument_requests_the_unprojected_view() {
    let projector = dynamic_projector();
    let view = projector
        .project_dynamic("Person", &ShapeArg::aggregate("Person"), &person())
        .unwrap();

    assert_eq!(view.to_value().unwrap(), person().to_value());
    assert_eq!(view.get("salary").unwrap(), Value::Int(90_000));
}

// ============================================================================
// Compatibility validation
// ============================================================================

#[test]
fn incompatible_shape_is_rejected_before_any_fetch() {
    let projector = dynamic_projector();
    projector
        .describe("Payroll", |shape| {
            shape.direct_field("salary").direct_field("iban")
        })
        .unwrap();

    let args = vec![QueryArg::Shape(ShapeArg::shape("Payroll"))];
    let err = projector.select_for_call("Person", args).unwrap_err();
    assert_eq!(
        err,
        ProjectionError::incompatible_projection(
            "Payroll",
            "Person",
            vec!["iban".to_string()],
        )
    );
}

#[test]
fn compatibility_is_checked_against_declared_fields_not_the_row() {
    let projector = dynamic_projector();

    // The row happens to carry the field, but the aggregate never declared it
    let record = person().with("iban", "GB82WEST12345698765432");
    projector
        .describe("IbanOnly", |shape| shape.direct_field("iban"))
        .unwrap();

    let err = projector
        .project_dynamic("Person", &ShapeArg::shape("IbanOnly"), &record)
        .unwrap_err();
    assert!(matches!(
        err,
        ProjectionError::IncompatibleProjection { .. }
    ));
}

#[test]
fn open_shapes_are_compatible_when_their_direct_roots_are_declared() {
    let projector = dynamic_projector();
    projector
        .describe("Greeting", |shape| {
            shape
                .direct_field("firstname")
                .computed("greeting", "greeting")
        })
        .unwrap();

    let view = projector
        .project_dynamic("Person", &ShapeArg::shape("Greeting"), &person())
        .unwrap();
    assert_eq!(view.get("greeting").unwrap(), Value::from("Hello Oliver"));
}

#[test]
fn unknown_runtime_shape_is_rejected() {
    let projector = dynamic_projector();
    let err = projector
        .project_dynamic("Person", &ShapeArg::shape("NeverDescribed"), &person())
        .unwrap_err();
    assert!(matches!(err, ProjectionError::UnsupportedShape { .. }));
}

#[test]
fn requesting_a_different_aggregate_is_incompatible() {
    let projector = dynamic_projector();
    let err = projector
        .project_dynamic("Person", &ShapeArg::aggregate("Order"), &person())
        .unwrap_err();
    assert!(matches!(
        err,
        ProjectionError::IncompatibleProjection { .. }
    ));
}

#[test]
fn unknown_aggregate_is_reported_by_name() {
    let projector = dynamic_projector();
    let err = projector
        .select_for_call("Order", vec![])
        .unwrap_err();
    match err {
        ProjectionError::UnsupportedShape { shape, .. } => assert_eq!(shape, "Order"),
        other => panic!("expected UnsupportedShape, got {other:?}"),
    }
}

// ============================================================================
// Identity shape details
// ============================================================================

#[test]
fn identity_shape_tolerates_sparse_rows() {
    let projector = dynamic_projector();

    // Declared fields the row does not carry resolve to null
    let sparse = Record::new().with("firstname", "Oliver");
    let view = projector
        .project_dynamic("Person", &ShapeArg::aggregate("Person"), &sparse)
        .unwrap();
    assert_eq!(view.get("firstname").unwrap(), Value::from("Oliver"));
    assert_eq!(view.get("lastname").unwrap(), Value::Null);
    assert_eq!(view.get("salary").unwrap(), Value::Null);
}

#[test]
fn identity_shape_is_reused_across_calls() {
    let projector = dynamic_projector();
    let first = projector
        .select_for_call("Person", vec![])
        .unwrap()
        .0;
    let second = projector
        .select_for_call("Person", vec![])
        .unwrap()
        .0;
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}
