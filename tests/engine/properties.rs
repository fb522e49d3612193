//! Property tests over generated records and descriptor trees.

use crate::common::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Strategies
// ============================================================================

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ]
}

fn flat_record() -> impl Strategy<Value = Record> {
    proptest::collection::btree_map("[a-z][a-z0-9_]{0,7}", scalar(), 1..8).prop_map(Record::from)
}

/// Blueprint of one accessor, possibly a nested subtree.
#[derive(Debug, Clone)]
enum AccessorTree {
    Direct(String),
    Computed(String),
    Nested(String, Vec<AccessorTree>),
}

fn accessor_tree() -> impl Strategy<Value = Vec<AccessorTree>> {
    let leaf = prop_oneof![
        "[a-z]{1,6}".prop_map(AccessorTree::Direct),
        "[a-z]{1,6}".prop_map(AccessorTree::Computed),
    ];
    let node = leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            "[a-z]{1,6}".prop_map(AccessorTree::Direct),
            "[a-z]{1,6}".prop_map(AccessorTree::Computed),
            ("[a-z]{1,6}", proptest::collection::vec(inner, 1..4))
                .prop_map(|(field, children)| AccessorTree::Nested(field, children)),
        ]
    });
    proptest::collection::vec(node, 1..4)
}

fn build_shape(name: &str, tree: &[AccessorTree]) -> Arc<ShapeDescriptor> {
    let mut builder = ShapeBuilder::new(name);
    for (position, node) in tree.iter().enumerate() {
        let accessor = format!("f{position}");
        builder = match node {
            AccessorTree::Direct(field) => builder.direct(accessor, field.clone()),
            AccessorTree::Computed(expression) => builder.computed(accessor, expression.clone()),
            AccessorTree::Nested(field, children) => {
                let child = build_shape(&format!("{name}_{position}"), children);
                builder.nested(accessor, field.clone(), child)
            }
        };
    }
    builder.build().unwrap()
}

fn any_computed(tree: &[AccessorTree]) -> bool {
    tree.iter().any(|node| match node {
        AccessorTree::Computed(_) => true,
        AccessorTree::Direct(_) => false,
        AccessorTree::Nested(_, children) => any_computed(children),
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// A shape reading every field reproduces the record.
    #[test]
    fn full_direct_projection_reproduces_the_record(record in flat_record()) {
        let shape = record
            .field_names()
            .fold(ShapeBuilder::new("Identity"), |builder, field| {
                builder.direct_field(field).nullable()
            })
            .build()
            .unwrap();

        let view = materialize(&shape, &record).unwrap();
        prop_assert_eq!(view.to_value().unwrap(), record.to_value());
    }

    /// Narrowing exposes exactly the requested fields, nothing else.
    #[test]
    fn narrowing_exposes_exactly_the_requested_fields(record in flat_record()) {
        let all: Vec<String> = record.field_names().map(str::to_string).collect();
        let keep = all.len() / 2;

        let shape = all[..keep]
            .iter()
            .fold(ShapeBuilder::new("Narrowed"), |builder, field| {
                builder.direct_field(field)
            })
            .build()
            .unwrap();
        let view = materialize(&shape, &record).unwrap();

        for name in &all[..keep] {
            prop_assert_eq!(view.get(name).unwrap(), record.get(name).cloned().unwrap());
        }
        for name in &all[keep..] {
            prop_assert!(view.get(name).is_err());
        }

        let narrowed: BTreeMap<String, Value> = record
            .iter()
            .filter(|(name, _)| all[..keep].iter().any(|kept| kept == name))
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        prop_assert_eq!(view.to_value().unwrap(), Value::Object(narrowed));
    }

    /// The closed flag equals a recursive scan for computed accessors.
    #[test]
    fn closed_flag_matches_a_reference_scan(tree in accessor_tree()) {
        let shape = build_shape("Generated", &tree);
        let closed = !any_computed(&tree);
        prop_assert_eq!(shape.is_closed(), closed);
        // Fetch hints exist exactly for closed shapes
        prop_assert_eq!(shape.field_hint().is_some(), closed);
    }

    /// Fetching only the hinted fields materializes the same view.
    #[test]
    fn pruned_fetch_is_equivalent_for_closed_shapes(record in flat_record()) {
        let all: Vec<String> = record.field_names().map(str::to_string).collect();
        let keep = (all.len() + 1) / 2;

        let shape = all[..keep]
            .iter()
            .fold(ShapeBuilder::new("Hinted"), |builder, field| {
                builder.direct_field(field)
            })
            .build()
            .unwrap();

        let hint = shape.field_hint().unwrap();
        let roots = hint.root_fields();
        let pruned = Record::pruned(
            record
                .iter()
                .filter(|(name, _)| roots.contains(name))
                .map(|(name, value)| (name.to_string(), value.clone())),
        );

        let full_view = materialize(&shape, &record).unwrap();
        let pruned_view = materialize(&shape, &pruned).unwrap();
        prop_assert_eq!(
            full_view.to_value().unwrap(),
            pruned_view.to_value().unwrap()
        );
    }

    /// Reads are stable: the same accessor returns the same value every time.
    #[test]
    fn repeated_reads_are_stable(record in flat_record()) {
        let shape = record
            .field_names()
            .fold(ShapeBuilder::new("Stable"), |builder, field| {
                builder.direct_field(field).nullable()
            })
            .build()
            .unwrap();
        let view = materialize(&shape, &record).unwrap();

        for name in record.field_names() {
            prop_assert_eq!(view.get(name).unwrap(), view.get(name).unwrap());
        }
    }
}
