//! Round-trip tests
//!
//! Tests for:
//! - read(write(v)) matches v up to container child order
//! - Payload kinds survive type narrowing and explicit type requests
//! - Attribute policies on read

use treestore::resolve::OverrideMap;
use treestore::storage::MemoryEngine;
use treestore::tree::{self, AttrPolicy, WriteOptions};
use treestore::value::{Complex, Container, Payload, Record, Value};

// =============================================================================
// Test Utilities
// =============================================================================

fn round_trip_with(value: &Value, options: &WriteOptions) -> Value {
    let mut engine = MemoryEngine::new();
    tree::write(&mut engine, value, "/rt", options).unwrap();
    tree::read(&engine, "/rt", &AttrPolicy::All).unwrap()
}

fn round_trip(value: &Value) -> Value {
    round_trip_with(value, &WriteOptions::new())
}

fn sample_tree() -> Value {
    let table = Record::new()
        .with_column("id", Value::int(vec![10, 20, 30]))
        .with_column("score", Value::float(vec![0.5, f64::NAN, 2.25]))
        .with_column("label", Value::text(vec!["a", "bb", "c"]))
        .with_column(
            "grade",
            Value::categorical(
                vec![Some(2), Some(1), Some(2)],
                vec!["low".into(), "high".into()],
            ),
        );
    let nested = Container::new()
        .with("zeta", Value::bool_opt(vec![Some(true), None]))
        .with("alpha", Value::complex(vec![Complex::new(1.0, -1.0)]))
        .with("blob", Value::binary(vec![0xde, 0xad, 0xbe, 0xef]));

    Value::container(
        Container::new()
            .with(
                "matrix",
                Value::array(Payload::Float(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), vec![3, 2]),
            )
            .with("table", Value::record(table))
            .with("nested", Value::container(nested).with_attr("note", Value::text(vec!["x"])))
            .with("empty", Value::null())
            .with("count", Value::scalar(Payload::Int(vec![Some(42)]))),
    )
    .with_attr("version", Value::int(vec![3]))
    .with_attr("ratio", Value::float(vec![0.125]))
    .with_attr("title", Value::text(vec!["root tree"]))
}

// =============================================================================
// Full Trees
// =============================================================================

#[test]
fn test_mixed_tree_round_trips() {
    let tree = sample_tree();
    let back = round_trip(&tree);
    assert!(back.equivalent(&tree), "{:#?}", back);
}

#[test]
fn test_child_order_is_engine_order() {
    let tree = Value::container(
        Container::new()
            .with("b", Value::null())
            .with("a", Value::null())
            .with("c", Value::null()),
    );
    let back = round_trip(&tree);
    let names: Vec<&str> = back
        .as_container()
        .unwrap()
        .children
        .iter()
        .map(|(n, _)| n.as_str())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_ne!(back, tree);
    assert!(back.equivalent(&tree));
}

#[test]
fn test_explicit_types_keep_payload_kind() {
    let tree = Value::container(
        Container::new()
            .with("ints", Value::int(vec![1, 2, 3]))
            .with("whole", Value::float(vec![4.0, 5.0]))
            .with("flags", Value::bool(vec![true, false]))
            .with("words", Value::text(vec!["one", "three"])),
    );
    let overrides = OverrideMap::parse([
        ("ints", "float32"),
        ("whole", "int64"),
        ("flags", "int8"),
        ("words", "utf8"),
    ])
    .unwrap();
    let back = round_trip_with(&tree, &WriteOptions::new().with_overrides(overrides));
    assert!(back.equivalent(&tree), "{:#?}", back);
}

#[test]
fn test_values_outside_signed_range_and_nul_text() {
    let tree = Value::container(
        Container::new()
            .with("big", Value::float(vec![1e19, 0.0]))
            .with("nul", Value::text(vec!["ab\0", "cde"])),
    );
    let overrides = OverrideMap::parse([("big", "uint64")]).unwrap();
    let back = round_trip_with(&tree, &WriteOptions::new().with_overrides(overrides));
    assert!(back.equivalent(&tree), "{:#?}", back);
}

#[test]
fn test_compressed_round_trip() {
    let tree = sample_tree();
    let back = round_trip_with(&tree, &WriteOptions::new().with_compression(6));
    assert!(back.equivalent(&tree));
}

#[test]
fn test_atomic_round_trip() {
    let tree = sample_tree();
    let back = round_trip_with(&tree, &WriteOptions::new().with_atomic(true));
    assert!(back.equivalent(&tree));
}

#[test]
fn test_skipped_children_are_absent() {
    let tree = Value::container(
        Container::new()
            .with("keep", Value::int(vec![1]))
            .with("drop", Value::int(vec![2])),
    );
    let overrides = OverrideMap::parse([("drop", "skip")]).unwrap();
    let back = round_trip_with(&tree, &WriteOptions::new().with_overrides(overrides));
    let expected = Value::container(Container::new().with("keep", Value::int(vec![1])));
    assert_eq!(back, expected);
}

// =============================================================================
// Attribute Policies
// =============================================================================

#[test]
fn test_attribute_policies_on_nested_tree() {
    let mut engine = MemoryEngine::new();
    tree::write(&mut engine, &sample_tree(), "/rt", &WriteOptions::new()).unwrap();

    let none = tree::read(&engine, "/rt", &AttrPolicy::None).unwrap();
    assert!(none.attrs.is_empty());
    assert!(none.as_container().unwrap().get("nested").unwrap().attrs.is_empty());

    let policy: AttrPolicy = "-ratio,-note".parse().unwrap();
    let some = tree::read(&engine, "/rt", &policy).unwrap();
    assert_eq!(some.attr("version"), Some(&Value::int(vec![3])));
    assert!(some.attr("ratio").is_none());
    assert!(some
        .as_container()
        .unwrap()
        .get("nested")
        .unwrap()
        .attr("note")
        .is_none());
}

#[test]
fn test_mixed_policy_rejected() {
    let err = "a,-b".parse::<AttrPolicy>().unwrap_err();
    assert_eq!(err.code(), "TREESTORE_MIXED_ATTR_POLICY");
}
