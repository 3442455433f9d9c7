//! Type resolution tests
//!
//! Tests for:
//! - Numeric auto-selection boundary cases
//! - Precedence of name, class and global override keys
//! - Fixed-text missing-value rejection
//! - Determinism of repeated resolution

use treestore::dtype::{Charset, StorageType};
use treestore::resolve::{resolve, OverrideMap, ResolveError, Resolution, ResolverSettings, Target};
use treestore::value::{Record, Value};

// =============================================================================
// Test Utilities
// =============================================================================

fn resolve_with(value: &Value, key: &str, overrides: &[(&str, &str)]) -> Result<Resolution, ResolveError> {
    let map = OverrideMap::parse(overrides.iter().copied()).unwrap();
    resolve(value, key, &map, Target::Host, &ResolverSettings::default())
}

fn auto(value: &Value) -> Option<StorageType> {
    resolve_with(value, "v", &[]).unwrap().storage_type().cloned()
}

// =============================================================================
// Numeric Auto-Selection
// =============================================================================

#[test]
fn test_numeric_boundaries() {
    assert_eq!(auto(&Value::float(vec![0.0, 255.0])), Some(StorageType::UInt8));
    assert_eq!(auto(&Value::float(vec![0.0, 256.0])), Some(StorageType::UInt16));
    assert_eq!(auto(&Value::float(vec![-1.0, 5.0])), Some(StorageType::Int8));
    assert_eq!(auto(&Value::float(vec![1.5])), Some(StorageType::Float64));
    assert_eq!(
        auto(&Value::float(vec![1.0, f64::NAN, 3.0])),
        Some(StorageType::Float64)
    );
    assert_eq!(
        auto(&Value::float(vec![f64::NAN, f64::NEG_INFINITY])),
        Some(StorageType::Float16)
    );
}

#[test]
fn test_integer_widths() {
    assert_eq!(auto(&Value::int(vec![-128, 127])), Some(StorageType::Int8));
    assert_eq!(auto(&Value::int(vec![-129])), Some(StorageType::Int16));
    assert_eq!(auto(&Value::int(vec![65_535])), Some(StorageType::UInt16));
    assert_eq!(auto(&Value::int(vec![65_536])), Some(StorageType::UInt32));
}

#[test]
fn test_text_fixed_or_variable() {
    assert_eq!(
        auto(&Value::text(vec!["abc", "de"])),
        Some(StorageType::FixedText {
            size: 3,
            charset: Charset::Ascii
        })
    );
    assert_eq!(
        auto(&Value::text(vec!["naïve"])),
        Some(StorageType::FixedText {
            size: 6,
            charset: Charset::Utf8
        })
    );
    assert_eq!(
        auto(&Value::text_opt(vec![Some("a".to_string()), None])),
        Some(StorageType::VarText {
            charset: Charset::Ascii
        })
    );
}

// =============================================================================
// Override Precedence
// =============================================================================

#[test]
fn test_name_beats_class_beats_global() {
    let v = Value::int(vec![1, 2]);
    let overrides = [(".", "float64"), (".integer", "int32"), ("v", "int64")];
    assert_eq!(
        resolve_with(&v, "v", &overrides).unwrap(),
        Resolution::Store(StorageType::Int64)
    );
    assert_eq!(
        resolve_with(&v, "w", &overrides).unwrap(),
        Resolution::Store(StorageType::Int32)
    );
    assert_eq!(
        resolve_with(&v, "w", &[(".", "float64")]).unwrap(),
        Resolution::Store(StorageType::Float64)
    );
}

#[test]
fn test_global_mismatch_falls_back_to_auto() {
    let v = Value::text(vec!["x"]);
    assert_eq!(
        resolve_with(&v, "v", &[(".", "float32")]).unwrap(),
        Resolution::Store(StorageType::FixedText {
            size: 1,
            charset: Charset::Ascii
        })
    );
    assert!(matches!(
        resolve_with(&v, "v", &[("v", "float32")]),
        Err(ResolveError::IncompatibleOverride { .. })
    ));
}

#[test]
fn test_fixed_text_request_rejects_missing() {
    let v = Value::text_opt(vec![Some("ab".to_string()), None]);
    assert_eq!(
        resolve_with(&v, "v", &[("v", "ascii[4]")]),
        Err(ResolveError::MissingInFixedText)
    );
}

#[test]
fn test_record_with_every_column_skipped() {
    let record = Record::new()
        .with_column("a", Value::int(vec![1]))
        .with_column("b", Value::float(vec![0.5]));
    let v = Value::record(record);
    assert_eq!(
        resolve_with(&v, "t", &[("a", "skip"), ("b", "skip")]),
        Err(ResolveError::EmptyRecord)
    );
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_repeated_resolution_is_identical() {
    let values = [
        Value::float(vec![0.25, -3.0, 1e4]),
        Value::int_opt(vec![Some(70_000), None]),
        Value::text(vec!["x", "yy", "zzz"]),
        Value::bool(vec![true, false]),
    ];
    for v in &values {
        let first = resolve_with(v, "v", &[(".logical", "int8")]);
        for _ in 0..5 {
            assert_eq!(resolve_with(v, "v", &[(".logical", "int8")]), first);
        }
    }
}
