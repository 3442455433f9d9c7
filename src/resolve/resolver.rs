//! Storage type selection
//!
//! `resolve` is pure: the same value, key, override map and settings always
//! produce the same answer. The writer relies on this to re-resolve during the
//! commit pass instead of caching the validation pass.

use std::collections::HashSet;

use crate::dtype::{
    Charset, StorageType, TypeSpec, FLOAT_EXACT_F16, FLOAT_EXACT_F32, FLOAT_EXACT_F64,
};
use crate::value::{Categorical, Node, Payload, Record, Shape, Value};

use super::errors::{ResolveError, ResolveResult};
use super::overrides::{MatchSource, OverrideMap, Target};

/// Tunables for automatic text selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverSettings {
    /// Longest string (bytes) still stored as fixed-length text
    pub fixed_text_max_bytes: usize,
    /// Fixed-length text is used only while `max_len <= ratio * mean_len`
    pub fixed_text_ragged_ratio: f64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            fixed_text_max_bytes: 64,
            fixed_text_ragged_ratio: 2.0,
        }
    }
}

/// Outcome of resolving one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Omit the value from the written tree
    Skip,
    Store(StorageType),
}

impl Resolution {
    pub fn is_skip(&self) -> bool {
        matches!(self, Resolution::Skip)
    }

    pub fn storage_type(&self) -> Option<&StorageType> {
        match self {
            Resolution::Skip => None,
            Resolution::Store(t) => Some(t),
        }
    }
}

/// Picks the storage type for `value` named `key`.
///
/// Records resolve to `Compound` with one entry per surviving column; columns
/// are resolved with their own names as keys.
pub fn resolve(
    value: &Value,
    key: &str,
    overrides: &OverrideMap,
    target: Target,
    settings: &ResolverSettings,
) -> ResolveResult<Resolution> {
    let (spec, source) = match overrides.lookup(key, value.class(), target) {
        Some(m) => (m.spec, m.source),
        None => (&TypeSpec::Auto, MatchSource::Global),
    };
    if *spec == TypeSpec::Skip {
        return Ok(Resolution::Skip);
    }
    let request = Request {
        spec,
        source,
        class: value.class().to_string(),
    };

    let dtype = match &value.node {
        Node::Null => {
            request.single_form()?;
            StorageType::Null
        }
        Node::Container(_) => {
            request.single_form()?;
            StorageType::Container
        }
        Node::Categorical(c) => {
            request.single_form()?;
            check_categorical(c)?;
            StorageType::Enum {
                levels: c.levels.clone(),
            }
        }
        Node::Record(r) => {
            request.single_form()?;
            resolve_record(r, overrides, settings)?
        }
        Node::Array(a) => resolve_payload(&a.payload, &request, settings)?,
    };
    Ok(Resolution::Store(dtype))
}

/// The override that applies to one value, with its origin.
struct Request<'a> {
    spec: &'a TypeSpec,
    source: MatchSource,
    class: String,
}

impl Request<'_> {
    /// Explicit request, or None when the resolver should pick.
    ///
    /// A global entry that does not fit this kind of value degrades to auto;
    /// named and class entries are errors.
    fn explicit<T>(&self, fits: impl FnOnce(&TypeSpec) -> Option<T>) -> ResolveResult<Option<T>> {
        if *self.spec == TypeSpec::Auto {
            return Ok(None);
        }
        match fits(self.spec) {
            Some(t) => Ok(Some(t)),
            None if self.source == MatchSource::Global => Ok(None),
            None => Err(self.incompatible()),
        }
    }

    fn single_form(&self) -> ResolveResult<()> {
        self.explicit(|_| None::<()>).map(|_| ())
    }

    fn incompatible(&self) -> ResolveError {
        ResolveError::IncompatibleOverride {
            spec: self.spec.to_string(),
            class: self.class.clone(),
        }
    }
}

fn check_categorical(c: &Categorical) -> ResolveResult<()> {
    let mut seen = HashSet::new();
    for level in &c.levels {
        if !seen.insert(level.as_str()) {
            return Err(ResolveError::InvalidCategorical(format!(
                "duplicate level '{}'",
                level
            )));
        }
    }
    for code in &c.codes {
        let Some(code) = code else {
            return Err(ResolveError::UnrepresentableMissingCategorical);
        };
        if *code < 1 || *code as usize > c.levels.len() {
            return Err(ResolveError::InvalidCategorical(format!(
                "code {} is outside 1..={}",
                code,
                c.levels.len()
            )));
        }
    }
    Ok(())
}

fn resolve_record(
    record: &Record,
    overrides: &OverrideMap,
    settings: &ResolverSettings,
) -> ResolveResult<StorageType> {
    let Some(rows) = record.rows() else {
        return Err(ResolveError::EmptyRecord);
    };
    let mut columns = Vec::with_capacity(record.columns.len());
    for (name, column) in &record.columns {
        check_column(name, column)?;
        let found = column.len().unwrap_or(0);
        if found != rows {
            return Err(ResolveError::RaggedRecord {
                column: name.clone(),
                expected: rows,
                found,
            });
        }
        match resolve(column, name, overrides, Target::Host, settings)? {
            Resolution::Skip => {}
            Resolution::Store(t) => columns.push((name.clone(), t)),
        }
    }
    if columns.is_empty() {
        return Err(ResolveError::EmptyRecord);
    }
    Ok(StorageType::Compound { columns })
}

fn check_column(name: &str, column: &Value) -> ResolveResult<()> {
    if !column.attrs.is_empty() {
        return Err(ResolveError::UnsupportedValueShape(format!(
            "record column '{}' carries attributes",
            name
        )));
    }
    match &column.node {
        Node::Categorical(_) => Ok(()),
        Node::Array(a) if a.shape == Shape::Vector && a.dim_labels.is_empty() => Ok(()),
        _ => Err(ResolveError::UnsupportedValueShape(format!(
            "record column '{}' must be an unlabelled flat array or categorical",
            name
        ))),
    }
}

fn resolve_payload(
    payload: &Payload,
    request: &Request<'_>,
    settings: &ResolverSettings,
) -> ResolveResult<StorageType> {
    match payload {
        Payload::Float(_) | Payload::Int(_) | Payload::Bool(_) => resolve_numeric(payload, request),
        Payload::Text(v) => resolve_text(v, request, settings),
        Payload::Binary(_) => {
            request.explicit(|s| (*s == TypeSpec::Opaque).then_some(()))?;
            Ok(StorageType::Opaque)
        }
        Payload::Complex(_) => {
            request.explicit(|s| (*s == TypeSpec::Complex).then_some(()))?;
            Ok(StorageType::Complex)
        }
    }
}

fn resolve_numeric(payload: &Payload, request: &Request<'_>) -> ResolveResult<StorageType> {
    let requested = request.explicit(|s| match s {
        TypeSpec::Numeric(t) => Some(t.clone()),
        _ => None,
    })?;
    let summary = payload.numeric_summary().unwrap_or_default();

    let Some(dtype) = requested else {
        return Ok(auto_numeric(payload));
    };

    if dtype.is_integer() {
        if summary.has_missing {
            return Err(ResolveError::MissingRequiresFloat {
                dtype: dtype.to_string(),
            });
        }
        if summary.has_fraction {
            return Err(overflow(&dtype, &summary));
        }
        let fits = match (payload.int_bounds(), dtype.int_range()) {
            (Some((lo, hi)), Some((tlo, thi))) => lo as i128 >= tlo && hi as i128 <= thi,
            _ => [summary.min, summary.max]
                .into_iter()
                .flatten()
                .all(|v| dtype.holds(v)),
        };
        if !fits {
            return Err(overflow(&dtype, &summary));
        }
    } else if !dtype.holds(summary.magnitude()) {
        return Err(overflow(&dtype, &summary));
    } else if matches!(payload, Payload::Int(_))
        && dtype
            .float_exact()
            .is_some_and(|exact| summary.magnitude() > exact)
    {
        // integers past the exact range would round
        return Err(overflow(&dtype, &summary));
    }
    Ok(dtype)
}

fn overflow(dtype: &StorageType, summary: &crate::value::NumericSummary) -> ResolveError {
    ResolveError::RangeOverflow {
        dtype: dtype.to_string(),
        min: summary.min.unwrap_or(0.0),
        max: summary.max.unwrap_or(0.0),
    }
}

/// Automatic choice for float, integer and boolean payloads.
fn auto_numeric(payload: &Payload) -> StorageType {
    let summary = payload.numeric_summary().unwrap_or_default();
    match payload {
        Payload::Bool(_) if summary.has_missing => StorageType::Float16,
        Payload::Bool(_) => StorageType::UInt8,
        Payload::Int(v) if v.is_empty() => StorageType::Int32,
        Payload::Int(_) if summary.has_missing => exact_float(summary.magnitude()),
        Payload::Int(_) => match payload.int_bounds() {
            Some((lo, hi)) => tightest_integer(lo as i128, hi as i128),
            None => StorageType::Int32,
        },
        _ => {
            if summary.has_missing {
                if summary.min.is_none() {
                    StorageType::Float16
                } else {
                    StorageType::Float64
                }
            } else if summary.has_fraction || summary.magnitude() > FLOAT_EXACT_F64 {
                StorageType::Float64
            } else {
                match (summary.min, summary.max) {
                    (Some(lo), Some(hi)) => tightest_integer(lo as i128, hi as i128),
                    _ => StorageType::Float64,
                }
            }
        }
    }
}

/// Narrowest float holding every integer up to `magnitude` exactly.
fn exact_float(magnitude: f64) -> StorageType {
    if magnitude <= FLOAT_EXACT_F16 {
        StorageType::Float16
    } else if magnitude <= FLOAT_EXACT_F32 {
        StorageType::Float32
    } else {
        StorageType::Float64
    }
}

/// Narrowest integer covering `[lo, hi]`; unsigned when `lo >= 0`.
fn tightest_integer(lo: i128, hi: i128) -> StorageType {
    StorageType::INTEGERS
        .into_iter()
        .filter(|t| t.int_range().is_some_and(|(min, _)| (min == 0) == (lo >= 0)))
        .find(|t| t.int_range().is_some_and(|(min, max)| lo >= min && hi <= max))
        .unwrap_or(StorageType::Float64)
}

fn resolve_text(
    values: &[Option<String>],
    request: &Request<'_>,
    settings: &ResolverSettings,
) -> ResolveResult<StorageType> {
    let requested = request.explicit(|s| match s {
        TypeSpec::VarText(_) | TypeSpec::FixedText(..) => Some(s.clone()),
        _ => None,
    })?;
    let present: Vec<&str> = values.iter().flatten().map(String::as_str).collect();
    let has_missing = present.len() != values.len();
    let detected = Charset::detect(present.iter().copied());
    let max_len = present.iter().map(|s| s.len()).max().unwrap_or(0);
    // fixed-length text is NUL-padded
    let has_nul = present.iter().any(|s| s.contains('\0'));

    let check_charset = |charset: Charset| {
        if charset == Charset::Ascii && detected == Charset::Utf8 {
            Err(request.incompatible())
        } else {
            Ok(charset)
        }
    };

    match requested {
        Some(TypeSpec::VarText(charset)) => Ok(StorageType::VarText {
            charset: check_charset(charset)?,
        }),
        Some(TypeSpec::FixedText(charset, size)) => {
            if has_missing {
                return Err(ResolveError::MissingInFixedText);
            }
            if has_nul {
                return Err(ResolveError::UnsupportedValueShape(
                    "fixed-length text cannot hold NUL bytes".to_string(),
                ));
            }
            let charset = check_charset(charset)?;
            let size = match size {
                Some(n) if n < max_len => {
                    return Err(ResolveError::RangeOverflow {
                        dtype: format!("{}[{}]", charset.as_str(), n),
                        min: 0.0,
                        max: max_len as f64,
                    });
                }
                Some(n) => n,
                None => max_len.max(1),
            };
            Ok(StorageType::FixedText { size, charset })
        }
        _ => Ok(auto_text(
            &present,
            has_missing || has_nul,
            detected,
            max_len,
            settings,
        )),
    }
}

fn auto_text(
    present: &[&str],
    needs_var: bool,
    charset: Charset,
    max_len: usize,
    settings: &ResolverSettings,
) -> StorageType {
    if needs_var || present.is_empty() || max_len == 0 || max_len > settings.fixed_text_max_bytes
    {
        return StorageType::VarText { charset };
    }
    let total: usize = present.iter().map(|s| s.len()).sum();
    let mean = total as f64 / present.len() as f64;
    if max_len as f64 <= settings.fixed_text_ragged_ratio * mean {
        StorageType::FixedText {
            size: max_len,
            charset,
        }
    } else {
        StorageType::VarText { charset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Complex;

    fn auto(v: &Value) -> ResolveResult<Resolution> {
        resolve(
            v,
            "v",
            &OverrideMap::new(),
            Target::Host,
            &ResolverSettings::default(),
        )
    }

    fn with(v: &Value, key: &str, spec: &str) -> ResolveResult<Resolution> {
        let o = OverrideMap::new().with(key, spec).unwrap();
        resolve(v, "v", &o, Target::Host, &ResolverSettings::default())
    }

    fn stored(t: StorageType) -> ResolveResult<Resolution> {
        Ok(Resolution::Store(t))
    }

    #[test]
    fn test_float_integer_valued_narrows() {
        assert_eq!(auto(&Value::float(vec![0.0, 255.0])), stored(StorageType::UInt8));
        assert_eq!(auto(&Value::float(vec![0.0, 256.0])), stored(StorageType::UInt16));
        assert_eq!(auto(&Value::float(vec![-1.0, 5.0])), stored(StorageType::Int8));
    }

    #[test]
    fn test_float_fraction_and_missing() {
        assert_eq!(auto(&Value::float(vec![1.5])), stored(StorageType::Float64));
        assert_eq!(
            auto(&Value::float(vec![1.0, f64::NAN, 3.0])),
            stored(StorageType::Float64)
        );
        assert_eq!(
            auto(&Value::float(vec![f64::NAN, f64::INFINITY])),
            stored(StorageType::Float16)
        );
    }

    #[test]
    fn test_float_beyond_exact_range() {
        assert_eq!(auto(&Value::float(vec![1e17])), stored(StorageType::Float64));
    }

    #[test]
    fn test_int_with_missing_picks_exact_float() {
        assert_eq!(
            auto(&Value::int_opt(vec![Some(1), None])),
            stored(StorageType::Float16)
        );
        assert_eq!(
            auto(&Value::int_opt(vec![Some(100_000), None])),
            stored(StorageType::Float32)
        );
        assert_eq!(
            auto(&Value::int_opt(vec![Some(1 << 30), None])),
            stored(StorageType::Float64)
        );
    }

    #[test]
    fn test_int_extremes() {
        assert_eq!(auto(&Value::int(vec![i64::MIN, 0])), stored(StorageType::Int64));
        assert_eq!(auto(&Value::int(vec![])), stored(StorageType::Int32));
    }

    #[test]
    fn test_bool_selection() {
        assert_eq!(auto(&Value::bool(vec![true, false])), stored(StorageType::UInt8));
        assert_eq!(
            auto(&Value::bool_opt(vec![Some(true), None])),
            stored(StorageType::Float16)
        );
    }

    #[test]
    fn test_text_selection() {
        assert_eq!(
            auto(&Value::text(vec!["ab", "cd"])),
            stored(StorageType::FixedText {
                size: 2,
                charset: Charset::Ascii
            })
        );
        assert_eq!(
            auto(&Value::text(vec!["a", "a", "abcdefgh"])),
            stored(StorageType::VarText {
                charset: Charset::Ascii
            })
        );
        assert_eq!(
            auto(&Value::text_opt(vec![Some("é".into()), None])),
            stored(StorageType::VarText {
                charset: Charset::Utf8
            })
        );
        let long = "x".repeat(65);
        assert_eq!(
            auto(&Value::text(vec![long])),
            stored(StorageType::VarText {
                charset: Charset::Ascii
            })
        );
    }

    #[test]
    fn test_text_with_nul_stays_variable() {
        assert_eq!(
            auto(&Value::text(vec!["ab\0", "cde"])),
            stored(StorageType::VarText {
                charset: Charset::Ascii
            })
        );
        assert!(matches!(
            with(&Value::text(vec!["a\0b"]), "v", "ascii[4]"),
            Err(ResolveError::UnsupportedValueShape(_))
        ));
    }

    #[test]
    fn test_explicit_fixed_text_rejects_missing() {
        let v = Value::text_opt(vec![Some("a".into()), None]);
        assert_eq!(with(&v, "v", "ascii[]"), Err(ResolveError::MissingInFixedText));
    }

    #[test]
    fn test_explicit_fixed_text_too_short() {
        let v = Value::text(vec!["abcd"]);
        assert!(matches!(
            with(&v, "v", "ascii[2]"),
            Err(ResolveError::RangeOverflow { .. })
        ));
    }

    #[test]
    fn test_explicit_width_overflow() {
        let v = Value::int(vec![0, 300]);
        assert!(matches!(
            with(&v, "v", "uint8"),
            Err(ResolveError::RangeOverflow { .. })
        ));
        assert_eq!(with(&v, "v", "uint16"), stored(StorageType::UInt16));
        let big = Value::float(vec![1e6]);
        assert!(matches!(
            with(&big, "v", "float16"),
            Err(ResolveError::RangeOverflow { .. })
        ));
    }

    #[test]
    fn test_explicit_integer_rejects_fractions() {
        let v = Value::float(vec![1.0, 1.5, 2.0]);
        assert!(matches!(
            with(&v, "v", "int32"),
            Err(ResolveError::RangeOverflow { .. })
        ));
        assert_eq!(with(&Value::float(vec![1.0, 2.0]), "v", "int32"), stored(StorageType::Int32));
    }

    #[test]
    fn test_explicit_float_keeps_integers_exact() {
        assert!(matches!(
            with(&Value::int(vec![2049]), "v", "float16"),
            Err(ResolveError::RangeOverflow { .. })
        ));
        assert_eq!(with(&Value::int(vec![2048]), "v", "float16"), stored(StorageType::Float16));
        assert!(matches!(
            with(&Value::int(vec![-257]), "v", "bfloat16"),
            Err(ResolveError::RangeOverflow { .. })
        ));
        assert!(matches!(
            with(&Value::int(vec![(1 << 24) + 1]), "v", "float32"),
            Err(ResolveError::RangeOverflow { .. })
        ));
        assert_eq!(
            with(&Value::int(vec![(1 << 24) + 1]), "v", "float64"),
            stored(StorageType::Float64)
        );
    }

    #[test]
    fn test_explicit_uint64_beyond_i64() {
        assert_eq!(
            with(&Value::float(vec![1e19]), "v", "uint64"),
            stored(StorageType::UInt64)
        );
    }

    #[test]
    fn test_explicit_integer_with_missing() {
        let v = Value::float(vec![1.0, f64::NAN]);
        assert_eq!(
            with(&v, "v", "int32"),
            Err(ResolveError::MissingRequiresFloat {
                dtype: "int32".into()
            })
        );
        assert_eq!(with(&v, "v", "float32"), stored(StorageType::Float32));
    }

    #[test]
    fn test_incompatible_named_vs_global() {
        let v = Value::float(vec![1.0]);
        assert!(matches!(
            with(&v, "v", "utf8"),
            Err(ResolveError::IncompatibleOverride { .. })
        ));
        assert_eq!(with(&v, ".", "utf8"), stored(StorageType::UInt8));
    }

    #[test]
    fn test_skip() {
        assert_eq!(with(&Value::null(), "v", "skip"), Ok(Resolution::Skip));
    }

    #[test]
    fn test_categorical_checks() {
        let ok = Value::categorical(vec![Some(1), Some(2)], vec!["a".into(), "b".into()]);
        assert_eq!(
            auto(&ok),
            stored(StorageType::Enum {
                levels: vec!["a".into(), "b".into()]
            })
        );
        let missing = Value::categorical(vec![Some(1), None], vec!["a".into()]);
        assert_eq!(auto(&missing), Err(ResolveError::UnrepresentableMissingCategorical));
        let out = Value::categorical(vec![Some(3)], vec!["a".into()]);
        assert!(matches!(auto(&out), Err(ResolveError::InvalidCategorical(_))));
        let dup = Value::categorical(vec![Some(1)], vec!["a".into(), "a".into()]);
        assert!(matches!(auto(&dup), Err(ResolveError::InvalidCategorical(_))));
    }

    #[test]
    fn test_record_columns() {
        let r = Record::new()
            .with_column("id", Value::int(vec![1, 2]))
            .with_column("name", Value::text(vec!["a", "b"]));
        let o = OverrideMap::new().with("id", "int64").unwrap();
        let res = resolve(
            &Value::record(r),
            "tbl",
            &o,
            Target::Host,
            &ResolverSettings::default(),
        );
        assert_eq!(
            res,
            stored(StorageType::Compound {
                columns: vec![
                    ("id".into(), StorageType::Int64),
                    (
                        "name".into(),
                        StorageType::FixedText {
                            size: 1,
                            charset: Charset::Ascii
                        }
                    ),
                ]
            })
        );
    }

    #[test]
    fn test_record_all_skipped_is_empty() {
        let r = Record::new().with_column("a", Value::int(vec![1]));
        let o = OverrideMap::new().with("a", "skip").unwrap();
        let res = resolve(
            &Value::record(r),
            "tbl",
            &o,
            Target::Host,
            &ResolverSettings::default(),
        );
        assert_eq!(res, Err(ResolveError::EmptyRecord));
        assert_eq!(auto(&Value::record(Record::new())), Err(ResolveError::EmptyRecord));
    }

    #[test]
    fn test_ragged_record() {
        let r = Record::new()
            .with_column("a", Value::int(vec![1, 2]))
            .with_column("b", Value::int(vec![1]));
        assert!(matches!(
            auto(&Value::record(r)),
            Err(ResolveError::RaggedRecord { .. })
        ));
    }

    #[test]
    fn test_record_columns_must_be_plain_vectors() {
        let labelled = Value::int(vec![1, 2]).with_dim_labels(vec![Some(vec!["x".into(), "y".into()])]);
        for column in [
            Value::scalar(Payload::Int(vec![Some(1)])),
            Value::array(Payload::Int(vec![Some(1); 4]), vec![2, 2]),
            labelled,
        ] {
            let r = Record::new().with_column("a", column);
            assert!(matches!(
                auto(&Value::record(r)),
                Err(ResolveError::UnsupportedValueShape(_))
            ));
        }
    }

    #[test]
    fn test_single_form_kinds() {
        let c = Value::complex(vec![Complex::new(1.0, 2.0)]);
        assert_eq!(auto(&c), stored(StorageType::Complex));
        assert!(matches!(
            with(&c, "v", "float64"),
            Err(ResolveError::IncompatibleOverride { .. })
        ));
        assert_eq!(with(&Value::binary(vec![1]), "v", "opaque"), stored(StorageType::Opaque));
    }

    #[test]
    fn test_deterministic() {
        let v = Value::float(vec![3.0, -7.0, 1e5]);
        assert_eq!(auto(&v), auto(&v));
    }
}
