//! Homogeneous leaf payloads and their class tags.
//!
//! Missing values are encoded per payload kind:
//! - `Float`: NaN, +Inf and -Inf
//! - `Int`, `Bool`, `Text`: `None`
//! - `Binary`, `Complex`: never missing

use std::fmt;

/// A complex number stored as a pair of doubles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl PartialEq for Complex {
    fn eq(&self, other: &Self) -> bool {
        same_f64(self.re, other.re) && same_f64(self.im, other.im)
    }
}

/// Homogeneous element buffer of a leaf value.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Double-precision values; non-finite values are missing markers
    Float(Vec<f64>),
    /// Integers with explicit missing values
    Int(Vec<Option<i64>>),
    /// Booleans with explicit missing values
    Bool(Vec<Option<bool>>),
    /// Strings with explicit missing values
    Text(Vec<Option<String>>),
    /// Opaque bytes
    Binary(Vec<u8>),
    /// Complex numbers
    Complex(Vec<Complex>),
}

/// Two doubles are the same value if they are equal or both NaN.
fn same_f64(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::Float(a), Payload::Float(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_f64(*x, *y))
            }
            (Payload::Int(a), Payload::Int(b)) => a == b,
            (Payload::Bool(a), Payload::Bool(b)) => a == b,
            (Payload::Text(a), Payload::Text(b)) => a == b,
            (Payload::Binary(a), Payload::Binary(b)) => a == b,
            (Payload::Complex(a), Payload::Complex(b)) => a == b,
            _ => false,
        }
    }
}

/// Range and missing-value facts about a numeric payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumericSummary {
    /// Smallest present finite value (None if there is none)
    pub min: Option<f64>,
    /// Largest present finite value (None if there is none)
    pub max: Option<f64>,
    /// Whether any element is a missing marker
    pub has_missing: bool,
    /// Whether any finite element has a fractional part
    pub has_fraction: bool,
}

impl NumericSummary {
    fn observe(&mut self, v: f64) {
        if !v.is_finite() {
            self.has_missing = true;
            return;
        }
        if v.fract() != 0.0 {
            self.has_fraction = true;
        }
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
    }

    /// Largest absolute finite value, or 0 when there are none.
    pub fn magnitude(&self) -> f64 {
        let lo = self.min.map_or(0.0, f64::abs);
        let hi = self.max.map_or(0.0, f64::abs);
        lo.max(hi)
    }
}

impl Payload {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Payload::Float(v) => v.len(),
            Payload::Int(v) => v.len(),
            Payload::Bool(v) => v.len(),
            Payload::Text(v) => v.len(),
            Payload::Binary(v) => v.len(),
            Payload::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class tag used by class-qualified override keys.
    pub fn class(&self) -> ValueClass {
        match self {
            Payload::Float(_) => ValueClass::Double,
            Payload::Int(_) => ValueClass::Integer,
            Payload::Bool(_) => ValueClass::Logical,
            Payload::Text(_) => ValueClass::Character,
            Payload::Binary(_) => ValueClass::Raw,
            Payload::Complex(_) => ValueClass::Complex,
        }
    }

    /// Whether any element is a missing-value marker.
    pub fn has_missing(&self) -> bool {
        match self {
            Payload::Float(v) => v.iter().any(|x| !x.is_finite()),
            Payload::Int(v) => v.iter().any(Option::is_none),
            Payload::Bool(v) => v.iter().any(Option::is_none),
            Payload::Text(v) => v.iter().any(Option::is_none),
            Payload::Binary(_) | Payload::Complex(_) => false,
        }
    }

    /// Range summary for numeric and boolean payloads; None for other kinds.
    pub fn numeric_summary(&self) -> Option<NumericSummary> {
        let mut summary = NumericSummary::default();
        match self {
            Payload::Float(v) => v.iter().for_each(|x| summary.observe(*x)),
            Payload::Int(v) => {
                for x in v {
                    match x {
                        Some(i) => summary.observe(*i as f64),
                        None => summary.has_missing = true,
                    }
                }
            }
            Payload::Bool(v) => {
                for x in v {
                    match x {
                        Some(b) => summary.observe(if *b { 1.0 } else { 0.0 }),
                        None => summary.has_missing = true,
                    }
                }
            }
            _ => return None,
        }
        Some(summary)
    }

    /// Exact integer bounds of an `Int` payload (ignores missing values).
    pub fn int_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Payload::Int(v) => {
                let mut it = v.iter().flatten();
                let first = *it.next()?;
                Some(it.fold((first, first), |(lo, hi), x| (lo.min(*x), hi.max(*x))))
            }
            _ => None,
        }
    }
}

/// Runtime class of a value, as matched by `.class` override keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueClass {
    Integer,
    Double,
    Logical,
    Character,
    Factor,
    Raw,
    Complex,
    DataFrame,
    List,
    Null,
}

impl ValueClass {
    /// Key spelling without the leading dot.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueClass::Integer => "integer",
            ValueClass::Double => "double",
            ValueClass::Logical => "logical",
            ValueClass::Character => "character",
            ValueClass::Factor => "factor",
            ValueClass::Raw => "raw",
            ValueClass::Complex => "complex",
            ValueClass::DataFrame => "data.frame",
            ValueClass::List => "list",
            ValueClass::Null => "null",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "integer" => ValueClass::Integer,
            "double" => ValueClass::Double,
            "logical" => ValueClass::Logical,
            "character" => ValueClass::Character,
            "factor" => ValueClass::Factor,
            "raw" => ValueClass::Raw,
            "complex" => ValueClass::Complex,
            "data.frame" => ValueClass::DataFrame,
            "list" => ValueClass::List,
            "null" => ValueClass::Null,
            _ => return None,
        })
    }

    /// Whether this class is matched by the `.numeric` key.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueClass::Integer | ValueClass::Double)
    }
}

impl fmt::Display for ValueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.as_str())
    }
}
