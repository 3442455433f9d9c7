//! Override maps
//!
//! An override map is an ordered list of `(KeyPattern, TypeSpec)` entries.
//! Lookup walks a fixed precedence ladder; within one rung the first entry in
//! list order wins.
//!
//! | Rung | Key form   | Applies to        |
//! |------|------------|-------------------|
//! | 0    | `name`     | hosts, attributes |
//! | 1    | `@name`    | attributes        |
//! | 2    | `.class`   | hosts, attributes |
//! | 3    | `.numeric` | hosts, attributes |
//! | 4    | `@.class`  | attributes        |
//! | 5    | `@.numeric`| attributes        |
//! | 6    | `.`        | hosts, attributes |
//! | 7    | `@.`       | attributes        |

use std::str::FromStr;

use thiserror::Error;

use crate::dtype::{TypeSpec, TypeSpecError};
use crate::value::ValueClass;

/// Class part of a class-qualified key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKey {
    Exact(ValueClass),
    /// `.numeric`: integers and doubles
    Numeric,
}

impl ClassKey {
    fn matches(&self, class: ValueClass) -> bool {
        match self {
            ClassKey::Exact(c) => *c == class,
            ClassKey::Numeric => class.is_numeric(),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        if s == "numeric" {
            return Some(ClassKey::Numeric);
        }
        ValueClass::parse(s).map(ClassKey::Exact)
    }
}

/// Key side of an override entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    Name(String),
    AttrName(String),
    Class(ClassKey),
    AttrClass(ClassKey),
    Global,
    AttrGlobal,
}

/// Where a matched entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    Name,
    Class,
    Global,
}

/// Whether a lookup is for a host value or for one of its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Host,
    Attribute,
}

impl KeyPattern {
    fn rung(&self) -> u8 {
        match self {
            KeyPattern::Name(_) => 0,
            KeyPattern::AttrName(_) => 1,
            KeyPattern::Class(ClassKey::Exact(_)) => 2,
            KeyPattern::Class(ClassKey::Numeric) => 3,
            KeyPattern::AttrClass(ClassKey::Exact(_)) => 4,
            KeyPattern::AttrClass(ClassKey::Numeric) => 5,
            KeyPattern::Global => 6,
            KeyPattern::AttrGlobal => 7,
        }
    }

    fn attribute_only(&self) -> bool {
        matches!(
            self,
            KeyPattern::AttrName(_) | KeyPattern::AttrClass(_) | KeyPattern::AttrGlobal
        )
    }

    fn source(&self) -> MatchSource {
        match self {
            KeyPattern::Name(_) | KeyPattern::AttrName(_) => MatchSource::Name,
            KeyPattern::Class(_) | KeyPattern::AttrClass(_) => MatchSource::Class,
            KeyPattern::Global | KeyPattern::AttrGlobal => MatchSource::Global,
        }
    }

    fn matches(&self, key: &str, class: ValueClass) -> bool {
        match self {
            KeyPattern::Name(n) | KeyPattern::AttrName(n) => n == key,
            KeyPattern::Class(c) | KeyPattern::AttrClass(c) => c.matches(class),
            KeyPattern::Global | KeyPattern::AttrGlobal => true,
        }
    }
}

/// Errors building an override map
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverrideError {
    #[error("Empty override key")]
    EmptyKey,

    #[error(transparent)]
    Spec(#[from] TypeSpecError),
}

impl FromStr for KeyPattern {
    type Err = OverrideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (attr, rest) = match s.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if rest.is_empty() {
            return Err(OverrideError::EmptyKey);
        }
        let pattern = if rest == "." {
            if attr {
                KeyPattern::AttrGlobal
            } else {
                KeyPattern::Global
            }
        } else if let Some(class) = rest.strip_prefix('.').and_then(ClassKey::parse) {
            if attr {
                KeyPattern::AttrClass(class)
            } else {
                KeyPattern::Class(class)
            }
        } else if attr {
            KeyPattern::AttrName(rest.to_string())
        } else {
            KeyPattern::Name(rest.to_string())
        };
        Ok(pattern)
    }
}

/// A matched override entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matched<'a> {
    pub spec: &'a TypeSpec,
    pub source: MatchSource,
}

/// Ordered list of type overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideMap {
    entries: Vec<(KeyPattern, TypeSpec)>,
}

impl OverrideMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from `(key, type)` string pairs.
    pub fn parse<K, T, I>(pairs: I) -> Result<Self, OverrideError>
    where
        K: AsRef<str>,
        T: AsRef<str>,
        I: IntoIterator<Item = (K, T)>,
    {
        let mut map = Self::new();
        for (k, t) in pairs {
            map.entries.push((k.as_ref().parse()?, t.as_ref().parse()?));
        }
        Ok(map)
    }

    pub fn push(&mut self, key: KeyPattern, spec: TypeSpec) {
        self.entries.push((key, spec));
    }

    /// Builder form of `push` taking strings.
    pub fn with(mut self, key: &str, spec: &str) -> Result<Self, OverrideError> {
        self.entries.push((key.parse()?, spec.parse()?));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most specific entry for a value named `key` of class `class`.
    pub fn lookup(&self, key: &str, class: ValueClass, target: Target) -> Option<Matched<'_>> {
        self.entries
            .iter()
            .filter(|(k, _)| target == Target::Attribute || !k.attribute_only())
            .filter(|(k, _)| k.matches(key, class))
            // min_by_key keeps the first of equal rungs
            .min_by_key(|(k, _)| k.rung())
            .map(|(k, spec)| Matched {
                spec,
                source: k.source(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::StorageType;

    fn map(pairs: &[(&str, &str)]) -> OverrideMap {
        OverrideMap::parse(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!("x".parse(), Ok(KeyPattern::Name("x".into())));
        assert_eq!("@x".parse(), Ok(KeyPattern::AttrName("x".into())));
        assert_eq!(
            ".integer".parse(),
            Ok(KeyPattern::Class(ClassKey::Exact(ValueClass::Integer)))
        );
        assert_eq!("@.numeric".parse(), Ok(KeyPattern::AttrClass(ClassKey::Numeric)));
        assert_eq!(".".parse(), Ok(KeyPattern::Global));
        assert_eq!("@.".parse(), Ok(KeyPattern::AttrGlobal));
        assert_eq!(".hidden".parse(), Ok(KeyPattern::Name(".hidden".into())));
        assert_eq!("@".parse::<KeyPattern>(), Err(OverrideError::EmptyKey));
    }

    #[test]
    fn test_name_beats_class_beats_global() {
        let m = map(&[(".", "float64"), (".integer", "int32"), ("x", "uint8")]);
        let hit = m.lookup("x", ValueClass::Integer, Target::Host).unwrap();
        assert_eq!(hit.spec, &TypeSpec::Numeric(StorageType::UInt8));
        assert_eq!(hit.source, MatchSource::Name);

        let hit = m.lookup("y", ValueClass::Integer, Target::Host).unwrap();
        assert_eq!(hit.spec, &TypeSpec::Numeric(StorageType::Int32));

        let hit = m.lookup("y", ValueClass::Logical, Target::Host).unwrap();
        assert_eq!(hit.source, MatchSource::Global);
    }

    #[test]
    fn test_numeric_ranks_below_exact_class() {
        let m = map(&[(".numeric", "float32"), (".double", "float64")]);
        let hit = m.lookup("v", ValueClass::Double, Target::Host).unwrap();
        assert_eq!(hit.spec, &TypeSpec::Numeric(StorageType::Float64));
        let hit = m.lookup("v", ValueClass::Integer, Target::Host).unwrap();
        assert_eq!(hit.spec, &TypeSpec::Numeric(StorageType::Float32));
    }

    #[test]
    fn test_attribute_keys_ignored_for_hosts() {
        let m = map(&[("@units", "skip"), ("@.", "utf8")]);
        assert!(m.lookup("units", ValueClass::Character, Target::Host).is_none());
        let hit = m
            .lookup("units", ValueClass::Character, Target::Attribute)
            .unwrap();
        assert_eq!(hit.spec, &TypeSpec::Skip);
    }

    #[test]
    fn test_attribute_precedence_order() {
        let m = map(&[
            ("@.", "float64"),
            ("@.integer", "int64"),
            (".integer", "int32"),
            ("@n", "int16"),
            ("n", "int8"),
        ]);
        let hit = m.lookup("n", ValueClass::Integer, Target::Attribute).unwrap();
        assert_eq!(hit.spec, &TypeSpec::Numeric(StorageType::Int8));
        let hit = m.lookup("k", ValueClass::Integer, Target::Attribute).unwrap();
        assert_eq!(hit.spec, &TypeSpec::Numeric(StorageType::Int32));
    }

    #[test]
    fn test_first_entry_wins_within_rung() {
        let m = map(&[("x", "int16"), ("x", "int64")]);
        let hit = m.lookup("x", ValueClass::Integer, Target::Host).unwrap();
        assert_eq!(hit.spec, &TypeSpec::Numeric(StorageType::Int16));
    }
}
