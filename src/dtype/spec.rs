//! User-facing type requests, as written in override maps.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::types::{Charset, StorageType};

/// A type request attached to an override key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    /// Let the resolver choose
    Auto,
    /// Omit the value from the written tree
    Skip,
    /// A fixed numeric type (`int8`..`float64`)
    Numeric(StorageType),
    /// Variable-length text
    VarText(Charset),
    /// Fixed-length text; `None` sizes it from the data
    FixedText(Charset, Option<usize>),
    Opaque,
    Complex,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown type request: {0}")]
pub struct TypeSpecError(pub String);

impl FromStr for TypeSpec {
    type Err = TypeSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let numeric = match t {
            "auto" => return Ok(TypeSpec::Auto),
            "skip" => return Ok(TypeSpec::Skip),
            "opaque" => return Ok(TypeSpec::Opaque),
            "complex" => return Ok(TypeSpec::Complex),
            "int8" => StorageType::Int8,
            "int16" => StorageType::Int16,
            "int32" => StorageType::Int32,
            "int64" => StorageType::Int64,
            "uint8" => StorageType::UInt8,
            "uint16" => StorageType::UInt16,
            "uint32" => StorageType::UInt32,
            "uint64" => StorageType::UInt64,
            "float16" => StorageType::Float16,
            "bfloat16" => StorageType::BFloat16,
            "float32" => StorageType::Float32,
            "float64" => StorageType::Float64,
            _ => return parse_text(t).ok_or_else(|| TypeSpecError(s.to_string())),
        };
        Ok(TypeSpec::Numeric(numeric))
    }
}

/// `ascii`, `utf8`, `ascii[]`, `utf8[16]`
fn parse_text(s: &str) -> Option<TypeSpec> {
    let (name, bracket) = match s.find('[') {
        Some(i) => (&s[..i], Some(&s[i..])),
        None => (s, None),
    };
    let charset = match name {
        "ascii" => Charset::Ascii,
        "utf8" => Charset::Utf8,
        _ => return None,
    };
    let Some(bracket) = bracket else {
        return Some(TypeSpec::VarText(charset));
    };
    let inner = bracket.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        return Some(TypeSpec::FixedText(charset, None));
    }
    let size: usize = inner.parse().ok()?;
    if size == 0 {
        return None;
    }
    Some(TypeSpec::FixedText(charset, Some(size)))
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Auto => f.write_str("auto"),
            TypeSpec::Skip => f.write_str("skip"),
            TypeSpec::Numeric(t) => f.write_str(t.type_name()),
            TypeSpec::VarText(c) => f.write_str(c.as_str()),
            TypeSpec::FixedText(c, None) => write!(f, "{}[]", c.as_str()),
            TypeSpec::FixedText(c, Some(n)) => write!(f, "{}[{}]", c.as_str(), n),
            TypeSpec::Opaque => f.write_str("opaque"),
            TypeSpec::Complex => f.write_str("complex"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric() {
        assert_eq!(
            "uint16".parse::<TypeSpec>().unwrap(),
            TypeSpec::Numeric(StorageType::UInt16)
        );
        assert_eq!(
            "bfloat16".parse::<TypeSpec>().unwrap(),
            TypeSpec::Numeric(StorageType::BFloat16)
        );
    }

    #[test]
    fn test_parse_text_forms() {
        assert_eq!("utf8".parse(), Ok(TypeSpec::VarText(Charset::Utf8)));
        assert_eq!("ascii[]".parse(), Ok(TypeSpec::FixedText(Charset::Ascii, None)));
        assert_eq!(
            "utf8[12]".parse(),
            Ok(TypeSpec::FixedText(Charset::Utf8, Some(12)))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["int7", "ascii[0]", "utf8[x]", "ascii[3", "latin1", ""] {
            assert!(bad.parse::<TypeSpec>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_display_parses_back() {
        for s in ["auto", "skip", "int64", "ascii[]", "utf8[4]", "opaque"] {
            assert_eq!(s.parse::<TypeSpec>().unwrap().to_string(), s);
        }
    }
}
