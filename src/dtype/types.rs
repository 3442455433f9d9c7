//! Concrete element types and their representable ranges.

use std::fmt;

/// Largest integer magnitude a float16 holds exactly.
pub const FLOAT_EXACT_F16: f64 = 2048.0;
/// Largest integer magnitude a bfloat16 holds exactly.
pub const FLOAT_EXACT_BF16: f64 = 256.0;
/// Largest integer magnitude a float32 holds exactly.
pub const FLOAT_EXACT_F32: f64 = 16_777_216.0;
/// Largest integer magnitude a float64 holds exactly.
pub const FLOAT_EXACT_F64: f64 = 9_007_199_254_740_992.0;

/// Character set of a text type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    Ascii,
    Utf8,
}

impl Charset {
    /// Narrowest charset able to hold every string.
    pub fn detect<'a, I: IntoIterator<Item = &'a str>>(strings: I) -> Self {
        if strings.into_iter().all(|s| s.is_ascii()) {
            Charset::Ascii
        } else {
            Charset::Utf8
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Charset::Ascii => "ascii",
            Charset::Utf8 => "utf8",
        }
    }
}

/// On-disk element type of a leaf or attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    /// Reduced-precision float (8-bit exponent, 7-bit mantissa)
    BFloat16,
    Float32,
    Float64,
    /// Fixed-size NUL-padded strings
    FixedText { size: usize, charset: Charset },
    /// Variable-length strings; the only text form that holds missing values
    VarText { charset: Charset },
    Opaque,
    Complex,
    Enum { levels: Vec<String> },
    Compound { columns: Vec<(String, StorageType)> },
    Null,
    Container,
}

impl StorageType {
    /// Signed and unsigned integer widths, narrowest first.
    pub const INTEGERS: [StorageType; 8] = [
        StorageType::UInt8,
        StorageType::Int8,
        StorageType::UInt16,
        StorageType::Int16,
        StorageType::UInt32,
        StorageType::Int32,
        StorageType::UInt64,
        StorageType::Int64,
    ];

    pub fn is_integer(&self) -> bool {
        self.int_range().is_some()
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            StorageType::Float16 | StorageType::BFloat16 | StorageType::Float32 | StorageType::Float64
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self, StorageType::FixedText { .. } | StorageType::VarText { .. })
    }

    /// Inclusive range of an integer type as i128 so that u64 fits.
    pub fn int_range(&self) -> Option<(i128, i128)> {
        Some(match self {
            StorageType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            StorageType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            StorageType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            StorageType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            StorageType::UInt8 => (0, u8::MAX as i128),
            StorageType::UInt16 => (0, u16::MAX as i128),
            StorageType::UInt32 => (0, u32::MAX as i128),
            StorageType::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }

    /// Largest finite value of a float type.
    pub fn float_max(&self) -> Option<f64> {
        Some(match self {
            StorageType::Float16 => f64::from(half::f16::MAX),
            StorageType::BFloat16 => f64::from(half::bf16::MAX),
            StorageType::Float32 => f32::MAX as f64,
            StorageType::Float64 => f64::MAX,
            _ => return None,
        })
    }

    /// Largest integer magnitude a float type stores without rounding.
    pub fn float_exact(&self) -> Option<f64> {
        Some(match self {
            StorageType::Float16 => FLOAT_EXACT_F16,
            StorageType::BFloat16 => FLOAT_EXACT_BF16,
            StorageType::Float32 => FLOAT_EXACT_F32,
            StorageType::Float64 => FLOAT_EXACT_F64,
            _ => return None,
        })
    }

    /// Whether an integer-valued `v` fits this numeric type.
    ///
    /// Floats only check magnitude against their largest finite value.
    pub fn holds(&self, v: f64) -> bool {
        if let Some((lo, hi)) = self.int_range() {
            return v.fract() == 0.0 && v >= lo as f64 && v <= hi as f64;
        }
        match self.float_max() {
            Some(max) => !v.is_finite() || v.abs() <= max,
            None => false,
        }
    }

    /// Bytes per element for fixed-width types.
    pub fn element_size(&self) -> Option<usize> {
        Some(match self {
            StorageType::Int8 | StorageType::UInt8 => 1,
            StorageType::Int16 | StorageType::UInt16 => 2,
            StorageType::Float16 | StorageType::BFloat16 => 2,
            StorageType::Int32 | StorageType::UInt32 | StorageType::Float32 => 4,
            StorageType::Int64 | StorageType::UInt64 | StorageType::Float64 => 8,
            StorageType::Complex => 16,
            StorageType::Opaque => 1,
            StorageType::Enum { .. } => 4,
            StorageType::FixedText { size, .. } => *size,
            _ => return None,
        })
    }

    /// Short name used by `info` and the tree listing.
    pub fn type_name(&self) -> &'static str {
        match self {
            StorageType::Int8 => "int8",
            StorageType::Int16 => "int16",
            StorageType::Int32 => "int32",
            StorageType::Int64 => "int64",
            StorageType::UInt8 => "uint8",
            StorageType::UInt16 => "uint16",
            StorageType::UInt32 => "uint32",
            StorageType::UInt64 => "uint64",
            StorageType::Float16 => "float16",
            StorageType::BFloat16 => "bfloat16",
            StorageType::Float32 => "float32",
            StorageType::Float64 => "float64",
            StorageType::FixedText { charset, .. } | StorageType::VarText { charset } => {
                charset.as_str()
            }
            StorageType::Opaque => "opaque",
            StorageType::Complex => "complex",
            StorageType::Enum { .. } => "enum",
            StorageType::Compound { .. } => "compound",
            StorageType::Null => "null",
            StorageType::Container => "container",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::FixedText { size, charset } => write!(f, "{}[{}]", charset.as_str(), size),
            StorageType::Enum { levels } => write!(f, "enum({})", levels.len()),
            StorageType::Compound { columns } => write!(f, "compound({})", columns.len()),
            other => f.write_str(other.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_ranges() {
        assert!(StorageType::UInt8.holds(255.0));
        assert!(!StorageType::UInt8.holds(256.0));
        assert!(!StorageType::UInt8.holds(-1.0));
        assert!(StorageType::Int8.holds(-128.0));
        assert!(!StorageType::Int16.holds(1.5));
    }

    #[test]
    fn test_float_ranges() {
        assert!(StorageType::Float16.holds(65504.0));
        assert!(!StorageType::Float16.holds(70000.0));
        assert!(StorageType::BFloat16.holds(1e38));
        assert!(StorageType::Float16.holds(f64::NAN));
    }

    #[test]
    fn test_charset_detect() {
        assert_eq!(Charset::detect(["abc", "def"]), Charset::Ascii);
        assert_eq!(Charset::detect(["abc", "déf"]), Charset::Utf8);
    }

    #[test]
    fn test_display() {
        let t = StorageType::FixedText {
            size: 3,
            charset: Charset::Ascii,
        };
        assert_eq!(t.to_string(), "ascii[3]");
        assert_eq!(StorageType::BFloat16.to_string(), "bfloat16");
    }
}
