//! Payload encoding
//!
//! Element layouts (all little-endian):
//! - integers and floats: native width, float16/bfloat16 via `half`
//! - fixed text: `size` bytes per element, NUL-padded
//! - variable text: u32 byte length then bytes; `0xFFFF_FFFF` marks a missing string
//! - opaque: raw bytes
//! - complex: two f64 (re, im)
//! - enum: i32 codes, 1-based
//! - compound attribute blob: per column, u64 length then the column bytes
//!
//! A storage type has one natural read-back kind (integers read as integers,
//! floats as doubles). When the written payload kind differs, a class marker
//! records the original kind so the reader can restore it.

use half::{bf16, f16};

use crate::dtype::{Charset, StorageType};
use crate::storage::Dataset;
use crate::value::{Complex, Payload};

const MISSING_TEXT: u32 = u32::MAX;

/// Original payload kind when it differs from the storage type's natural one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    Double,
    Integer,
    Logical,
}

impl Marker {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Marker::Double => "double",
            Marker::Integer => "integer",
            Marker::Logical => "logical",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "double" => Some(Marker::Double),
            "integer" => Some(Marker::Integer),
            "logical" => Some(Marker::Logical),
            _ => None,
        }
    }
}

/// Marker needed to read `payload` back from `dtype`, if any.
pub(crate) fn marker_for(payload: &Payload, dtype: &StorageType) -> Option<Marker> {
    match payload {
        Payload::Float(_) if dtype.is_integer() => Some(Marker::Double),
        Payload::Int(_) if dtype.is_float() => Some(Marker::Integer),
        Payload::Bool(_) => Some(Marker::Logical),
        _ => None,
    }
}

/// A scalar or vector of ASCII strings, used for structural markers.
pub(crate) fn text_dataset(strings: &[&str]) -> Dataset {
    let values: Vec<Option<String>> = strings.iter().map(|s| Some(s.to_string())).collect();
    let dtype = StorageType::VarText {
        charset: Charset::detect(strings.iter().copied()),
    };
    let dims = if strings.len() == 1 {
        Vec::new()
    } else {
        vec![strings.len()]
    };
    Dataset::new(dtype, dims, encode_var_text(&values))
}

/// Strings of a text dataset, missing entries as "".
pub(crate) fn dataset_strings(dataset: &Dataset) -> Result<Vec<String>, String> {
    match decode(&dataset.dtype, &dataset.data, element_count(&dataset.dims), None)? {
        Payload::Text(v) => Ok(v.into_iter().map(Option::unwrap_or_default).collect()),
        _ => Err(format!("expected text, found {}", dataset.dtype)),
    }
}

/// Number of elements described by `dims`; a scalar holds one.
pub(crate) fn element_count(dims: &[usize]) -> usize {
    dims.iter().product()
}

#[derive(Debug, Clone, Copy)]
enum Num {
    I(i64),
    F(f64),
}

impl Num {
    fn as_i64(self) -> i64 {
        match self {
            Num::I(i) => i,
            Num::F(f) => f as i64,
        }
    }

    /// Unsigned widths convert from the float directly so values past
    /// `i64::MAX` keep their magnitude.
    fn as_u64(self) -> u64 {
        match self {
            Num::I(i) => i as u64,
            Num::F(f) => f as u64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::I(i) => i as f64,
            Num::F(f) => f,
        }
    }
}

fn numbers(payload: &Payload) -> Vec<Num> {
    match payload {
        Payload::Float(v) => v.iter().map(|f| Num::F(*f)).collect(),
        Payload::Int(v) => v
            .iter()
            .map(|x| x.map_or(Num::F(f64::NAN), Num::I))
            .collect(),
        Payload::Bool(v) => v
            .iter()
            .map(|x| x.map_or(Num::F(f64::NAN), |b| Num::I(b as i64)))
            .collect(),
        _ => Vec::new(),
    }
}

fn put_number(out: &mut Vec<u8>, dtype: &StorageType, n: Num) {
    match dtype {
        StorageType::Int8 => out.extend_from_slice(&(n.as_i64() as i8).to_le_bytes()),
        StorageType::Int16 => out.extend_from_slice(&(n.as_i64() as i16).to_le_bytes()),
        StorageType::Int32 => out.extend_from_slice(&(n.as_i64() as i32).to_le_bytes()),
        StorageType::Int64 => out.extend_from_slice(&n.as_i64().to_le_bytes()),
        StorageType::UInt8 => out.extend_from_slice(&(n.as_u64() as u8).to_le_bytes()),
        StorageType::UInt16 => out.extend_from_slice(&(n.as_u64() as u16).to_le_bytes()),
        StorageType::UInt32 => out.extend_from_slice(&(n.as_u64() as u32).to_le_bytes()),
        StorageType::UInt64 => out.extend_from_slice(&n.as_u64().to_le_bytes()),
        StorageType::Float16 => out.extend_from_slice(&f16::from_f64(n.as_f64()).to_le_bytes()),
        StorageType::BFloat16 => {
            out.extend_from_slice(&bf16::from_f64(n.as_f64()).to_le_bytes())
        }
        StorageType::Float32 => out.extend_from_slice(&(n.as_f64() as f32).to_le_bytes()),
        StorageType::Float64 => out.extend_from_slice(&n.as_f64().to_le_bytes()),
        _ => {}
    }
}

fn encode_var_text(values: &[Option<String>]) -> Vec<u8> {
    let mut out = Vec::new();
    for v in values {
        match v {
            Some(s) => {
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            None => out.extend_from_slice(&MISSING_TEXT.to_le_bytes()),
        }
    }
    out
}

fn encode_fixed_text(values: &[Option<String>], size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * size);
    for v in values {
        let bytes = v.as_deref().unwrap_or("").as_bytes();
        let n = bytes.len().min(size);
        out.extend_from_slice(&bytes[..n]);
        out.resize(out.len() + size - n, 0);
    }
    out
}

/// Encode a payload as `dtype`. The pair must come from the resolver.
pub(crate) fn encode(payload: &Payload, dtype: &StorageType) -> Vec<u8> {
    match (payload, dtype) {
        (Payload::Text(v), StorageType::VarText { .. }) => encode_var_text(v),
        (Payload::Text(v), StorageType::FixedText { size, .. }) => encode_fixed_text(v, *size),
        (Payload::Binary(b), _) => b.clone(),
        (Payload::Complex(v), _) => {
            let mut out = Vec::with_capacity(v.len() * 16);
            for c in v {
                out.extend_from_slice(&c.re.to_le_bytes());
                out.extend_from_slice(&c.im.to_le_bytes());
            }
            out
        }
        (p, t) => {
            let mut out = Vec::with_capacity(p.len() * t.element_size().unwrap_or(8));
            for n in numbers(p) {
                put_number(&mut out, t, n);
            }
            out
        }
    }
}

/// Encode categorical codes. Missing codes are rejected before this point.
pub(crate) fn encode_codes(codes: &[Option<i32>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(codes.len() * 4);
    for c in codes {
        out.extend_from_slice(&c.unwrap_or(0).to_le_bytes());
    }
    out
}

pub(crate) fn decode_codes(data: &[u8], count: usize) -> Result<Vec<Option<i32>>, String> {
    check_len(data, count, 4)?;
    Ok(data
        .chunks_exact(4)
        .map(|c| Some(i32::from_le_bytes(arr(c))))
        .collect())
}

/// Pack column buffers into a single attribute blob.
pub(crate) fn pack_columns(columns: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for c in columns {
        out.extend_from_slice(&(c.len() as u64).to_le_bytes());
        out.extend_from_slice(c);
    }
    out
}

pub(crate) fn unpack_columns(data: &[u8], count: usize) -> Result<Vec<Vec<u8>>, String> {
    let mut columns = Vec::with_capacity(count);
    let mut pos = 0;
    for _ in 0..count {
        let len_bytes = data
            .get(pos..pos + 8)
            .ok_or_else(|| "truncated column blob".to_string())?;
        let len = u64::from_le_bytes(arr(len_bytes)) as usize;
        pos += 8;
        let bytes = data
            .get(pos..pos.saturating_add(len))
            .ok_or_else(|| "truncated column blob".to_string())?;
        columns.push(bytes.to_vec());
        pos += len;
    }
    if pos != data.len() {
        return Err("trailing bytes in column blob".to_string());
    }
    Ok(columns)
}

fn arr<const N: usize>(c: &[u8]) -> [u8; N] {
    let mut a = [0u8; N];
    a.copy_from_slice(&c[..N]);
    a
}

fn check_len(data: &[u8], count: usize, size: usize) -> Result<(), String> {
    if count.checked_mul(size) != Some(data.len()) {
        return Err(format!(
            "{} bytes cannot hold {} elements of {} bytes",
            data.len(),
            count,
            size
        ));
    }
    Ok(())
}

fn read_numbers(dtype: &StorageType, data: &[u8], count: usize) -> Result<Vec<Num>, String> {
    let size = dtype
        .element_size()
        .ok_or_else(|| format!("{} is not numeric", dtype))?;
    check_len(data, count, size)?;
    let read = |c: &[u8]| match dtype {
        StorageType::Int8 => Num::I(i8::from_le_bytes(arr(c)) as i64),
        StorageType::Int16 => Num::I(i16::from_le_bytes(arr(c)) as i64),
        StorageType::Int32 => Num::I(i32::from_le_bytes(arr(c)) as i64),
        StorageType::Int64 => Num::I(i64::from_le_bytes(arr(c))),
        StorageType::UInt8 => Num::I(u8::from_le_bytes(arr(c)) as i64),
        StorageType::UInt16 => Num::I(u16::from_le_bytes(arr(c)) as i64),
        StorageType::UInt32 => Num::I(u32::from_le_bytes(arr(c)) as i64),
        StorageType::UInt64 => {
            let v = u64::from_le_bytes(arr(c));
            i64::try_from(v).map_or(Num::F(v as f64), Num::I)
        }
        StorageType::Float16 => Num::F(f16::from_le_bytes(arr(c)).to_f64()),
        StorageType::BFloat16 => Num::F(bf16::from_le_bytes(arr(c)).to_f64()),
        StorageType::Float32 => Num::F(f32::from_le_bytes(arr(c)) as f64),
        _ => Num::F(f64::from_le_bytes(arr(c))),
    };
    Ok(data.chunks_exact(size).map(read).collect())
}

fn to_int(n: Num) -> Result<Option<i64>, String> {
    match n {
        Num::I(i) => Ok(Some(i)),
        Num::F(f) if !f.is_finite() => Ok(None),
        Num::F(f) if f.fract() == 0.0 && f.abs() < 9.2e18 => Ok(Some(f as i64)),
        Num::F(f) => Err(format!("{} is not an integer", f)),
    }
}

fn to_bool(n: Num) -> Option<bool> {
    match n {
        Num::I(i) => Some(i != 0),
        Num::F(f) if !f.is_finite() => None,
        Num::F(f) => Some(f != 0.0),
    }
}

fn decode_var_text(data: &[u8], count: usize) -> Result<Vec<Option<String>>, String> {
    let mut out = Vec::with_capacity(count.min(data.len() / 4 + 1));
    let mut pos = 0;
    for _ in 0..count {
        let len_bytes = data
            .get(pos..pos + 4)
            .ok_or_else(|| "truncated text".to_string())?;
        let len = u32::from_le_bytes(arr(len_bytes));
        pos += 4;
        if len == MISSING_TEXT {
            out.push(None);
            continue;
        }
        let bytes = data
            .get(pos..pos + len as usize)
            .ok_or_else(|| "truncated text".to_string())?;
        pos += len as usize;
        let s = String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())?;
        out.push(Some(s));
    }
    if pos != data.len() {
        return Err("trailing bytes after text".to_string());
    }
    Ok(out)
}

fn decode_fixed_text(data: &[u8], count: usize, size: usize) -> Result<Vec<Option<String>>, String> {
    check_len(data, count, size)?;
    if size == 0 {
        return Ok(vec![Some(String::new()); count]);
    }
    data.chunks_exact(size)
        .map(|c| {
            let end = c.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
            String::from_utf8(c[..end].to_vec())
                .map(Some)
                .map_err(|e| e.to_string())
        })
        .collect()
}

/// Decode `count` elements of `dtype`, restoring the marked kind if given.
pub(crate) fn decode(
    dtype: &StorageType,
    data: &[u8],
    count: usize,
    marker: Option<Marker>,
) -> Result<Payload, String> {
    match dtype {
        StorageType::VarText { .. } => Ok(Payload::Text(decode_var_text(data, count)?)),
        StorageType::FixedText { size, .. } => {
            Ok(Payload::Text(decode_fixed_text(data, count, *size)?))
        }
        StorageType::Opaque => {
            check_len(data, count, 1)?;
            Ok(Payload::Binary(data.to_vec()))
        }
        StorageType::Complex => {
            check_len(data, count, 16)?;
            Ok(Payload::Complex(
                data.chunks_exact(16)
                    .map(|c| Complex::new(f64::from_le_bytes(arr(&c[..8])), f64::from_le_bytes(arr(&c[8..]))))
                    .collect(),
            ))
        }
        t if t.is_integer() || t.is_float() => {
            let nums = read_numbers(t, data, count)?;
            let kind = marker.unwrap_or(if t.is_integer() {
                Marker::Integer
            } else {
                Marker::Double
            });
            Ok(match kind {
                Marker::Integer => Payload::Int(nums.into_iter().map(to_int).collect::<Result<_, _>>()?),
                Marker::Double => Payload::Float(nums.into_iter().map(Num::as_f64).collect()),
                Marker::Logical => Payload::Bool(nums.into_iter().map(to_bool).collect()),
            })
        }
        other => Err(format!("{} has no array payload", other)),
    }
}
