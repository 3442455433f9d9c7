//! Container file format
//!
//! ```text
//! +--------------------+
//! | Magic "TSTR"       | (4 bytes)
//! +--------------------+
//! | Format version     | (u16 LE)
//! +--------------------+
//! | Created at         | (length-prefixed RFC3339 string)
//! +--------------------+
//! | Root node          | (recursive, see below)
//! +--------------------+
//! | Checksum           | (u32 LE, CRC32 of everything above)
//! +--------------------+
//! ```
//!
//! Node: kind tag (u8), attribute count (u32) and `(name, dataset)` pairs,
//! then per kind:
//! - container: child count (u32) and `(name, node)` pairs
//! - leaf: layout, dataset
//! - compound: layout, rows (u64), column count (u32), `(name, type, bytes)` triples
//!
//! Strings are u32-length-prefixed UTF-8, byte buffers u64-length-prefixed,
//! all integers little-endian.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::checksum;
use super::engine::{CompoundData, Dataset, Layout};
use super::errors::{EngineError, EngineResult};
use super::memory::{Entry, StoredNode};
use crate::dtype::{Charset, StorageType};

pub const MAGIC: &[u8; 4] = b"TSTR";
pub const FORMAT_VERSION: u16 = 1;

const NODE_CONTAINER: u8 = 0;
const NODE_LEAF: u8 = 1;
const NODE_COMPOUND: u8 = 2;

/// Serialize a tree into a sealed container image.
pub fn encode(created_at: &DateTime<Utc>, root: &StoredNode) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    put_str(&mut buf, &created_at.to_rfc3339());
    put_node(&mut buf, root);
    checksum::seal(buf)
}

/// Parse and verify a container image.
pub fn decode(image: &[u8]) -> EngineResult<(DateTime<Utc>, StoredNode)> {
    let body = checksum::verify_trailer(image).map_err(|(computed, stored)| {
        EngineError::Corrupt(format!(
            "checksum mismatch: computed {:08x}, stored {:08x}",
            computed, stored
        ))
    })?;
    let mut d = Decoder { buf: body, pos: 0 };
    if d.take(4)? != MAGIC {
        return Err(EngineError::Corrupt("bad magic".to_string()));
    }
    let version = d.u16()?;
    if version != FORMAT_VERSION {
        return Err(EngineError::Corrupt(format!(
            "unsupported format version {}",
            version
        )));
    }
    let created_at = DateTime::parse_from_rfc3339(&d.string()?)
        .map_err(|e| EngineError::Corrupt(format!("bad timestamp: {}", e)))?
        .with_timezone(&Utc);
    let root = d.node()?;
    if d.pos != d.buf.len() {
        return Err(EngineError::Corrupt(format!(
            "{} trailing bytes",
            d.buf.len() - d.pos
        )));
    }
    Ok((created_at, root))
}

fn put_u32(buf: &mut Vec<u8>, v: usize) {
    buf.extend_from_slice(&(v as u32).to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: usize) {
    buf.extend_from_slice(&(v as u64).to_le_bytes());
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_u32(buf, s.len());
    buf.extend_from_slice(s.as_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    put_u64(buf, b.len());
    buf.extend_from_slice(b);
}

fn put_dims(buf: &mut Vec<u8>, dims: &[usize]) {
    put_u32(buf, dims.len());
    for d in dims {
        put_u64(buf, *d);
    }
}

fn put_type(buf: &mut Vec<u8>, t: &StorageType) {
    let tag = match t {
        StorageType::Int8 => 0,
        StorageType::Int16 => 1,
        StorageType::Int32 => 2,
        StorageType::Int64 => 3,
        StorageType::UInt8 => 4,
        StorageType::UInt16 => 5,
        StorageType::UInt32 => 6,
        StorageType::UInt64 => 7,
        StorageType::Float16 => 8,
        StorageType::BFloat16 => 9,
        StorageType::Float32 => 10,
        StorageType::Float64 => 11,
        StorageType::FixedText { .. } => 12,
        StorageType::VarText { .. } => 13,
        StorageType::Opaque => 14,
        StorageType::Complex => 15,
        StorageType::Enum { .. } => 16,
        StorageType::Compound { .. } => 17,
        StorageType::Null => 18,
        StorageType::Container => 19,
    };
    buf.push(tag);
    match t {
        StorageType::FixedText { size, charset } => {
            put_u64(buf, *size);
            buf.push(charset_tag(*charset));
        }
        StorageType::VarText { charset } => buf.push(charset_tag(*charset)),
        StorageType::Enum { levels } => {
            put_u32(buf, levels.len());
            for l in levels {
                put_str(buf, l);
            }
        }
        StorageType::Compound { columns } => {
            put_u32(buf, columns.len());
            for (name, t) in columns {
                put_str(buf, name);
                put_type(buf, t);
            }
        }
        _ => {}
    }
}

fn charset_tag(c: Charset) -> u8 {
    match c {
        Charset::Ascii => 0,
        Charset::Utf8 => 1,
    }
}

fn put_dataset(buf: &mut Vec<u8>, d: &Dataset) {
    put_type(buf, &d.dtype);
    put_dims(buf, &d.dims);
    put_bytes(buf, &d.data);
}

fn put_layout(buf: &mut Vec<u8>, l: &Layout) {
    buf.push(l.compression);
    match &l.chunk {
        Some(chunk) => {
            buf.push(1);
            put_dims(buf, chunk);
        }
        None => buf.push(0),
    }
}

fn put_node(buf: &mut Vec<u8>, node: &StoredNode) {
    let tag = match node.entry {
        Entry::Container(_) => NODE_CONTAINER,
        Entry::Leaf { .. } => NODE_LEAF,
        Entry::Compound { .. } => NODE_COMPOUND,
    };
    buf.push(tag);
    put_u32(buf, node.attrs.len());
    for (name, d) in &node.attrs {
        put_str(buf, name);
        put_dataset(buf, d);
    }
    match &node.entry {
        Entry::Container(children) => {
            put_u32(buf, children.len());
            for (name, child) in children {
                put_str(buf, name);
                put_node(buf, child);
            }
        }
        Entry::Leaf { dataset, layout } => {
            put_layout(buf, layout);
            put_dataset(buf, dataset);
        }
        Entry::Compound { compound, layout } => {
            put_layout(buf, layout);
            put_u64(buf, compound.rows);
            put_u32(buf, compound.columns.len());
            for ((name, t), data) in compound.columns.iter().zip(&compound.data) {
                put_str(buf, name);
                put_type(buf, t);
                put_bytes(buf, data);
            }
        }
    }
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn take(&mut self, n: usize) -> EngineResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| EngineError::Corrupt(format!("truncated at byte {}", self.pos)))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> EngineResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> EngineResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> EngineResult<usize> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
    }

    fn u64(&mut self) -> EngineResult<usize> {
        let b = self.take(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        usize::try_from(u64::from_le_bytes(a))
            .map_err(|_| EngineError::Corrupt("length exceeds address space".to_string()))
    }

    fn string(&mut self) -> EngineResult<String> {
        let len = self.u32()?;
        let b = self.take(len)?;
        String::from_utf8(b.to_vec())
            .map_err(|e| EngineError::Corrupt(format!("invalid UTF-8: {}", e)))
    }

    fn bytes(&mut self) -> EngineResult<Vec<u8>> {
        let len = self.u64()?;
        Ok(self.take(len)?.to_vec())
    }

    fn dims(&mut self) -> EngineResult<Vec<usize>> {
        let n = self.u32()?;
        (0..n).map(|_| self.u64()).collect()
    }

    fn charset(&mut self) -> EngineResult<Charset> {
        match self.u8()? {
            0 => Ok(Charset::Ascii),
            1 => Ok(Charset::Utf8),
            t => Err(EngineError::Corrupt(format!("unknown charset tag {}", t))),
        }
    }

    fn dtype(&mut self) -> EngineResult<StorageType> {
        Ok(match self.u8()? {
            0 => StorageType::Int8,
            1 => StorageType::Int16,
            2 => StorageType::Int32,
            3 => StorageType::Int64,
            4 => StorageType::UInt8,
            5 => StorageType::UInt16,
            6 => StorageType::UInt32,
            7 => StorageType::UInt64,
            8 => StorageType::Float16,
            9 => StorageType::BFloat16,
            10 => StorageType::Float32,
            11 => StorageType::Float64,
            12 => {
                let size = self.u64()?;
                StorageType::FixedText {
                    size,
                    charset: self.charset()?,
                }
            }
            13 => StorageType::VarText {
                charset: self.charset()?,
            },
            14 => StorageType::Opaque,
            15 => StorageType::Complex,
            16 => {
                let n = self.u32()?;
                let levels = (0..n).map(|_| self.string()).collect::<EngineResult<_>>()?;
                StorageType::Enum { levels }
            }
            17 => {
                let n = self.u32()?;
                let mut columns = Vec::with_capacity(n.min(1024));
                for _ in 0..n {
                    let name = self.string()?;
                    columns.push((name, self.dtype()?));
                }
                StorageType::Compound { columns }
            }
            18 => StorageType::Null,
            19 => StorageType::Container,
            t => return Err(EngineError::Corrupt(format!("unknown type tag {}", t))),
        })
    }

    fn dataset(&mut self) -> EngineResult<Dataset> {
        let dtype = self.dtype()?;
        let dims = self.dims()?;
        let data = self.bytes()?;
        Ok(Dataset { dtype, dims, data })
    }

    fn layout(&mut self) -> EngineResult<Layout> {
        let compression = self.u8()?;
        let chunk = match self.u8()? {
            0 => None,
            _ => Some(self.dims()?),
        };
        Ok(Layout { compression, chunk })
    }

    fn node(&mut self) -> EngineResult<StoredNode> {
        let tag = self.u8()?;
        let mut attrs = BTreeMap::new();
        for _ in 0..self.u32()? {
            let name = self.string()?;
            attrs.insert(name, self.dataset()?);
        }
        let entry = match tag {
            NODE_CONTAINER => {
                let mut children = BTreeMap::new();
                for _ in 0..self.u32()? {
                    let name = self.string()?;
                    children.insert(name, self.node()?);
                }
                Entry::Container(children)
            }
            NODE_LEAF => {
                let layout = self.layout()?;
                Entry::Leaf {
                    dataset: self.dataset()?,
                    layout,
                }
            }
            NODE_COMPOUND => {
                let layout = self.layout()?;
                let rows = self.u64()?;
                let n = self.u32()?;
                let mut columns = Vec::with_capacity(n.min(1024));
                let mut data = Vec::with_capacity(n.min(1024));
                for _ in 0..n {
                    let name = self.string()?;
                    columns.push((name, self.dtype()?));
                    data.push(self.bytes()?);
                }
                Entry::Compound {
                    compound: CompoundData {
                        rows,
                        columns,
                        data,
                    },
                    layout,
                }
            }
            t => return Err(EngineError::Corrupt(format!("unknown node tag {}", t))),
        };
        Ok(StoredNode { entry, attrs })
    }
}
