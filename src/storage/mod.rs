//! Storage engine subsystem
//!
//! The tree walker never touches bytes on disk itself; it drives a
//! `StorageEngine` through a narrow set of primitives (create container,
//! write leaf, write attribute, list, read, delete, rename).
//!
//! Two engines are provided:
//! - `MemoryEngine`: the whole tree in memory, listings in lexicographic order
//! - `FileEngine`: a `MemoryEngine` persisted to one checksummed container file
//!   after every mutating primitive
//!
//! # Guarantees
//!
//! - Each primitive succeeds completely or leaves the engine unchanged
//! - No multi-primitive transactions
//! - Container files are CRC32-verified on open; a mismatch is `Corrupt`
//! - Compression levels and chunk layouts are recorded, not applied

mod checksum;
mod engine;
mod errors;
mod file;
mod format;
mod layout;
mod memory;

pub use checksum::compute_checksum;
pub use engine::{CompoundData, Dataset, Layout, NodeKind, StorageEngine};
pub use errors::{EngineError, EngineResult};
pub use file::FileEngine;
pub use format::{FORMAT_VERSION, MAGIC};
pub use layout::{chunk_dims, MAX_CHUNK_BYTES};
pub use memory::MemoryEngine;
