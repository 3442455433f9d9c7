//! # Storage Engine Trait
//!
//! The narrow interface the tree walker drives. Addresses are absolute,
//! normalised `/`-separated paths; `/` is the root container and always exists.
//! Every primitive either fully succeeds or leaves the engine unchanged. There
//! is no multi-call transaction.

use crate::dtype::StorageType;

use super::errors::EngineResult;

/// What lives at an address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    Leaf,
    CompoundLeaf,
    Missing,
}

/// An encoded leaf or attribute: element type, extents and raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub dtype: StorageType,
    /// Empty for a scalar
    pub dims: Vec<usize>,
    pub data: Vec<u8>,
}

impl Dataset {
    pub fn new(dtype: StorageType, dims: Vec<usize>, data: Vec<u8>) -> Self {
        Self { dtype, dims, data }
    }
}

/// An encoded record: named columns of equal length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundData {
    pub rows: usize,
    pub columns: Vec<(String, StorageType)>,
    /// One encoded buffer per column, in column order
    pub data: Vec<Vec<u8>>,
}

/// Storage properties of a leaf
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Layout {
    pub compression: u8,
    /// Chunk extents; None when the leaf is stored contiguously
    pub chunk: Option<Vec<usize>>,
}

/// Storage engine collaborator
pub trait StorageEngine: std::fmt::Debug {
    /// Whether a container exists at address
    fn container_exists(&self, address: &str) -> EngineResult<bool>;

    /// Create a container, creating missing ancestors. Idempotent.
    fn create_container(&mut self, address: &str) -> EngineResult<()>;

    /// Write a leaf, replacing any node at address. The parent must exist.
    fn write_leaf(&mut self, address: &str, dataset: &Dataset, compression: u8)
        -> EngineResult<()>;

    /// Write a compound leaf, replacing any node at address. The parent must exist.
    fn write_compound_leaf(
        &mut self,
        address: &str,
        compound: &CompoundData,
        compression: u8,
    ) -> EngineResult<()>;

    /// Attach (or replace) an attribute on an existing node
    fn write_attribute(&mut self, owner: &str, name: &str, dataset: &Dataset)
        -> EngineResult<()>;

    /// Kind of node at address
    fn node_kind(&self, address: &str) -> EngineResult<NodeKind>;

    /// Immediate child names of a container
    fn list_children(&self, address: &str) -> EngineResult<Vec<String>>;

    fn read_leaf(&self, address: &str) -> EngineResult<Dataset>;

    fn read_compound_leaf(&self, address: &str) -> EngineResult<CompoundData>;

    fn read_attribute(&self, owner: &str, name: &str) -> EngineResult<Dataset>;

    fn list_attributes(&self, owner: &str) -> EngineResult<Vec<String>>;

    /// Compression and chunking of a leaf or compound leaf
    fn layout(&self, address: &str) -> EngineResult<Layout>;

    /// Remove a node and everything below it
    fn delete(&mut self, address: &str) -> EngineResult<()>;

    fn delete_attribute(&mut self, owner: &str, name: &str) -> EngineResult<()>;

    /// Move a node without rewriting its payload. The parent of `to` must exist.
    fn rename(&mut self, from: &str, to: &str) -> EngineResult<()>;
}
