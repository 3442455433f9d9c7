//! # In-Memory Engine
//!
//! Children and attributes live in `BTreeMap`s, so listings come back in
//! lexicographic order regardless of write order.

use std::collections::BTreeMap;

use super::engine::{CompoundData, Dataset, Layout, NodeKind, StorageEngine};
use super::errors::{EngineError, EngineResult};
use super::layout;
use crate::dtype::StorageType;

/// Payload of a stored node
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Entry {
    Container(BTreeMap<String, StoredNode>),
    Leaf { dataset: Dataset, layout: Layout },
    Compound { compound: CompoundData, layout: Layout },
}

/// A stored node plus its attributes
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoredNode {
    pub entry: Entry,
    pub attrs: BTreeMap<String, Dataset>,
}

impl StoredNode {
    pub(crate) fn container() -> Self {
        Self {
            entry: Entry::Container(BTreeMap::new()),
            attrs: BTreeMap::new(),
        }
    }

    fn kind(&self) -> NodeKind {
        match self.entry {
            Entry::Container(_) => NodeKind::Container,
            Entry::Leaf { .. } => NodeKind::Leaf,
            Entry::Compound { .. } => NodeKind::CompoundLeaf,
        }
    }
}

/// Splits an absolute address into segments. `/` has none.
fn segments(address: &str) -> EngineResult<Vec<&str>> {
    if !address.starts_with('/') {
        return Err(EngineError::InvalidAddress(address.to_string()));
    }
    let segs: Vec<&str> = address.split('/').filter(|s| !s.is_empty()).collect();
    if segs.iter().any(|s| *s == "." || *s == "..") {
        return Err(EngineError::InvalidAddress(address.to_string()));
    }
    Ok(segs)
}

fn prefix(segs: &[&str]) -> String {
    format!("/{}", segs.join("/"))
}

/// Engine holding the whole tree in memory
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEngine {
    root: StoredNode,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Create an engine with an empty root container
    pub fn new() -> Self {
        Self {
            root: StoredNode::container(),
        }
    }

    pub(crate) fn from_root(root: StoredNode) -> Self {
        Self { root }
    }

    pub(crate) fn root(&self) -> &StoredNode {
        &self.root
    }

    fn get(&self, segs: &[&str]) -> Option<&StoredNode> {
        let mut cur = &self.root;
        for seg in segs {
            cur = match &cur.entry {
                Entry::Container(children) => children.get(*seg)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    fn get_mut(&mut self, segs: &[&str]) -> Option<&mut StoredNode> {
        let mut cur = &mut self.root;
        for seg in segs {
            cur = match &mut cur.entry {
                Entry::Container(children) => children.get_mut(*seg)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    fn node(&self, address: &str) -> EngineResult<&StoredNode> {
        let segs = segments(address)?;
        self.get(&segs)
            .ok_or_else(|| EngineError::NotFound(address.to_string()))
    }

    fn node_mut(&mut self, address: &str) -> EngineResult<&mut StoredNode> {
        let segs = segments(address)?;
        self.get_mut(&segs)
            .ok_or_else(|| EngineError::NotFound(address.to_string()))
    }

    /// Children map of the parent of `address`, plus the last segment.
    fn parent_mut<'a>(
        &mut self,
        address: &'a str,
    ) -> EngineResult<(&mut BTreeMap<String, StoredNode>, &'a str)> {
        let segs = segments(address)?;
        let Some((name, parent)) = segs.split_last() else {
            return Err(EngineError::InvalidAddress(address.to_string()));
        };
        let parent_path = prefix(parent);
        match self.get_mut(parent) {
            Some(StoredNode {
                entry: Entry::Container(children),
                ..
            }) => Ok((children, *name)),
            Some(_) => Err(EngineError::NotAContainer(parent_path)),
            None => Err(EngineError::NotFound(parent_path)),
        }
    }

    fn insert(&mut self, address: &str, node: StoredNode) -> EngineResult<()> {
        let (children, name) = self.parent_mut(address)?;
        children.insert(name.to_string(), node);
        Ok(())
    }
}

impl StorageEngine for MemoryEngine {
    fn container_exists(&self, address: &str) -> EngineResult<bool> {
        let segs = segments(address)?;
        Ok(matches!(self.get(&segs).map(StoredNode::kind), Some(NodeKind::Container)))
    }

    fn create_container(&mut self, address: &str) -> EngineResult<()> {
        let segs = segments(address)?;
        let mut cur = &mut self.root;
        for (i, seg) in segs.iter().enumerate() {
            let children = match &mut cur.entry {
                Entry::Container(children) => children,
                _ => return Err(EngineError::NotAContainer(prefix(&segs[..i]))),
            };
            cur = children
                .entry(seg.to_string())
                .or_insert_with(StoredNode::container);
        }
        match cur.entry {
            Entry::Container(_) => Ok(()),
            _ => Err(EngineError::NotAContainer(address.to_string())),
        }
    }

    fn write_leaf(
        &mut self,
        address: &str,
        dataset: &Dataset,
        compression: u8,
    ) -> EngineResult<()> {
        let layout = Layout {
            compression,
            chunk: layout::plan(&dataset.dims, &dataset.dtype, compression),
        };
        self.insert(
            address,
            StoredNode {
                entry: Entry::Leaf {
                    dataset: dataset.clone(),
                    layout,
                },
                attrs: BTreeMap::new(),
            },
        )
    }

    fn write_compound_leaf(
        &mut self,
        address: &str,
        compound: &CompoundData,
        compression: u8,
    ) -> EngineResult<()> {
        if compound.columns.len() != compound.data.len() {
            return Err(EngineError::InvalidAddress(format!(
                "{}: {} column types for {} column buffers",
                address,
                compound.columns.len(),
                compound.data.len()
            )));
        }
        let dtype = StorageType::Compound {
            columns: compound.columns.clone(),
        };
        let layout = Layout {
            compression,
            chunk: layout::plan(&[compound.rows], &dtype, compression),
        };
        self.insert(
            address,
            StoredNode {
                entry: Entry::Compound {
                    compound: compound.clone(),
                    layout,
                },
                attrs: BTreeMap::new(),
            },
        )
    }

    fn write_attribute(&mut self, owner: &str, name: &str, dataset: &Dataset) -> EngineResult<()> {
        let node = self.node_mut(owner)?;
        node.attrs.insert(name.to_string(), dataset.clone());
        Ok(())
    }

    fn node_kind(&self, address: &str) -> EngineResult<NodeKind> {
        let segs = segments(address)?;
        Ok(self.get(&segs).map_or(NodeKind::Missing, StoredNode::kind))
    }

    fn list_children(&self, address: &str) -> EngineResult<Vec<String>> {
        match &self.node(address)?.entry {
            Entry::Container(children) => Ok(children.keys().cloned().collect()),
            _ => Err(EngineError::NotAContainer(address.to_string())),
        }
    }

    fn read_leaf(&self, address: &str) -> EngineResult<Dataset> {
        match &self.node(address)?.entry {
            Entry::Leaf { dataset, .. } => Ok(dataset.clone()),
            _ => Err(EngineError::NotALeaf(address.to_string())),
        }
    }

    fn read_compound_leaf(&self, address: &str) -> EngineResult<CompoundData> {
        match &self.node(address)?.entry {
            Entry::Compound { compound, .. } => Ok(compound.clone()),
            _ => Err(EngineError::NotALeaf(address.to_string())),
        }
    }

    fn read_attribute(&self, owner: &str, name: &str) -> EngineResult<Dataset> {
        self.node(owner)?
            .attrs
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::AttributeNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            })
    }

    fn list_attributes(&self, owner: &str) -> EngineResult<Vec<String>> {
        Ok(self.node(owner)?.attrs.keys().cloned().collect())
    }

    fn layout(&self, address: &str) -> EngineResult<Layout> {
        match &self.node(address)?.entry {
            Entry::Leaf { layout, .. } | Entry::Compound { layout, .. } => Ok(layout.clone()),
            Entry::Container(_) => Err(EngineError::NotALeaf(address.to_string())),
        }
    }

    fn delete(&mut self, address: &str) -> EngineResult<()> {
        let (children, name) = self.parent_mut(address)?;
        children
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(address.to_string()))
    }

    fn delete_attribute(&mut self, owner: &str, name: &str) -> EngineResult<()> {
        let node = self.node_mut(owner)?;
        node.attrs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::AttributeNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            })
    }

    fn rename(&mut self, from: &str, to: &str) -> EngineResult<()> {
        let from_segs = segments(from)?;
        let to_segs = segments(to)?;
        if from_segs.is_empty() || to_segs.is_empty() || to_segs.starts_with(&from_segs) {
            return Err(EngineError::InvalidAddress(format!("{} -> {}", from, to)));
        }
        if self.get(&from_segs).is_none() {
            return Err(EngineError::NotFound(from.to_string()));
        }
        let to_parent = &to_segs[..to_segs.len() - 1];
        match self.get(to_parent).map(StoredNode::kind) {
            Some(NodeKind::Container) => {}
            Some(_) => return Err(EngineError::NotAContainer(prefix(to_parent))),
            None => return Err(EngineError::NotFound(prefix(to_parent))),
        }
        if self.get(&to_segs).is_some() {
            return Err(EngineError::AlreadyExists(to.to_string()));
        }

        let (children, name) = self.parent_mut(from)?;
        let node = children
            .remove(name)
            .ok_or_else(|| EngineError::NotFound(from.to_string()))?;
        self.insert(to, node)
    }
}
