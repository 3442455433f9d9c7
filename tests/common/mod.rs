//! Shared test harness
//!
//! `RecordingEngine` wraps a `MemoryEngine`, logs every primitive it receives
//! and can be told to fail leaf writes whose address ends with a suffix, the
//! n-th rename it receives, or deletes of addresses ending with a suffix.

#![allow(dead_code)]

use std::cell::RefCell;

use treestore::storage::{
    CompoundData, Dataset, EngineError, EngineResult, Layout, MemoryEngine, NodeKind,
    StorageEngine,
};

#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub inner: MemoryEngine,
    calls: RefCell<Vec<String>>,
    fail_suffix: Option<String>,
    fail_renames: Vec<usize>,
    renames: usize,
    fail_delete_suffix: Option<String>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn over(inner: MemoryEngine) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Fail every leaf write whose address ends with `suffix`.
    pub fn failing_leaf(mut self, suffix: &str) -> Self {
        self.fail_suffix = Some(suffix.to_string());
        self
    }

    /// Fail the listed renames, counted from 1 in arrival order.
    pub fn failing_renames(mut self, nth: &[usize]) -> Self {
        self.fail_renames = nth.to_vec();
        self
    }

    /// Fail every delete whose address ends with `suffix`.
    pub fn failing_delete(mut self, suffix: &str) -> Self {
        self.fail_delete_suffix = Some(suffix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Calls that change engine state
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                ["create_container", "write_", "delete", "rename"]
                    .iter()
                    .any(|p| c.starts_with(p))
            })
            .collect()
    }

    fn log(&self, op: &str, address: &str) {
        self.calls.borrow_mut().push(format!("{} {}", op, address));
    }

    fn check_leaf(&self, address: &str) -> EngineResult<()> {
        match &self.fail_suffix {
            Some(suffix) if address.ends_with(suffix.as_str()) => {
                Err(EngineError::Io(format!("injected failure at {}", address)))
            }
            _ => Ok(()),
        }
    }
}

impl StorageEngine for RecordingEngine {
    fn container_exists(&self, address: &str) -> EngineResult<bool> {
        self.log("container_exists", address);
        self.inner.container_exists(address)
    }

    fn create_container(&mut self, address: &str) -> EngineResult<()> {
        self.log("create_container", address);
        self.inner.create_container(address)
    }

    fn write_leaf(&mut self, address: &str, dataset: &Dataset, compression: u8) -> EngineResult<()> {
        self.log("write_leaf", address);
        self.check_leaf(address)?;
        self.inner.write_leaf(address, dataset, compression)
    }

    fn write_compound_leaf(
        &mut self,
        address: &str,
        compound: &CompoundData,
        compression: u8,
    ) -> EngineResult<()> {
        self.log("write_compound_leaf", address);
        self.check_leaf(address)?;
        self.inner.write_compound_leaf(address, compound, compression)
    }

    fn write_attribute(&mut self, owner: &str, name: &str, dataset: &Dataset) -> EngineResult<()> {
        self.log("write_attribute", &format!("{}@{}", owner, name));
        self.inner.write_attribute(owner, name, dataset)
    }

    fn node_kind(&self, address: &str) -> EngineResult<NodeKind> {
        self.log("node_kind", address);
        self.inner.node_kind(address)
    }

    fn list_children(&self, address: &str) -> EngineResult<Vec<String>> {
        self.log("list_children", address);
        self.inner.list_children(address)
    }

    fn read_leaf(&self, address: &str) -> EngineResult<Dataset> {
        self.log("read_leaf", address);
        self.inner.read_leaf(address)
    }

    fn read_compound_leaf(&self, address: &str) -> EngineResult<CompoundData> {
        self.log("read_compound_leaf", address);
        self.inner.read_compound_leaf(address)
    }

    fn read_attribute(&self, owner: &str, name: &str) -> EngineResult<Dataset> {
        self.log("read_attribute", &format!("{}@{}", owner, name));
        self.inner.read_attribute(owner, name)
    }

    fn list_attributes(&self, owner: &str) -> EngineResult<Vec<String>> {
        self.log("list_attributes", owner);
        self.inner.list_attributes(owner)
    }

    fn layout(&self, address: &str) -> EngineResult<Layout> {
        self.log("layout", address);
        self.inner.layout(address)
    }

    fn delete(&mut self, address: &str) -> EngineResult<()> {
        self.log("delete", address);
        if let Some(suffix) = &self.fail_delete_suffix {
            if address.ends_with(suffix.as_str()) {
                return Err(EngineError::Io(format!("injected failure deleting {}", address)));
            }
        }
        self.inner.delete(address)
    }

    fn delete_attribute(&mut self, owner: &str, name: &str) -> EngineResult<()> {
        self.log("delete_attribute", &format!("{}@{}", owner, name));
        self.inner.delete_attribute(owner, name)
    }

    fn rename(&mut self, from: &str, to: &str) -> EngineResult<()> {
        self.log("rename", &format!("{} -> {}", from, to));
        self.renames += 1;
        if self.fail_renames.contains(&self.renames) {
            return Err(EngineError::Io(format!("injected failure renaming {}", from)));
        }
        self.inner.rename(from, to)
    }
}
