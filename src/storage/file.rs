//! # File-Backed Engine
//!
//! Holds the tree in a `MemoryEngine` and rewrites the whole container file
//! after every mutating primitive:
//!
//! 1. Encode and seal the image
//! 2. Write `<file>.tmp` and fsync it
//! 3. Rename over `<file>`
//! 4. fsync the parent directory
//!
//! A crash leaves either the old image or the new one on disk. When persisting
//! fails the in-memory tree is rolled back so memory and disk never disagree.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::engine::{CompoundData, Dataset, Layout, NodeKind, StorageEngine};
use super::errors::{EngineError, EngineResult};
use super::format;
use super::memory::MemoryEngine;
use crate::observability::{Event, Logger};

/// Engine persisting to a single container file
#[derive(Debug)]
pub struct FileEngine {
    path: PathBuf,
    created_at: DateTime<Utc>,
    tree: MemoryEngine,
}

impl FileEngine {
    /// Create a new, empty container file. Fails if the file exists.
    pub fn create(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            return Err(EngineError::AlreadyExists(path.display().to_string()));
        }
        let engine = Self {
            path,
            created_at: Utc::now(),
            tree: MemoryEngine::new(),
        };
        engine.persist()?;
        Ok(engine)
    }

    /// Open an existing container file, verifying its checksum.
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        let image = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::NotFound(path.display().to_string())
            } else {
                EngineError::io(format!("read {}", path.display()), e)
            }
        })?;
        let (created_at, root) = format::decode(&image)?;
        Ok(Self {
            path,
            created_at,
            tree: MemoryEngine::from_root(root),
        })
    }

    /// Open the file if it exists, otherwise create it.
    pub fn open_or_create(path: impl AsRef<Path>) -> EngineResult<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn persist(&self) -> EngineResult<()> {
        let image = format::encode(&self.created_at, self.tree.root());
        let tmp = self.temp_path();

        let mut file = File::create(&tmp)
            .map_err(|e| EngineError::io(format!("create {}", tmp.display()), e))?;
        file.write_all(&image)
            .map_err(|e| EngineError::io(format!("write {}", tmp.display()), e))?;
        file.sync_all()
            .map_err(|e| EngineError::io(format!("fsync {}", tmp.display()), e))?;
        drop(file);

        fs::rename(&tmp, &self.path)
            .map_err(|e| EngineError::io(format!("rename onto {}", self.path.display()), e))?;
        fsync_dir(self.path.parent())?;

        let bytes = image.len().to_string();
        let file = self.path.display().to_string();
        Logger::emit(
            Event::ContainerPersisted,
            &[("bytes", bytes.as_str()), ("file", file.as_str())],
        );
        Ok(())
    }

    /// Apply a mutation and persist it, undoing the mutation if persisting fails.
    fn mutate(
        &mut self,
        op: impl FnOnce(&mut MemoryEngine) -> EngineResult<()>,
    ) -> EngineResult<()> {
        let before = self.tree.clone();
        op(&mut self.tree)?;
        if let Err(e) = self.persist() {
            self.tree = before;
            return Err(e);
        }
        Ok(())
    }
}

/// fsync a directory so a rename inside it is durable.
fn fsync_dir(dir: Option<&Path>) -> EngineResult<()> {
    let dir = match dir {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let handle = OpenOptions::new()
        .read(true)
        .open(dir)
        .map_err(|e| EngineError::io(format!("open directory {}", dir.display()), e))?;
    handle
        .sync_all()
        .map_err(|e| EngineError::io(format!("fsync directory {}", dir.display()), e))
}

impl StorageEngine for FileEngine {
    fn container_exists(&self, address: &str) -> EngineResult<bool> {
        self.tree.container_exists(address)
    }

    fn create_container(&mut self, address: &str) -> EngineResult<()> {
        if self.tree.container_exists(address)? {
            return Ok(());
        }
        self.mutate(|t| t.create_container(address))
    }

    fn write_leaf(&mut self, address: &str, dataset: &Dataset, compression: u8) -> EngineResult<()> {
        self.mutate(|t| t.write_leaf(address, dataset, compression))
    }

    fn write_compound_leaf(
        &mut self,
        address: &str,
        compound: &CompoundData,
        compression: u8,
    ) -> EngineResult<()> {
        self.mutate(|t| t.write_compound_leaf(address, compound, compression))
    }

    fn write_attribute(&mut self, owner: &str, name: &str, dataset: &Dataset) -> EngineResult<()> {
        self.mutate(|t| t.write_attribute(owner, name, dataset))
    }

    fn node_kind(&self, address: &str) -> EngineResult<NodeKind> {
        self.tree.node_kind(address)
    }

    fn list_children(&self, address: &str) -> EngineResult<Vec<String>> {
        self.tree.list_children(address)
    }

    fn read_leaf(&self, address: &str) -> EngineResult<Dataset> {
        self.tree.read_leaf(address)
    }

    fn read_compound_leaf(&self, address: &str) -> EngineResult<CompoundData> {
        self.tree.read_compound_leaf(address)
    }

    fn read_attribute(&self, owner: &str, name: &str) -> EngineResult<Dataset> {
        self.tree.read_attribute(owner, name)
    }

    fn list_attributes(&self, owner: &str) -> EngineResult<Vec<String>> {
        self.tree.list_attributes(owner)
    }

    fn layout(&self, address: &str) -> EngineResult<Layout> {
        self.tree.layout(address)
    }

    fn delete(&mut self, address: &str) -> EngineResult<()> {
        self.mutate(|t| t.delete(address))
    }

    fn delete_attribute(&mut self, owner: &str, name: &str) -> EngineResult<()> {
        self.mutate(|t| t.delete_attribute(owner, name))
    }

    fn rename(&mut self, from: &str, to: &str) -> EngineResult<()> {
        self.mutate(|t| t.rename(from, to))
    }
}
