//! Inspection and editing of stored trees
//!
//! Listing, existence checks, per-node storage info, a printable tree view,
//! and the delete/rename edits. Reserved marker attributes and the staging
//! area are never shown.

use crate::dtype::StorageType;
use crate::path::{self, ROOT};
use crate::storage::{Layout, NodeKind, StorageEngine};

use super::errors::{TreeError, TreeResult};
use super::policy::RESERVED_PREFIX;
use super::reader::visible_children;
use super::walker::attr_marker;

/// Storage facts about one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub kind: NodeKind,
    /// None for containers
    pub dtype: Option<StorageType>,
    /// Empty for scalars and containers
    pub dims: Vec<usize>,
    pub compression: u8,
    pub chunk: Option<Vec<usize>>,
}

fn kind_of(engine: &dyn StorageEngine, address: &str) -> TreeResult<NodeKind> {
    engine.node_kind(address).map_err(TreeError::from_engine)
}

fn existing(engine: &dyn StorageEngine, address: &str) -> TreeResult<NodeKind> {
    match kind_of(engine, address)? {
        NodeKind::Missing => Err(TreeError::NotFound {
            path: address.to_string(),
        }),
        kind => Ok(kind),
    }
}

fn container(engine: &dyn StorageEngine, address: &str) -> TreeResult<()> {
    match existing(engine, address)? {
        NodeKind::Container => Ok(()),
        _ => Err(TreeError::NotAContainer {
            path: address.to_string(),
        }),
    }
}

/// Names below the container at `address`.
///
/// Recursive listings are depth-first, parent before children. Without
/// `full_names` nested entries are relative to `address`.
pub fn ls(
    engine: &dyn StorageEngine,
    address: &str,
    recursive: bool,
    full_names: bool,
) -> TreeResult<Vec<String>> {
    let address = path::normalize(address);
    container(engine, &address)?;
    let mut out = Vec::new();
    list_into(engine, &address, "", recursive, full_names, &mut out)?;
    Ok(out)
}

fn list_into(
    engine: &dyn StorageEngine,
    address: &str,
    relative: &str,
    recursive: bool,
    full_names: bool,
    out: &mut Vec<String>,
) -> TreeResult<()> {
    for name in visible_children(engine, address)? {
        let child = path::join(address, &name);
        let child_relative = if relative.is_empty() {
            name
        } else {
            format!("{}/{}", relative, name)
        };
        out.push(if full_names {
            child.clone()
        } else {
            child_relative.clone()
        });
        if recursive && kind_of(engine, &child)? == NodeKind::Container {
            list_into(engine, &child, &child_relative, recursive, full_names, out)?;
        }
    }
    Ok(())
}

pub fn exists(engine: &dyn StorageEngine, address: &str) -> TreeResult<bool> {
    Ok(kind_of(engine, &path::normalize(address))? != NodeKind::Missing)
}

pub fn is_container(engine: &dyn StorageEngine, address: &str) -> TreeResult<bool> {
    Ok(kind_of(engine, &path::normalize(address))? == NodeKind::Container)
}

/// Plain or compound leaf
pub fn is_leaf(engine: &dyn StorageEngine, address: &str) -> TreeResult<bool> {
    Ok(matches!(
        kind_of(engine, &path::normalize(address))?,
        NodeKind::Leaf | NodeKind::CompoundLeaf
    ))
}

/// User attribute names on the node at `address`.
pub fn attr_names(engine: &dyn StorageEngine, address: &str) -> TreeResult<Vec<String>> {
    let address = path::normalize(address);
    existing(engine, &address)?;
    let mut names = engine
        .list_attributes(&address)
        .map_err(TreeError::from_engine)?;
    names.retain(|n| !n.starts_with(RESERVED_PREFIX));
    Ok(names)
}

pub fn exists_attr(engine: &dyn StorageEngine, address: &str, name: &str) -> TreeResult<bool> {
    Ok(attr_names(engine, address)?.iter().any(|n| n == name))
}

pub fn info(engine: &dyn StorageEngine, address: &str) -> TreeResult<NodeInfo> {
    let address = path::normalize(address);
    let kind = existing(engine, &address)?;
    let (dtype, dims) = match kind {
        NodeKind::Container => (None, Vec::new()),
        NodeKind::CompoundLeaf => {
            let compound = engine.read_compound_leaf(&address)?;
            (
                Some(StorageType::Compound {
                    columns: compound.columns,
                }),
                vec![compound.rows],
            )
        }
        _ => {
            let dataset = engine.read_leaf(&address)?;
            (Some(dataset.dtype), dataset.dims)
        }
    };
    let layout = match kind {
        NodeKind::Container => Layout::default(),
        _ => engine.layout(&address)?,
    };
    Ok(NodeInfo {
        kind,
        dtype,
        dims,
        compression: layout.compression,
        chunk: layout.chunk,
    })
}

/// `<type scalar>` or `<type × d1 × d2>`
fn describe(dtype: &StorageType, dims: &[usize]) -> String {
    if dims.is_empty() {
        format!("<{} scalar>", dtype.type_name())
    } else {
        let extents: Vec<String> = dims.iter().map(usize::to_string).collect();
        format!("<{} × {}>", dtype.type_name(), extents.join(" × "))
    }
}

/// Printable tree below `address`.
///
/// ```text
/// /
/// ├── grid <float64 × 2 × 3>
/// │   └── @units <ascii × 1>
/// └── runs/
///     └── table <compound × 4>
///         ├── $id <uint8 × 4>
///         └── $label <enum × 4>
/// ```
pub fn render(engine: &dyn StorageEngine, address: &str, show_attrs: bool) -> TreeResult<String> {
    let address = path::normalize(address);
    let kind = existing(engine, &address)?;
    let mut out = String::new();
    let label = match kind {
        NodeKind::Container if address == ROOT => ROOT.to_string(),
        _ => address.clone(),
    };
    out.push_str(&heading(engine, &address, &label, kind)?);
    out.push('\n');
    render_items(engine, &address, kind, show_attrs, "", &mut out)?;
    Ok(out)
}

fn heading(
    engine: &dyn StorageEngine,
    address: &str,
    label: &str,
    kind: NodeKind,
) -> TreeResult<String> {
    Ok(match kind {
        NodeKind::Container if label.ends_with('/') => label.to_string(),
        NodeKind::Container => format!("{}/", label),
        NodeKind::CompoundLeaf => {
            let compound = engine.read_compound_leaf(address)?;
            format!("{} <compound × {}>", label, compound.rows)
        }
        _ => {
            let dataset = engine.read_leaf(address)?;
            format!("{} {}", label, describe(&dataset.dtype, &dataset.dims))
        }
    })
}

enum Item {
    Line(String),
    Child(String, NodeKind),
}

fn render_items(
    engine: &dyn StorageEngine,
    address: &str,
    kind: NodeKind,
    show_attrs: bool,
    prefix: &str,
    out: &mut String,
) -> TreeResult<()> {
    let mut items = Vec::new();
    if show_attrs {
        for name in attr_names(engine, address)? {
            let dataset = engine.read_attribute(address, &name)?;
            items.push(Item::Line(format!(
                "@{} {}",
                name,
                describe(&dataset.dtype, &dataset.dims)
            )));
        }
    }
    match kind {
        NodeKind::CompoundLeaf => {
            let compound = engine.read_compound_leaf(address)?;
            for (name, dtype) in &compound.columns {
                items.push(Item::Line(format!(
                    "${} {}",
                    name,
                    describe(dtype, &[compound.rows])
                )));
            }
        }
        NodeKind::Container => {
            for name in visible_children(engine, address)? {
                let child = path::join(address, &name);
                let child_kind = kind_of(engine, &child)?;
                items.push(Item::Child(name, child_kind));
            }
        }
        _ => {}
    }

    let last = items.len().saturating_sub(1);
    for (i, item) in items.into_iter().enumerate() {
        let (branch, continuation) = if i == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(prefix);
        out.push_str(branch);
        match item {
            Item::Line(line) => {
                out.push_str(&line);
                out.push('\n');
            }
            Item::Child(name, child_kind) => {
                let child = path::join(address, &name);
                out.push_str(&heading(engine, &child, &name, child_kind)?);
                out.push('\n');
                let child_prefix = format!("{}{}", prefix, continuation);
                render_items(engine, &child, child_kind, show_attrs, &child_prefix, out)?;
            }
        }
    }
    Ok(())
}

/// Remove the node at `address` and everything below it.
pub fn delete(engine: &mut dyn StorageEngine, address: &str) -> TreeResult<()> {
    let address = path::normalize(address);
    if address == ROOT {
        return Err(TreeError::InvalidOption(
            "the root cannot be deleted".to_string(),
        ));
    }
    existing(engine, &address)?;
    engine.delete(&address).map_err(TreeError::from_engine)
}

/// Remove a user attribute and its class marker.
pub fn delete_attr(engine: &mut dyn StorageEngine, address: &str, name: &str) -> TreeResult<()> {
    let address = path::normalize(address);
    if !exists_attr(engine, &address, name)? {
        return Err(TreeError::NotFound {
            path: format!("{}@{}", address, name),
        });
    }
    engine.delete_attribute(&address, name)?;
    let marker = attr_marker(name);
    if engine.list_attributes(&address)?.contains(&marker) {
        engine.delete_attribute(&address, &marker)?;
    }
    Ok(())
}

/// Move a node, creating the parent containers of `to`.
pub fn rename(engine: &mut dyn StorageEngine, from: &str, to: &str) -> TreeResult<()> {
    let from = path::normalize(from);
    let to = path::normalize(to);
    existing(engine, &from)?;
    if let Some((parent, _)) = path::split_parent(&to) {
        engine
            .create_container(&parent)
            .map_err(TreeError::from_engine)?;
    }
    engine.rename(&from, &to).map_err(TreeError::from_engine)
}
