//! Tree reconstruction
//!
//! Mirrors the writer: containers recurse one level per call, leaves decode
//! their declared type, class markers restore the written payload kind.
//! Children come back in the engine's listing order.

use crate::dtype::StorageType;
use crate::observability::{Event, Logger};
use crate::path::{self, ROOT};
use crate::storage::{Dataset, NodeKind, StorageEngine};
use crate::value::{Array, Categorical, Container, DimLabels, Node, Record, Value};

use super::codec::{self, Marker};
use super::errors::{TreeError, TreeResult};
use super::policy::{AttrPolicy, RESERVED_PREFIX};
use super::walker::{attr_marker, dim_label_attr, CLASS_MARKER, STAGING_ROOT};

/// Reconstruct the value stored at `source`.
pub fn read(engine: &dyn StorageEngine, source: &str, policy: &AttrPolicy) -> TreeResult<Value> {
    let source = path::normalize(source);
    let value = read_node(engine, &source, policy)?;
    Logger::emit(Event::ReadComplete, &[("source", source.as_str())]);
    Ok(value)
}

/// Reconstruct one attribute of the node at `owner`.
pub fn read_attribute(engine: &dyn StorageEngine, owner: &str, name: &str) -> TreeResult<Value> {
    let owner = path::normalize(owner);
    let names = attribute_list(engine, &owner)?;
    if name.starts_with(RESERVED_PREFIX) || !names.iter().any(|n| n == name) {
        return Err(TreeError::NotFound {
            path: format!("{}@{}", owner, name),
        });
    }
    attribute(engine, &owner, name, &names)
}

/// Child names of a container, hiding the staging area at the root.
pub(crate) fn visible_children(engine: &dyn StorageEngine, address: &str) -> TreeResult<Vec<String>> {
    let mut names = engine.list_children(address).map_err(TreeError::from_engine)?;
    if address == ROOT {
        let staging = path::basename(STAGING_ROOT);
        names.retain(|n| n != staging);
    }
    Ok(names)
}

fn attribute_list(engine: &dyn StorageEngine, owner: &str) -> TreeResult<Vec<String>> {
    engine.list_attributes(owner).map_err(TreeError::from_engine)
}

fn read_node(engine: &dyn StorageEngine, address: &str, policy: &AttrPolicy) -> TreeResult<Value> {
    let kind = engine.node_kind(address).map_err(TreeError::from_engine)?;
    if kind == NodeKind::Missing {
        return Err(TreeError::NotFound {
            path: address.to_string(),
        });
    }
    let attr_names = attribute_list(engine, address)?;
    let markers = markers(engine, address, CLASS_MARKER, &attr_names)?;

    let node = match kind {
        NodeKind::Container => {
            let mut container = Container::new();
            for name in visible_children(engine, address)? {
                let child = read_node(engine, &path::join(address, &name), policy)?;
                container.children.push((name, child));
            }
            Node::Container(container)
        }
        NodeKind::CompoundLeaf => {
            let compound = engine.read_compound_leaf(address)?;
            let record = record(&compound.columns, &compound.data, compound.rows, &markers)
                .map_err(|reason| unreadable(address, reason))?;
            Node::Record(record)
        }
        _ => {
            let dataset = engine.read_leaf(address)?;
            let labels = dim_labels(engine, address, &attr_names, dataset.dims.len())?;
            from_dataset(&dataset, &markers, labels).map_err(|reason| unreadable(address, reason))?
        }
    };

    let mut value = Value::new(node);
    for name in policy.select(&attr_names) {
        let attr = attribute(engine, address, name, &attr_names)?;
        value.attrs.push((name.to_string(), attr));
    }
    Ok(value)
}

fn attribute(
    engine: &dyn StorageEngine,
    owner: &str,
    name: &str,
    attr_names: &[String],
) -> TreeResult<Value> {
    let dataset = engine.read_attribute(owner, name)?;
    let markers = markers(engine, owner, &attr_marker(name), attr_names)?;
    let node = from_dataset(&dataset, &markers, Vec::new())
        .map_err(|reason| unreadable(&format!("{}@{}", owner, name), reason))?;
    Ok(Value::new(node))
}

/// Class markers stored under `marker_name`, or none.
fn markers(
    engine: &dyn StorageEngine,
    owner: &str,
    marker_name: &str,
    attr_names: &[String],
) -> TreeResult<Vec<String>> {
    if !attr_names.iter().any(|n| n == marker_name) {
        return Ok(Vec::new());
    }
    let dataset = engine.read_attribute(owner, marker_name)?;
    codec::dataset_strings(&dataset)
        .map_err(|reason| unreadable(&format!("{}@{}", owner, marker_name), reason))
}

/// Dimension labels of a leaf of rank `rank`, `None` for unlabelled dimensions.
fn dim_labels(
    engine: &dyn StorageEngine,
    address: &str,
    attr_names: &[String],
    rank: usize,
) -> TreeResult<DimLabels> {
    let mut labels = Vec::with_capacity(rank);
    for i in 0..rank {
        let name = dim_label_attr(i);
        if !attr_names.contains(&name) {
            labels.push(None);
            continue;
        }
        let dataset = engine.read_attribute(address, &name)?;
        let strings = codec::dataset_strings(&dataset)
            .map_err(|reason| unreadable(&format!("{}@{}", address, name), reason))?;
        labels.push(Some(strings));
    }
    Ok(labels)
}

fn unreadable(path: &str, reason: String) -> TreeError {
    TreeError::Unreadable {
        path: path.to_string(),
        reason,
    }
}

fn marker_at(markers: &[String], i: usize) -> Option<Marker> {
    markers.get(i).and_then(|m| Marker::parse(m))
}

/// Rebuild a node from one dataset (a leaf or an attribute).
fn from_dataset(dataset: &Dataset, markers: &[String], labels: DimLabels) -> Result<Node, String> {
    let count = codec::element_count(&dataset.dims);
    match &dataset.dtype {
        StorageType::Null => Ok(Node::Null),
        StorageType::Enum { levels } => {
            let codes = codec::decode_codes(&dataset.data, count)?;
            Ok(Node::Categorical(Categorical::new(codes, levels.clone())))
        }
        StorageType::Compound { columns } => {
            let data = codec::unpack_columns(&dataset.data, columns.len())?;
            Ok(Node::Record(record(columns, &data, count, markers)?))
        }
        StorageType::Container => Err("a container cannot be stored as a dataset".to_string()),
        dtype => {
            let payload = codec::decode(dtype, &dataset.data, count, marker_at(markers, 0))?;
            let array = Array::with_dims(payload, dataset.dims.clone()).with_dim_labels(labels);
            Ok(Node::Array(array))
        }
    }
}

fn record(
    columns: &[(String, StorageType)],
    data: &[Vec<u8>],
    rows: usize,
    markers: &[String],
) -> Result<Record, String> {
    if data.len() != columns.len() {
        return Err(format!(
            "{} column buffers for {} columns",
            data.len(),
            columns.len()
        ));
    }
    let mut record = Record::new();
    for (i, ((name, dtype), bytes)) in columns.iter().zip(data).enumerate() {
        let column = match dtype {
            StorageType::Enum { levels } => {
                Value::categorical(codec::decode_codes(bytes, rows)?, levels.clone())
            }
            dtype => Value::vector(codec::decode(dtype, bytes, rows, marker_at(markers, i))?),
        };
        record.columns.push((name.clone(), column));
    }
    Ok(record)
}
