//! Planned tree walk
//!
//! Validation and commit share one traversal. A `Walker` without an engine is
//! the dry run: it resolves every node and attribute and returns the first
//! error without issuing a single engine call. The commit pass walks the same
//! tree again with the engine attached.

use std::collections::HashSet;

use uuid::Uuid;

use crate::dtype::StorageType;
use crate::observability::{Event, Logger};
use crate::path::{self, ROOT};
use crate::resolve::{self, array_shape, OverrideMap, Resolution, ResolverSettings, Target};
use crate::storage::{CompoundData, Dataset, NodeKind, StorageEngine};
use crate::value::{DimLabels, Node, Record, Value};

use super::codec;
use super::errors::{TreeError, TreeResult};
use super::policy::RESERVED_PREFIX;

/// Container under the root that holds in-flight atomic writes
pub const STAGING_ROOT: &str = "/.treestore-staging";

/// Reserved attribute carrying the class marker of a leaf
pub(crate) const CLASS_MARKER: &str = "treestore.class";

/// Reserved attribute carrying the class marker of attribute `name`
pub(crate) fn attr_marker(name: &str) -> String {
    format!("{}.{}", CLASS_MARKER, name)
}

/// Reserved attribute carrying the labels of dimension `i` of a leaf
pub(crate) fn dim_label_attr(i: usize) -> String {
    format!("{}{}", DIM_LABEL_PREFIX, i)
}

pub(crate) const DIM_LABEL_PREFIX: &str = "treestore.dim.";

/// Options for one top-level write
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub overrides: OverrideMap,
    /// Compression level 0..=9, recorded by the engine
    pub compression: u8,
    /// Stage under a temporary address and rename on success
    pub atomic: bool,
    pub settings: ResolverSettings,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(mut self, overrides: OverrideMap) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_compression(mut self, level: u8) -> Self {
        self.compression = level;
        self
    }

    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    fn check(&self) -> TreeResult<()> {
        if self.compression > 9 {
            return Err(TreeError::InvalidOption(format!(
                "compression level {} is outside 0..=9",
                self.compression
            )));
        }
        Ok(())
    }
}

/// What a write did (or, for `validate`, would do)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Containers created or merged into
    pub containers_written: usize,
    pub leaves_written: usize,
    pub attributes_written: usize,
    /// Paths resolved to `skip`
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
}

/// Dry run of `value` under `key`. Never touches an engine.
pub fn validate(value: &Value, key: &str, options: &WriteOptions) -> TreeResult<WriteReport> {
    options.check()?;
    let root = path::join(ROOT, key);
    let mut walker = Walker::dry_run(options);
    walker.node(value, key, &root, &root)?;
    Ok(walker.report)
}

/// Write `value` at `destination`, all or nothing with respect to validation.
///
/// The whole tree is validated first; an invalid tree leaves the engine
/// untouched. Existing containers are merged, leaves are replaced. With
/// `options.atomic` the tree is staged and renamed onto the destination, which
/// it then replaces entirely.
pub fn write(
    engine: &mut dyn StorageEngine,
    value: &Value,
    destination: &str,
    options: &WriteOptions,
) -> TreeResult<WriteReport> {
    options.check()?;
    let destination = path::normalize(destination);
    if destination == ROOT && !matches!(value.node, Node::Container(_)) {
        return Err(TreeError::UnsupportedValueShape {
            path: destination,
            reason: "only a container can be written at the root".to_string(),
        });
    }
    if options.atomic && destination == ROOT {
        return Err(TreeError::InvalidOption(
            "an atomic write needs a destination below the root".to_string(),
        ));
    }

    let key = path::basename(&destination);
    let mut dry = Walker::dry_run(options);
    if let Err(e) = dry.node(value, key, &destination, &destination) {
        let path = e.path().unwrap_or(&destination).to_string();
        Logger::emit(
            Event::ValidateFailed,
            &[("code", e.code()), ("path", path.as_str())],
        );
        return Err(e);
    }

    let report = if options.atomic {
        write_staged(engine, value, key, &destination, options)?
    } else {
        ensure_parent(engine, &destination)?;
        let mut walker = Walker::commit(engine, options);
        walker.node(value, key, &destination, &destination)?;
        walker.report
    };

    let leaves = report.leaves_written.to_string();
    let containers = report.containers_written.to_string();
    Logger::emit(
        Event::WriteComplete,
        &[
            ("containers", containers.as_str()),
            ("destination", destination.as_str()),
            ("leaves", leaves.as_str()),
        ],
    );
    Ok(report)
}

/// Attach one attribute to an existing node, validating it first.
pub fn write_attribute(
    engine: &mut dyn StorageEngine,
    owner: &str,
    name: &str,
    value: &Value,
    options: &WriteOptions,
) -> TreeResult<WriteReport> {
    options.check()?;
    let owner = path::normalize(owner);
    Walker::dry_run(options).attribute(name, value, &owner, &owner)?;

    if engine.node_kind(&owner).map_err(TreeError::from_engine)? == NodeKind::Missing {
        return Err(TreeError::NotFound { path: owner });
    }
    let mut walker = Walker::commit(engine, options);
    walker.attribute(name, value, &owner, &owner)?;
    Ok(walker.report)
}

fn ensure_parent(engine: &mut dyn StorageEngine, address: &str) -> TreeResult<()> {
    if let Some((parent, _)) = path::split_parent(address) {
        engine
            .create_container(&parent)
            .map_err(TreeError::from_engine)?;
    }
    Ok(())
}

fn write_staged(
    engine: &mut dyn StorageEngine,
    value: &Value,
    key: &str,
    destination: &str,
    options: &WriteOptions,
) -> TreeResult<WriteReport> {
    let staging = path::join(STAGING_ROOT, &Uuid::new_v4().to_string());
    match commit_staged(engine, value, key, destination, &staging, options) {
        Ok(report) => {
            remove_staging_root(engine);
            Ok(report)
        }
        Err(e) => {
            if matches!(engine.node_kind(&staging), Ok(kind) if kind != NodeKind::Missing) {
                let _ = engine.delete(&staging);
            }
            remove_staging_root(engine);
            Logger::emit(
                Event::StagedWriteRollback,
                &[
                    ("code", e.code()),
                    ("destination", destination),
                    ("staging", staging.as_str()),
                ],
            );
            Err(e)
        }
    }
}

fn commit_staged(
    engine: &mut dyn StorageEngine,
    value: &Value,
    key: &str,
    destination: &str,
    staging: &str,
    options: &WriteOptions,
) -> TreeResult<WriteReport> {
    engine
        .create_container(STAGING_ROOT)
        .map_err(TreeError::from_engine)?;
    let mut walker = Walker::commit(engine, options);
    walker.node(value, key, destination, staging)?;
    let mut report = walker.report;

    if engine.node_kind(staging)? == NodeKind::Missing {
        // root resolved to skip
        return Ok(report);
    }
    ensure_parent(engine, destination)?;

    let backup = format!("{}-old", staging);
    let replaced = engine.node_kind(destination)? != NodeKind::Missing;
    if replaced {
        engine.rename(destination, &backup)?;
    }
    if let Err(e) = engine.rename(staging, destination) {
        if replaced {
            if let Err(restore) = engine.rename(&backup, destination) {
                Logger::emit(
                    Event::StagedBackupStranded,
                    &[
                        ("backup", backup.as_str()),
                        ("code", restore.code()),
                        ("destination", destination),
                    ],
                );
                return Err(TreeError::StrandedBackup {
                    path: destination.to_string(),
                    backup,
                });
            }
        }
        return Err(e.into());
    }
    if replaced {
        if let Err(e) = engine.delete(&backup) {
            Logger::emit(
                Event::StagedBackupLeft,
                &[("backup", backup.as_str()), ("code", e.code())],
            );
            report
                .warnings
                .push(format!("{}: previous contents left at {}", destination, backup));
        }
    }
    Ok(report)
}

fn remove_staging_root(engine: &mut dyn StorageEngine) {
    if matches!(engine.list_children(STAGING_ROOT), Ok(children) if children.is_empty()) {
        let _ = engine.delete(STAGING_ROOT);
    }
}

/// One traversal of a value tree.
///
/// `path` is the user-visible tree path used in errors and the report;
/// `address` is where the commit pass writes, which differs while staging.
struct Walker<'a> {
    engine: Option<&'a mut dyn StorageEngine>,
    overrides: &'a OverrideMap,
    settings: &'a ResolverSettings,
    compression: u8,
    report: WriteReport,
}

impl<'a> Walker<'a> {
    fn dry_run(options: &'a WriteOptions) -> Self {
        Self {
            engine: None,
            overrides: &options.overrides,
            settings: &options.settings,
            compression: options.compression,
            report: WriteReport::default(),
        }
    }

    fn commit(engine: &'a mut dyn StorageEngine, options: &'a WriteOptions) -> Self {
        Self {
            engine: Some(engine),
            ..Self::dry_run(options)
        }
    }

    fn resolve(
        &self,
        value: &Value,
        key: &str,
        target: Target,
        path: &str,
    ) -> TreeResult<Resolution> {
        resolve::resolve(value, key, self.overrides, target, self.settings)
            .map_err(|e| TreeError::resolve_at(path, e))
    }

    fn node(&mut self, value: &Value, key: &str, path: &str, address: &str) -> TreeResult<()> {
        let dtype = match self.resolve(value, key, Target::Host, path)? {
            Resolution::Skip => {
                self.report.skipped.push(path.to_string());
                return Ok(());
            }
            Resolution::Store(t) => t,
        };
        check_attribute_names(value, path)?;

        match &value.node {
            Node::Container(container) => {
                check_names(container.children.iter().map(|(n, _)| n.as_str()), path)?;
                self.container(address)?;
                self.attributes(value, path, address)?;
                for (name, child) in &container.children {
                    let child_path = path::join(path, name);
                    let child_address = path::join(address, name);
                    self.node(child, name, &child_path, &child_address)?;
                }
            }
            Node::Record(record) => {
                check_names(record.columns.iter().map(|(n, _)| n.as_str()), path)?;
                let (compound, markers) = encode_record(record, dtype);
                self.compound_leaf(address, &compound, &markers)?;
                self.attributes(value, path, address)?;
            }
            _ => {
                let encoded = self.encode(value, dtype, path)?;
                self.leaf(address, &encoded)?;
                self.attributes(value, path, address)?;
            }
        }
        Ok(())
    }

    fn container(&mut self, address: &str) -> TreeResult<()> {
        self.report.containers_written += 1;
        let Some(engine) = self.engine.as_deref_mut() else {
            return Ok(());
        };
        match engine.node_kind(address).map_err(TreeError::from_engine)? {
            NodeKind::Leaf | NodeKind::CompoundLeaf => engine.delete(address)?,
            NodeKind::Container | NodeKind::Missing => {}
        }
        engine
            .create_container(address)
            .map_err(TreeError::from_engine)
    }

    fn leaf(&mut self, address: &str, encoded: &Encoded) -> TreeResult<()> {
        self.report.leaves_written += 1;
        let Some(engine) = self.engine.as_deref_mut() else {
            return Ok(());
        };
        engine.write_leaf(address, &encoded.dataset, self.compression)?;
        if let Some(markers) = encoded.marker_dataset() {
            engine.write_attribute(address, CLASS_MARKER, &markers)?;
        }
        for (i, labels) in encoded.dim_labels.iter().enumerate() {
            if let Some(labels) = labels {
                let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
                let dataset = codec::text_dataset(&labels);
                engine.write_attribute(address, &dim_label_attr(i), &dataset)?;
            }
        }
        Ok(())
    }

    fn compound_leaf(
        &mut self,
        address: &str,
        compound: &CompoundData,
        markers: &[String],
    ) -> TreeResult<()> {
        self.report.leaves_written += 1;
        let Some(engine) = self.engine.as_deref_mut() else {
            return Ok(());
        };
        engine.write_compound_leaf(address, compound, self.compression)?;
        if let Some(markers) = marker_dataset(markers) {
            engine.write_attribute(address, CLASS_MARKER, &markers)?;
        }
        Ok(())
    }

    fn attributes(&mut self, value: &Value, path: &str, address: &str) -> TreeResult<()> {
        for (name, attr) in &value.attrs {
            self.attribute(name, attr, path, address)?;
        }
        Ok(())
    }

    fn attribute(
        &mut self,
        name: &str,
        value: &Value,
        owner_path: &str,
        owner: &str,
    ) -> TreeResult<()> {
        check_attribute(name, value, owner_path)?;
        let path = format!("{}@{}", owner_path, name);
        let dtype = match self.resolve(value, name, Target::Attribute, &path)? {
            Resolution::Skip => {
                self.report.skipped.push(path);
                return Ok(());
            }
            Resolution::Store(t) => t,
        };
        let encoded = self.encode(value, dtype, &path)?;
        self.report.attributes_written += 1;

        let Some(engine) = self.engine.as_deref_mut() else {
            return Ok(());
        };
        engine.write_attribute(owner, name, &encoded.dataset)?;
        let marker_name = attr_marker(name);
        match encoded.marker_dataset() {
            Some(markers) => engine.write_attribute(owner, &marker_name, &markers)?,
            None => {
                if engine.list_attributes(owner)?.contains(&marker_name) {
                    engine.delete_attribute(owner, &marker_name)?;
                }
            }
        }
        Ok(())
    }

    /// Encode a value stored as one dataset: arrays, categoricals, null, and
    /// records held in attributes.
    fn encode(&mut self, value: &Value, dtype: StorageType, path: &str) -> TreeResult<Encoded> {
        let encoded = match &value.node {
            Node::Array(array) => {
                let extents = array_shape(array).map_err(|e| TreeError::resolve_at(path, e))?;
                if let Some(warning) = extents.warning {
                    self.warn(path, &warning);
                }
                let marker = codec::marker_for(&array.payload, &dtype);
                let data = codec::encode(&array.payload, &dtype);
                Encoded {
                    dataset: Dataset::new(dtype, extents.dims, data),
                    markers: marker.map(|m| vec![m.as_str().to_string()]).unwrap_or_default(),
                    dim_labels: array.dim_labels.clone(),
                }
            }
            Node::Categorical(c) => Encoded {
                dataset: Dataset::new(dtype, vec![c.len()], codec::encode_codes(&c.codes)),
                markers: Vec::new(),
                dim_labels: Vec::new(),
            },
            Node::Null => Encoded {
                dataset: Dataset::new(StorageType::Null, Vec::new(), Vec::new()),
                markers: Vec::new(),
                dim_labels: Vec::new(),
            },
            Node::Record(record) => {
                let (compound, markers) = encode_record(record, dtype);
                Encoded {
                    dataset: Dataset::new(
                        StorageType::Compound {
                            columns: compound.columns,
                        },
                        vec![compound.rows],
                        codec::pack_columns(&compound.data),
                    ),
                    markers,
                    dim_labels: Vec::new(),
                }
            }
            Node::Container(_) => {
                return Err(TreeError::UnsupportedValueShape {
                    path: path.to_string(),
                    reason: "a container cannot be stored as a single dataset".to_string(),
                })
            }
        };
        Ok(encoded)
    }

    fn warn(&mut self, path: &str, warning: &str) {
        if self.engine.is_some() {
            Logger::emit(Event::ScalarFlagIgnored, &[("path", path), ("warning", warning)]);
        }
        self.report.warnings.push(format!("{}: {}", path, warning));
    }
}

/// An encoded dataset plus its class markers: one entry for an array, one
/// per column for a record, "" where no marker is needed
struct Encoded {
    dataset: Dataset,
    markers: Vec<String>,
    dim_labels: DimLabels,
}

impl Encoded {
    fn marker_dataset(&self) -> Option<Dataset> {
        marker_dataset(&self.markers)
    }
}

fn marker_dataset(markers: &[String]) -> Option<Dataset> {
    if markers.iter().all(String::is_empty) {
        return None;
    }
    let markers: Vec<&str> = markers.iter().map(String::as_str).collect();
    Some(codec::text_dataset(&markers))
}

/// Encode the columns kept by the resolved compound type.
fn encode_record(record: &Record, dtype: StorageType) -> (CompoundData, Vec<String>) {
    let columns = match dtype {
        StorageType::Compound { columns } => columns,
        _ => Vec::new(),
    };
    let mut data = Vec::with_capacity(columns.len());
    let mut markers = Vec::with_capacity(columns.len());
    for (name, column_type) in &columns {
        let column = record.columns.iter().find(|(n, _)| n == name).map(|(_, v)| &v.node);
        let (bytes, marker) = match column {
            Some(Node::Array(a)) => (
                codec::encode(&a.payload, column_type),
                codec::marker_for(&a.payload, column_type),
            ),
            Some(Node::Categorical(c)) => (codec::encode_codes(&c.codes), None),
            _ => (Vec::new(), None),
        };
        data.push(bytes);
        markers.push(marker.map_or(String::new(), |m| m.as_str().to_string()));
    }
    let compound = CompoundData {
        rows: record.rows().unwrap_or(0),
        columns,
        data,
    };
    (compound, markers)
}

/// Child and column names: non-empty, no `/`, unique.
fn check_names<'v>(names: impl Iterator<Item = &'v str>, path: &str) -> TreeResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() || name.contains('/') {
            return Err(TreeError::InvalidChildName {
                path: path.to_string(),
                name: name.to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(TreeError::DuplicateChildName {
                path: path.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_attribute_names(value: &Value, path: &str) -> TreeResult<()> {
    let mut seen = HashSet::new();
    for (name, _) in &value.attrs {
        if !seen.insert(name.as_str()) {
            return Err(TreeError::DuplicateChildName {
                path: path.to_string(),
                name: format!("@{}", name),
            });
        }
    }
    Ok(())
}

fn check_attribute(name: &str, value: &Value, owner_path: &str) -> TreeResult<()> {
    let unsupported = |reason: String| TreeError::UnsupportedValueShape {
        path: format!("{}@{}", owner_path, name),
        reason,
    };
    if name.is_empty() {
        return Err(unsupported("attribute name is empty".to_string()));
    }
    if name.starts_with(RESERVED_PREFIX) {
        return Err(unsupported(format!(
            "attribute names starting with '{}' are reserved",
            RESERVED_PREFIX
        )));
    }
    let nested = match &value.node {
        Node::Container(_) => true,
        Node::Record(r) => r
            .columns
            .iter()
            .any(|(_, c)| matches!(c.node, Node::Container(_))),
        _ => false,
    };
    if nested {
        return Err(TreeError::NestedContainerAsAttribute {
            path: owner_path.to_string(),
            name: name.to_string(),
        });
    }
    if !value.attrs.is_empty() {
        return Err(unsupported("attributes cannot carry attributes".to_string()));
    }
    if matches!(&value.node, Node::Array(a) if !a.dim_labels.is_empty()) {
        return Err(unsupported("attributes cannot carry dimension labels".to_string()));
    }
    Ok(())
}
