//! # Tree Errors
//!
//! Error codes:
//! - TREESTORE_UNSUPPORTED_SHAPE (validation)
//! - TREESTORE_RANGE_OVERFLOW (validation)
//! - TREESTORE_MISSING_REQUIRES_FLOAT (validation)
//! - TREESTORE_MISSING_IN_FIXED_TEXT (validation)
//! - TREESTORE_MISSING_CATEGORICAL (validation)
//! - TREESTORE_INVALID_CATEGORICAL (validation)
//! - TREESTORE_EMPTY_RECORD (validation)
//! - TREESTORE_RAGGED_RECORD (validation)
//! - TREESTORE_DUPLICATE_CHILD (validation)
//! - TREESTORE_INVALID_CHILD_NAME (validation)
//! - TREESTORE_NESTED_CONTAINER_ATTRIBUTE (validation)
//! - TREESTORE_INCOMPATIBLE_OVERRIDE (validation)
//! - TREESTORE_INVALID_OPTION (validation)
//! - TREESTORE_MIXED_ATTR_POLICY
//! - TREESTORE_HANDLE_CLOSED
//! - TREESTORE_NOT_FOUND
//! - TREESTORE_NOT_A_CONTAINER
//! - TREESTORE_UNREADABLE
//! - TREESTORE_STORAGE_ENGINE

use thiserror::Error;

use crate::resolve::ResolveError;
use crate::storage::EngineError;

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Tree write, read and navigation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    // Validation: the value itself
    #[error("{path}: unsupported value shape: {reason}")]
    UnsupportedValueShape { path: String, reason: String },

    #[error("{path}: {dtype} cannot hold values in [{min}, {max}]")]
    RangeOverflow {
        path: String,
        dtype: String,
        min: f64,
        max: f64,
    },

    #[error("{path}: {dtype} cannot hold missing values; request a float type")]
    MissingRequiresFloat { path: String, dtype: String },

    #[error("{path}: fixed-length text cannot hold missing values; request variable-length text")]
    MissingInFixedText { path: String },

    #[error("{path}: categorical value has a missing code")]
    UnrepresentableMissingCategorical { path: String },

    #[error("{path}: invalid categorical value: {reason}")]
    InvalidCategorical { path: String, reason: String },

    #[error("{path}: record has no columns to write")]
    EmptyRecord { path: String },

    #[error("{path}: record column '{column}' has {found} rows, expected {expected}")]
    RaggedRecord {
        path: String,
        column: String,
        expected: usize,
        found: usize,
    },

    // Validation: tree structure
    #[error("{path}: duplicate child name '{name}'")]
    DuplicateChildName { path: String, name: String },

    #[error("{path}: invalid child name '{name}'")]
    InvalidChildName { path: String, name: String },

    #[error("{path}: attribute '{name}' holds a container")]
    NestedContainerAsAttribute { path: String, name: String },

    // Validation: caller options
    #[error("{path}: type request '{spec}' does not apply to a {class} value")]
    IncompatibleOverride {
        path: String,
        spec: String,
        class: String,
    },

    #[error("Invalid write option: {0}")]
    InvalidOption(String),

    // Read side
    #[error("Attribute policy mixes included and excluded names")]
    MixedAttrPolicy,

    #[error("{path}: not found")]
    NotFound { path: String },

    #[error("{path}: not a container")]
    NotAContainer { path: String },

    #[error("{path}: cannot reconstruct value: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("{path}: staged write failed and the previous contents remain at {backup}")]
    StrandedBackup { path: String, backup: String },

    // Handle
    #[error("Handle is closed")]
    HandleClosed,

    #[error("Storage engine error: {0}")]
    StorageEngine(#[from] EngineError),
}

impl TreeError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TreeError::UnsupportedValueShape { .. } => "TREESTORE_UNSUPPORTED_SHAPE",
            TreeError::RangeOverflow { .. } => "TREESTORE_RANGE_OVERFLOW",
            TreeError::MissingRequiresFloat { .. } => "TREESTORE_MISSING_REQUIRES_FLOAT",
            TreeError::MissingInFixedText { .. } => "TREESTORE_MISSING_IN_FIXED_TEXT",
            TreeError::UnrepresentableMissingCategorical { .. } => {
                "TREESTORE_MISSING_CATEGORICAL"
            }
            TreeError::InvalidCategorical { .. } => "TREESTORE_INVALID_CATEGORICAL",
            TreeError::EmptyRecord { .. } => "TREESTORE_EMPTY_RECORD",
            TreeError::RaggedRecord { .. } => "TREESTORE_RAGGED_RECORD",
            TreeError::DuplicateChildName { .. } => "TREESTORE_DUPLICATE_CHILD",
            TreeError::InvalidChildName { .. } => "TREESTORE_INVALID_CHILD_NAME",
            TreeError::NestedContainerAsAttribute { .. } => {
                "TREESTORE_NESTED_CONTAINER_ATTRIBUTE"
            }
            TreeError::IncompatibleOverride { .. } => "TREESTORE_INCOMPATIBLE_OVERRIDE",
            TreeError::InvalidOption(_) => "TREESTORE_INVALID_OPTION",
            TreeError::MixedAttrPolicy => "TREESTORE_MIXED_ATTR_POLICY",
            TreeError::NotFound { .. } => "TREESTORE_NOT_FOUND",
            TreeError::NotAContainer { .. } => "TREESTORE_NOT_A_CONTAINER",
            TreeError::Unreadable { .. } => "TREESTORE_UNREADABLE",
            TreeError::StrandedBackup { .. } => "TREESTORE_STRANDED_BACKUP",
            TreeError::HandleClosed => "TREESTORE_HANDLE_CLOSED",
            TreeError::StorageEngine(_) => "TREESTORE_STORAGE_ENGINE",
        }
    }

    /// Whether this error is raised by the dry run, before any mutation
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            TreeError::MixedAttrPolicy
                | TreeError::NotFound { .. }
                | TreeError::NotAContainer { .. }
                | TreeError::Unreadable { .. }
                | TreeError::StrandedBackup { .. }
                | TreeError::HandleClosed
                | TreeError::StorageEngine(_)
        )
    }

    /// Tree path the error refers to, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            TreeError::UnsupportedValueShape { path, .. }
            | TreeError::RangeOverflow { path, .. }
            | TreeError::MissingRequiresFloat { path, .. }
            | TreeError::MissingInFixedText { path }
            | TreeError::UnrepresentableMissingCategorical { path }
            | TreeError::InvalidCategorical { path, .. }
            | TreeError::EmptyRecord { path }
            | TreeError::RaggedRecord { path, .. }
            | TreeError::DuplicateChildName { path, .. }
            | TreeError::InvalidChildName { path, .. }
            | TreeError::NestedContainerAsAttribute { path, .. }
            | TreeError::IncompatibleOverride { path, .. }
            | TreeError::NotFound { path }
            | TreeError::NotAContainer { path }
            | TreeError::Unreadable { path, .. }
            | TreeError::StrandedBackup { path, .. } => Some(path),
            TreeError::InvalidOption(_)
            | TreeError::MixedAttrPolicy
            | TreeError::HandleClosed
            | TreeError::StorageEngine(_) => None,
        }
    }

    /// Attach a tree path to a resolver error
    pub(crate) fn resolve_at(path: &str, e: ResolveError) -> Self {
        let path = path.to_string();
        match e {
            ResolveError::UnsupportedValueShape(reason) => {
                TreeError::UnsupportedValueShape { path, reason }
            }
            ResolveError::RangeOverflow { dtype, min, max } => TreeError::RangeOverflow {
                path,
                dtype,
                min,
                max,
            },
            ResolveError::MissingRequiresFloat { dtype } => {
                TreeError::MissingRequiresFloat { path, dtype }
            }
            ResolveError::MissingInFixedText => TreeError::MissingInFixedText { path },
            ResolveError::UnrepresentableMissingCategorical => {
                TreeError::UnrepresentableMissingCategorical { path }
            }
            ResolveError::InvalidCategorical(reason) => {
                TreeError::InvalidCategorical { path, reason }
            }
            ResolveError::EmptyRecord => TreeError::EmptyRecord { path },
            ResolveError::RaggedRecord {
                column,
                expected,
                found,
            } => TreeError::RaggedRecord {
                path,
                column,
                expected,
                found,
            },
            ResolveError::IncompatibleOverride { spec, class } => {
                TreeError::IncompatibleOverride { path, spec, class }
            }
        }
    }

    /// Engine errors about a specific address become tree errors at that path
    pub(crate) fn from_engine(e: EngineError) -> Self {
        match e {
            EngineError::NotFound(path) => TreeError::NotFound { path },
            EngineError::NotAContainer(path) => TreeError::NotAContainer { path },
            other => TreeError::StorageEngine(other),
        }
    }
}
