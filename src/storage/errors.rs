//! # Storage Engine Errors

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Storage engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    // Address errors
    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Node already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a container: {0}")]
    NotAContainer(String),

    #[error("Not a leaf: {0}")]
    NotALeaf(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Attribute '{name}' not found on {owner}")]
    AttributeNotFound { owner: String, name: String },

    // Container file errors
    #[error("Corrupt container: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl EngineError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "TREESTORE_ENGINE_NOT_FOUND",
            EngineError::AlreadyExists(_) => "TREESTORE_ENGINE_EXISTS",
            EngineError::NotAContainer(_) => "TREESTORE_ENGINE_NOT_CONTAINER",
            EngineError::NotALeaf(_) => "TREESTORE_ENGINE_NOT_LEAF",
            EngineError::InvalidAddress(_) => "TREESTORE_ENGINE_BAD_ADDRESS",
            EngineError::AttributeNotFound { .. } => "TREESTORE_ENGINE_NO_ATTRIBUTE",
            EngineError::Corrupt(_) => "TREESTORE_ENGINE_CORRUPT",
            EngineError::Io(_) => "TREESTORE_ENGINE_IO",
        }
    }

    pub(crate) fn io(context: impl std::fmt::Display, e: std::io::Error) -> Self {
        EngineError::Io(format!("{}: {}", context, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(EngineError::NotFound("/a".into()).code(), "TREESTORE_ENGINE_NOT_FOUND");
        assert_eq!(EngineError::Corrupt("x".into()).code(), "TREESTORE_ENGINE_CORRUPT");
    }

    #[test]
    fn test_io_context() {
        let e = EngineError::io(
            "open /tmp/x",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert_eq!(e.to_string(), "I/O error: open /tmp/x: boom");
    }
}
