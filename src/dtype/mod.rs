//! Storage types
//!
//! `StorageType` is the contract between the resolver and the storage engine:
//! the concrete on-disk element type of every leaf and attribute.
//! `TypeSpec` is what a caller writes in an override before it is checked
//! against the data.

mod spec;
mod types;

pub use spec::{TypeSpec, TypeSpecError};
pub use types::{Charset, StorageType, FLOAT_EXACT_BF16, FLOAT_EXACT_F16, FLOAT_EXACT_F32, FLOAT_EXACT_F64};
