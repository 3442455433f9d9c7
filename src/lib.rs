//! treestore - store nested values as a hierarchical container tree
//!
//! A value tree (containers of named children, typed arrays, records,
//! categoricals, nulls, attributes) is mapped onto an abstract storage engine
//! of containers, typed leaves and attributes, and read back. Storage types
//! are chosen per leaf by the resolver; writes are validated in full before
//! the engine is touched.

pub mod cli;
pub mod config;
pub mod dtype;
pub mod handle;
pub mod observability;
pub mod path;
pub mod resolve;
pub mod storage;
pub mod tree;
pub mod value;
