//! Tree serialization
//!
//! Turns a nested `Value` into engine primitives and back.
//!
//! # Write
//!
//! `write` walks the tree twice with the same per-node logic. The first pass
//! has no engine and only resolves; any failure aborts before a single engine
//! call. The second pass commits depth-first, parent before children, in the
//! caller's child order. Resolution is pure, so both passes agree.
//!
//! A failure during commit stops the walk and leaves whatever the engine
//! already holds. `WriteOptions::atomic` stages the tree under
//! `/.treestore-staging/<uuid>` and renames it onto the destination only when
//! every primitive succeeded.
//!
//! # Read
//!
//! `read` rebuilds containers one level per call, leaves from their declared
//! types, and attaches attributes chosen by an `AttrPolicy`. Child order is the
//! engine's listing order, not the write order.
//!
//! # Markers
//!
//! Attributes under the `treestore.` prefix are structural. They record the
//! payload kind when it differs from the storage type's natural one (an
//! integer-valued double stored as `uint8`, say) and are never surfaced.

mod codec;
mod errors;
mod inspect;
mod policy;
mod reader;
mod walker;

pub use errors::{TreeError, TreeResult};
pub use inspect::{
    attr_names, delete, delete_attr, exists, exists_attr, info, is_container, is_leaf, ls,
    rename, render, NodeInfo,
};
pub use policy::{AttrPolicy, RESERVED_PREFIX};
pub use reader::{read, read_attribute};
pub use walker::{validate, write, write_attribute, WriteOptions, WriteReport, STAGING_ROOT};
