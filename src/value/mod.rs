//! In-memory value model
//!
//! Everything a caller can hand to the writer or get back from the reader:
//! scalars and arrays over a homogeneous payload, categorical values, records
//! (tables of equal-length columns), named containers, and the attributes that
//! any of these may carry.
//!
//! Values are plain data. They are built fresh for each write or read and are
//! never mutated by either pass.

mod node;
mod payload;

pub use node::{Array, Attributes, Categorical, Container, DimLabels, Node, Record, Shape, Value};
pub use payload::{Complex, NumericSummary, Payload, ValueClass};
