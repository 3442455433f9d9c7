//! Type resolution
//!
//! Pure planning layer used by both passes of the tree walk:
//! - `overrides`: caller-supplied type requests keyed by name, class or global
//! - `resolver`: storage type selection for a value under an override map
//! - `shape`: extents of a leaf, honouring (or ignoring) the scalar flag
//!
//! Nothing in this module performs I/O.

mod errors;
mod overrides;
mod resolver;
mod shape;

pub use errors::{ResolveError, ResolveResult};
pub use overrides::{ClassKey, KeyPattern, MatchSource, Matched, OverrideError, OverrideMap, Target};
pub use resolver::{resolve, Resolution, ResolverSettings};
pub use shape::{array_shape, shape, Extents};
