//! Dimension extraction

use crate::value::{Array, Node, Shape, Value};

use super::errors::{ResolveError, ResolveResult};

/// Extents of a leaf as written to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extents {
    /// Empty for a true scalar
    pub dims: Vec<usize>,
    /// Set when a scalar flag was dropped because the value has more than one element
    pub warning: Option<String>,
}

impl Extents {
    fn plain(dims: Vec<usize>) -> Self {
        Self {
            dims,
            warning: None,
        }
    }
}

/// Extents of an array leaf.
///
/// A scalar flag on anything but a single element is ignored: the value is
/// written as a flat vector and a warning is returned. Dimension labels must
/// name every dimension of the written extents, one label per element.
pub fn array_shape(array: &Array) -> ResolveResult<Extents> {
    let extents = extents(array)?;
    check_dim_labels(array, &extents.dims)?;
    Ok(extents)
}

fn check_dim_labels(array: &Array, dims: &[usize]) -> ResolveResult<()> {
    if array.dim_labels.is_empty() {
        return Ok(());
    }
    if array.dim_labels.len() != dims.len() {
        return Err(ResolveError::UnsupportedValueShape(format!(
            "{} dimension label sets for {} dimensions",
            array.dim_labels.len(),
            dims.len()
        )));
    }
    for (i, (labels, extent)) in array.dim_labels.iter().zip(dims).enumerate() {
        if let Some(labels) = labels {
            if labels.len() != *extent {
                return Err(ResolveError::UnsupportedValueShape(format!(
                    "dimension {} has {} labels but extent {}",
                    i,
                    labels.len(),
                    extent
                )));
            }
        }
    }
    Ok(())
}

fn extents(array: &Array) -> ResolveResult<Extents> {
    let n = array.len();
    match &array.shape {
        Shape::Scalar if n == 1 => Ok(Extents::plain(Vec::new())),
        Shape::Scalar => Ok(Extents {
            dims: vec![n],
            warning: Some(format!(
                "scalar flag ignored for a value with {} elements",
                n
            )),
        }),
        Shape::Vector => Ok(Extents::plain(vec![n])),
        Shape::Dims(dims) => {
            let product: usize = dims.iter().product();
            if product != n {
                return Err(ResolveError::UnsupportedValueShape(format!(
                    "dims {:?} describe {} elements but the payload has {}",
                    dims, product, n
                )));
            }
            Ok(Extents::plain(dims.clone()))
        }
    }
}

/// Extents of any value written as a single leaf.
///
/// Records report their row count; null is a scalar.
pub fn shape(value: &Value) -> ResolveResult<Extents> {
    match &value.node {
        Node::Null => Ok(Extents::plain(Vec::new())),
        Node::Array(a) => array_shape(a),
        Node::Categorical(c) => Ok(Extents::plain(vec![c.len()])),
        Node::Record(r) => Ok(Extents::plain(vec![r.rows().unwrap_or(0)])),
        Node::Container(_) => Err(ResolveError::UnsupportedValueShape(
            "a container has no extents".to_string(),
        )),
    }
}
