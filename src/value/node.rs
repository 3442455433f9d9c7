//! Value tree nodes
//!
//! A `Value` is a `Node` plus its attribute list. Containers and records keep
//! their members in caller order; nothing here sorts.

use super::payload::{Complex, Payload, ValueClass};

/// Ordered name -> value attribute list.
pub type Attributes = Vec<(String, Value)>;

/// Extent description of an array leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Caller asked for a true scalar (only honoured for one element)
    Scalar,
    /// Flat array; extent is the element count
    Vector,
    /// Row-major extents, rank >= 2
    Dims(Vec<usize>),
}

/// Per-dimension labels: one entry per dimension, `None` where a dimension
/// is unlabelled.
pub type DimLabels = Vec<Option<Vec<String>>>;

/// Homogeneous leaf with a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub payload: Payload,
    pub shape: Shape,
    /// Empty when no dimension is labelled
    pub dim_labels: DimLabels,
}

impl Array {
    pub fn vector(payload: Payload) -> Self {
        Self {
            payload,
            shape: Shape::Vector,
            dim_labels: Vec::new(),
        }
    }

    pub fn scalar(payload: Payload) -> Self {
        Self {
            payload,
            shape: Shape::Scalar,
            dim_labels: Vec::new(),
        }
    }

    /// Array with explicit extents. Rank 0 becomes `Scalar`, rank 1 `Vector`.
    pub fn with_dims(payload: Payload, dims: Vec<usize>) -> Self {
        let shape = match dims.len() {
            0 => Shape::Scalar,
            1 => Shape::Vector,
            _ => Shape::Dims(dims),
        };
        Self {
            payload,
            shape,
            dim_labels: Vec::new(),
        }
    }

    /// Attach dimension labels. A list with no labelled dimension clears them.
    pub fn with_dim_labels(mut self, labels: DimLabels) -> Self {
        self.dim_labels = labelled(labels);
        self
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

fn labelled(labels: DimLabels) -> DimLabels {
    if labels.iter().all(Option::is_none) {
        Vec::new()
    } else {
        labels
    }
}

/// Integer codes (1-based) into an ordered list of labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorical {
    pub codes: Vec<Option<i32>>,
    pub levels: Vec<String>,
}

impl Categorical {
    pub fn new(codes: Vec<Option<i32>>, levels: Vec<String>) -> Self {
        Self { codes, levels }
    }

    /// Builds codes by looking up each label in `levels`.
    ///
    /// Labels absent from `levels` become missing codes.
    pub fn from_labels<S: AsRef<str>>(labels: &[S], levels: Vec<String>) -> Self {
        let codes = labels
            .iter()
            .map(|l| {
                levels
                    .iter()
                    .position(|lv| lv == l.as_ref())
                    .map(|i| i as i32 + 1)
            })
            .collect();
        Self { codes, levels }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Table of equal-length named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub columns: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, column: Value) -> Self {
        self.columns.push((name.into(), column));
        self
    }

    /// Row count taken from the first column; None for zero columns.
    pub fn rows(&self) -> Option<usize> {
        self.columns.first().and_then(|(_, v)| v.len())
    }
}

/// Named grouping node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Container {
    pub children: Vec<(String, Value)>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, child: Value) -> Self {
        self.children.push((name.into(), child));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Shape of a value tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Array(Array),
    Categorical(Categorical),
    Record(Record),
    Container(Container),
}

/// A node plus the attributes attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub node: Node,
    pub attrs: Attributes,
}

impl Value {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            attrs: Vec::new(),
        }
    }

    pub fn null() -> Self {
        Self::new(Node::Null)
    }

    /// Flat array of the given payload.
    pub fn vector(payload: Payload) -> Self {
        Self::new(Node::Array(Array::vector(payload)))
    }

    /// Explicit scalar. Multi-element payloads are written as length-n vectors with a warning.
    pub fn scalar(payload: Payload) -> Self {
        Self::new(Node::Array(Array::scalar(payload)))
    }

    pub fn array(payload: Payload, dims: Vec<usize>) -> Self {
        Self::new(Node::Array(Array::with_dims(payload, dims)))
    }

    pub fn float(values: Vec<f64>) -> Self {
        Self::vector(Payload::Float(values))
    }

    pub fn int(values: Vec<i64>) -> Self {
        Self::vector(Payload::Int(values.into_iter().map(Some).collect()))
    }

    pub fn int_opt(values: Vec<Option<i64>>) -> Self {
        Self::vector(Payload::Int(values))
    }

    pub fn bool(values: Vec<bool>) -> Self {
        Self::vector(Payload::Bool(values.into_iter().map(Some).collect()))
    }

    pub fn bool_opt(values: Vec<Option<bool>>) -> Self {
        Self::vector(Payload::Bool(values))
    }

    pub fn text<S: Into<String>>(values: Vec<S>) -> Self {
        Self::vector(Payload::Text(
            values.into_iter().map(|s| Some(s.into())).collect(),
        ))
    }

    pub fn text_opt(values: Vec<Option<String>>) -> Self {
        Self::vector(Payload::Text(values))
    }

    pub fn binary(bytes: Vec<u8>) -> Self {
        Self::vector(Payload::Binary(bytes))
    }

    pub fn complex(values: Vec<Complex>) -> Self {
        Self::vector(Payload::Complex(values))
    }

    pub fn categorical(codes: Vec<Option<i32>>, levels: Vec<String>) -> Self {
        Self::new(Node::Categorical(Categorical::new(codes, levels)))
    }

    pub fn record(record: Record) -> Self {
        Self::new(Node::Record(record))
    }

    pub fn container(container: Container) -> Self {
        Self::new(Node::Container(container))
    }

    /// Labels the dimensions of an array. Other nodes are returned unchanged.
    pub fn with_dim_labels(mut self, labels: DimLabels) -> Self {
        if let Node::Array(array) = &mut self.node {
            array.dim_labels = labelled(labels);
        }
        self
    }

    /// Attaches (or replaces) an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        self.attrs.retain(|(n, _)| *n != name);
        self.attrs.push((name, value));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Class tag matched by `.class` override keys.
    pub fn class(&self) -> ValueClass {
        match &self.node {
            Node::Null => ValueClass::Null,
            Node::Array(a) => a.payload.class(),
            Node::Categorical(_) => ValueClass::Factor,
            Node::Record(_) => ValueClass::DataFrame,
            Node::Container(_) => ValueClass::List,
        }
    }

    /// Element count of a leaf; None for containers and null.
    pub fn len(&self) -> Option<usize> {
        match &self.node {
            Node::Array(a) => Some(a.len()),
            Node::Categorical(c) => Some(c.len()),
            Node::Record(r) => r.rows(),
            Node::Null | Node::Container(_) => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match &self.node {
            Node::Container(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match &self.node {
            Node::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Structural equality that ignores container child order and attribute order.
    ///
    /// Engines list children and attributes in their own iteration order, so this
    /// is the comparison a write/read round trip can promise.
    pub fn equivalent(&self, other: &Value) -> bool {
        if !same_named_set(&self.attrs, &other.attrs) {
            return false;
        }
        match (&self.node, &other.node) {
            (Node::Container(a), Node::Container(b)) => {
                same_named_set(&a.children, &b.children)
            }
            (Node::Record(a), Node::Record(b)) => {
                a.columns.len() == b.columns.len()
                    && a.columns
                        .iter()
                        .zip(&b.columns)
                        .all(|((na, va), (nb, vb))| na == nb && va.equivalent(vb))
            }
            (a, b) => a == b,
        }
    }
}

fn same_named_set(a: &[(String, Value)], b: &[(String, Value)]) -> bool {
    a.len() == b.len()
        && a.iter().all(|(name, value)| {
            b.iter()
                .find(|(n, _)| n == name)
                .is_some_and(|(_, other)| value.equivalent(other))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_dims_normalises_rank() {
        let p = Payload::Int(vec![Some(1)]);
        assert_eq!(Array::with_dims(p.clone(), vec![]).shape, Shape::Scalar);
        assert_eq!(Array::with_dims(p.clone(), vec![1]).shape, Shape::Vector);
        assert_eq!(
            Array::with_dims(p, vec![1, 1]).shape,
            Shape::Dims(vec![1, 1])
        );
    }

    #[test]
    fn test_dim_labels_without_any_label_are_dropped() {
        let v = Value::int(vec![1, 2]).with_dim_labels(vec![None]);
        assert_eq!(v, Value::int(vec![1, 2]));

        let v = Value::int(vec![1, 2]).with_dim_labels(vec![Some(vec!["a".into(), "b".into()])]);
        let Node::Array(a) = &v.node else {
            panic!("expected an array");
        };
        assert_eq!(a.dim_labels.len(), 1);
        assert_eq!(Value::null().with_dim_labels(vec![Some(vec![])]), Value::null());
    }

    #[test]
    fn test_categorical_from_labels() {
        let c = Categorical::from_labels(&["b", "a", "z"], vec!["a".into(), "b".into()]);
        assert_eq!(c.codes, vec![Some(2), Some(1), None]);
    }

    #[test]
    fn test_with_attr_replaces() {
        let v = Value::int(vec![1])
            .with_attr("units", Value::text(vec!["m"]))
            .with_attr("units", Value::text(vec!["km"]));
        assert_eq!(v.attrs.len(), 1);
        assert_eq!(v.attr("units"), Some(&Value::text(vec!["km"])));
    }

    #[test]
    fn test_equivalent_ignores_child_order() {
        let a = Value::container(
            Container::new()
                .with("x", Value::int(vec![1]))
                .with("y", Value::null()),
        );
        let b = Value::container(
            Container::new()
                .with("y", Value::null())
                .with("x", Value::int(vec![1])),
        );
        assert_ne!(a, b);
        assert!(a.equivalent(&b));
    }

    #[test]
    fn test_equivalent_keeps_column_order() {
        let a = Value::record(
            Record::new()
                .with_column("a", Value::int(vec![1]))
                .with_column("b", Value::int(vec![2])),
        );
        let b = Value::record(
            Record::new()
                .with_column("b", Value::int(vec![2]))
                .with_column("a", Value::int(vec![1])),
        );
        assert!(!a.equivalent(&b));
    }

    #[test]
    fn test_record_rows() {
        assert_eq!(Record::new().rows(), None);
        let r = Record::new().with_column("a", Value::float(vec![1.0, 2.0]));
        assert_eq!(r.rows(), Some(2));
    }
}
