//! Output handling for the CLI
//!
//! Values print as JSON on stdout:
//! - null is `null`, a scalar is a bare value, a vector is an array
//! - a multi-dimensional array is `{"dims": [..], "values": [..]}`, row-major
//! - missing values and non-finite doubles are `null`
//! - categoricals print their labels, records an object of columns
//! - a value with attributes is `{"value": .., "attrs": {..}}`

use std::io::{self, Write};

use serde_json::{json, Map, Value as Json};

use crate::storage::NodeKind;
use crate::tree::NodeInfo;
use crate::value::{Node, Payload, Shape, Value};

use super::errors::CliResult;

/// Write a JSON document to stdout
pub fn write_json(value: &Json) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Write text lines to stdout
pub fn write_lines<S: AsRef<str>>(lines: &[S]) -> CliResult<()> {
    let mut stdout = io::stdout();
    for line in lines {
        writeln!(stdout, "{}", line.as_ref())?;
    }
    stdout.flush()?;
    Ok(())
}

fn payload_json(payload: &Payload) -> Vec<Json> {
    match payload {
        Payload::Float(v) => v
            .iter()
            .map(|f| if f.is_finite() { json!(f) } else { Json::Null })
            .collect(),
        Payload::Int(v) => v.iter().map(|x| json!(x)).collect(),
        Payload::Bool(v) => v.iter().map(|x| json!(x)).collect(),
        Payload::Text(v) => v.iter().map(|x| json!(x)).collect(),
        Payload::Binary(v) => v.iter().map(|b| json!(b)).collect(),
        Payload::Complex(v) => v.iter().map(|c| json!({"re": c.re, "im": c.im})).collect(),
    }
}

fn node_json(node: &Node) -> Json {
    match node {
        Node::Null => Json::Null,
        Node::Array(array) => {
            let mut values = payload_json(&array.payload);
            match &array.shape {
                Shape::Scalar if values.len() == 1 => values.remove(0),
                Shape::Dims(dims) => json!({"dims": dims, "values": values}),
                _ => Json::Array(values),
            }
        }
        Node::Categorical(c) => Json::Array(
            c.codes
                .iter()
                .map(|code| {
                    code.and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| c.levels.get(i.wrapping_sub(1)))
                        .map_or(Json::Null, |label| json!(label))
                })
                .collect(),
        ),
        Node::Record(record) => {
            let columns: Map<String, Json> = record
                .columns
                .iter()
                .map(|(name, column)| (name.clone(), value_json(column)))
                .collect();
            Json::Object(columns)
        }
        Node::Container(container) => {
            let children: Map<String, Json> = container
                .children
                .iter()
                .map(|(name, child)| (name.clone(), value_json(child)))
                .collect();
            Json::Object(children)
        }
    }
}

/// JSON rendering of a value
pub fn value_json(value: &Value) -> Json {
    let node = node_json(&value.node);
    if value.attrs.is_empty() {
        return node;
    }
    let attrs: Map<String, Json> = value
        .attrs
        .iter()
        .map(|(name, attr)| (name.clone(), value_json(attr)))
        .collect();
    json!({"value": node, "attrs": attrs})
}

/// JSON rendering of node storage details
pub fn info_json(info: &NodeInfo) -> Json {
    let kind = match info.kind {
        NodeKind::Container => "container",
        NodeKind::Leaf => "leaf",
        NodeKind::CompoundLeaf => "compound",
        NodeKind::Missing => "missing",
    };
    json!({
        "kind": kind,
        "type": info.dtype.as_ref().map(|t| t.to_string()),
        "dims": info.dims,
        "compression": info.compression,
        "chunk": info.chunk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Container, Record};

    #[test]
    fn test_scalar_and_missing() {
        assert_eq!(
            value_json(&Value::scalar(Payload::Int(vec![Some(3)]))),
            json!(3)
        );
        assert_eq!(
            value_json(&Value::float(vec![1.5, f64::NAN])),
            json!([1.5, null])
        );
    }

    #[test]
    fn test_categorical_labels() {
        let v = Value::categorical(vec![Some(2), Some(1)], vec!["a".into(), "b".into()]);
        assert_eq!(value_json(&v), json!(["b", "a"]));
    }

    #[test]
    fn test_nested_with_attrs() {
        let v = Value::container(
            Container::new().with(
                "t",
                Value::record(Record::new().with_column("x", Value::int(vec![1, 2]))),
            ),
        )
        .with_attr("units", Value::text(vec!["m"]));
        assert_eq!(
            value_json(&v),
            json!({"value": {"t": {"x": [1, 2]}}, "attrs": {"units": ["m"]}})
        );
    }

    #[test]
    fn test_dims() {
        let v = Value::array(Payload::Int(vec![Some(1); 4]), vec![2, 2]);
        assert_eq!(value_json(&v), json!({"dims": [2, 2], "values": [1, 1, 1, 1]}));
    }
}
