use eframe::egui::{Vec2, vec2};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DatasetError;
use crate::model::{Dataset, EdgeSpec, NodeSpec};

#[derive(Clone, Copy, Debug, Deserialize)]
struct RawPoint {
    x: f32,
    y: f32,
}

/// Node attributes, found either on the node object itself or under its
/// `data` sub-record.
#[derive(Clone, Debug, Default, Deserialize)]
struct RawNodeFields {
    #[serde(default)]
    x: Option<f32>,
    #[serde(default)]
    y: Option<f32>,
    #[serde(default, alias = "size")]
    radius: Option<f32>,
    #[serde(default)]
    pinned: Option<RawPoint>,
    #[serde(default)]
    fx: Option<f32>,
    #[serde(default)]
    fy: Option<f32>,
    #[serde(default, alias = "name")]
    label: Option<String>,
    #[serde(default, alias = "genre", alias = "cluster")]
    group: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawEdge {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, alias = "from")]
    source: Option<Value>,
    #[serde(default, alias = "to")]
    target: Option<Value>,
    #[serde(default)]
    weight: Option<f32>,
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn point(x: Option<f32>, y: Option<f32>) -> Option<Vec2> {
    match (x, y) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(vec2(x, y)),
        _ => None,
    }
}

fn normalize_node(index: usize, object: &Map<String, Value>) -> Result<NodeSpec, DatasetError> {
    let nested = object.get("data").and_then(Value::as_object);
    let id = object
        .get("id")
        .or_else(|| nested.and_then(|data| data.get("id")))
        .and_then(id_string)
        .ok_or(DatasetError::MissingNodeId { index })?;

    let fields_source = nested.unwrap_or(object);
    let fields = RawNodeFields::deserialize(Value::Object(fields_source.clone()))?;

    let pinned = fields
        .pinned
        .and_then(|pin| point(Some(pin.x), Some(pin.y)))
        .or_else(|| point(fields.fx, fields.fy));

    let mut node = NodeSpec::new(id);
    node.label = fields.label;
    node.group = fields.group.filter(|group| !group.is_empty());
    node.position = point(fields.x, fields.y);
    node.pinned = pinned;
    if let Some(radius) = fields.radius {
        node.radius = radius;
    }
    Ok(node)
}

fn normalize_edge(index: usize, value: &Value) -> Result<EdgeSpec, DatasetError> {
    let raw = RawEdge::deserialize(value)?;
    let source = raw
        .source
        .as_ref()
        .and_then(id_string)
        .ok_or(DatasetError::MissingEdgeEndpoint {
            index,
            field: "source",
        })?;
    let target = raw
        .target
        .as_ref()
        .and_then(id_string)
        .ok_or(DatasetError::MissingEdgeEndpoint {
            index,
            field: "target",
        })?;

    let mut edge = EdgeSpec::new(source, target);
    if let Some(id) = raw.id.as_ref().and_then(id_string) {
        edge.id = id;
    }
    if let Some(weight) = raw.weight {
        edge.weight = weight;
    }
    Ok(edge)
}

/// Parses a dataset document into canonical node and edge records. Both the
/// flat node shape and the one nesting attributes under `data` are accepted;
/// downstream code only ever sees [`NodeSpec`].
pub fn parse_dataset(raw: &str) -> Result<Dataset, DatasetError> {
    let parsed: Value = serde_json::from_str(raw)?;
    let object = parsed.as_object().ok_or(DatasetError::MissingNodes)?;
    let raw_nodes = object
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or(DatasetError::MissingNodes)?;

    let mut nodes = Vec::with_capacity(raw_nodes.len());
    for (index, value) in raw_nodes.iter().enumerate() {
        let node_object = value
            .as_object()
            .ok_or(DatasetError::MissingNodeId { index })?;
        nodes.push(normalize_node(index, node_object)?);
    }

    let mut edges = Vec::new();
    if let Some(raw_edges) = object
        .get("edges")
        .or_else(|| object.get("links"))
        .and_then(Value::as_array)
    {
        edges.reserve(raw_edges.len());
        for (index, value) in raw_edges.iter().enumerate() {
            edges.push(normalize_edge(index, value)?);
        }
    }

    Ok(Dataset { nodes, edges })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_and_nested_nodes_normalize_to_one_shape() {
        let dataset = parse_dataset(
            r#"{
                "nodes": [
                    {"id": "a", "x": 10, "y": -4, "radius": 9, "group": "house"},
                    {"id": "b", "data": {"x": 1, "y": 2, "size": 4, "genre": "techno", "name": "B"}},
                    {"data": {"id": 7, "pinned": {"x": 3, "y": 4}}}
                ],
                "edges": []
            }"#,
        )
        .expect("dataset parses");

        let a = &dataset.nodes[0];
        assert_eq!(a.id, "a");
        assert_eq!(a.position, Some(vec2(10.0, -4.0)));
        assert_eq!(a.radius, 9.0);
        assert_eq!(a.group.as_deref(), Some("house"));

        let b = &dataset.nodes[1];
        assert_eq!(b.position, Some(vec2(1.0, 2.0)));
        assert_eq!(b.radius, 4.0);
        assert_eq!(b.group.as_deref(), Some("techno"));
        assert_eq!(b.label.as_deref(), Some("B"));

        let c = &dataset.nodes[2];
        assert_eq!(c.id, "7");
        assert_eq!(c.position, None);
        assert_eq!(c.pinned, Some(vec2(3.0, 4.0)));
        assert_eq!(c.radius, NodeSpec::DEFAULT_RADIUS);
    }

    #[test]
    fn edges_accept_from_to_aliases_and_default_weight() {
        let dataset = parse_dataset(
            r#"{
                "nodes": [{"id": "a"}, {"id": "b"}],
                "links": [{"from": "a", "to": "b"}, {"id": "e2", "source": "b", "target": "a", "weight": 2.5}]
            }"#,
        )
        .expect("dataset parses");

        assert_eq!(dataset.edges.len(), 2);
        assert_eq!(dataset.edges[0].id, "a->b");
        assert_eq!(dataset.edges[0].weight, 1.0);
        assert_eq!(dataset.edges[1].id, "e2");
        assert_eq!(dataset.edges[1].weight, 2.5);
    }

    #[test]
    fn partial_position_is_treated_as_unpositioned() {
        let dataset =
            parse_dataset(r#"{"nodes": [{"id": "a", "x": 5}]}"#).expect("dataset parses");
        assert_eq!(dataset.nodes[0].position, None);
        assert!(dataset.edges.is_empty());
    }

    #[test]
    fn structural_problems_are_reported() {
        assert!(matches!(
            parse_dataset("[]"),
            Err(DatasetError::MissingNodes)
        ));
        assert!(matches!(
            parse_dataset(r#"{"nodes": [{"x": 1}]}"#),
            Err(DatasetError::MissingNodeId { index: 0 })
        ));
        assert!(matches!(
            parse_dataset(r#"{"nodes": [{"id": "a"}], "edges": [{"source": "a"}]}"#),
            Err(DatasetError::MissingEdgeEndpoint {
                index: 0,
                field: "target"
            })
        ));
        assert!(matches!(parse_dataset("{"), Err(DatasetError::Json(_))));
    }
}
