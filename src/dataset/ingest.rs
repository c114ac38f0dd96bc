use std::collections::HashMap;

use eframe::egui::Vec2;
use log::{debug, warn};

use crate::diagnostics::{Diagnostics, LoadSummary};
use crate::error::{DropCounters, DropReason};
use crate::model::{Dataset, Edge, Graph, Node, NodeSpec};

/// A dataset resolved against itself: every accepted edge points at nodes
/// that exist, by index.
#[derive(Debug, Default)]
pub struct Ingested {
    pub graph: Graph,
    pub initial_positions: Vec<Option<Vec2>>,
    pub pins: Vec<Option<Vec2>>,
    pub drops: DropCounters,
}

impl Ingested {
    pub fn summary(&self, epoch: u64, input_nodes: usize, input_edges: usize) -> LoadSummary {
        LoadSummary {
            epoch,
            input_nodes,
            input_edges,
            accepted_nodes: self.graph.node_count(),
            accepted_edges: self.graph.edge_count(),
            drops: self.drops,
        }
    }
}

fn sanitized_radius(radius: f32) -> f32 {
    if radius.is_finite() && radius > 0.0 {
        radius
    } else {
        NodeSpec::DEFAULT_RADIUS
    }
}

fn finite(position: Option<Vec2>) -> Option<Vec2> {
    position.filter(|position| position.x.is_finite() && position.y.is_finite())
}

fn drop_entity(
    drops: &mut DropCounters,
    diagnostics: &mut Option<&mut dyn Diagnostics>,
    reason: DropReason,
    id: &str,
) {
    drops.record(reason);
    if let Some(diagnostics) = diagnostics.as_deref_mut() {
        diagnostics.entity_dropped(reason, id);
    }
}

/// Builds the canonical graph. Problems with individual entities drop that
/// entity and bump a counter; ingestion itself cannot fail.
pub fn ingest(dataset: Dataset, mut diagnostics: Option<&mut dyn Diagnostics>) -> Ingested {
    let mut drops = DropCounters::default();
    let mut index_by_id = HashMap::with_capacity(dataset.nodes.len());
    let mut group_index = HashMap::new();
    let mut groups = Vec::new();
    let mut nodes = Vec::with_capacity(dataset.nodes.len());
    let mut initial_positions = Vec::with_capacity(dataset.nodes.len());
    let mut pins = Vec::with_capacity(dataset.nodes.len());

    for spec in dataset.nodes {
        if index_by_id.contains_key(&spec.id) {
            drop_entity(&mut drops, &mut diagnostics, DropReason::DuplicateNode, &spec.id);
            continue;
        }

        let group = spec.group.map(|name| {
            *group_index.entry(name.clone()).or_insert_with(|| {
                groups.push(name);
                groups.len() - 1
            })
        });

        index_by_id.insert(spec.id.clone(), nodes.len());
        initial_positions.push(finite(spec.position));
        pins.push(finite(spec.pinned));
        nodes.push(Node {
            label: spec.label.unwrap_or_else(|| spec.id.clone()),
            id: spec.id,
            group,
            radius: sanitized_radius(spec.radius),
            selected: false,
            hovered: false,
        });
    }

    let mut degree = vec![0usize; nodes.len()];
    let mut edges = Vec::with_capacity(dataset.edges.len());
    for spec in dataset.edges {
        let (Some(&source), Some(&target)) =
            (index_by_id.get(&spec.source), index_by_id.get(&spec.target))
        else {
            drop_entity(&mut drops, &mut diagnostics, DropReason::DanglingEdge, &spec.id);
            continue;
        };

        if source == target {
            drop_entity(&mut drops, &mut diagnostics, DropReason::SelfLoop, &spec.id);
            continue;
        }

        if !spec.weight.is_finite() || spec.weight < 0.0 {
            drop_entity(&mut drops, &mut diagnostics, DropReason::InvalidWeight, &spec.id);
            continue;
        }

        degree[source] += 1;
        degree[target] += 1;
        edges.push(Edge {
            id: spec.id,
            source,
            target,
            weight: spec.weight,
        });
    }

    if drops.total() > 0 {
        warn!(
            "dropped {} entities while ingesting dataset ({} dangling edges, {} duplicate nodes, {} self loops, {} invalid weights)",
            drops.total(),
            drops.dangling_edges,
            drops.duplicate_nodes,
            drops.self_loops,
            drops.invalid_weights
        );
    }
    debug!(
        "ingested {} nodes, {} edges, {} groups",
        nodes.len(),
        edges.len(),
        groups.len()
    );

    Ingested {
        graph: Graph {
            nodes,
            edges,
            groups,
            index_by_id,
            degree,
        },
        initial_positions,
        pins,
        drops,
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::model::EdgeSpec;

    fn dataset() -> Dataset {
        Dataset {
            nodes: vec![
                NodeSpec::new("a").with_group("house"),
                NodeSpec::new("b").with_group("techno").with_position(vec2(5.0, 5.0)),
                NodeSpec::new("c").with_group("house").with_radius(-3.0),
            ],
            edges: vec![
                EdgeSpec::new("a", "b"),
                EdgeSpec::new("b", "c").with_weight(2.0),
                EdgeSpec::new("a", "X"),
            ],
        }
    }

    #[test]
    fn dangling_edge_is_dropped_and_counted() {
        let mut recorder = RecordingDiagnostics::default();
        let ingested = ingest(dataset(), Some(&mut recorder));

        assert_eq!(ingested.graph.edge_count(), 3 - 1);
        assert_eq!(ingested.drops.dangling_edges, 1);
        assert_eq!(
            recorder.drops,
            vec![(DropReason::DanglingEdge, "a->X".to_owned())]
        );
    }

    #[test]
    fn edges_resolve_to_indices_and_degree() {
        let ingested = ingest(dataset(), None);
        let graph = &ingested.graph;

        let edge = &graph.edges[1];
        assert_eq!(graph.nodes[edge.source].id, "b");
        assert_eq!(graph.nodes[edge.target].id, "c");
        assert_eq!(graph.degree, vec![1, 2, 1]);
    }

    #[test]
    fn groups_are_interned_in_first_seen_order() {
        let ingested = ingest(dataset(), None);
        assert_eq!(ingested.graph.groups, vec!["house", "techno"]);
        assert_eq!(ingested.graph.nodes[0].group, Some(0));
        assert_eq!(ingested.graph.nodes[1].group, Some(1));
        assert_eq!(ingested.graph.nodes[2].group, Some(0));
    }

    #[test]
    fn invalid_radius_falls_back_and_positions_carry_over() {
        let ingested = ingest(dataset(), None);
        assert_eq!(ingested.graph.nodes[2].radius, NodeSpec::DEFAULT_RADIUS);
        assert_eq!(ingested.initial_positions[0], None);
        assert_eq!(ingested.initial_positions[1], Some(vec2(5.0, 5.0)));
        assert_eq!(ingested.graph.nodes[0].label, "a");
    }

    #[test]
    fn duplicates_self_loops_and_bad_weights_are_dropped() {
        let ingested = ingest(
            Dataset {
                nodes: vec![NodeSpec::new("a"), NodeSpec::new("a"), NodeSpec::new("b")],
                edges: vec![
                    EdgeSpec::new("a", "a"),
                    EdgeSpec::new("a", "b").with_weight(f32::NAN),
                    EdgeSpec::new("b", "a"),
                ],
            },
            None,
        );

        assert_eq!(ingested.graph.node_count(), 2);
        assert_eq!(ingested.graph.edge_count(), 1);
        assert_eq!(ingested.drops.duplicate_nodes, 1);
        assert_eq!(ingested.drops.self_loops, 1);
        assert_eq!(ingested.drops.invalid_weights, 1);
        assert_eq!(ingested.drops.total(), 3);
    }
}
