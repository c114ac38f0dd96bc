use eframe::egui::{Color32, Pos2};
use log::trace;

use crate::config::LodConfig;
use crate::lod::{Load, LodSelector};
use crate::model::{Generation, Graph, Tier};
use crate::physics::Body;
use crate::spatial::SpatialIndex;
use crate::style::{
    EdgeStyle, Outline, StyleContext, edge_style, label_visible, node_fill, node_outline,
    node_screen_radius,
};
use crate::viewport::Viewport;

/// Draw command for one node. Borrowed strings point into the engine's
/// graph and are only valid for the duration of the call.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeUpdate<'a> {
    pub index: usize,
    pub id: &'a str,
    pub screen_pos: Pos2,
    pub radius: f32,
    pub fill: Color32,
    pub outline: Outline,
    pub label: &'a str,
    pub label_visible: bool,
    pub tier: Tier,
    pub visible: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeUpdate<'a> {
    pub index: usize,
    pub id: &'a str,
    pub from: Pos2,
    pub to: Pos2,
    pub stroke_width: f32,
    pub color: Color32,
    pub alpha: f32,
    pub tier: Tier,
    pub visible: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    pub generation: Generation,
    pub epoch: u64,
    pub optimize: bool,
}

/// The host side of the engine. Commands arrive edges first, then nodes,
/// bracketed by `begin_frame` and `end_frame`.
pub trait SceneRenderer {
    /// Forget everything retained for the previous dataset.
    fn reset(&mut self);

    fn begin_frame(&mut self, _frame: FrameInfo) {}

    fn update_edge(&mut self, update: &EdgeUpdate<'_>);

    fn update_node(&mut self, update: &NodeUpdate<'_>);

    fn end_frame(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EntityState {
    #[default]
    NotRendered,
    Visible(Tier),
    Culled,
}

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    state: EntityState,
    last_seen: Generation,
}

impl Slot {
    /// Applies the new tier and reports whether a command is due.
    fn advance(&mut self, tier: Tier, stale: bool, forced: bool) -> bool {
        let (next, emit) = match (self.state, tier.should_render()) {
            (EntityState::NotRendered, false) => (EntityState::NotRendered, false),
            (EntityState::Culled, false) => (EntityState::Culled, false),
            (EntityState::Visible(_), false) => (EntityState::Culled, true),
            (EntityState::NotRendered | EntityState::Culled, true) => {
                (EntityState::Visible(tier), true)
            }
            (EntityState::Visible(previous), true) => {
                (EntityState::Visible(tier), previous != tier || stale || forced)
            }
        };
        self.state = next;
        emit
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub generation: Generation,
    pub executed: bool,
    pub optimize: bool,
    pub node_updates: usize,
    pub edge_updates: usize,
    pub visible_nodes: usize,
    pub visible_edges: usize,
}

/// Snapshot the scheduler reads for one frame.
pub struct FrameInput<'a> {
    pub graph: &'a Graph,
    pub bodies: &'a [Body],
    pub viewport: &'a Viewport,
    pub generation: Generation,
    pub epoch: u64,
    /// Bumped when interaction state that affects styling changes.
    pub style_revision: u64,
    pub optimize: bool,
}

pub struct FrameScheduler {
    lod: LodSelector,
    spatial: SpatialIndex,
    nodes: Vec<Slot>,
    edges: Vec<Slot>,
    node_tiers: Vec<Tier>,
    node_emitted: Vec<bool>,
    last_generation: Option<Generation>,
    last_viewport_revision: Option<u64>,
    last_style_revision: Option<u64>,
    visible_nodes: usize,
    visible_edges: usize,
}

impl FrameScheduler {
    pub fn new(lod: LodConfig, spatial: SpatialIndex) -> Self {
        Self {
            lod: LodSelector::new(lod),
            spatial,
            nodes: Vec::new(),
            edges: Vec::new(),
            node_tiers: Vec::new(),
            node_emitted: Vec::new(),
            last_generation: None,
            last_viewport_revision: None,
            last_style_revision: None,
            visible_nodes: 0,
            visible_edges: 0,
        }
    }

    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    pub fn lod(&self) -> &LodSelector {
        &self.lod
    }

    pub fn node_state(&self, index: usize) -> Option<EntityState> {
        self.nodes.get(index).map(|slot| slot.state)
    }

    pub fn edge_state(&self, index: usize) -> Option<EntityState> {
        self.edges.get(index).map(|slot| slot.state)
    }

    /// Tier of each node as of the last executed frame.
    pub fn node_tiers(&self) -> &[Tier] {
        &self.node_tiers
    }

    pub fn visible_counts(&self) -> (usize, usize) {
        (self.visible_nodes, self.visible_edges)
    }

    /// Discards all per-entity state from the previous dataset.
    pub fn reset(&mut self, node_count: usize, edge_count: usize) {
        self.spatial.clear();
        self.nodes.clear();
        self.nodes.resize(node_count, Slot::default());
        self.edges.clear();
        self.edges.resize(edge_count, Slot::default());
        self.node_tiers.clear();
        self.node_emitted.clear();
        self.last_generation = None;
        self.last_viewport_revision = None;
        self.last_style_revision = None;
        self.visible_nodes = 0;
        self.visible_edges = 0;
    }

    /// Rebuilds the index without drawing, e.g. for hit tests before the
    /// first paint.
    pub fn refresh_index(&mut self, bodies: &[Body]) {
        self.spatial
            .rebuild(bodies.iter().map(|body| body.position).enumerate());
    }

    pub fn run(&mut self, input: FrameInput<'_>, renderer: &mut dyn SceneRenderer) -> FrameReport {
        if self.last_generation == Some(input.generation) && !input.optimize {
            return FrameReport {
                generation: input.generation,
                executed: false,
                optimize: false,
                node_updates: 0,
                edge_updates: 0,
                visible_nodes: self.visible_nodes,
                visible_edges: self.visible_edges,
            };
        }

        let graph = input.graph;
        let viewport = input.viewport;
        let node_count = graph.node_count();
        if self.nodes.len() != node_count || self.edges.len() != graph.edge_count() {
            self.reset(node_count, graph.edge_count());
        }

        self.refresh_index(input.bodies);

        let pass = self.lod.begin(
            viewport,
            Load {
                nodes: node_count,
                edges: graph.edge_count(),
            },
        );
        let restyle_all = self.last_viewport_revision != Some(viewport.revision())
            || self.last_style_revision != Some(input.style_revision);

        self.node_tiers.clear();
        self.node_tiers.extend(
            input
                .bodies
                .iter()
                .map(|body| pass.classify_node(viewport, body.position)),
        );

        // Decide node emission first so edges can follow moved endpoints.
        self.node_emitted.clear();
        let mut visible_nodes = 0;
        for (index, slot) in self.nodes.iter_mut().enumerate() {
            let tier = self.node_tiers[index];
            if tier.should_render() {
                visible_nodes += 1;
            }
            let stale = restyle_all || input.bodies[index].last_update > slot.last_seen;
            self.node_emitted.push(slot.advance(tier, stale, input.optimize));
        }

        renderer.begin_frame(FrameInfo {
            generation: input.generation,
            epoch: input.epoch,
            optimize: input.optimize,
        });

        let zoom = viewport.scale();
        let highlight = |index: usize| {
            let node = &graph.nodes[index];
            node.selected || node.hovered
        };

        let mut edge_updates = 0;
        let mut visible_edges = 0;
        for (index, edge) in graph.edges.iter().enumerate() {
            let tier = pass.classify_edge(
                self.node_tiers[edge.source],
                self.node_tiers[edge.target],
            );
            if tier.should_render() {
                visible_edges += 1;
            }

            let slot = &mut self.edges[index];
            let stale = self.node_emitted[edge.source] || self.node_emitted[edge.target];
            if !slot.advance(tier, stale, input.optimize) {
                continue;
            }
            slot.last_seen = input.generation;

            let from = endpoint(viewport, &input.bodies[edge.source]);
            let to = endpoint(viewport, &input.bodies[edge.target]);
            let EdgeStyle {
                width,
                color,
                alpha,
            } = edge_style(
                tier,
                zoom,
                edge.weight,
                highlight(edge.source) || highlight(edge.target),
            );
            renderer.update_edge(&EdgeUpdate {
                index,
                id: &edge.id,
                from,
                to,
                stroke_width: width,
                color,
                alpha,
                tier,
                visible: tier.should_render(),
            });
            edge_updates += 1;
        }

        let context = StyleContext::for_nodes(&graph.nodes);
        let mut node_updates = 0;
        for (index, node) in graph.nodes.iter().enumerate() {
            if !self.node_emitted[index] {
                continue;
            }
            self.nodes[index].last_seen = input.generation;

            let body = &input.bodies[index];
            let tier = self.node_tiers[index];
            let radius = node_screen_radius(node.radius, zoom, tier);
            renderer.update_node(&NodeUpdate {
                index,
                id: &node.id,
                screen_pos: endpoint(viewport, body),
                radius,
                fill: node_fill(node, &context),
                outline: node_outline(node, body.pinned.is_some(), tier),
                label: &node.label,
                label_visible: label_visible(node, tier, radius, zoom),
                tier,
                visible: tier.should_render(),
            });
            node_updates += 1;
        }

        renderer.end_frame();

        self.last_generation = Some(input.generation);
        self.last_viewport_revision = Some(viewport.revision());
        self.last_style_revision = Some(input.style_revision);
        self.visible_nodes = visible_nodes;
        self.visible_edges = visible_edges;

        trace!(
            "frame {}: {} node updates, {} edge updates, {} / {} nodes visible",
            input.generation, node_updates, edge_updates, visible_nodes, node_count
        );

        FrameReport {
            generation: input.generation,
            executed: true,
            optimize: input.optimize,
            node_updates,
            edge_updates,
            visible_nodes,
            visible_edges,
        }
    }
}

/// Last known screen position; hidden entities may not have one.
fn endpoint(viewport: &Viewport, body: &Body) -> Pos2 {
    body.position
        .map(|world| viewport.world_to_screen(world))
        .unwrap_or(Pos2::new(f32::NAN, f32::NAN))
}
