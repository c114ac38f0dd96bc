use std::collections::HashMap;

use eframe::egui::Vec2;

pub type NodeId = String;
pub type EdgeId = String;

/// Monotonic stamp. The engine bumps its generation whenever state changes
/// in a way that needs a redraw; entities remember the generation at which
/// they last changed.
pub type Generation = u64;

/// Detail tier, ordered from most to least detailed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Full,
    Reduced,
    Minimal,
    Culled,
}

impl Tier {
    pub fn should_render(self) -> bool {
        self < Tier::Culled
    }

    /// One step coarser, never past `Minimal`.
    pub fn downgraded(self) -> Self {
        match self {
            Self::Full => Self::Reduced,
            Self::Reduced | Self::Minimal => Self::Minimal,
            Self::Culled => Self::Culled,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Reduced => "reduced",
            Self::Minimal => "minimal",
            Self::Culled => "culled",
        }
    }
}

/// Canonical node record handed over by the dataset loader.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSpec {
    pub id: NodeId,
    pub label: Option<String>,
    pub group: Option<String>,
    pub radius: f32,
    pub position: Option<Vec2>,
    pub pinned: Option<Vec2>,
}

impl NodeSpec {
    pub const DEFAULT_RADIUS: f32 = 6.0;

    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            group: None,
            radius: Self::DEFAULT_RADIUS,
            position: None,
            pinned: None,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn pinned_at(mut self, position: Vec2) -> Self {
        self.pinned = Some(position);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeSpec {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f32,
}

impl EdgeSpec {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{source}->{target}"),
            source,
            target,
            weight: 1.0,
        }
    }

    pub fn with_id(mut self, id: impl Into<EdgeId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

/// Topology and interaction flags. Positions live in the physics stepper.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub group: Option<usize>,
    pub radius: f32,
    pub selected: bool,
    pub hovered: bool,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub id: EdgeId,
    pub source: usize,
    pub target: usize,
    pub weight: f32,
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub groups: Vec<String>,
    pub index_by_id: HashMap<NodeId, usize>,
    pub degree: Vec<usize>,
}

impl Graph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).and_then(|index| self.nodes.get(index))
    }

    pub fn max_radius(&self) -> f32 {
        self.nodes
            .iter()
            .map(|node| node.radius)
            .fold(0.0, f32::max)
    }
}
