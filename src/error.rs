use thiserror::Error;

/// Rejected engine configuration. Raised by [`crate::EngineConfig::validate`]
/// before any frame runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("zoom bounds are inverted: min {min} > max {max}")]
    InvertedZoomBounds { min: f32, max: f32 },

    #[error("zoom bounds must be finite and positive, got [{min}, {max}]")]
    NonPositiveZoom { min: f32, max: f32 },

    #[error("initial zoom {initial} lies outside [{min}, {max}]")]
    InitialZoomOutOfBounds { initial: f32, min: f32, max: f32 },

    #[error("spatial cell size must be finite and positive, got {0}")]
    NonPositiveCellSize(f32),

    #[error("LOD thresholds must satisfy 0 < full ({full}) <= reduced ({reduced})")]
    InvalidLodThresholds { full: f32, reduced: f32 },

    #[error("LOD load watermarks must satisfy medium ({medium}) <= high ({high})")]
    InvertedWatermarks { medium: usize, high: usize },

    #[error("{name} must lie in {range}, got {value}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
        value: f64,
    },

    #[error("target frame rate must be finite and positive, got {0}")]
    NonPositiveTargetFps(f32),

    #[error("warm-start tick cap must be at least 1")]
    ZeroWarmStartCap,
}

/// Malformed dataset document at the loader boundary.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid dataset JSON")]
    Json(#[from] serde_json::Error),

    #[error("dataset must be a JSON object with a \"nodes\" array")]
    MissingNodes,

    #[error("node #{index} has no usable id")]
    MissingNodeId { index: usize },

    #[error("edge #{index} is missing its {field} reference")]
    MissingEdgeEndpoint { index: usize, field: &'static str },
}

/// Why an entity was dropped while ingesting a dataset. Drops are recovered
/// locally and only counted; they never abort a load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    DanglingEdge,
    DuplicateNode,
    SelfLoop,
    InvalidWeight,
}

impl DropReason {
    pub fn label(self) -> &'static str {
        match self {
            Self::DanglingEdge => "dangling edge",
            Self::DuplicateNode => "duplicate node",
            Self::SelfLoop => "self loop",
            Self::InvalidWeight => "invalid weight",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DropCounters {
    pub dangling_edges: usize,
    pub duplicate_nodes: usize,
    pub self_loops: usize,
    pub invalid_weights: usize,
}

impl DropCounters {
    pub fn record(&mut self, reason: DropReason) {
        let counter = match reason {
            DropReason::DanglingEdge => &mut self.dangling_edges,
            DropReason::DuplicateNode => &mut self.duplicate_nodes,
            DropReason::SelfLoop => &mut self.self_loops,
            DropReason::InvalidWeight => &mut self.invalid_weights,
        };
        *counter += 1;
    }

    pub fn total(&self) -> usize {
        self.dangling_edges + self.duplicate_nodes + self.self_loops + self.invalid_weights
    }
}
