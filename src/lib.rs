//! Rendering and simulation control for large, continuously moving
//! node/edge graphs.
//!
//! [`GraphEngine`] drives a force-directed [`PhysicsStepper`], rebuilds a
//! uniform-grid [`SpatialIndex`] every frame, assigns a level-of-detail
//! [`Tier`] to every entity and emits only the draw commands that changed to
//! a host-provided [`SceneRenderer`].

pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod lod;
pub mod model;
pub mod perf;
pub mod physics;
pub mod scheduler;
pub mod spatial;
pub mod style;
pub mod viewport;

pub use config::{
    EngineConfig, ForceProfile, LayoutMode, LodConfig, PerformanceConfig, PhysicsConfig,
    RestartProfile, SpatialConfig, ViewportConfig,
};
pub use dataset::{Ingested, ingest, parse_dataset};
pub use diagnostics::{Diagnostics, LoadSummary, RECORDED_FRAMES, RecordingDiagnostics};
pub use engine::{GraphEngine, PerformanceSnapshot};
pub use error::{ConfigError, DatasetError, DropCounters, DropReason};
pub use lod::{Load, LodPass, LodSelector};
pub use model::{Dataset, EdgeId, EdgeSpec, Generation, Graph, NodeId, NodeSpec, Tier};
pub use perf::{FrameRateStats, PerformanceMonitor};
pub use physics::{Body, PhysicsStepper, RestartTrigger, SimulationState};
pub use scheduler::{
    EdgeUpdate, EntityState, FrameInfo, FrameReport, FrameScheduler, NodeUpdate, SceneRenderer,
};
pub use spatial::SpatialIndex;
pub use style::Outline;
pub use viewport::Viewport;
