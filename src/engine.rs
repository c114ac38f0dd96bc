use std::time::{Duration, Instant};

use eframe::egui::{Pos2, Vec2};
use log::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dataset::{Ingested, ingest, parse_dataset};
use crate::diagnostics::{Diagnostics, LoadSummary};
use crate::error::{ConfigError, DatasetError, DropCounters};
use crate::model::{Dataset, Generation, Graph, Node, NodeId, Tier};
use crate::perf::{FrameRateStats, PerformanceMonitor};
use crate::physics::{Body, PhysicsStepper, RestartTrigger, SimulationState};
use crate::scheduler::{FrameInput, FrameReport, FrameScheduler, SceneRenderer};
use crate::spatial::SpatialIndex;
use crate::style::{MAX_NODE_SCREEN_RADIUS, node_screen_radius};
use crate::viewport::Viewport;

/// Read-only view for status bars and diagnostics overlays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceSnapshot {
    pub fps: FrameRateStats,
    pub target_fps: f32,
    pub should_optimize: bool,
    pub visible_nodes: usize,
    pub visible_edges: usize,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub drops: DropCounters,
    pub simulation: SimulationState,
    pub epoch: u64,
}

/// One session: a viewport that lives for the whole session plus one
/// dataset generation of graph, physics and scheduler state.
pub struct GraphEngine {
    config: EngineConfig,
    viewport: Viewport,
    graph: Graph,
    physics: PhysicsStepper,
    scheduler: FrameScheduler,
    monitor: PerformanceMonitor,
    diagnostics: Option<Box<dyn Diagnostics>>,
    drops: DropCounters,
    generation: Generation,
    epoch: u64,
    style_revision: u64,
    renderer_stale: bool,
    was_running: bool,
    selected: Option<usize>,
    hovered: Option<usize>,
}

impl GraphEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        if let Err(err) = config.validate() {
            warn!("rejected engine configuration: {err}");
            return Err(err);
        }

        let graph = Graph::default();
        let physics = PhysicsStepper::new(&config.physics, &graph, &[], &[]);
        let scheduler = FrameScheduler::new(
            config.lod,
            SpatialIndex::new(config.spatial.cell_size, config.spatial.max_nearest_rings),
        );

        Ok(Self {
            viewport: Viewport::new(&config.viewport),
            monitor: PerformanceMonitor::new(&config.performance),
            config,
            graph,
            physics,
            scheduler,
            diagnostics: None,
            drops: DropCounters::default(),
            generation: 0,
            epoch: 0,
            style_revision: 0,
            renderer_stale: false,
            was_running: false,
            selected: None,
            hovered: None,
        })
    }

    pub fn with_diagnostics(
        config: EngineConfig,
        diagnostics: impl Diagnostics + 'static,
    ) -> Result<Self, ConfigError> {
        let mut engine = Self::new(config)?;
        engine.diagnostics = Some(Box::new(diagnostics));
        Ok(engine)
    }

    fn diagnostics_mut(&mut self) -> Option<&mut dyn Diagnostics> {
        match &mut self.diagnostics {
            Some(diagnostics) => {
                let diagnostics: &mut dyn Diagnostics = diagnostics.as_mut();
                Some(diagnostics)
            }
            None => None,
        }
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    fn restyle(&mut self) {
        self.style_revision += 1;
        self.touch();
    }

    pub fn load_json(&mut self, raw: &str) -> Result<LoadSummary, DatasetError> {
        let dataset = parse_dataset(raw)?;
        Ok(self.load(dataset))
    }

    /// Replaces the whole node/edge set. State from the previous dataset is
    /// discarded before the new one takes its first tick, and the renderer
    /// is reset at the start of the next frame.
    pub fn load(&mut self, dataset: Dataset) -> LoadSummary {
        let (input_nodes, input_edges) = (dataset.nodes.len(), dataset.edges.len());
        let trigger = if self.epoch == 0 {
            RestartTrigger::InitialLoad
        } else {
            RestartTrigger::DataChanged
        };

        let ingested = ingest(dataset, self.diagnostics_mut());
        self.epoch += 1;
        let summary = ingested.summary(self.epoch, input_nodes, input_edges);
        let Ingested {
            graph,
            initial_positions,
            pins,
            drops,
        } = ingested;

        self.scheduler.reset(graph.node_count(), graph.edge_count());
        self.physics = PhysicsStepper::new(&self.config.physics, &graph, &initial_positions, &pins);
        self.graph = graph;
        self.drops = drops;
        self.selected = None;
        self.hovered = None;
        self.renderer_stale = true;

        self.physics.restart(trigger, None);
        let ticks = self.physics.warm_start(self.config.physics.warm_start_ticks);
        let settled = !self.physics.state().running;
        self.was_running = !settled;
        self.scheduler.refresh_index(self.physics.bodies());
        self.restyle();

        info!(
            "loaded dataset epoch {}: {} of {} nodes, {} of {} edges, warm start {} ticks",
            self.epoch,
            summary.accepted_nodes,
            input_nodes,
            summary.accepted_edges,
            input_edges,
            ticks
        );
        if let Some(diagnostics) = self.diagnostics_mut() {
            diagnostics.dataset_loaded(&summary);
            diagnostics.warm_start_finished(ticks, settled);
        }
        summary
    }

    /// Runs one paint callback: physics step, then the scheduler pass.
    pub fn frame(&mut self, now: Instant, renderer: &mut dyn SceneRenderer) -> FrameReport {
        let optimize = self.monitor.record_frame(now);
        self.advance(optimize, renderer)
    }

    /// Same as [`Self::frame`] for hosts that already measure their frame
    /// time, such as egui's `stable_dt`.
    pub fn frame_with_delta(
        &mut self,
        delta: Duration,
        renderer: &mut dyn SceneRenderer,
    ) -> FrameReport {
        self.monitor.record_frame_time(delta);
        let optimize = self.monitor.should_optimize();
        self.advance(optimize, renderer)
    }

    fn advance(&mut self, optimize: bool, renderer: &mut dyn SceneRenderer) -> FrameReport {
        if self.renderer_stale {
            renderer.reset();
            self.renderer_stale = false;
        }

        let next = self.generation + 1;
        if self.physics.tick(next) {
            self.generation = next;
        }
        self.note_settled();

        let report = self.scheduler.run(
            FrameInput {
                graph: &self.graph,
                bodies: self.physics.bodies(),
                viewport: &self.viewport,
                generation: self.generation,
                epoch: self.epoch,
                style_revision: self.style_revision,
                optimize,
            },
            renderer,
        );

        if let Some(diagnostics) = self.diagnostics_mut() {
            diagnostics.frame_completed(&report);
        }
        report
    }

    fn note_settled(&mut self) {
        let state = self.physics.state();
        if self.was_running && !state.running {
            self.was_running = false;
            debug!("simulation settled at tick {}", state.tick_count);
            if let Some(diagnostics) = self.diagnostics_mut() {
                diagnostics.simulation_settled(state.tick_count);
            }
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn bodies(&self) -> &[Body] {
        self.physics.bodies()
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn drops(&self) -> DropCounters {
        self.drops
    }

    pub fn simulation_state(&self) -> SimulationState {
        self.physics.state()
    }

    pub fn node_position(&self, id: &str) -> Option<Vec2> {
        self.graph
            .index_of(id)
            .and_then(|index| self.physics.position(index))
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected
            .map(|index| self.graph.nodes[index].id.as_str())
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.map(|index| self.graph.nodes[index].id.as_str())
    }

    pub fn performance_snapshot(&self) -> PerformanceSnapshot {
        let (visible_nodes, visible_edges) = self.scheduler.visible_counts();
        PerformanceSnapshot {
            fps: self.monitor.stats(),
            target_fps: self.monitor.target_fps(),
            should_optimize: self.monitor.should_optimize(),
            visible_nodes,
            visible_edges,
            total_nodes: self.graph.node_count(),
            total_edges: self.graph.edge_count(),
            drops: self.drops,
            simulation: self.physics.state(),
            epoch: self.epoch,
        }
    }

    pub fn set_target_fps(&mut self, target_fps: f32) {
        self.monitor.set_target_fps(target_fps);
    }

    /// Node under `screen`, within the configured pixel tolerance of the
    /// circle the renderer was told to draw. Closest edge of a circle wins.
    pub fn hit_test(&self, screen: Pos2) -> Option<NodeId> {
        self.hit_test_index(screen)
            .map(|index| self.graph.nodes[index].id.clone())
    }

    fn hit_test_index(&self, screen: Pos2) -> Option<usize> {
        if !(screen.x.is_finite() && screen.y.is_finite()) || self.graph.nodes.is_empty() {
            return None;
        }

        let zoom = self.viewport.scale();
        let tolerance = self.config.spatial.hit_tolerance_px;
        let world = self.viewport.screen_to_world(screen);
        let reach = (MAX_NODE_SCREEN_RADIUS + tolerance) / zoom;
        let tiers = self.scheduler.node_tiers();

        let mut best: Option<(usize, f32)> = None;
        for index in self.scheduler.spatial().query(world, reach) {
            let Some(position) = self.physics.position(index) else {
                continue;
            };
            // Tiers are those of the last executed frame; before it, draw size.
            let tier = tiers.get(index).copied().unwrap_or(Tier::Full);
            if !tier.should_render() {
                continue;
            }
            let drawn = node_screen_radius(self.graph.nodes[index].radius, zoom, tier);
            let gap = (self.viewport.world_to_screen(position) - screen).length() - drawn;
            if gap <= tolerance && best.is_none_or(|(_, best_gap)| gap < best_gap) {
                best = Some((index, gap));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Closest indexed node to a world point, bounded by the ring cap.
    pub fn nearest_node(&self, world: Vec2) -> Option<(NodeId, f32)> {
        self.scheduler
            .spatial()
            .nearest(world)
            .map(|(index, distance)| (self.graph.nodes[index].id.clone(), distance))
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        if self.viewport.pan_by(delta) {
            self.touch();
        }
    }

    /// Absolute zoom that keeps the world point under `anchor` in place.
    pub fn zoom_at(&mut self, scale: f32, anchor: Pos2) {
        if self.viewport.set_scale(scale, anchor) {
            self.touch();
        }
    }

    pub fn zoom_by(&mut self, factor: f32, anchor: Pos2) {
        if self.viewport.zoom_by(factor, anchor) {
            self.touch();
        }
    }

    pub fn set_screen_size(&mut self, width: f32, height: f32) {
        if self.viewport.set_screen_size(width, height) {
            self.touch();
        }
    }

    /// Returns false for unknown or not yet positioned nodes.
    pub fn center_on(&mut self, id: &str) -> bool {
        let Some(position) = self.node_position(id) else {
            return false;
        };
        if self.viewport.center_on(position) {
            self.touch();
        }
        true
    }

    pub fn pause(&mut self) {
        self.physics.pause();
    }

    pub fn resume(&mut self) {
        self.physics.resume();
    }

    pub fn stop(&mut self) {
        self.physics.stop();
        self.note_settled();
    }

    pub fn restart(&mut self, trigger: RestartTrigger) {
        self.restart_with_energy(trigger, None);
    }

    pub fn restart_with_energy(&mut self, trigger: RestartTrigger, energy: Option<f64>) {
        self.physics.restart(trigger, energy);
        self.was_running = self.physics.state().running;
    }

    /// Pins a node to `position`, or releases it with `None`.
    pub fn pin(&mut self, id: &str, position: Option<Vec2>) -> bool {
        let Some(index) = self.graph.index_of(id) else {
            return false;
        };
        let was_pinned = self.physics.bodies()[index].pinned.is_some();
        if !self.physics.pin(index, position, self.generation + 1) {
            return false;
        }
        // Only the outline depends on the pin; a moved body is stamped already.
        if was_pinned != position.is_some() {
            self.restyle();
        } else {
            self.touch();
        }
        true
    }

    fn set_flag(
        &mut self,
        id: Option<&str>,
        current: Option<usize>,
        flag: fn(&mut Node) -> &mut bool,
    ) -> Option<Option<usize>> {
        let next = match id {
            Some(id) => Some(self.graph.index_of(id)?),
            None => None,
        };
        if next == current {
            return Some(current);
        }

        if let Some(previous) = current {
            *flag(&mut self.graph.nodes[previous]) = false;
        }
        if let Some(next) = next {
            *flag(&mut self.graph.nodes[next]) = true;
        }
        self.restyle();
        Some(next)
    }

    /// Selects a node by id, or clears the selection. Unknown ids leave the
    /// selection untouched and return false.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        match self.set_flag(id, self.selected, |node| &mut node.selected) {
            Some(next) => {
                self.selected = next;
                true
            }
            None => false,
        }
    }

    pub fn hover(&mut self, id: Option<&str>) -> bool {
        match self.set_flag(id, self.hovered, |node| &mut node.hovered) {
            Some(next) => {
                self.hovered = next;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::model::{EdgeSpec, NodeSpec};

    fn engine() -> GraphEngine {
        GraphEngine::new(EngineConfig::default()).expect("default config is valid")
    }

    fn fixed_pair() -> Dataset {
        Dataset {
            nodes: vec![
                NodeSpec::new("a").pinned_at(vec2(0.0, 0.0)),
                NodeSpec::new("b").pinned_at(vec2(100.0, 0.0)).with_radius(10.0),
            ],
            edges: vec![EdgeSpec::new("a", "b")],
        }
    }

    #[test]
    fn invalid_config_fails_before_anything_runs() {
        let mut config = EngineConfig::default();
        config.viewport.min_zoom = 4.0;
        config.viewport.max_zoom = 1.0;
        assert!(GraphEngine::new(config).is_err());
    }

    #[test]
    fn hit_test_uses_radius_and_tolerance() {
        let mut engine = engine();
        engine.load(fixed_pair());

        // b sits at screen (500, 300) with radius 10 and 6 px tolerance.
        assert_eq!(engine.hit_test(Pos2::new(514.0, 300.0)).as_deref(), Some("b"));
        assert_eq!(engine.hit_test(Pos2::new(520.0, 300.0)), None);
        assert_eq!(engine.hit_test(Pos2::new(402.0, 301.0)).as_deref(), Some("a"));
        assert_eq!(engine.hit_test(Pos2::new(f32::NAN, 0.0)), None);
    }

    #[test]
    fn hit_area_follows_the_drawn_radius_when_zoomed_in() {
        let mut engine = engine();
        engine.load(Dataset {
            nodes: vec![NodeSpec::new("a").pinned_at(Vec2::ZERO).with_radius(6.0)],
            edges: Vec::new(),
        });
        let center = Pos2::new(400.0, 300.0);
        engine.zoom_at(6.0, center);

        // Drawn at 6 * 6^0.4, about 12.3 px, plus 6 px of tolerance.
        assert_eq!(engine.hit_test(center + vec2(15.0, 0.0)).as_deref(), Some("a"));
        assert_eq!(engine.hit_test(center + vec2(0.0, 18.0)).as_deref(), Some("a"));
        assert_eq!(engine.hit_test(center + vec2(40.0, 0.0)), None);
        assert_eq!(engine.hit_test(center + vec2(0.0, 19.0)), None);
    }

    #[test]
    fn dragging_a_pinned_node_does_not_restyle_everything() {
        let mut engine = engine();
        engine.load(fixed_pair());

        engine.pin("a", Some(vec2(5.0, 0.0)));
        let restyled = engine.style_revision;
        let before = engine.generation();

        engine.pin("a", Some(vec2(10.0, 0.0)));
        assert_eq!(engine.style_revision, restyled);
        assert_eq!(engine.generation(), before + 1);
        assert_eq!(engine.bodies()[0].last_update, engine.generation());

        engine.pin("a", None);
        assert_eq!(engine.style_revision, restyled + 1);
    }

    #[test]
    fn selection_tracks_a_single_node() {
        let mut engine = engine();
        engine.load(fixed_pair());

        assert!(engine.select(Some("a")));
        assert!(engine.graph().nodes[0].selected);
        assert!(engine.select(Some("b")));
        assert!(!engine.graph().nodes[0].selected);
        assert!(engine.graph().nodes[1].selected);
        assert_eq!(engine.selected(), Some("b"));

        assert!(!engine.select(Some("missing")));
        assert_eq!(engine.selected(), Some("b"));
        assert!(engine.select(None));
        assert_eq!(engine.selected(), None);
    }

    #[test]
    fn camera_commands_bump_the_generation() {
        let mut engine = engine();
        engine.load(fixed_pair());
        let before = engine.generation();

        engine.pan_by(vec2(10.0, 0.0));
        engine.zoom_at(2.0, Pos2::new(400.0, 300.0));
        assert_eq!(engine.generation(), before + 2);

        engine.pan_by(Vec2::ZERO);
        engine.zoom_at(2.0, Pos2::new(400.0, 300.0));
        assert_eq!(engine.generation(), before + 2);

        assert!(engine.center_on("b"));
        let center = engine.viewport().world_to_screen(vec2(100.0, 0.0));
        assert!((center - Pos2::new(400.0, 300.0)).length() < 1e-3);
        assert!(!engine.center_on("missing"));
    }

    #[test]
    fn pin_moves_a_node_immediately() {
        let mut engine = engine();
        engine.load(fixed_pair());
        assert!(engine.pin("a", Some(vec2(-50.0, 20.0))));
        assert_eq!(engine.node_position("a"), Some(vec2(-50.0, 20.0)));
        assert!(!engine.pin("missing", None));
    }

    #[test]
    fn load_counts_the_epoch() {
        let mut engine = engine();
        let first = engine.load(fixed_pair());
        let second = engine.load(fixed_pair());
        assert_eq!(first.epoch, 1);
        assert_eq!(second.epoch, 2);
        assert_eq!(engine.performance_snapshot().total_nodes, 2);
    }
}
