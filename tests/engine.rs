use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use eframe::egui::{Pos2, Vec2, vec2};

use graphflux::{
    Dataset, DropReason, EdgeSpec, EdgeUpdate, EngineConfig, FrameInfo, GraphEngine, NodeSpec,
    NodeUpdate, RecordingDiagnostics, RestartTrigger, SceneRenderer, SpatialIndex, Tier,
};

#[derive(Clone, Debug, PartialEq)]
enum Command {
    Edge { id: String, visible: bool },
    Node { id: String, visible: bool, tier: Tier, screen_pos: Pos2 },
}

#[derive(Default)]
struct RecordingRenderer {
    resets: usize,
    frames: Vec<(FrameInfo, Vec<Command>)>,
}

impl RecordingRenderer {
    fn last_commands(&self) -> &[Command] {
        self.frames
            .last()
            .map(|(_, commands)| commands.as_slice())
            .unwrap_or(&[])
    }

    fn push(&mut self, command: Command) {
        if let Some((_, commands)) = self.frames.last_mut() {
            commands.push(command);
        }
    }
}

impl SceneRenderer for RecordingRenderer {
    fn reset(&mut self) {
        self.resets += 1;
    }

    fn begin_frame(&mut self, frame: FrameInfo) {
        self.frames.push((frame, Vec::new()));
    }

    fn update_edge(&mut self, update: &EdgeUpdate<'_>) {
        self.push(Command::Edge {
            id: update.id.to_owned(),
            visible: update.visible,
        });
    }

    fn update_node(&mut self, update: &NodeUpdate<'_>) {
        self.push(Command::Node {
            id: update.id.to_owned(),
            visible: update.visible,
            tier: update.tier,
            screen_pos: update.screen_pos,
        });
    }
}

fn assert_close(actual: Pos2, expected: Pos2) {
    assert!(
        (actual - expected).length() < 1e-3,
        "expected {expected:?}, got {actual:?}"
    );
}

fn quick_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.physics.warm_start_ticks = 1;
    config
}

fn pinned_row(prefix: &str, count: usize, spacing: f32) -> Dataset {
    Dataset {
        nodes: (0..count)
            .map(|i| NodeSpec::new(format!("{prefix}{i}")).pinned_at(vec2(i as f32 * spacing, 0.0)))
            .collect(),
        edges: (1..count)
            .map(|i| EdgeSpec::new(format!("{prefix}{}", i - 1), format!("{prefix}{i}")))
            .collect(),
    }
}

fn chain(count: usize) -> Dataset {
    Dataset {
        nodes: (0..count).map(|i| NodeSpec::new(format!("n{i}"))).collect(),
        edges: (1..count)
            .map(|i| EdgeSpec::new(format!("n{}", i - 1), format!("n{i}")))
            .collect(),
    }
}

#[test]
fn world_origin_maps_to_screen_center() {
    let engine = GraphEngine::new(EngineConfig::default()).expect("valid config");
    let viewport = engine.viewport();
    assert_eq!(viewport.size(), vec2(800.0, 600.0));
    assert_close(viewport.world_to_screen(Vec2::ZERO), Pos2::new(400.0, 300.0));
}

#[test]
fn heavy_load_classifies_against_scaled_thresholds() {
    let mut dataset = Dataset {
        nodes: (0..1199)
            .map(|i| {
                let x = (i % 40) as f32 * 5.0 - 100.0;
                let y = (i / 40) as f32 * 5.0 - 75.0;
                NodeSpec::new(format!("n{i}")).pinned_at(vec2(x, y))
            })
            .collect(),
        edges: Vec::new(),
    };
    dataset
        .nodes
        .push(NodeSpec::new("corner").pinned_at(vec2(400.0, -300.0)));

    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    engine.load(dataset);
    assert_eq!(engine.graph().node_count(), 1200);
    let (full, reduced) = engine.scheduler().lod().thresholds(1200);
    assert!((full - 240.0).abs() < 1e-3 && (reduced - 480.0).abs() < 1e-3);

    let mut renderer = RecordingRenderer::default();
    engine.frame(Instant::now(), &mut renderer);

    let corner = engine.graph().index_of("corner").expect("corner node");
    // Half the diagonal out: reduced under base thresholds, minimal here.
    assert_eq!(engine.scheduler().node_tiers()[corner], Tier::Minimal);
    let command = renderer
        .last_commands()
        .iter()
        .find(|command| matches!(command, Command::Node { id, .. } if id == "corner"))
        .expect("corner node was emitted");
    assert!(matches!(command, Command::Node { tier: Tier::Minimal, visible: true, .. }));
}

#[test]
fn simulation_converges_after_expected_ticks() {
    let mut config = EngineConfig::default();
    config.physics.alpha_decay = 0.02;
    config.physics.alpha_min = 0.01;
    config.physics.warm_start_ticks = 100;

    let recorder = Rc::new(RefCell::new(RecordingDiagnostics::default()));
    let mut engine = GraphEngine::with_diagnostics(config, recorder.clone()).expect("valid config");
    engine.load(chain(6));
    assert_eq!(recorder.borrow().warm_starts, vec![(100, false)]);

    let mut renderer = RecordingRenderer::default();
    let start = Instant::now();
    let mut frame = 0;
    while engine.simulation_state().running {
        frame += 1;
        engine.frame(start + Duration::from_millis(16 * frame), &mut renderer);
        assert!(frame < 1_000);
    }

    assert_eq!(frame, 128);
    assert_eq!(engine.simulation_state().tick_count, 228);
    assert!(engine.simulation_state().alpha < 0.01);
    assert_eq!(recorder.borrow().settled_at, vec![228]);
}

#[test]
fn dangling_edge_is_dropped_not_fatal() {
    let recorder = Rc::new(RefCell::new(RecordingDiagnostics::default()));
    let mut engine =
        GraphEngine::with_diagnostics(quick_config(), recorder.clone())
            .expect("valid config");

    let summary = engine
        .load_json(
            r#"{
                "nodes": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
                "edges": [
                    {"source": "a", "target": "b"},
                    {"source": "b", "target": "c"},
                    {"id": "bad", "source": "a", "target": "X"}
                ]
            }"#,
        )
        .expect("document parses");

    assert_eq!(summary.input_edges, 3);
    assert_eq!(summary.accepted_edges, 2);
    assert_eq!(summary.drops.dangling_edges, 1);
    assert_eq!(engine.drops().total(), 1);
    assert_eq!(
        recorder.borrow().drops,
        vec![(DropReason::DanglingEdge, "bad".to_owned())]
    );
    assert_eq!(recorder.borrow().loads, vec![summary]);
}

#[test]
fn nearest_on_empty_index_is_none() {
    assert_eq!(SpatialIndex::new(100.0, 5).nearest(Vec2::ZERO), None);

    let engine = GraphEngine::new(EngineConfig::default()).expect("valid config");
    assert_eq!(engine.nearest_node(vec2(10.0, 10.0)), None);
    assert_eq!(engine.hit_test(Pos2::new(400.0, 300.0)), None);
}

#[test]
fn reload_discards_previous_generation() {
    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    let mut renderer = RecordingRenderer::default();
    let start = Instant::now();

    engine.load(pinned_row("a", 5, 100.0));
    engine.frame(start, &mut renderer);
    assert_eq!(renderer.resets, 1);
    assert_eq!(engine.hit_test(Pos2::new(700.0, 300.0)).as_deref(), Some("a3"));

    engine.load(Dataset {
        nodes: vec![
            NodeSpec::new("b0").pinned_at(vec2(0.0, 0.0)),
            NodeSpec::new("b1").pinned_at(vec2(0.0, 100.0)),
        ],
        edges: vec![EdgeSpec::new("b0", "b1")],
    });

    // Before any frame of the new dataset the index already holds only it.
    assert!(engine.scheduler().spatial().query(vec2(300.0, 0.0), 1.0).is_empty());
    assert_eq!(engine.hit_test(Pos2::new(700.0, 300.0)), None);

    engine.frame(start + Duration::from_millis(16), &mut renderer);
    assert_eq!(renderer.resets, 2);
    assert_eq!(renderer.frames.last().map(|(frame, _)| frame.epoch), Some(2));
    for command in renderer.last_commands() {
        let id = match command {
            Command::Edge { id, .. } | Command::Node { id, .. } => id,
        };
        assert!(!id.starts_with('a'), "stale entity {id} emitted after reload");
    }

    let everything = engine.scheduler().spatial().query(Vec2::ZERO, 10_000.0);
    assert_eq!(everything.len(), 2);
    assert!(everything.iter().all(|index| *index < 2));
    assert_eq!(engine.scheduler().spatial().query(Vec2::ZERO, 0.0), vec![0]);
}

#[test]
fn clean_frames_are_skipped() {
    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    engine.load(pinned_row("n", 4, 50.0));
    engine.stop();

    let mut renderer = RecordingRenderer::default();
    let start = Instant::now();
    let first = engine.frame(start, &mut renderer);
    assert!(first.executed);
    assert_eq!(first.node_updates, 4);
    assert_eq!(first.edge_updates, 3);

    let second = engine.frame(start + Duration::from_millis(16), &mut renderer);
    assert!(!second.executed);
    assert_eq!(renderer.frames.len(), 1);
}

#[test]
fn edges_are_emitted_before_nodes() {
    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    engine.load(chain(12));

    let mut renderer = RecordingRenderer::default();
    let report = engine.frame(Instant::now(), &mut renderer);
    assert!(report.executed);

    let commands = renderer.last_commands();
    let first_node = commands
        .iter()
        .position(|command| matches!(command, Command::Node { .. }))
        .expect("nodes emitted");
    assert!(commands[first_node..]
        .iter()
        .all(|command| matches!(command, Command::Node { .. })));
    assert_eq!(first_node, report.edge_updates);
}

#[test]
fn paused_simulation_keeps_drawing_frozen_positions() {
    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    engine.load(chain(8));

    let mut renderer = RecordingRenderer::default();
    let start = Instant::now();
    engine.frame(start, &mut renderer);

    engine.pause();
    let frozen = engine.bodies().to_vec();
    let paused = engine.frame(start + Duration::from_millis(16), &mut renderer);
    assert!(!paused.executed);
    assert_eq!(engine.bodies(), frozen.as_slice());

    engine.pan_by(vec2(25.0, 0.0));
    let panned = engine.frame(start + Duration::from_millis(32), &mut renderer);
    assert!(panned.executed);
    assert_eq!(panned.node_updates, panned.visible_nodes);
    assert_eq!(engine.bodies(), frozen.as_slice());
    assert!(engine.simulation_state().paused);
    assert!(engine.simulation_state().running);

    engine.resume();
    let resumed = engine.frame(start + Duration::from_millis(48), &mut renderer);
    assert!(resumed.executed);
    assert_ne!(engine.bodies(), frozen.as_slice());
}

#[test]
fn slow_frames_force_a_redraw() {
    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    engine.load(pinned_row("n", 3, 40.0));
    engine.stop();

    let mut renderer = RecordingRenderer::default();
    let start = Instant::now();
    engine.frame(start, &mut renderer);

    // 20 fps against a 60 fps target.
    let slow = engine.frame(start + Duration::from_millis(50), &mut renderer);
    assert!(slow.executed);
    assert!(slow.optimize);
    assert_eq!(slow.node_updates, 3);
    assert!(engine.performance_snapshot().should_optimize);

    let recovered = engine.frame(start + Duration::from_millis(60), &mut renderer);
    assert!(!recovered.executed);
}

#[test]
fn repaint_after_idle_does_not_degrade() {
    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    engine.load(pinned_row("n", 3, 40.0));
    engine.stop();

    let mut renderer = RecordingRenderer::default();
    let start = Instant::now();
    engine.frame(start, &mut renderer);
    engine.frame(start + Duration::from_millis(16), &mut renderer);

    // A hover wakes an on-demand host three seconds later.
    engine.hover(Some("n1"));
    let woken = engine.frame(start + Duration::from_millis(3016), &mut renderer);
    assert!(woken.executed);
    assert!(!woken.optimize);
    assert!(!engine.performance_snapshot().should_optimize);

    let idle = engine.frame_with_delta(Duration::from_secs(3), &mut renderer);
    assert!(!idle.executed);
    assert!(!idle.optimize);
}

#[test]
fn dragging_a_pinned_node_resends_only_what_it_touches() {
    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    engine.load(pinned_row("n", 4, 40.0));
    engine.stop();

    let mut renderer = RecordingRenderer::default();
    let start = Instant::now();
    engine.frame(start, &mut renderer);

    assert!(engine.pin("n1", Some(vec2(42.0, 3.0))));
    let drag = engine.frame(start + Duration::from_millis(16), &mut renderer);
    assert!(drag.executed);
    assert_eq!(drag.node_updates, 1);
    assert_eq!(drag.edge_updates, 2);
    assert!(renderer.last_commands().contains(&Command::Edge {
        id: "n1->n2".to_owned(),
        visible: true
    }));
}

#[test]
fn selection_restyles_on_next_frame() {
    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    engine.load(pinned_row("n", 3, 40.0));
    engine.stop();

    let mut renderer = RecordingRenderer::default();
    let start = Instant::now();
    engine.frame(start, &mut renderer);

    assert!(engine.select(Some("n1")));
    let report = engine.frame(start + Duration::from_millis(16), &mut renderer);
    assert!(report.executed);
    assert_eq!(report.node_updates, 3);
}

#[test]
fn node_leaving_the_screen_is_hidden_once() {
    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    engine.load(pinned_row("n", 2, 100.0));
    engine.stop();

    let mut renderer = RecordingRenderer::default();
    let start = Instant::now();
    engine.frame(start, &mut renderer);

    assert!(engine.pin("n1", Some(vec2(5_000.0, 0.0))));
    engine.frame(start + Duration::from_millis(16), &mut renderer);
    let hides = renderer
        .last_commands()
        .iter()
        .filter(|command| {
            matches!(command, Command::Node { id, visible: false, .. } if id == "n1")
        })
        .count();
    assert_eq!(hides, 1);
    assert!(renderer
        .last_commands()
        .contains(&Command::Edge { id: "n0->n1".to_owned(), visible: false }));

    engine.pin("n1", Some(vec2(6_000.0, 0.0)));
    engine.frame(start + Duration::from_millis(32), &mut renderer);
    assert!(!renderer
        .last_commands()
        .iter()
        .any(|command| matches!(command, Command::Node { id, .. } if id == "n1")));
}

#[test]
fn manual_refresh_wakes_a_stopped_simulation() {
    let mut engine = GraphEngine::new(quick_config()).expect("valid config");
    engine.load(chain(5));
    engine.stop();
    assert!(!engine.simulation_state().running);

    engine.restart(RestartTrigger::ManualRefresh);
    let state = engine.simulation_state();
    assert!(state.running);
    assert!((state.alpha - 0.3).abs() < 1e-9);
}
