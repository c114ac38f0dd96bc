use eframe::egui::{self, Align, Context, Layout, Ui};

use graphflux::{GraphEngine, PerformanceSnapshot, RestartTrigger};

use super::Viewer;

fn fps_text(snapshot: &PerformanceSnapshot) -> String {
    let mut parts = vec![format!("FPS {:.0}", snapshot.fps.current)];
    if snapshot.fps.average > 0.0 {
        parts.push(format!("avg {:.1}", snapshot.fps.average));
    }
    if snapshot.fps.frame_time_ms > f32::EPSILON {
        parts.push(format!("{:.1} ms", snapshot.fps.frame_time_ms));
    }
    if snapshot.should_optimize {
        parts.push("degraded".to_owned());
    }
    parts.join(" | ")
}

fn visible_text(snapshot: &PerformanceSnapshot) -> String {
    format!(
        "visible graph: {} / {} nodes, {} / {} edges",
        snapshot.visible_nodes, snapshot.total_nodes, snapshot.visible_edges, snapshot.total_edges
    )
}

impl Viewer {
    pub(super) fn show_top_bar(&mut self, ctx: &Context, reload_requested: &mut bool, is_loading: bool) {
        let snapshot = self.engine.performance_snapshot();
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("graphflux");
                    ui.separator();
                    ui.label(format!("dataset: {}", self.dataset_label));
                    ui.label(format!("epoch {}", snapshot.epoch));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload dataset"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(visible_text(&snapshot));
                        ui.label(fps_text(&snapshot));
                    });
                });
            });
    }

    pub(super) fn show_controls(&mut self, ctx: &Context) {
        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                draw_simulation_controls(ui, &mut self.engine);
                ui.separator();
                self.draw_performance(ui);
                ui.separator();
                draw_selection(ui, &mut self.engine);
            });
    }

    fn draw_performance(&mut self, ui: &mut Ui) {
        ui.heading("Performance");
        let slider = ui.add(egui::Slider::new(&mut self.target_fps, 15.0..=240.0).text("target fps"));
        if slider.changed() {
            self.engine.set_target_fps(self.target_fps);
        }

        let snapshot = self.engine.performance_snapshot();
        ui.label(format!(
            "fps {:.0} (low {:.0}, high {:.0})",
            snapshot.fps.current, snapshot.fps.low, snapshot.fps.high
        ));
        ui.label(format!(
            "last frame: {} commands",
            self.renderer.commands_last_frame()
        ));
        if let Some(frame) = self.renderer.last_frame() {
            ui.label(format!("generation {}", frame.generation));
        }
        if snapshot.drops.total() > 0 {
            ui.label(format!(
                "dropped: {} dangling, {} duplicate, {} self loops, {} bad weights",
                snapshot.drops.dangling_edges,
                snapshot.drops.duplicate_nodes,
                snapshot.drops.self_loops,
                snapshot.drops.invalid_weights
            ));
        }
    }
}

fn draw_simulation_controls(ui: &mut Ui, engine: &mut GraphEngine) {
    ui.heading("Simulation");
    let state = engine.simulation_state();
    ui.label(format!(
        "layout: {}",
        engine.config().physics.layout.label()
    ));
    ui.label(format!(
        "alpha {:.4}  |  tick {}  |  {}",
        state.alpha,
        state.tick_count,
        if state.paused {
            "paused"
        } else if state.running {
            "running"
        } else {
            "settled"
        }
    ));

    ui.horizontal(|ui| {
        let pause_label = if state.paused { "Resume" } else { "Pause" };
        if ui.button(pause_label).clicked() {
            if state.paused {
                engine.resume();
            } else {
                engine.pause();
            }
        }
        if ui.button("Refresh").clicked() {
            engine.restart(RestartTrigger::ManualRefresh);
        }
        if ui.button("Stop").clicked() {
            engine.stop();
        }
    });
    ui.small("Space pauses, R refreshes, S stops. Drag a node to pin it.");
}

fn draw_selection(ui: &mut Ui, engine: &mut GraphEngine) {
    ui.heading("Selection");
    let Some(selected) = engine.selected().map(str::to_owned) else {
        ui.label("Click a node to select it.");
        return;
    };

    let graph = engine.graph();
    if let Some(index) = graph.index_of(&selected) {
        let node = &graph.nodes[index];
        ui.label(format!("id: {}", node.id));
        if node.label != node.id {
            ui.label(format!("label: {}", node.label));
        }
        if let Some(group) = node.group.and_then(|group| graph.groups.get(group)) {
            ui.label(format!("group: {group}"));
        }
        ui.label(format!("degree: {}", graph.degree[index]));
    }
    if let Some(position) = engine.node_position(&selected) {
        ui.label(format!("position: ({:.1}, {:.1})", position.x, position.y));
    }

    ui.horizontal(|ui| {
        if ui.button("Center").clicked() {
            engine.center_on(&selected);
        }
        if ui.button("Unpin").clicked() {
            engine.pin(&selected, None);
        }
        if ui.button("Clear").clicked() {
            engine.select(None);
        }
    });
}
