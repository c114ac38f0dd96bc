use eframe::egui::{self, Pos2, Rect, Ui};

use graphflux::{GraphEngine, RestartTrigger};

/// Pointer and keyboard handling for the graph canvas. Positions handed to
/// the engine are relative to the canvas' top-left corner.
#[derive(Default)]
pub(super) struct CanvasInput {
    dragged_node: Option<String>,
}

fn local(rect: Rect, pointer: Pos2) -> Pos2 {
    (pointer - rect.min).to_pos2()
}

impl CanvasInput {
    pub(super) fn handle(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        engine: &mut GraphEngine,
    ) {
        engine.set_screen_size(rect.width(), rect.height());
        let pointer = ui.input(|input| input.pointer.hover_pos());

        self.handle_zoom(ui, rect, response, engine, pointer);
        self.handle_drag(rect, response, engine);

        let hit = pointer
            .filter(|pointer| rect.contains(*pointer))
            .and_then(|pointer| engine.hit_test(local(rect, pointer)));
        engine.hover(hit.as_deref());
        if response.clicked() {
            engine.select(hit.as_deref());
        }

        if response.hovered() || response.has_focus() {
            handle_keys(ui, engine);
        }
    }

    fn handle_zoom(
        &self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        engine: &mut GraphEngine,
        pointer: Option<Pos2>,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let anchor = local(rect, pointer.unwrap_or_else(|| rect.center()));
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        engine.zoom_by(zoom_factor, anchor);
    }

    /// Primary drag on a node pins it under the pointer until release;
    /// any other drag pans.
    fn handle_drag(&mut self, rect: Rect, response: &egui::Response, engine: &mut GraphEngine) {
        if response.drag_started_by(egui::PointerButton::Primary) {
            self.dragged_node = response
                .interact_pointer_pos()
                .and_then(|pointer| engine.hit_test(local(rect, pointer)));
        }

        if response.dragged() {
            match (&self.dragged_node, response.interact_pointer_pos()) {
                (Some(id), Some(pointer)) => {
                    let world = engine.viewport().screen_to_world(local(rect, pointer));
                    engine.pin(id, Some(world));
                }
                _ => engine.pan_by(response.drag_delta()),
            }
        }

        if response.drag_stopped()
            && let Some(id) = self.dragged_node.take()
        {
            engine.pin(&id, None);
            engine.restart(RestartTrigger::ManualRefresh);
        }
    }
}

fn handle_keys(ui: &Ui, engine: &mut GraphEngine) {
    let (toggle_pause, refresh, stop) = ui.input(|input| {
        (
            input.key_pressed(egui::Key::Space),
            input.key_pressed(egui::Key::R),
            input.key_pressed(egui::Key::S),
        )
    });

    if toggle_pause {
        if engine.simulation_state().paused {
            engine.resume();
        } else {
            engine.pause();
        }
    }
    if refresh {
        engine.restart(RestartTrigger::ManualRefresh);
    }
    if stop {
        engine.stop();
    }
}
