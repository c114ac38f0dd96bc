use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2, vec2};

use graphflux::{EdgeUpdate, FrameInfo, NodeUpdate, Outline, SceneRenderer, Tier};

struct RetainedNode {
    screen_pos: Pos2,
    radius: f32,
    fill: Color32,
    outline: Outline,
    label: Option<String>,
}

struct RetainedEdge {
    from: Pos2,
    to: Pos2,
    stroke: Stroke,
}

/// Keeps the last command per entity and repaints all of them every egui
/// frame. Positions are relative to the canvas' top-left corner.
#[derive(Default)]
pub(super) struct EguiSceneRenderer {
    nodes: Vec<Option<RetainedNode>>,
    edges: Vec<Option<RetainedEdge>>,
    last_frame: Option<FrameInfo>,
    commands_last_frame: usize,
    commands_in_frame: usize,
}

fn slot<T>(slots: &mut Vec<Option<T>>, index: usize) -> &mut Option<T> {
    if slots.len() <= index {
        slots.resize_with(index + 1, || None);
    }
    &mut slots[index]
}

fn outline_stroke(outline: Outline) -> Option<Stroke> {
    match outline {
        Outline::None => None,
        Outline::Standard => Some(Stroke::new(
            1.0,
            Color32::from_rgba_unmultiplied(15, 15, 15, 190),
        )),
        Outline::Pinned => Some(Stroke::new(1.6, Color32::from_gray(225))),
        Outline::Hovered => Some(Stroke::new(2.0, Color32::from_rgb(255, 164, 101))),
        Outline::Selected => Some(Stroke::new(2.4, Color32::from_rgb(245, 206, 93))),
    }
}

impl EguiSceneRenderer {
    pub(super) fn last_frame(&self) -> Option<FrameInfo> {
        self.last_frame
    }

    pub(super) fn commands_last_frame(&self) -> usize {
        self.commands_last_frame
    }

    pub(super) fn paint(&self, painter: &Painter, rect: Rect) {
        let origin = rect.min.to_vec2();

        for edge in self.edges.iter().flatten() {
            painter.line_segment([edge.from + origin, edge.to + origin], edge.stroke);
        }

        for node in self.nodes.iter().flatten() {
            let position = node.screen_pos + origin;
            painter.circle_filled(position, node.radius, node.fill);
            if let Some(stroke) = outline_stroke(node.outline) {
                painter.circle_stroke(position, node.radius, stroke);
            }
            if let Some(label) = &node.label {
                painter.text(
                    position + vec2(node.radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    label,
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }
    }
}

impl SceneRenderer for EguiSceneRenderer {
    fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.last_frame = None;
    }

    fn begin_frame(&mut self, frame: FrameInfo) {
        self.last_frame = Some(frame);
        self.commands_in_frame = 0;
    }

    fn update_edge(&mut self, update: &EdgeUpdate<'_>) {
        self.commands_in_frame += 1;
        let retained = slot(&mut self.edges, update.index);
        if !update.visible {
            *retained = None;
            return;
        }
        *retained = Some(RetainedEdge {
            from: update.from,
            to: update.to,
            stroke: Stroke::new(update.stroke_width, update.color.gamma_multiply(update.alpha)),
        });
    }

    fn update_node(&mut self, update: &NodeUpdate<'_>) {
        self.commands_in_frame += 1;
        let retained = slot(&mut self.nodes, update.index);
        if !update.visible {
            *retained = None;
            return;
        }
        *retained = Some(RetainedNode {
            screen_pos: update.screen_pos,
            radius: update.radius,
            fill: if update.tier == Tier::Minimal {
                update.fill.gamma_multiply(0.8)
            } else {
                update.fill
            },
            outline: update.outline,
            label: update.label_visible.then(|| update.label.to_owned()),
        });
    }

    fn end_frame(&mut self) {
        self.commands_last_frame = self.commands_in_frame;
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, offset: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + offset;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}
