use eframe::egui::Color32;

use crate::model::{Node, Tier};

const GROUP_PALETTE: [Color32; 8] = [
    Color32::from_rgb(103, 196, 255),
    Color32::from_rgb(246, 137, 92),
    Color32::from_rgb(134, 214, 120),
    Color32::from_rgb(214, 128, 232),
    Color32::from_rgb(247, 194, 111),
    Color32::from_rgb(96, 214, 196),
    Color32::from_rgb(236, 104, 134),
    Color32::from_rgb(170, 170, 250),
];

const HOVER_COLOR: Color32 = Color32::from_rgb(255, 164, 101);
const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
const EDGE_COLOR: Color32 = Color32::from_rgb(120, 128, 140);
/// Largest on-screen node radius before the tier factor.
pub const MAX_NODE_SCREEN_RADIUS: f32 = 46.0;

const EDGE_HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(241, 146, 94);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outline {
    None,
    Standard,
    Hovered,
    Selected,
    Pinned,
}

pub fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Blue for small nodes through to orange for the largest.
pub fn radius_color(radius: f32, min: f32, max: f32) -> Color32 {
    let t = if max - min > f32::EPSILON {
        ((radius - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let r = (55.0 + (190.0 * t)) as u8;
    let g = (150.0 - (70.0 * t)) as u8;
    let b = (215.0 - (155.0 * t)) as u8;
    Color32::from_rgb(r, g, b)
}

pub fn group_color(group: usize) -> Color32 {
    GROUP_PALETTE[group % GROUP_PALETTE.len()]
}

/// Graph-wide inputs that stay fixed for one dataset generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleContext {
    pub min_radius: f32,
    pub max_radius: f32,
    pub selection_active: bool,
}

impl StyleContext {
    pub fn for_nodes(nodes: &[Node]) -> Self {
        let (min_radius, max_radius) = nodes.iter().fold(
            (f32::INFINITY, 0.0_f32),
            |(min, max), node| (min.min(node.radius), max.max(node.radius)),
        );
        Self {
            min_radius: if min_radius.is_finite() { min_radius } else { 0.0 },
            max_radius,
            selection_active: nodes.iter().any(|node| node.selected),
        }
    }
}

pub fn node_screen_radius(radius: f32, zoom: f32, tier: Tier) -> f32 {
    let scaled = (radius * zoom.powf(0.40)).clamp(2.5, MAX_NODE_SCREEN_RADIUS);
    match tier {
        Tier::Minimal => (scaled * 0.6).max(1.5),
        _ => scaled,
    }
}

pub fn node_fill(node: &Node, context: &StyleContext) -> Color32 {
    let base = match node.group {
        Some(group) => group_color(group),
        None => radius_color(node.radius, context.min_radius, context.max_radius),
    };

    if node.selected {
        SELECTED_COLOR
    } else if node.hovered {
        blend_color(base, HOVER_COLOR, 0.75)
    } else if context.selection_active {
        dim_color(base, 0.52)
    } else {
        base
    }
}

pub fn node_outline(node: &Node, pinned: bool, tier: Tier) -> Outline {
    if node.selected {
        Outline::Selected
    } else if node.hovered {
        Outline::Hovered
    } else if pinned {
        Outline::Pinned
    } else if tier == Tier::Full || tier == Tier::Reduced {
        Outline::Standard
    } else {
        Outline::None
    }
}

pub fn label_visible(node: &Node, tier: Tier, screen_radius: f32, zoom: f32) -> bool {
    node.selected
        || node.hovered
        || (tier == Tier::Full && (screen_radius > 17.0 || zoom > 1.35))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeStyle {
    pub width: f32,
    pub color: Color32,
    pub alpha: f32,
}

pub fn edge_style(tier: Tier, zoom: f32, weight: f32, highlighted: bool) -> EdgeStyle {
    let zoom_sqrt = zoom.max(0.0).sqrt();
    let weight_scale = weight.clamp(0.25, 4.0).sqrt();
    if highlighted {
        return EdgeStyle {
            width: (2.5 * zoom_sqrt * weight_scale).clamp(1.2, 4.4),
            color: EDGE_HIGHLIGHT_COLOR,
            alpha: 1.0,
        };
    }

    let (width, alpha) = match tier {
        Tier::Full => ((1.18 * zoom_sqrt * weight_scale).clamp(0.60, 3.4), 0.85),
        Tier::Reduced => ((0.9 * zoom_sqrt * weight_scale).clamp(0.5, 2.4), 0.55),
        Tier::Minimal | Tier::Culled => ((0.6 * zoom_sqrt).clamp(0.45, 1.2), 0.3),
    };
    EdgeStyle {
        width,
        color: EDGE_COLOR,
        alpha,
    }
}
