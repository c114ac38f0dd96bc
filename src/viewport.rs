use eframe::egui::{Pos2, Rect, Vec2, vec2};

use crate::config::ViewportConfig;

/// Camera over the world plane. `offset` is the pan in screen pixels and
/// `scale` the zoom factor; the screen origin is the top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    offset: Vec2,
    scale: f32,
    width: f32,
    height: f32,
    min_zoom: f32,
    max_zoom: f32,
    revision: u64,
}

impl Viewport {
    /// Expects a validated config; bounds are not re-checked here.
    pub fn new(config: &ViewportConfig) -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: config.initial_zoom.clamp(config.min_zoom, config.max_zoom),
            width: config.width.max(0.0),
            height: config.height.max(0.0),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            revision: 0,
        }
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn size(&self) -> Vec2 {
        vec2(self.width, self.height)
    }

    pub fn zoom_bounds(&self) -> (f32, f32) {
        (self.min_zoom, self.max_zoom)
    }

    /// Bumped on every mutation that changes the transform or the screen.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn screen_center(&self) -> Pos2 {
        Pos2::new(self.width * 0.5, self.height * 0.5)
    }

    pub fn screen_rect(&self) -> Rect {
        Rect::from_min_size(Pos2::ZERO, self.size())
    }

    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    pub fn world_to_screen(&self, world: Vec2) -> Pos2 {
        self.screen_center() + self.offset + world * self.scale
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Vec2 {
        (screen - self.screen_center() - self.offset) / self.scale
    }

    /// World-space rectangle currently covered by the screen.
    pub fn visible_world_rect(&self) -> Rect {
        let min = self.screen_to_world(Pos2::ZERO);
        let max = self.screen_to_world(Pos2::new(self.width, self.height));
        Rect::from_min_max(min.to_pos2(), max.to_pos2())
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Zooms so that the world point under `anchor` stays under `anchor`.
    /// Out-of-range scales are clamped; non-finite requests are ignored.
    pub fn set_scale(&mut self, scale: f32, anchor: Pos2) -> bool {
        if !scale.is_finite() || !anchor.x.is_finite() || !anchor.y.is_finite() {
            return false;
        }

        let next_scale = scale.clamp(self.min_zoom, self.max_zoom);
        let world_before = self.screen_to_world(anchor);
        let next_offset = anchor - self.screen_center() - world_before * next_scale;
        if next_scale == self.scale && next_offset == self.offset {
            return false;
        }

        self.scale = next_scale;
        self.offset = next_offset;
        self.touch();
        true
    }

    pub fn zoom_by(&mut self, factor: f32, anchor: Pos2) -> bool {
        self.set_scale(self.scale * factor, anchor)
    }

    pub fn pan_by(&mut self, delta: Vec2) -> bool {
        if !delta.is_finite() || delta == Vec2::ZERO {
            return false;
        }
        self.offset += delta;
        self.touch();
        true
    }

    /// Moves the camera so `world` lands on the screen center.
    pub fn center_on(&mut self, world: Vec2) -> bool {
        if !world.is_finite() {
            return false;
        }
        let next_offset = -world * self.scale;
        if next_offset == self.offset {
            return false;
        }
        self.offset = next_offset;
        self.touch();
        true
    }

    pub fn set_screen_size(&mut self, width: f32, height: f32) -> bool {
        if !(width.is_finite() && height.is_finite()) {
            return false;
        }
        let (width, height) = (width.max(0.0), height.max(0.0));
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.touch();
        true
    }
}
