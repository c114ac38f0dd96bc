use eframe::egui::{Pos2, Rect, Vec2};

use crate::config::LodConfig;
use crate::model::Tier;
use crate::viewport::Viewport;

/// Thresholds are given in pixels on a screen of this diagonal (800x600).
pub const REFERENCE_DIAGONAL: f32 = 1000.0;

/// Global entity counts that drive adaptive thresholds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Load {
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Clone, Debug)]
pub struct LodSelector {
    config: LodConfig,
}

/// Per-frame constants of the LOD pass, derived once from the viewport.
#[derive(Clone, Copy, Debug)]
pub struct LodPass {
    cull_rect: Rect,
    center: Pos2,
    diagonal: f32,
    full: f32,
    reduced: f32,
    high_edge_load: bool,
}

impl LodSelector {
    pub fn new(config: LodConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    /// Threshold multiplier for the current node count.
    pub fn load_scale(&self, node_count: usize) -> f32 {
        if node_count > self.config.high_node_watermark {
            self.config.high_scale
        } else if node_count > self.config.medium_node_watermark {
            self.config.medium_scale
        } else {
            1.0
        }
    }

    pub fn thresholds(&self, node_count: usize) -> (f32, f32) {
        let scale = self.load_scale(node_count);
        (
            self.config.full_threshold * scale,
            self.config.reduced_threshold * scale,
        )
    }

    pub fn begin(&self, viewport: &Viewport, load: Load) -> LodPass {
        let (full, reduced) = self.thresholds(load.nodes);
        LodPass {
            cull_rect: viewport.screen_rect().expand(self.config.cull_margin_px),
            center: viewport.screen_center(),
            diagonal: viewport.diagonal(),
            full,
            reduced,
            high_edge_load: load.edges > self.config.high_edge_watermark,
        }
    }
}

impl LodPass {
    pub fn thresholds(&self) -> (f32, f32) {
        (self.full, self.reduced)
    }

    /// Tier for a point already projected to the screen.
    pub fn classify_screen(&self, screen: Pos2) -> Tier {
        if self.diagonal <= 0.0 || !self.cull_rect.contains(screen) {
            return Tier::Culled;
        }

        let normalized = (screen - self.center).length() / self.diagonal;
        self.classify_normalized(normalized)
    }

    /// Buckets a center distance expressed as a fraction of the diagonal.
    pub fn classify_normalized(&self, normalized: f32) -> Tier {
        let distance = normalized * REFERENCE_DIAGONAL;
        if distance <= self.full {
            Tier::Full
        } else if distance <= self.reduced {
            Tier::Reduced
        } else {
            Tier::Minimal
        }
    }

    pub fn classify_node(&self, viewport: &Viewport, position: Option<Vec2>) -> Tier {
        match position {
            Some(world) if world.is_finite() => {
                self.classify_screen(viewport.world_to_screen(world))
            }
            _ => Tier::Culled,
        }
    }

    /// Coarser endpoint wins; culled endpoints cull the edge.
    pub fn classify_edge(&self, source: Tier, target: Tier) -> Tier {
        if source == Tier::Culled || target == Tier::Culled {
            return Tier::Culled;
        }

        let tier = source.max(target);
        if self.high_edge_load && tier != Tier::Full {
            tier.downgraded()
        } else {
            tier
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::config::ViewportConfig;

    fn viewport() -> Viewport {
        Viewport::new(&ViewportConfig::default())
    }

    fn selector() -> LodSelector {
        LodSelector::new(LodConfig::default())
    }

    #[test]
    fn high_load_scales_thresholds() {
        let selector = selector();
        assert_eq!(selector.thresholds(100), (400.0, 800.0));

        let (full, reduced) = selector.thresholds(700);
        assert!((full - 320.0).abs() < 1e-3);
        assert!((reduced - 640.0).abs() < 1e-3);

        let (full, reduced) = selector.thresholds(1200);
        assert!((full - 240.0).abs() < 1e-3);
        assert!((reduced - 480.0).abs() < 1e-3);
    }

    #[test]
    fn half_diagonal_node_uses_scaled_thresholds() {
        let viewport = viewport();
        // (400, -300) projects to the top-right corner: half the diagonal
        // away from the center.
        let corner = vec2(400.0, -300.0);

        let light = selector().begin(&viewport, Load { nodes: 10, edges: 0 });
        assert_eq!(light.classify_node(&viewport, Some(corner)), Tier::Reduced);

        let heavy = selector().begin(&viewport, Load { nodes: 1200, edges: 0 });
        assert_eq!(heavy.classify_node(&viewport, Some(corner)), Tier::Minimal);
    }

    #[test]
    fn off_screen_and_unpositioned_nodes_are_culled() {
        let viewport = viewport();
        let pass = selector().begin(&viewport, Load::default());

        assert_eq!(pass.classify_node(&viewport, None), Tier::Culled);
        assert_eq!(pass.classify_node(&viewport, Some(vec2(2000.0, 0.0))), Tier::Culled);
        // Inside the buffer margin is still considered visible.
        assert_ne!(pass.classify_node(&viewport, Some(vec2(430.0, 0.0))), Tier::Culled);
        assert_eq!(pass.classify_node(&viewport, Some(vec2(470.0, 0.0))), Tier::Culled);
    }

    #[test]
    fn tier_never_gets_finer_with_distance() {
        let viewport = viewport();
        for nodes in [10, 700, 1200] {
            let pass = selector().begin(&viewport, Load { nodes, edges: 0 });
            let mut previous = Tier::Full;
            for step in 0..=60 {
                let normalized = step as f32 * 0.02;
                let tier = pass.classify_normalized(normalized);
                assert!(tier >= previous, "tier refined at {normalized}");
                previous = tier;
            }
        }
    }

    #[test]
    fn culled_endpoint_culls_edge() {
        let pass = selector().begin(&viewport(), Load::default());
        for tier in [Tier::Full, Tier::Reduced, Tier::Minimal, Tier::Culled] {
            assert!(!pass.classify_edge(tier, Tier::Culled).should_render());
            assert!(!pass.classify_edge(Tier::Culled, tier).should_render());
        }
    }

    #[test]
    fn edge_takes_coarser_endpoint() {
        let pass = selector().begin(&viewport(), Load::default());
        assert_eq!(pass.classify_edge(Tier::Full, Tier::Full), Tier::Full);
        assert_eq!(pass.classify_edge(Tier::Full, Tier::Minimal), Tier::Minimal);
        assert_eq!(pass.classify_edge(Tier::Reduced, Tier::Full), Tier::Reduced);
    }

    #[test]
    fn high_edge_load_downgrades_non_full_edges() {
        let pass = selector().begin(&viewport(), Load { nodes: 10, edges: 5000 });
        assert_eq!(pass.classify_edge(Tier::Full, Tier::Full), Tier::Full);
        assert_eq!(pass.classify_edge(Tier::Full, Tier::Reduced), Tier::Minimal);
        assert_eq!(pass.classify_edge(Tier::Minimal, Tier::Minimal), Tier::Minimal);
    }

    #[test]
    fn repeated_pass_is_idempotent() {
        let mut viewport = viewport();
        viewport.set_scale(1.7, Pos2::new(200.0, 100.0));
        let positions = (0..200)
            .map(|i| {
                let angle = i as f32 * 0.37;
                Some(vec2(angle.cos(), angle.sin()) * (i as f32 * 4.0))
            })
            .collect::<Vec<_>>();
        let load = Load { nodes: 800, edges: 2500 };

        let classify = || {
            let pass = selector().begin(&viewport, load);
            positions
                .iter()
                .map(|position| pass.classify_node(&viewport, *position))
                .collect::<Vec<_>>()
        };
        assert_eq!(classify(), classify());
    }

    #[test]
    fn empty_screen_culls_everything() {
        let mut viewport = viewport();
        viewport.set_screen_size(0.0, 0.0);
        let pass = selector().begin(&viewport, Load::default());
        assert_eq!(pass.classify_node(&viewport, Some(Vec2::ZERO)), Tier::Culled);
    }
}
