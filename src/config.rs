use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    Standard,
    /// Nodes sharing a `group` are pulled towards a common anchor.
    Clustered,
}

impl LayoutMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Clustered => "clustered",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub viewport: ViewportConfig,
    pub spatial: SpatialConfig,
    pub lod: LodConfig,
    pub physics: PhysicsConfig,
    pub performance: PerformanceConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub initial_zoom: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            min_zoom: 0.05,
            max_zoom: 6.0,
            initial_zoom: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    pub cell_size: f32,
    pub max_nearest_rings: u32,
    /// Hit-test tolerance in screen pixels beyond a node's drawn radius.
    pub hit_tolerance_px: f32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            cell_size: 100.0,
            max_nearest_rings: 5,
            hit_tolerance_px: 6.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Pixels on a 1000px reference diagonal.
    pub full_threshold: f32,
    pub reduced_threshold: f32,
    pub cull_margin_px: f32,
    pub medium_node_watermark: usize,
    pub high_node_watermark: usize,
    pub medium_scale: f32,
    pub high_scale: f32,
    pub high_edge_watermark: usize,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            full_threshold: 400.0,
            reduced_threshold: 800.0,
            cull_margin_px: 64.0,
            medium_node_watermark: 500,
            high_node_watermark: 1000,
            medium_scale: 0.8,
            high_scale: 0.6,
            high_edge_watermark: 2000,
        }
    }
}

/// Force parameters for one layout mode.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForceProfile {
    pub link_distance: f32,
    pub link_strength_scale: f32,
    pub charge_strength: f32,
    pub charge_distance_min: f32,
    pub charge_distance_max: f32,
    pub theta: f32,
    pub center_strength: f32,
    pub collision_strength: f32,
    pub collision_padding: f32,
    pub cluster_strength: f32,
    pub cluster_ring_radius: f32,
}

impl ForceProfile {
    pub fn standard() -> Self {
        Self {
            link_distance: 60.0,
            link_strength_scale: 1.0,
            charge_strength: -120.0,
            charge_distance_min: 1.0,
            charge_distance_max: 900.0,
            theta: 0.9,
            center_strength: 1.0,
            collision_strength: 0.7,
            collision_padding: 2.0,
            cluster_strength: 0.0,
            cluster_ring_radius: 0.0,
        }
    }

    pub fn clustered() -> Self {
        Self {
            link_distance: 45.0,
            link_strength_scale: 0.6,
            charge_strength: -80.0,
            charge_distance_min: 1.0,
            charge_distance_max: 600.0,
            theta: 0.9,
            center_strength: 0.6,
            collision_strength: 0.9,
            collision_padding: 3.0,
            cluster_strength: 0.08,
            cluster_ring_radius: 420.0,
        }
    }

    pub fn for_mode(mode: LayoutMode) -> Self {
        match mode {
            LayoutMode::Standard => Self::standard(),
            LayoutMode::Clustered => Self::clustered(),
        }
    }
}

impl Default for ForceProfile {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RestartProfile {
    pub alpha: f64,
    /// Replaces the configured decay while this restart is settling.
    pub alpha_decay: Option<f64>,
}

impl Default for RestartProfile {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            alpha_decay: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub layout: LayoutMode,
    /// Overrides the layout mode's default force parameters.
    pub forces: Option<ForceProfile>,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub alpha_target: f64,
    pub velocity_decay: f32,
    pub warm_start_ticks: usize,
    pub initial_load: RestartProfile,
    pub data_changed: RestartProfile,
    pub manual_refresh: RestartProfile,
}

impl PhysicsConfig {
    pub fn force_profile(&self) -> ForceProfile {
        self.forces
            .unwrap_or_else(|| ForceProfile::for_mode(self.layout))
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f64;
        Self {
            layout: LayoutMode::Standard,
            forces: None,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.4,
            warm_start_ticks: 300,
            initial_load: RestartProfile {
                alpha: 1.0,
                alpha_decay: None,
            },
            data_changed: RestartProfile {
                alpha: 0.6,
                alpha_decay: None,
            },
            manual_refresh: RestartProfile {
                alpha: 0.3,
                alpha_decay: Some(0.05),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub target_fps: f32,
    pub degrade_ratio: f32,
    /// Gaps between paints longer than this are idle time, not frames.
    pub idle_gap_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            degrade_ratio: 0.8,
            idle_gap_ms: 500,
        }
    }
}

fn check_range(
    name: &'static str,
    range: &'static str,
    value: f64,
    valid: bool,
) -> Result<(), ConfigError> {
    if valid && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, range, value })
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let viewport = &self.viewport;
        if !(viewport.min_zoom.is_finite() && viewport.max_zoom.is_finite())
            || viewport.min_zoom <= 0.0
            || viewport.max_zoom <= 0.0
        {
            return Err(ConfigError::NonPositiveZoom {
                min: viewport.min_zoom,
                max: viewport.max_zoom,
            });
        }
        if viewport.min_zoom > viewport.max_zoom {
            return Err(ConfigError::InvertedZoomBounds {
                min: viewport.min_zoom,
                max: viewport.max_zoom,
            });
        }
        if !(viewport.min_zoom..=viewport.max_zoom).contains(&viewport.initial_zoom) {
            return Err(ConfigError::InitialZoomOutOfBounds {
                initial: viewport.initial_zoom,
                min: viewport.min_zoom,
                max: viewport.max_zoom,
            });
        }
        check_range(
            "viewport width",
            "[0, inf)",
            viewport.width as f64,
            viewport.width >= 0.0,
        )?;
        check_range(
            "viewport height",
            "[0, inf)",
            viewport.height as f64,
            viewport.height >= 0.0,
        )?;

        let spatial = &self.spatial;
        if !spatial.cell_size.is_finite() || spatial.cell_size <= 0.0 {
            return Err(ConfigError::NonPositiveCellSize(spatial.cell_size));
        }
        check_range(
            "hit tolerance",
            "[0, inf)",
            spatial.hit_tolerance_px as f64,
            spatial.hit_tolerance_px >= 0.0,
        )?;

        let lod = &self.lod;
        if !(lod.full_threshold.is_finite() && lod.reduced_threshold.is_finite())
            || lod.full_threshold <= 0.0
            || lod.full_threshold > lod.reduced_threshold
        {
            return Err(ConfigError::InvalidLodThresholds {
                full: lod.full_threshold,
                reduced: lod.reduced_threshold,
            });
        }
        if lod.medium_node_watermark > lod.high_node_watermark {
            return Err(ConfigError::InvertedWatermarks {
                medium: lod.medium_node_watermark,
                high: lod.high_node_watermark,
            });
        }
        check_range(
            "LOD medium scale",
            "(0, 1]",
            lod.medium_scale as f64,
            lod.medium_scale > 0.0 && lod.medium_scale <= 1.0,
        )?;
        check_range(
            "LOD high scale",
            "(0, 1]",
            lod.high_scale as f64,
            lod.high_scale > 0.0 && lod.high_scale <= 1.0,
        )?;
        check_range(
            "cull margin",
            "[0, inf)",
            lod.cull_margin_px as f64,
            lod.cull_margin_px >= 0.0,
        )?;

        let physics = &self.physics;
        check_range(
            "alpha_min",
            "[0, 1)",
            physics.alpha_min,
            (0.0..1.0).contains(&physics.alpha_min),
        )?;
        check_range(
            "alpha_decay",
            "(0, 1)",
            physics.alpha_decay,
            physics.alpha_decay > 0.0 && physics.alpha_decay < 1.0,
        )?;
        check_range(
            "alpha_target",
            "[0, 1]",
            physics.alpha_target,
            (0.0..=1.0).contains(&physics.alpha_target),
        )?;
        check_range(
            "velocity_decay",
            "[0, 1]",
            physics.velocity_decay as f64,
            (0.0..=1.0).contains(&physics.velocity_decay),
        )?;
        for (name, profile) in [
            ("initial_load alpha", physics.initial_load),
            ("data_changed alpha", physics.data_changed),
            ("manual_refresh alpha", physics.manual_refresh),
        ] {
            check_range(name, "[0, 1]", profile.alpha, (0.0..=1.0).contains(&profile.alpha))?;
            if let Some(decay) = profile.alpha_decay {
                check_range("restart alpha_decay", "(0, 1)", decay, decay > 0.0 && decay < 1.0)?;
            }
        }
        if physics.warm_start_ticks == 0 {
            return Err(ConfigError::ZeroWarmStartCap);
        }
        let forces = physics.force_profile();
        check_range(
            "charge distance bounds",
            "0 < min <= max",
            forces.charge_distance_min as f64,
            forces.charge_distance_min > 0.0
                && forces.charge_distance_min <= forces.charge_distance_max,
        )?;
        check_range(
            "theta",
            "(0, inf)",
            forces.theta as f64,
            forces.theta > 0.0,
        )?;

        let performance = &self.performance;
        if !performance.target_fps.is_finite() || performance.target_fps <= 0.0 {
            return Err(ConfigError::NonPositiveTargetFps(performance.target_fps));
        }
        check_range(
            "degrade ratio",
            "(0, 1]",
            performance.degrade_ratio as f64,
            performance.degrade_ratio > 0.0 && performance.degrade_ratio <= 1.0,
        )?;
        check_range(
            "idle gap",
            "[1, inf) ms",
            performance.idle_gap_ms as f64,
            performance.idle_gap_ms >= 1,
        )?;

        Ok(())
    }
}
