use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::PerformanceConfig;

const FPS_SAMPLE_WINDOW: usize = 180;

/// Rolling frame-rate tracker. The degrade signal is derived from the
/// instantaneous rate, the window only feeds the snapshot statistics.
#[derive(Debug)]
pub struct PerformanceMonitor {
    target_fps: f32,
    degrade_ratio: f32,
    idle_gap: Duration,
    last_frame: Option<Instant>,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
    should_optimize: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameRateStats {
    pub current: f32,
    pub average: f32,
    pub low: f32,
    pub high: f32,
    pub frame_time_ms: f32,
}

impl PerformanceMonitor {
    pub fn new(config: &PerformanceConfig) -> Self {
        Self {
            target_fps: config.target_fps,
            degrade_ratio: config.degrade_ratio,
            idle_gap: Duration::from_millis(config.idle_gap_ms),
            last_frame: None,
            fps_current: 0.0,
            fps_samples: VecDeque::with_capacity(FPS_SAMPLE_WINDOW),
            should_optimize: false,
        }
    }

    pub fn target_fps(&self) -> f32 {
        self.target_fps
    }

    pub fn set_target_fps(&mut self, target_fps: f32) {
        if target_fps.is_finite() && target_fps > 0.0 {
            self.target_fps = target_fps;
            self.should_optimize = self.below_target(self.fps_current);
        }
    }

    fn below_target(&self, fps: f32) -> bool {
        fps > 0.0 && fps < self.target_fps * self.degrade_ratio
    }

    /// Records a paint callback at `now`. The first call only arms the clock.
    pub fn record_frame(&mut self, now: Instant) -> bool {
        if let Some(previous) = self.last_frame.replace(now) {
            self.record_frame_time(now.saturating_duration_since(previous));
        }
        self.should_optimize
    }

    /// Feeds one frame duration. Zero deltas and gaps past the idle limit
    /// are not samples: an on-demand host sleeps between repaints.
    pub fn record_frame_time(&mut self, delta: Duration) {
        let seconds = delta.as_secs_f32();
        if seconds <= f32::EPSILON || delta > self.idle_gap {
            return;
        }

        self.fps_current = (1.0 / seconds).clamp(0.0, 1000.0);
        self.fps_samples.push_back(self.fps_current);
        while self.fps_samples.len() > FPS_SAMPLE_WINDOW {
            self.fps_samples.pop_front();
        }
        self.should_optimize = self.below_target(self.fps_current);
    }

    pub fn should_optimize(&self) -> bool {
        self.should_optimize
    }

    pub fn stats(&self) -> FrameRateStats {
        let average = if self.fps_samples.is_empty() {
            0.0
        } else {
            self.fps_samples.iter().sum::<f32>() / self.fps_samples.len() as f32
        };
        FrameRateStats {
            current: self.fps_current,
            average,
            low: self.fps_samples.iter().copied().reduce(f32::min).unwrap_or(0.0),
            high: self.fps_samples.iter().copied().reduce(f32::max).unwrap_or(0.0),
            frame_time_ms: if self.fps_current > f32::EPSILON {
                1000.0 / self.fps_current
            } else {
                0.0
            },
        }
    }

    /// Forgets timing history, e.g. after the host was suspended.
    pub fn reset(&mut self) {
        self.last_frame = None;
        self.fps_current = 0.0;
        self.fps_samples.clear();
        self.should_optimize = false;
    }
}
