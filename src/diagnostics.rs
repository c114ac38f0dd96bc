use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::{DropCounters, DropReason};
use crate::scheduler::FrameReport;

/// Opt-in observer passed to [`crate::GraphEngine::with_diagnostics`].
/// Every hook has an empty default so callers implement only what they
/// inspect.
pub trait Diagnostics {
    fn entity_dropped(&mut self, _reason: DropReason, _id: &str) {}

    fn dataset_loaded(&mut self, _summary: &LoadSummary) {}

    fn warm_start_finished(&mut self, _ticks: usize, _settled: bool) {}

    fn simulation_settled(&mut self, _tick_count: u64) {}

    fn frame_completed(&mut self, _report: &FrameReport) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub epoch: u64,
    pub input_nodes: usize,
    pub input_edges: usize,
    pub accepted_nodes: usize,
    pub accepted_edges: usize,
    pub drops: DropCounters,
}

/// Frame reports kept by [`RecordingDiagnostics`]; older ones are dropped.
pub const RECORDED_FRAMES: usize = 600;

/// Keeps load events in memory and the last [`RECORDED_FRAMES`] frame
/// reports. Handy for tests and for hosts that want to dump the last load
/// on demand.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    pub drops: Vec<(DropReason, String)>,
    pub loads: Vec<LoadSummary>,
    pub warm_starts: Vec<(usize, bool)>,
    pub settled_at: Vec<u64>,
    pub frames: VecDeque<FrameReport>,
}

impl Diagnostics for RecordingDiagnostics {
    fn entity_dropped(&mut self, reason: DropReason, id: &str) {
        self.drops.push((reason, id.to_owned()));
    }

    fn dataset_loaded(&mut self, summary: &LoadSummary) {
        self.loads.push(*summary);
    }

    fn warm_start_finished(&mut self, ticks: usize, settled: bool) {
        self.warm_starts.push((ticks, settled));
    }

    fn simulation_settled(&mut self, tick_count: u64) {
        self.settled_at.push(tick_count);
    }

    fn frame_completed(&mut self, report: &FrameReport) {
        if self.frames.len() == RECORDED_FRAMES {
            self.frames.pop_front();
        }
        self.frames.push_back(*report);
    }
}

/// Lets a caller keep a handle on the observer it hands to the engine.
impl<T: Diagnostics + ?Sized> Diagnostics for Rc<RefCell<T>> {
    fn entity_dropped(&mut self, reason: DropReason, id: &str) {
        self.borrow_mut().entity_dropped(reason, id);
    }

    fn dataset_loaded(&mut self, summary: &LoadSummary) {
        self.borrow_mut().dataset_loaded(summary);
    }

    fn warm_start_finished(&mut self, ticks: usize, settled: bool) {
        self.borrow_mut().warm_start_finished(ticks, settled);
    }

    fn simulation_settled(&mut self, tick_count: u64) {
        self.borrow_mut().simulation_settled(tick_count);
    }

    fn frame_completed(&mut self, report: &FrameReport) {
        self.borrow_mut().frame_completed(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_log_keeps_only_the_latest_reports() {
        let mut recorder = RecordingDiagnostics::default();
        for generation in 0..(RECORDED_FRAMES as u64 + 25) {
            recorder.frame_completed(&FrameReport {
                generation,
                ..FrameReport::default()
            });
        }

        assert_eq!(recorder.frames.len(), RECORDED_FRAMES);
        assert_eq!(recorder.frames.front().map(|report| report.generation), Some(25));
        assert_eq!(
            recorder.frames.back().map(|report| report.generation),
            Some(RECORDED_FRAMES as u64 + 24)
        );
    }
}
