use std::time::Duration;

use serde::Serialize;
use strata_submit::SubmitCounters;

/// What one frame did. Counters are reset at the start of every frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub frame_index: u64,
    pub draw_calls: u32,
    pub triangles: u64,
    /// Pipeline, bind-group and buffer binds; per-draw object binds excluded.
    pub state_changes: u32,
    pub pipeline_binds: u32,
    pub bind_group_binds: u32,
    pub object_binds: u32,
    pub buffer_binds: u32,

    pub candidates: usize,
    pub visible: usize,
    pub culled: usize,
    pub shadow_draws: u32,

    pub sort_time: Duration,
    pub submit_time: Duration,
    pub frame_time: Duration,

    pub commands_dropped: usize,
    pub uniform_exhausted: usize,
    /// Draws whose transform or bone range was out of bounds.
    pub missing_transforms: usize,
    pub unknown_ids: u32,
    pub degenerate_planes: u32,

    pub shadows_skipped: bool,
    pub transparent_degraded: bool,
    pub static_cache_hit: bool,
    pub replayed_commands: usize,

    pub uniform_bytes: usize,
}

impl FrameStats {
    pub(crate) fn absorb(&mut self, counters: &SubmitCounters) {
        self.draw_calls += counters.draw_calls;
        self.triangles += counters.triangles;
        self.pipeline_binds += counters.pipeline_binds;
        self.bind_group_binds += counters.bind_group_binds;
        self.object_binds += counters.object_binds;
        self.buffer_binds += counters.buffer_binds;
        self.unknown_ids += counters.skipped;
        self.state_changes = self.pipeline_binds + self.bind_group_binds + self.buffer_binds;
    }

    /// True when any recovered condition fired this frame.
    pub fn degraded(&self) -> bool {
        self.commands_dropped > 0
            || self.uniform_exhausted > 0
            || self.missing_transforms > 0
            || self.unknown_ids > 0
            || self.degenerate_planes > 0
            || self.transparent_degraded
    }
}

impl std::fmt::Display for FrameStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Frame {}: draws={} tris={} state_changes={} (pipelines={}) visible={}/{} shadow_draws={} sort={:?} submit={:?} total={:?}",
            self.frame_index,
            self.draw_calls,
            self.triangles,
            self.state_changes,
            self.pipeline_binds,
            self.visible,
            self.candidates,
            self.shadow_draws,
            self.sort_time,
            self.submit_time,
            self.frame_time,
        )?;
        if self.static_cache_hit {
            write!(f, " cached={}", self.replayed_commands)?;
        }
        if self.degraded() {
            write!(
                f,
                " [dropped={} uniform_exhausted={} missing_transforms={} unknown={} degenerate={}{}]",
                self.commands_dropped,
                self.uniform_exhausted,
                self.missing_transforms,
                self.unknown_ids,
                self.degenerate_planes,
                if self.transparent_degraded {
                    " transparent_off"
                } else {
                    ""
                },
            )?;
        }
        Ok(())
    }
}

/// Ring of recent frame times.
#[derive(Debug)]
pub struct FrameTimer {
    history: Vec<Duration>,
    next: usize,
    len: usize,
}

impl FrameTimer {
    /// `capacity` of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            history: vec![Duration::ZERO; capacity.max(1)],
            next: 0,
            len: 0,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.next] = dt;
        self.next = (self.next + 1) % self.history.len();
        self.len = (self.len + 1).min(self.history.len());
    }

    fn recorded(&self) -> &[Duration] {
        &self.history[..self.len]
    }

    pub fn average(&self) -> Duration {
        if self.len == 0 {
            return Duration::ZERO;
        }
        self.recorded().iter().sum::<Duration>() / self.len as u32
    }

    pub fn max(&self) -> Duration {
        self.recorded().iter().copied().max().unwrap_or_default()
    }

    pub fn min(&self) -> Duration {
        self.recorded().iter().copied().min().unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.len
    }
}
