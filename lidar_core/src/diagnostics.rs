//! Per-sensor diagnostic counters (§3.6, §7).
//!
//! The single-writer model (§5) means these are plain counters, not
//! atomics: only the sensor's owning task ever mutates them. External
//! readers get a copy via [`Diagnostics::snapshot`], never a live
//! reference, matching "Reader access for external queries ... must go
//! through a copy-on-snapshot path."

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub invalid_input_points: u64,
    pub numerical_singularities: u64,
    pub state_exceeded_events: u64,
    pub capacity_exceeded_events: u64,
    pub frame_soft_budget_exceeded: u64,
    pub background_oscillations: u64,
    pub fragmentation_count: u64,
    pub frames_processed: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_invalid_input(&mut self) {
        self.invalid_input_points += 1;
    }

    pub fn record_numerical_singularity(&mut self) {
        self.numerical_singularities += 1;
    }

    pub fn record_state_exceeded(&mut self) {
        self.state_exceeded_events += 1;
    }

    pub fn record_capacity_exceeded(&mut self) {
        self.capacity_exceeded_events += 1;
    }

    pub fn record_background_oscillation(&mut self) {
        self.background_oscillations += 1;
    }

    pub fn record_fragmentation(&mut self) {
        self.fragmentation_count += 1;
    }

    /// Called by the caller (e.g. `lidar_env`'s drain loop) with the
    /// wall-clock duration of a frame; the core does no timing of its own
    /// since "frame computation is bounded by frame size, not
    /// wall-clock" (§5).
    pub fn record_frame_duration(&mut self, duration_secs: f64, soft_budget_secs: f64) {
        self.frames_processed += 1;
        if duration_secs > soft_budget_secs {
            self.frame_soft_budget_exceeded += 1;
        }
    }

    /// Copy-on-snapshot read for diagnostics consumers.
    pub fn snapshot(&self) -> Diagnostics {
        *self
    }
}
