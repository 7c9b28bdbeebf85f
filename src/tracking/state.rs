/// Filter memory carried from one sample to the next.
///
/// While `initialized` is false the next sample is a seed frame: it only sets the
/// reference angles and clears the accumulators, nothing is emitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackingState {
    pub last_yaw: f32,
    pub last_pitch: f32,
    pub last_roll: f32,
    /// Smoothed deltas of the previous frame, before accumulation
    pub last_dx: f32,
    pub last_dy: f32,
    /// Fractional pixels not yet emitted
    pub accum_x: f32,
    pub accum_y: f32,
    pub center_yaw: f32,
    pub center_pitch: f32,
    pub initialized: bool,
}

impl TrackingState {
    /// Forces the next sample to be treated as a seed frame.
    ///
    /// Only the flag is cleared here; the accumulators are zeroed by the seed step.
    pub fn reset(&mut self) {
        self.initialized = false;
    }
}

/// Gates on pipeline output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeFlags {
    pub enabled: bool,
    pub paused: bool,
}

impl Default for RuntimeFlags {
    fn default() -> Self {
        Self {
            enabled: true,
            paused: false,
        }
    }
}

impl RuntimeFlags {
    pub fn is_active(&self) -> bool {
        self.enabled && !self.paused
    }
}
