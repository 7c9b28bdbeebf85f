//! Orientation-to-pointer translation
//!
//! Turns one [`OrientationSample`] into integer pointer and scroll deltas.
//!
//! ```text
//! angles ─► delta ─► wrap ─► deadzone ─► sensitivity ─► invert ─► smooth ─► accumulate ─► pixels
//!   roll ───────────────────────────────────────────────────────────────► threshold ─► clicks
//! ```
//!
//! All math is `f32`. Integer pixel and click counts are extracted by truncation
//! toward zero; the fractional pixel remainder stays in the accumulators.

use crate::config::MouseConfig;
use crate::sensor::OrientationSample;
use tracing::trace;

use super::state::TrackingState;

/// Relative pointer motion in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerMotion {
    pub dx: i32,
    pub dy: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Wheel movement produced by holding the head rolled past the threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollEvent {
    pub direction: ScrollDirection,
    pub clicks: u32,
}

impl ScrollEvent {
    /// Wheel value with up as positive
    pub fn signed_amount(&self) -> i32 {
        let clicks = i32::try_from(self.clicks).unwrap_or(i32::MAX);
        match self.direction {
            ScrollDirection::Up => clicks,
            ScrollDirection::Down => -clicks,
        }
    }
}

/// Everything one sample produced. Both parts are optional.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineOutput {
    pub motion: Option<PointerMotion>,
    pub scroll: Option<ScrollEvent>,
}

impl PipelineOutput {
    pub fn is_empty(&self) -> bool {
        self.motion.is_none() && self.scroll.is_none()
    }
}

/// Shortest-path correction for a yaw difference on the (-180, 180] circle.
pub fn wrap_delta(delta: f32) -> f32 {
    if delta > 180.0 {
        delta - 360.0
    } else if delta < -180.0 {
        delta + 360.0
    } else {
        delta
    }
}

/// Zeroes deltas inside the deadzone and shifts the rest toward zero by its width,
/// so output grows from 0 at the boundary instead of jumping.
pub fn apply_deadzone(delta: f32, deadzone: f32) -> f32 {
    if delta.abs() < deadzone {
        0.0
    } else {
        let sign = if delta > 0.0 { 1.0 } else { -1.0 };
        sign * (delta.abs() - deadzone)
    }
}

/// Runs one pipeline step. Callers gate on the runtime flags before calling.
pub fn translate(
    sample: &OrientationSample,
    state: &mut TrackingState,
    config: &MouseConfig,
) -> PipelineOutput {
    if !state.initialized {
        seed(sample, state);
        trace!(
            "Seed frame at {}: yaw={:.3} pitch={:.3} roll={:.3}",
            sample.timestamp.format("%H:%M:%S.%3f"),
            sample.yaw,
            sample.pitch,
            sample.roll
        );
        return PipelineOutput::default();
    }

    let delta_yaw = wrap_delta(sample.yaw - state.last_yaw);
    // Pitch stays within range on the sensor side, no wrap
    let delta_pitch = sample.pitch - state.last_pitch;

    let delta_yaw = apply_deadzone(delta_yaw, config.deadzone);
    let delta_pitch = apply_deadzone(delta_pitch, config.deadzone);

    let mut dx = delta_yaw * config.sensitivity_yaw;
    let mut dy = delta_pitch * config.sensitivity_pitch;

    if config.invert_x {
        dx = -dx;
    }
    if config.invert_y {
        dy = -dy;
    }

    let dx = dx * (1.0 - config.smoothing) + state.last_dx * config.smoothing;
    let dy = dy * (1.0 - config.smoothing) + state.last_dy * config.smoothing;

    state.accum_x += dx;
    state.accum_y += dy;

    // `as` truncates toward zero
    let move_x = state.accum_x as i32;
    let move_y = state.accum_y as i32;

    state.accum_x -= move_x as f32;
    state.accum_y -= move_y as f32;

    let motion = (move_x != 0 || move_y != 0).then_some(PointerMotion {
        dx: move_x,
        dy: move_y,
    });

    let scroll = roll_scroll(sample.roll, config);

    trace!(
        "Sample at {}: d_yaw={:.4} d_pitch={:.4} dx={:.4} dy={:.4} accum=({:.4},{:.4}) out={:?}/{:?}",
        sample.timestamp.format("%H:%M:%S.%3f"),
        delta_yaw,
        delta_pitch,
        dx,
        dy,
        state.accum_x,
        state.accum_y,
        motion,
        scroll
    );

    state.last_yaw = sample.yaw;
    state.last_pitch = sample.pitch;
    state.last_roll = sample.roll;
    state.last_dx = dx;
    state.last_dy = dy;

    PipelineOutput { motion, scroll }
}

fn seed(sample: &OrientationSample, state: &mut TrackingState) {
    state.last_yaw = sample.yaw;
    state.last_pitch = sample.pitch;
    state.last_roll = sample.roll;
    state.center_yaw = sample.yaw;
    state.center_pitch = sample.pitch;
    state.accum_x = 0.0;
    state.accum_y = 0.0;
    state.initialized = true;
}

fn roll_scroll(roll: f32, config: &MouseConfig) -> Option<ScrollEvent> {
    let abs_roll = roll.abs();
    if abs_roll <= config.roll_scroll_threshold {
        return None;
    }

    let amount = (abs_roll - config.roll_scroll_threshold) * config.scroll_sensitivity;
    let clicks = amount as i32;
    if clicks <= 0 {
        return None;
    }

    let up = (roll > 0.0) != config.invert_scroll;
    Some(ScrollEvent {
        direction: if up {
            ScrollDirection::Up
        } else {
            ScrollDirection::Down
        },
        clicks: clicks as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_config() -> MouseConfig {
        MouseConfig {
            sensitivity_yaw: 1.0,
            sensitivity_pitch: 1.0,
            invert_y: false,
            ..MouseConfig::default()
        }
    }

    fn sample(roll: f32, pitch: f32, yaw: f32) -> OrientationSample {
        OrientationSample::new(roll, pitch, yaw)
    }

    fn seeded(yaw: f32, pitch: f32, config: &MouseConfig) -> TrackingState {
        let mut state = TrackingState::default();
        let out = translate(&sample(0.0, pitch, yaw), &mut state, config);
        assert!(out.is_empty());
        state
    }

    #[test]
    fn deadzone_is_continuous() {
        assert_eq!(apply_deadzone(0.5, 1.0), 0.0);
        assert_eq!(apply_deadzone(-0.999, 1.0), 0.0);
        assert_eq!(apply_deadzone(1.0, 1.0), 0.0);
        assert_eq!(apply_deadzone(-1.0, 1.0), 0.0);
        assert_eq!(apply_deadzone(1.5, 1.0), 0.5);
        assert_eq!(apply_deadzone(-1.5, 1.0), -0.5);
        assert_eq!(apply_deadzone(3.0, 0.0), 3.0);
        assert_eq!(apply_deadzone(0.0, 0.0), 0.0);
    }

    #[test]
    fn yaw_wraps_the_short_way() {
        assert_eq!(wrap_delta(-179.0 - 179.0), 2.0);
        assert_eq!(wrap_delta(179.0 - -179.0), -2.0);
        assert_eq!(wrap_delta(180.0), 180.0);
        assert_eq!(wrap_delta(-10.0), -10.0);

        let config = MouseConfig {
            sensitivity_yaw: 10.0,
            ..plain_config()
        };
        let mut state = seeded(179.0, 0.0, &config);
        let out = translate(&sample(0.0, 0.0, -179.0), &mut state, &config);
        assert_eq!(out.motion, Some(PointerMotion { dx: 20, dy: 0 }));
    }

    #[test]
    fn seed_frame_sets_reference_only() {
        let config = plain_config();
        let mut state = TrackingState {
            accum_x: 0.7,
            accum_y: -0.3,
            ..TrackingState::default()
        };

        let out = translate(&sample(5.0, 10.0, 20.0), &mut state, &config);
        assert!(out.is_empty());
        assert!(state.initialized);
        assert_eq!(state.last_yaw, 20.0);
        assert_eq!(state.last_pitch, 10.0);
        assert_eq!(state.last_roll, 5.0);
        assert_eq!(state.center_yaw, 20.0);
        assert_eq!(state.center_pitch, 10.0);
        assert_eq!(state.accum_x, 0.0);
        assert_eq!(state.accum_y, 0.0);
    }

    #[test]
    fn seed_frame_emits_no_scroll_even_when_rolled() {
        let config = plain_config();
        let mut state = TrackingState::default();
        let out = translate(&sample(80.0, 0.0, 0.0), &mut state, &config);
        assert!(out.is_empty());
    }

    #[test]
    fn sensitivity_and_inversion() {
        let config = MouseConfig {
            sensitivity_yaw: 2.0,
            sensitivity_pitch: 3.0,
            invert_x: true,
            invert_y: true,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);
        let out = translate(&sample(0.0, 1.0, 2.0), &mut state, &config);
        assert_eq!(out.motion, Some(PointerMotion { dx: -4, dy: -3 }));
    }

    #[test]
    fn deadzone_applies_before_sensitivity() {
        let config = MouseConfig {
            sensitivity_yaw: 10.0,
            sensitivity_pitch: 10.0,
            deadzone: 0.5,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);

        let out = translate(&sample(0.0, 0.25, 0.25), &mut state, &config);
        assert!(out.motion.is_none());

        // yaw moved 1.5 from 0.25, pitch stayed
        let out = translate(&sample(0.0, 0.25, 1.75), &mut state, &config);
        assert_eq!(out.motion, Some(PointerMotion { dx: 10, dy: 0 }));
    }

    #[test]
    fn sub_pixel_motion_accumulates_exactly() {
        let config = MouseConfig {
            sensitivity_yaw: 0.25,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);

        let mut total = 0;
        let mut emitted_on = Vec::new();
        for step in 1..=8 {
            let out = translate(&sample(0.0, 0.0, step as f32), &mut state, &config);
            if let Some(motion) = out.motion {
                total += motion.dx;
                emitted_on.push(step);
            }
        }
        assert_eq!(total, 2);
        assert_eq!(emitted_on, vec![4, 8]);
        assert_eq!(state.accum_x, 0.0);
    }

    #[test]
    fn sub_pixel_motion_is_not_lost() {
        // 1 degree per step at 0.4 px/degree feeds 0.4 px per step
        let config = MouseConfig {
            sensitivity_yaw: 0.4,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);

        let mut total = 0;
        for step in 1..=10 {
            let out = translate(&sample(0.0, 0.0, step as f32), &mut state, &config);
            total += out.motion.map_or(0, |m| m.dx);
        }
        let carried = total as f32 + state.accum_x;
        assert!((carried - 4.0).abs() < 1e-4, "carried {}", carried);
        assert!((3..=4).contains(&total));
        assert!(state.accum_x.abs() < 1.0);
    }

    #[test]
    fn truncation_is_toward_zero_for_negative_deltas() {
        let config = MouseConfig {
            sensitivity_yaw: 0.5,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);

        let out = translate(&sample(0.0, 0.0, -1.0), &mut state, &config);
        assert!(out.motion.is_none());
        assert_eq!(state.accum_x, -0.5);

        let out = translate(&sample(0.0, 0.0, -2.0), &mut state, &config);
        assert_eq!(out.motion, Some(PointerMotion { dx: -1, dy: 0 }));
        assert_eq!(state.accum_x, 0.0);
    }

    #[test]
    fn zero_smoothing_passes_delta_through() {
        let config = MouseConfig {
            sensitivity_yaw: 4.0,
            smoothing: 0.0,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);
        state.last_dx = 100.0;

        let out = translate(&sample(0.0, 0.0, 1.0), &mut state, &config);
        assert_eq!(out.motion, Some(PointerMotion { dx: 4, dy: 0 }));
        assert_eq!(state.last_dx, 4.0);
    }

    #[test]
    fn full_smoothing_repeats_previous_delta() {
        let config = MouseConfig {
            smoothing: 1.0,
            ..plain_config()
        };
        let mut state = seeded(10.0, 0.0, &config);
        state.last_dx = 3.0;
        state.last_dy = -2.0;

        for _ in 0..5 {
            let out = translate(&sample(0.0, 0.0, 10.0), &mut state, &config);
            assert_eq!(out.motion, Some(PointerMotion { dx: 3, dy: -2 }));
            assert_eq!(state.last_dx, 3.0);
            assert_eq!(state.last_dy, -2.0);
        }
    }

    #[test]
    fn partial_smoothing_blends_with_previous_frame() {
        let config = MouseConfig {
            sensitivity_yaw: 10.0,
            smoothing: 0.5,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);

        let out = translate(&sample(0.0, 0.0, 1.0), &mut state, &config);
        assert_eq!(out.motion, Some(PointerMotion { dx: 5, dy: 0 }));
        assert_eq!(state.last_dx, 5.0);

        let out = translate(&sample(0.0, 0.0, 2.0), &mut state, &config);
        // 10 * 0.5 + 5 * 0.5
        assert_eq!(out.motion, Some(PointerMotion { dx: 7, dy: 0 }));
        assert_eq!(state.last_dx, 7.5);
        assert_eq!(state.accum_x, 0.5);
    }

    #[test]
    fn roll_at_threshold_does_not_scroll() {
        let config = MouseConfig {
            roll_scroll_threshold: 20.0,
            scroll_sensitivity: 1.0,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);
        let out = translate(&sample(20.0, 0.0, 0.0), &mut state, &config);
        assert!(out.scroll.is_none());
        let out = translate(&sample(-20.0, 0.0, 0.0), &mut state, &config);
        assert!(out.scroll.is_none());
    }

    #[test]
    fn roll_past_threshold_scrolls_truncated_clicks() {
        let config = MouseConfig {
            roll_scroll_threshold: 20.0,
            scroll_sensitivity: 0.5,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);

        let out = translate(&sample(25.0, 0.0, 0.0), &mut state, &config);
        assert_eq!(
            out.scroll,
            Some(ScrollEvent {
                direction: ScrollDirection::Up,
                clicks: 2
            })
        );

        let out = translate(&sample(-25.0, 0.0, 0.0), &mut state, &config);
        assert_eq!(
            out.scroll,
            Some(ScrollEvent {
                direction: ScrollDirection::Down,
                clicks: 2
            })
        );

        // One degree past the threshold is half a click
        let out = translate(&sample(21.0, 0.0, 0.0), &mut state, &config);
        assert!(out.scroll.is_none());
    }

    #[test]
    fn invert_scroll_flips_direction() {
        let config = MouseConfig {
            roll_scroll_threshold: 10.0,
            scroll_sensitivity: 1.0,
            invert_scroll: true,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);

        let out = translate(&sample(13.0, 0.0, 0.0), &mut state, &config);
        let scroll = out.scroll.unwrap();
        assert_eq!(scroll.direction, ScrollDirection::Down);
        assert_eq!(scroll.clicks, 3);
        assert_eq!(scroll.signed_amount(), -3);

        let out = translate(&sample(-13.0, 0.0, 0.0), &mut state, &config);
        assert_eq!(out.scroll.unwrap().signed_amount(), 3);
    }

    #[test]
    fn reset_forces_new_seed_frame() {
        let config = MouseConfig {
            sensitivity_yaw: 10.0,
            ..plain_config()
        };
        let mut state = seeded(0.0, 0.0, &config);
        translate(&sample(0.0, 0.0, 1.0), &mut state, &config);

        state.reset();
        let out = translate(&sample(0.0, 0.0, 50.0), &mut state, &config);
        assert!(out.is_empty());
        assert_eq!(state.center_yaw, 50.0);

        let out = translate(&sample(0.0, 0.0, 51.0), &mut state, &config);
        assert_eq!(out.motion, Some(PointerMotion { dx: 10, dy: 0 }));
    }
}
