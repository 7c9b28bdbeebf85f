//! Shared tracking container
//!
//! [`HeadTracker`] is the single owner of the configuration, the filter state and
//! the runtime flags. The sample path and the control path both go through it.
//!
//! All three live behind one `tokio::sync::Mutex`. Each pipeline step and each
//! control operation takes the lock exactly once, so a command is applied either
//! entirely before or entirely after a given sample, never in the middle of one.

use crate::config::{ConfigOrigin, ConfigSource, MouseConfig};
use crate::sensor::OrientationSample;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::pipeline::{self, PipelineOutput};
use super::state::{RuntimeFlags, TrackingState};

/// Errors from control operations on the tracker
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrackerError {
    #[error("invalid sensitivity value")]
    InvalidSensitivity,

    #[error("invalid {} value", .0.name())]
    InvalidSetting(Setting),

    #[error("configuration reload failed: {0}")]
    Reload(String),
}

/// Single-valued tuning parameters adjustable at runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Setting {
    Smoothing,
    Deadzone,
    RollThreshold,
    ScrollSensitivity,
}

impl Setting {
    pub fn name(self) -> &'static str {
        match self {
            Setting::Smoothing => "smoothing",
            Setting::Deadzone => "deadzone",
            Setting::RollThreshold => "roll threshold",
            Setting::ScrollSensitivity => "scroll sensitivity",
        }
    }

    /// Smoothing must lie in 0.0-1.0, deadzone and roll threshold must not be
    /// negative, scroll sensitivity must be positive.
    pub fn accepts(self, value: f32) -> bool {
        value.is_finite()
            && match self {
                Setting::Smoothing => (0.0..=1.0).contains(&value),
                Setting::Deadzone | Setting::RollThreshold => value >= 0.0,
                Setting::ScrollSensitivity => value > 0.0,
            }
    }

    fn field(self, config: &mut MouseConfig) -> &mut f32 {
        match self {
            Setting::Smoothing => &mut config.smoothing,
            Setting::Deadzone => &mut config.deadzone,
            Setting::RollThreshold => &mut config.roll_scroll_threshold,
            Setting::ScrollSensitivity => &mut config.scroll_sensitivity,
        }
    }
}

/// Direction flags that can be flipped at runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvertTarget {
    X,
    Y,
    Scroll,
}

impl InvertTarget {
    fn flag(self, config: &mut MouseConfig) -> &mut bool {
        match self {
            InvertTarget::X => &mut config.invert_x,
            InvertTarget::Y => &mut config.invert_y,
            InvertTarget::Scroll => &mut config.invert_scroll,
        }
    }
}

#[derive(Debug, Default)]
struct TrackerCore {
    config: MouseConfig,
    state: TrackingState,
    flags: RuntimeFlags,
}

/// Point-in-time view used by `status`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusSnapshot {
    pub enabled: bool,
    pub paused: bool,
    pub sensitivity: f32,
}

#[derive(Debug)]
pub struct HeadTracker {
    core: Mutex<TrackerCore>,
    config_source: ConfigSource,
}

impl HeadTracker {
    pub fn new(config: MouseConfig, config_source: ConfigSource) -> Self {
        Self {
            core: Mutex::new(TrackerCore {
                config,
                ..TrackerCore::default()
            }),
            config_source,
        }
    }

    /// Tracker on default configuration that never reads files
    pub fn with_defaults() -> Self {
        Self::new(MouseConfig::default(), ConfigSource::defaults_only())
    }

    /// Runs one pipeline step. `None` when tracking is disabled or paused, in which
    /// case the filter state is left untouched.
    pub async fn process(&self, sample: &OrientationSample) -> Option<PipelineOutput> {
        let mut core = self.core.lock().await;
        if !core.flags.is_active() {
            return None;
        }
        let TrackerCore { config, state, .. } = &mut *core;
        Some(pipeline::translate(sample, state, config))
    }

    /// Flips `enabled`. Disabling also resets the filter state. Returns the new value.
    pub async fn toggle(&self) -> bool {
        let mut core = self.core.lock().await;
        core.flags.enabled = !core.flags.enabled;
        if !core.flags.enabled {
            core.state.reset();
        }
        info!(
            "Head tracking {}",
            if core.flags.enabled { "enabled" } else { "disabled" }
        );
        core.flags.enabled
    }

    pub async fn recenter(&self) {
        self.core.lock().await.state.reset();
        info!("Position recentered, next sample becomes the new reference");
    }

    pub async fn pause(&self) {
        self.core.lock().await.flags.paused = true;
        info!("Head tracking paused");
    }

    pub async fn resume(&self) {
        self.core.lock().await.flags.paused = false;
        info!("Head tracking resumed");
    }

    /// Re-reads configuration through the startup chain and swaps it in.
    pub async fn reload(&self) -> Result<ConfigOrigin, TrackerError> {
        // File I/O runs on the blocking pool, before the lock is taken
        let source = self.config_source.clone();
        let (config, origin) = tokio::task::spawn_blocking(move || source.load())
            .await
            .map_err(|e| TrackerError::Reload(e.to_string()))?;
        self.core.lock().await.config = config;
        info!("Configuration reloaded from {}", origin);
        Ok(origin)
    }

    pub async fn status(&self) -> StatusSnapshot {
        let core = self.core.lock().await;
        StatusSnapshot {
            enabled: core.flags.enabled,
            paused: core.flags.paused,
            sensitivity: core.config.sensitivity_yaw,
        }
    }

    /// Sets yaw and pitch sensitivity. Rejects values that are not positive and finite.
    pub async fn set_sensitivity(&self, value: f32) -> Result<f32, TrackerError> {
        if !is_valid_sensitivity(value) {
            debug!("Rejected sensitivity {}", value);
            return Err(TrackerError::InvalidSensitivity);
        }
        let mut core = self.core.lock().await;
        core.config.sensitivity_yaw = value;
        core.config.sensitivity_pitch = value;
        info!("Sensitivity set to {:.1}", value);
        Ok(value)
    }

    /// Adds `delta` to yaw and pitch sensitivity. Returns the new yaw sensitivity.
    ///
    /// An adjustment that would leave either axis at or below zero is rejected and
    /// nothing changes.
    pub async fn adjust_sensitivity(&self, delta: f32) -> Result<f32, TrackerError> {
        let mut core = self.core.lock().await;
        let yaw = core.config.sensitivity_yaw + delta;
        let pitch = core.config.sensitivity_pitch + delta;
        if !delta.is_finite() || !is_valid_sensitivity(yaw) || !is_valid_sensitivity(pitch) {
            debug!(
                "Rejected sensitivity adjustment {} from {}/{}",
                delta, core.config.sensitivity_yaw, core.config.sensitivity_pitch
            );
            return Err(TrackerError::InvalidSensitivity);
        }
        core.config.sensitivity_yaw = yaw;
        core.config.sensitivity_pitch = pitch;
        info!("Sensitivity adjusted by {:+.1} to {:.1}", delta, yaw);
        Ok(yaw)
    }

    /// Sets one tuning parameter after checking it against [`Setting::accepts`].
    pub async fn set_setting(&self, setting: Setting, value: f32) -> Result<f32, TrackerError> {
        if !setting.accepts(value) {
            debug!("Rejected {} {}", setting.name(), value);
            return Err(TrackerError::InvalidSetting(setting));
        }
        let mut core = self.core.lock().await;
        *setting.field(&mut core.config) = value;
        info!("{} set to {:.2}", setting.name(), value);
        Ok(value)
    }

    /// Flips one inversion flag. Returns the new value.
    pub async fn toggle_invert(&self, target: InvertTarget) -> bool {
        let mut core = self.core.lock().await;
        let flag = target.flag(&mut core.config);
        *flag = !*flag;
        let inverted = *flag;
        info!("{:?} inversion {}", target, if inverted { "on" } else { "off" });
        inverted
    }

    pub async fn config(&self) -> MouseConfig {
        self.core.lock().await.config.clone()
    }

    pub async fn tracking_state(&self) -> TrackingState {
        self.core.lock().await.state.clone()
    }

    pub async fn flags(&self) -> RuntimeFlags {
        self.core.lock().await.flags
    }
}

fn is_valid_sensitivity(value: f32) -> bool {
    value.is_finite() && value > 0.0
}
