//! # Mouse Configuration
//!
//! Tunable parameters of the orientation-to-pointer translation and the flat
//! `key = value` text format they are persisted in.
//!
//! The format is line based:
//!
//! ```text
//! # comment
//! sensitivity_yaw = 45.0
//! invert_y = true
//! ```
//!
//! Lines are applied one at a time on top of [`MouseConfig::default`]. A line that
//! cannot be understood is skipped; it never invalidates the rest of the file.

pub mod loader;

pub use loader::{ConfigOrigin, ConfigSource};

use tracing::{debug, warn};

/// Tunable parameters shared by the pipeline and the control plane.
///
/// Value ranges are not enforced here. Out-of-range values coming from a file are
/// reported through [`MouseConfig::range_warnings`] and then used as they are.
#[derive(Clone, Debug, PartialEq)]
pub struct MouseConfig {
    /// Pixels per degree of yaw
    pub sensitivity_yaw: f32,
    /// Pixels per degree of pitch
    pub sensitivity_pitch: f32,
    /// Minimum per-sample angle change in degrees before motion registers
    pub deadzone: f32,
    /// Exponential smoothing factor, 0.0 (off) to 1.0 (frozen)
    pub smoothing: f32,
    /// Roll angle in degrees beyond which the wheel starts scrolling
    pub roll_scroll_threshold: f32,
    /// Scroll clicks per degree of roll past the threshold
    pub scroll_sensitivity: f32,
    pub invert_x: bool,
    pub invert_y: bool,
    pub invert_scroll: bool,
    /// Yaw span mapped to the screen width. Not used by relative motion.
    pub yaw_range: f32,
    /// Pitch span mapped to the screen height. Not used by relative motion.
    pub pitch_range: f32,
}

impl Default for MouseConfig {
    /// The one place the built-in defaults live. Every entry point starts here.
    fn default() -> Self {
        Self {
            sensitivity_yaw: 45.0,
            sensitivity_pitch: 45.0,
            deadzone: 0.0,
            smoothing: 0.0,
            roll_scroll_threshold: 20.0,
            scroll_sensitivity: 0.1,
            invert_x: false,
            invert_y: true,
            invert_scroll: false,
            yaw_range: 40.0,
            pitch_range: 25.0,
        }
    }
}

/// Errors from reading or writing configuration files
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Could not determine user config directory")]
    NoConfigDir,
}

impl MouseConfig {
    /// Parses the flat text format on top of the defaults.
    pub fn parse(contents: &str) -> Self {
        let mut config = Self::default();
        for (index, line) in contents.lines().enumerate() {
            config.apply_line(index + 1, line);
        }
        config
    }

    // Returns false when the line was skipped
    fn apply_line(&mut self, line_no: usize, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return false;
        }

        let Some((key, value)) = line.split_once('=') else {
            warn!("Config line {} has no '=', skipping: {:?}", line_no, line);
            return false;
        };
        let key = key.trim();
        let value = value.trim();

        let float_field = match key {
            "sensitivity_yaw" => Some(&mut self.sensitivity_yaw),
            "sensitivity_pitch" => Some(&mut self.sensitivity_pitch),
            "deadzone" => Some(&mut self.deadzone),
            "smoothing" => Some(&mut self.smoothing),
            "roll_scroll_threshold" => Some(&mut self.roll_scroll_threshold),
            "scroll_sensitivity" => Some(&mut self.scroll_sensitivity),
            "yaw_range" => Some(&mut self.yaw_range),
            "pitch_range" => Some(&mut self.pitch_range),
            _ => None,
        };

        if let Some(field) = float_field {
            return match value.parse::<f32>() {
                Ok(parsed) => {
                    *field = parsed;
                    true
                }
                Err(e) => {
                    warn!(
                        "Config line {}: invalid number for {} ({:?}): {}",
                        line_no, key, value, e
                    );
                    false
                }
            };
        }

        let bool_field = match key {
            "invert_x" => Some(&mut self.invert_x),
            "invert_y" => Some(&mut self.invert_y),
            "invert_scroll" => Some(&mut self.invert_scroll),
            _ => None,
        };

        match bool_field {
            Some(field) => {
                *field = parse_flag(value);
                true
            }
            None => {
                debug!("Config line {}: ignoring unknown key {:?}", line_no, key);
                false
            }
        }
    }

    /// Renders the commented file format written by `--save-config`.
    pub fn to_config_string(&self) -> String {
        format!(
            "# Head Mouse Configuration\n\
             # Generated automatically - feel free to edit\n\
             \n\
             # Mouse sensitivity (higher = faster movement)\n\
             sensitivity_yaw = {:.1}\n\
             sensitivity_pitch = {:.1}\n\
             \n\
             # Movement filtering\n\
             deadzone = {:.2}\n\
             smoothing = {:.2}\n\
             \n\
             # Scroll control\n\
             roll_scroll_threshold = {:.1}\n\
             scroll_sensitivity = {:.2}\n\
             \n\
             # Axis inversion\n\
             invert_x = {}\n\
             invert_y = {}\n\
             invert_scroll = {}\n\
             \n\
             # Screen mapping ranges (degrees)\n\
             yaw_range = {:.1}\n\
             pitch_range = {:.1}\n",
            self.sensitivity_yaw,
            self.sensitivity_pitch,
            self.deadzone,
            self.smoothing,
            self.roll_scroll_threshold,
            self.scroll_sensitivity,
            self.invert_x,
            self.invert_y,
            self.invert_scroll,
            self.yaw_range,
            self.pitch_range,
        )
    }

    /// Human readable notes for values outside their documented ranges.
    pub fn range_warnings(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if self.sensitivity_yaw <= 0.0 {
            notes.push(format!("sensitivity_yaw {} is not positive", self.sensitivity_yaw));
        }
        if self.sensitivity_pitch <= 0.0 {
            notes.push(format!(
                "sensitivity_pitch {} is not positive",
                self.sensitivity_pitch
            ));
        }
        if self.deadzone < 0.0 {
            notes.push(format!("deadzone {} is negative", self.deadzone));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            notes.push(format!("smoothing {} is outside 0.0-1.0", self.smoothing));
        }
        if self.roll_scroll_threshold < 0.0 {
            notes.push(format!(
                "roll_scroll_threshold {} is negative",
                self.roll_scroll_threshold
            ));
        }
        if self.scroll_sensitivity <= 0.0 {
            notes.push(format!(
                "scroll_sensitivity {} is not positive",
                self.scroll_sensitivity
            ));
        }
        notes
    }
}

fn parse_flag(value: &str) -> bool {
    value == "true" || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_defaults() {
        assert_eq!(MouseConfig::parse(""), MouseConfig::default());
        assert_eq!(
            MouseConfig::parse("# only a comment\n\n"),
            MouseConfig::default()
        );
    }

    #[test]
    fn parses_known_keys() {
        let config = MouseConfig::parse(
            "sensitivity_yaw = 12.5\n\
             sensitivity_pitch=8\n\
             deadzone = 0.25\n\
             smoothing = 0.5\n\
             roll_scroll_threshold = 15\n\
             scroll_sensitivity = 0.3\n\
             invert_x = 1\n\
             invert_y = false\n\
             invert_scroll = true\n\
             yaw_range = 60\n\
             pitch_range = 30\n",
        );

        assert_eq!(config.sensitivity_yaw, 12.5);
        assert_eq!(config.sensitivity_pitch, 8.0);
        assert_eq!(config.deadzone, 0.25);
        assert_eq!(config.smoothing, 0.5);
        assert_eq!(config.roll_scroll_threshold, 15.0);
        assert_eq!(config.scroll_sensitivity, 0.3);
        assert!(config.invert_x);
        assert!(!config.invert_y);
        assert!(config.invert_scroll);
        assert_eq!(config.yaw_range, 60.0);
        assert_eq!(config.pitch_range, 30.0);
    }

    #[test]
    fn booleans_only_accept_true_or_one() {
        let config = MouseConfig::parse("invert_x = yes\ninvert_scroll = TRUE\ninvert_y = 0\n");
        assert!(!config.invert_x);
        assert!(!config.invert_scroll);
        assert!(!config.invert_y);
    }

    #[test]
    fn malformed_lines_are_skipped_individually() {
        let config = MouseConfig::parse(
            "deadzone = lots\n\
             garbage line\n\
             unknown_key = 3\n\
             smoothing = 0.75\n",
        );
        assert_eq!(config.deadzone, MouseConfig::default().deadzone);
        assert_eq!(config.smoothing, 0.75);
    }

    #[test]
    fn saved_format_reads_back() {
        let mut config = MouseConfig::default();
        config.sensitivity_yaw = 30.0;
        config.deadzone = 0.15;
        config.invert_x = true;
        config.invert_y = false;

        let text = config.to_config_string();
        assert!(text.starts_with("# Head Mouse Configuration"));
        assert!(text.contains("sensitivity_yaw = 30.0\n"));
        assert!(text.contains("invert_x = true\n"));
        assert_eq!(MouseConfig::parse(&text), config);
    }

    #[test]
    fn saved_format_layout() {
        let expected = "# Head Mouse Configuration
# Generated automatically - feel free to edit

# Mouse sensitivity (higher = faster movement)
sensitivity_yaw = 45.0
sensitivity_pitch = 45.0

# Movement filtering
deadzone = 0.00
smoothing = 0.00

# Scroll control
roll_scroll_threshold = 20.0
scroll_sensitivity = 0.10

# Axis inversion
invert_x = false
invert_y = true
invert_scroll = false

# Screen mapping ranges (degrees)
yaw_range = 40.0
pitch_range = 25.0
";
        assert_eq!(MouseConfig::default().to_config_string(), expected);
    }

    #[test]
    fn range_warnings_flag_out_of_range_values() {
        assert!(MouseConfig::default().range_warnings().is_empty());

        let config = MouseConfig::parse("smoothing = 1.5\nsensitivity_yaw = -1\n");
        let notes = config.range_warnings();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().any(|n| n.contains("smoothing")));
        assert!(notes.iter().any(|n| n.contains("sensitivity_yaw")));
    }
}
