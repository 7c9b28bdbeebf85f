//! Sensor subsystem for head orientation input
//!
//! 1. [`OrientationSample`] - one decoded orientation reading
//! 2. [`SensorDriver`] - the seam a device driver plugs into
//! 3. [`sample_feed`] - bounded queue between the driver callback and the pipeline
//! 4. [`replay`] - driver that replays recorded samples from a file or stdin
//!
//! ```text
//! Driver thread ──► SampleCallback ──► mpsc (bounded) ──► pipeline task
//! ```

pub mod replay;
pub mod sample_feed;

pub use replay::{ReplayDriver, ReplayFormat};
pub use sample_feed::{SampleCallback, SampleFeed};

use chrono::{DateTime, Local};
use std::fmt;

/// Length of a full IMU payload including the quaternion block
pub const IMU_FRAME_LEN: usize = 36;

/// Minimum payload length carrying roll, pitch and yaw
pub const IMU_ANGLES_LEN: usize = 12;

/// Orientation quaternion as delivered by the sensor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// One orientation reading. Angles are degrees in (-180, 180].
#[derive(Clone, Debug, PartialEq)]
pub struct OrientationSample {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    /// Carried through for completeness, the translation ignores it
    pub quaternion: Option<Quaternion>,
    /// Host time the sample was received
    pub timestamp: DateTime<Local>,
    /// Device tick counter in milliseconds, when the driver supplies one
    pub device_timestamp_ms: Option<u32>,
}

impl OrientationSample {
    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self {
            roll,
            pitch,
            yaw,
            quaternion: None,
            timestamp: Local::now(),
            device_timestamp_ms: None,
        }
    }

    pub fn with_quaternion(mut self, quaternion: Quaternion) -> Self {
        self.quaternion = Some(quaternion);
        self
    }

    /// Decodes a raw IMU payload.
    ///
    /// Roll, pitch and yaw are big-endian `f32` at offsets 0, 4 and 8. Payloads of
    /// [`IMU_FRAME_LEN`] bytes or more also carry a quaternion (w, x, y, z) at
    /// offsets 20, 24, 28 and 32.
    pub fn from_imu_payload(data: &[u8], device_timestamp_ms: u32) -> Result<Self, SensorError> {
        if data.len() < IMU_ANGLES_LEN {
            return Err(SensorError::ShortPayload {
                expected: IMU_ANGLES_LEN,
                actual: data.len(),
            });
        }

        let quaternion = if data.len() >= IMU_FRAME_LEN {
            Some(Quaternion {
                w: read_be_f32(data, 20),
                x: read_be_f32(data, 24),
                y: read_be_f32(data, 28),
                z: read_be_f32(data, 32),
            })
        } else {
            None
        };

        Ok(Self {
            roll: read_be_f32(data, 0),
            pitch: read_be_f32(data, 4),
            yaw: read_be_f32(data, 8),
            quaternion,
            timestamp: Local::now(),
            device_timestamp_ms: Some(device_timestamp_ms),
        })
    }
}

// Callers check the length first
fn read_be_f32(data: &[u8], offset: usize) -> f32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    f32::from_be_bytes(bytes)
}

/// Sample rates the sensor can be switched to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ImuRate {
    Hz60,
    Hz90,
    #[default]
    Hz120,
    Hz240,
}

impl ImuRate {
    pub fn hz(self) -> u32 {
        match self {
            ImuRate::Hz60 => 60,
            ImuRate::Hz90 => 90,
            ImuRate::Hz120 => 120,
            ImuRate::Hz240 => 240,
        }
    }

    pub fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            60 => Some(ImuRate::Hz60),
            90 => Some(ImuRate::Hz90),
            120 => Some(ImuRate::Hz120),
            240 => Some(ImuRate::Hz240),
            _ => None,
        }
    }

    pub fn period(self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000 / u64::from(self.hz()))
    }
}

impl fmt::Display for ImuRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

/// Errors raised by sensor drivers and sample decoding
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Failed to open sensor source: {0}")]
    OpenError(String),

    #[error("IMU payload too short: expected at least {expected} bytes, got {actual}")]
    ShortPayload { expected: usize, actual: usize },

    #[error("No sample callback registered")]
    NoCallback,

    #[error("Sensor already streaming")]
    AlreadyEnabled,

    #[error("Failed to start sensor thread: {0}")]
    ThreadError(String),
}

/// Seam for a device driver that produces orientation samples.
///
/// Drivers deliver samples through the registered [`SampleCallback`] from whatever
/// thread they run on. Samples must be delivered in sensor order.
pub trait SensorDriver: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Installs the callback samples are delivered to.
    fn register(&mut self, callback: SampleCallback);

    /// Requests a sample rate. Takes effect for subsequent samples.
    fn set_rate(&mut self, rate: ImuRate) -> Result<(), SensorError>;

    /// Starts or stops sample delivery.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), SensorError>;
}
