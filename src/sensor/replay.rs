//! Replay driver: feeds recorded orientation data through the normal sensor seam.
//!
//! Two recording formats are understood:
//!
//! - [`ReplayFormat::Angles`]: text, one sample per line, `roll pitch yaw` optionally
//!   followed by `w x y z`. Blank lines and `#` comments are skipped.
//! - [`ReplayFormat::Frames`]: raw IMU payloads of [`IMU_FRAME_LEN`] bytes back to back,
//!   as captured from the device.
//!
//! Samples are paced at the configured [`ImuRate`]. When the input ends the
//! callback is dropped, which closes the sample feed.

use super::{ImuRate, OrientationSample, Quaternion, SampleCallback, SensorDriver, SensorError};
use super::IMU_FRAME_LEN;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReplayFormat {
    #[default]
    Angles,
    Frames,
}

pub struct ReplayDriver {
    name: String,
    format: ReplayFormat,
    reader: Option<Box<dyn Read + Send>>,
    callback: Option<SampleCallback>,
    rate_hz: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
    paced: bool,
    worker: Option<JoinHandle<()>>,
}

impl ReplayDriver {
    /// Opens a recording. `-` reads from stdin.
    pub fn open(path: &Path, format: ReplayFormat) -> Result<Self, SensorError> {
        if path == Path::new("-") {
            info!("Replaying {:?} samples from stdin", format);
            return Ok(Self::from_reader("stdin", Box::new(std::io::stdin()), format));
        }

        let file = std::fs::File::open(path)
            .map_err(|e| SensorError::OpenError(format!("{}: {}", path.display(), e)))?;
        info!("Replaying {:?} samples from {}", format, path.display());
        Ok(Self::from_reader(
            &path.display().to_string(),
            Box::new(file),
            format,
        ))
    }

    pub fn from_reader(name: &str, reader: Box<dyn Read + Send>, format: ReplayFormat) -> Self {
        Self {
            name: format!("replay:{}", name),
            format,
            reader: Some(reader),
            callback: None,
            rate_hz: Arc::new(AtomicU32::new(ImuRate::default().hz())),
            running: Arc::new(AtomicBool::new(false)),
            paced: true,
            worker: None,
        }
    }

    /// Delivers samples as fast as the queue takes them
    pub fn without_pacing(mut self) -> Self {
        self.paced = false;
        self
    }

    fn start(&mut self) -> Result<(), SensorError> {
        if self.worker.is_some() {
            return Err(SensorError::AlreadyEnabled);
        }
        let callback = self.callback.take().ok_or(SensorError::NoCallback)?;
        let reader = self
            .reader
            .take()
            .ok_or_else(|| SensorError::OpenError("replay source already consumed".to_string()))?;

        self.running.store(true, Ordering::SeqCst);
        let worker = ReplayWorker {
            format: self.format,
            callback,
            rate_hz: self.rate_hz.clone(),
            running: self.running.clone(),
            paced: self.paced,
        };

        let handle = std::thread::Builder::new()
            .name("sensor-replay".to_string())
            .spawn(move || worker.run(reader))
            .map_err(|e| SensorError::ThreadError(e.to_string()))?;

        self.worker = Some(handle);
        Ok(())
    }
}

impl SensorDriver for ReplayDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, callback: SampleCallback) {
        debug!("Registered sample callback on {}", self.name);
        self.callback = Some(callback);
    }

    fn set_rate(&mut self, rate: ImuRate) -> Result<(), SensorError> {
        info!("Setting {} sample rate to {}", self.name, rate);
        self.rate_hz.store(rate.hz(), Ordering::Relaxed);
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), SensorError> {
        if enabled {
            info!("Enabling {}", self.name);
            return self.start();
        }

        info!("Disabling {}", self.name);
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            // A worker blocked on stdin is left to exit on its own
            if handle.is_finished() && handle.join().is_err() {
                error!("Replay worker panicked");
            }
        }
        Ok(())
    }
}

struct ReplayWorker {
    format: ReplayFormat,
    callback: SampleCallback,
    rate_hz: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
    paced: bool,
}

impl ReplayWorker {
    fn run(self, reader: Box<dyn Read + Send>) {
        let delivered = match self.format {
            ReplayFormat::Angles => self.run_angles(reader),
            ReplayFormat::Frames => self.run_frames(reader),
        };
        info!(
            "Replay finished: {} samples delivered, {} dropped",
            delivered,
            self.callback.dropped()
        );
    }

    fn active(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.callback.is_closed()
    }

    fn period(&self) -> std::time::Duration {
        let hz = self.rate_hz.load(Ordering::Relaxed).max(1);
        std::time::Duration::from_micros(1_000_000 / u64::from(hz))
    }

    fn pace(&self) {
        if self.paced {
            std::thread::sleep(self.period());
        }
    }

    fn run_angles(&self, reader: Box<dyn Read + Send>) -> u64 {
        let mut delivered = 0;
        for (index, line) in BufReader::new(reader).lines().enumerate() {
            if !self.active() {
                break;
            }
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Replay read failed: {}", e);
                    break;
                }
            };

            match parse_angles_line(&line) {
                Ok(Some(sample)) => {
                    if self.callback.deliver(sample) {
                        delivered += 1;
                    }
                    self.pace();
                }
                Ok(None) => {}
                Err(msg) => warn!("Replay line {}: {}", index + 1, msg),
            }
        }
        delivered
    }

    fn run_frames(&self, mut reader: Box<dyn Read + Send>) -> u64 {
        let mut delivered = 0;
        let mut frame = [0u8; IMU_FRAME_LEN];
        let mut device_ms: u32 = 0;

        while self.active() {
            match reader.read_exact(&mut frame) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    warn!("Replay read failed: {}", e);
                    break;
                }
            }

            match OrientationSample::from_imu_payload(&frame, device_ms) {
                Ok(sample) => {
                    if self.callback.deliver(sample) {
                        delivered += 1;
                    }
                }
                Err(e) => warn!("Skipping frame: {}", e),
            }

            let period = self.period();
            device_ms = device_ms.wrapping_add(period.as_millis() as u32);
            self.pace();
        }
        delivered
    }
}

/// Parses `roll pitch yaw [w x y z]`. `Ok(None)` for blank and comment lines.
pub fn parse_angles_line(line: &str) -> Result<Option<OrientationSample>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let values = line
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|e| format!("invalid number {:?}: {}", token, e))
        })
        .collect::<Result<Vec<f32>, String>>()?;

    match values.as_slice() {
        [roll, pitch, yaw] => Ok(Some(OrientationSample::new(*roll, *pitch, *yaw))),
        [roll, pitch, yaw, w, x, y, z] => Ok(Some(
            OrientationSample::new(*roll, *pitch, *yaw).with_quaternion(Quaternion {
                w: *w,
                x: *x,
                y: *y,
                z: *z,
            }),
        )),
        other => Err(format!("expected 3 or 7 values, got {}", other.len())),
    }
}
