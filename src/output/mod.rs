//! Pointer output
//!
//! [`MotionSink`] is the seam between the translation pipeline and whatever turns
//! pixels and wheel clicks into input events. [`MotionSinkAdapter`] maps a
//! [`PipelineOutput`] onto sink calls.
//!
//! Sinks:
//! - [`UinputSink`] - virtual mouse through the kernel uinput interface
//! - [`LoggingSink`] - logs every event, used for dry runs

pub mod logging_sink;
pub mod uinput;

pub use logging_sink::LoggingSink;
pub use uinput::UinputSink;

use crate::tracking::PipelineOutput;
use std::fmt;
use tracing::{debug, error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::Middle => write!(f, "middle"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(#[source] std::io::Error),

    #[error("Failed to emit input events: {0}")]
    Emit(#[source] std::io::Error),

    #[error("Sink not ready")]
    NotReady,
}

/// Consumer of relative pointer events
pub trait MotionSink: Send {
    fn name(&self) -> &str;

    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), SinkError>;

    /// Wheel movement, positive is up (or right when `horizontal`)
    fn scroll(&mut self, amount: i32, horizontal: bool) -> Result<(), SinkError>;

    fn click(&mut self, button: MouseButton, pressed: bool) -> Result<(), SinkError>;

    /// False while the sink cannot take events. The pipeline skips samples entirely
    /// in that case, leaving the filter state alone.
    fn is_ready(&self) -> bool;
}

/// Forwards pipeline output to a boxed sink
pub struct MotionSinkAdapter {
    sink: Box<dyn MotionSink>,
    emit_failures: u64,
}

impl MotionSinkAdapter {
    pub fn new(sink: Box<dyn MotionSink>) -> Self {
        Self {
            sink,
            emit_failures: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.sink.is_ready()
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    pub fn emit_failures(&self) -> u64 {
        self.emit_failures
    }

    /// Emits motion first, then scroll. Failures are logged and counted, never fatal.
    pub fn emit(&mut self, output: &PipelineOutput) {
        if let Some(motion) = output.motion {
            debug!("move_by({}, {})", motion.dx, motion.dy);
            if let Err(e) = self.sink.move_by(motion.dx, motion.dy) {
                self.record_failure(&e);
            }
        }
        if let Some(scroll) = output.scroll {
            debug!("scroll({:?} x{})", scroll.direction, scroll.clicks);
            if let Err(e) = self.sink.scroll(scroll.signed_amount(), false) {
                self.record_failure(&e);
            }
        }
    }

    fn record_failure(&mut self, e: &SinkError) {
        self.emit_failures += 1;
        if self.emit_failures % 120 == 1 {
            error!(
                "{} failed to emit ({} failures so far): {}",
                self.sink.name(),
                self.emit_failures,
                e
            );
        }
    }
}
