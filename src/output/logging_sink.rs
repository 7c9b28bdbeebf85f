use super::{MotionSink, MouseButton, SinkError};
use tracing::info;

/// Dry-run sink, logs instead of moving anything
#[derive(Debug, Default)]
pub struct LoggingSink {
    moves: u64,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moves(&self) -> u64 {
        self.moves
    }
}

impl MotionSink for LoggingSink {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), SinkError> {
        self.moves += 1;
        info!(dx, dy, "pointer move");
        Ok(())
    }

    fn scroll(&mut self, amount: i32, horizontal: bool) -> Result<(), SinkError> {
        info!(amount, horizontal, "scroll");
        Ok(())
    }

    fn click(&mut self, button: MouseButton, pressed: bool) -> Result<(), SinkError> {
        info!(%button, pressed, "button");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }
}
