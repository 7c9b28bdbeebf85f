//! Head-orientation mouse
//!
//! Turns head orientation samples into relative pointer motion and scroll, and
//! exposes a local control socket for toggling, recentering and tuning at runtime.
//!
//! ```text
//! SensorDriver ──► SampleFeed ──► TrackerHandle ──► HeadTracker ──► MotionSink
//!                                                       ▲
//!                                   ControlServer ──────┘
//! ```

pub mod config;
pub mod control;
pub mod output;
pub mod sensor;
pub mod tracking;
