//! Head tracking: orientation samples in, pointer motion and scroll out.
//!
//! - [`pipeline`] - the per-sample translation steps
//! - [`state`] - filter memory and runtime flags
//! - [`tracker`] - [`HeadTracker`], the locked container shared with the control server
//! - [`tracker_handle`] - the consumer task that drains the sample feed
//!
//! ```text
//! SampleFeed ──► TrackerHandle task ──► HeadTracker::process ──► MotionSinkAdapter
//!                                            ▲
//!                           control server ──┘
//! ```

pub mod pipeline;
pub mod state;
pub mod tracker;
pub mod tracker_handle;

pub use pipeline::{PipelineOutput, PointerMotion, ScrollDirection, ScrollEvent};
pub use state::{RuntimeFlags, TrackingState};
pub use tracker::{HeadTracker, InvertTarget, Setting, StatusSnapshot, TrackerError};
pub use tracker_handle::{TrackerHandle, TrackerStats};
