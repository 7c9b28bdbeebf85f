//! Tracker Handle - owns the task that drains the sample feed
//!
//! One task receives samples in order, runs a locked pipeline step on the shared
//! [`HeadTracker`] and hands the result to the sink adapter once the lock is
//! released. The task ends when the feed closes or the cancellation token fires.

use super::tracker::HeadTracker;
use crate::output::MotionSinkAdapter;
use crate::sensor::OrientationSample;
use chrono::Local;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Counters reported when the consumer task ends
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub received: u64,
    /// Samples that produced pointer motion or scroll
    pub emitted: u64,
    /// Samples dropped because tracking was disabled or paused
    pub gated: u64,
    /// Samples skipped because the sink was not ready
    pub sink_not_ready: u64,
}

pub struct TrackerHandle {
    task: JoinHandle<TrackerStats>,
    cancel: CancellationToken,
}

impl TrackerHandle {
    pub fn spawn(
        tracker: Arc<HeadTracker>,
        samples: mpsc::Receiver<OrientationSample>,
        adapter: MotionSinkAdapter,
        cancel: CancellationToken,
    ) -> Self {
        info!("Spawning tracking task with sink {}", adapter.sink_name());
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let stats = run_tracking_loop(tracker, samples, adapter, task_cancel).await;
            info!(
                "Tracking task finished: {} received, {} emitted, {} gated, {} skipped (sink not ready)",
                stats.received, stats.emitted, stats.gated, stats.sink_not_ready
            );
            stats
        });
        Self { task, cancel }
    }

    /// Waits for the feed to close on its own
    pub async fn wait(self) -> TrackerStats {
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Tracking task failed: {}", e);
                TrackerStats::default()
            }
        }
    }

    /// Stops the task and waits for it
    pub async fn shutdown(self) -> TrackerStats {
        debug!("Cancelling tracking task");
        self.cancel.cancel();
        self.wait().await
    }
}

async fn run_tracking_loop(
    tracker: Arc<HeadTracker>,
    mut samples: mpsc::Receiver<OrientationSample>,
    mut adapter: MotionSinkAdapter,
    cancel: CancellationToken,
) -> TrackerStats {
    let mut stats = TrackerStats::default();
    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(30);

    loop {
        let sample = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Tracking task cancelled");
                break;
            }
            sample = samples.recv() => match sample {
                Some(sample) => sample,
                None => {
                    info!("Sample feed closed");
                    break;
                }
            },
        };
        stats.received += 1;

        if !adapter.is_ready() {
            stats.sink_not_ready += 1;
            continue;
        }

        match tracker.process(&sample).await {
            Some(output) if !output.is_empty() => {
                stats.emitted += 1;
                adapter.emit(&output);
            }
            Some(_) => {}
            None => stats.gated += 1,
        }

        let now = Local::now();
        if now.signed_duration_since(last_stats_time) >= stats_interval {
            debug!(
                "Tracking stats: {} received, {} emitted, {} gated, {} emit failures",
                stats.received,
                stats.emitted,
                stats.gated,
                adapter.emit_failures()
            );
            last_stats_time = now;
        }
    }

    stats
}
