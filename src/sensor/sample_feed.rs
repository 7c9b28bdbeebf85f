//! Bounded hand-off from the driver's delivery context to the pipeline task.
//!
//! The driver calls [`SampleCallback::deliver`] on its own thread. Delivery never
//! blocks: when the queue is full the sample is dropped and counted, so a stalled
//! consumer cannot back up into the driver. Delivered samples keep their order.

use super::OrientationSample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default queue depth, roughly two seconds at 120 Hz
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// Cloneable sender half handed to sensor drivers
#[derive(Clone, Debug)]
pub struct SampleCallback {
    sender: mpsc::Sender<OrientationSample>,
    dropped: Arc<AtomicU64>,
}

impl SampleCallback {
    /// Queues one sample. Returns false when it was dropped.
    pub fn deliver(&self, sample: OrientationSample) -> bool {
        match self.sender.try_send(sample) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                // Warn on the first drop and every 120th after that
                if dropped % 120 == 1 {
                    warn!("Sample queue full, {} samples dropped so far", dropped);
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Sample queue closed, discarding sample");
                false
            }
        }
    }

    /// True once the consuming side has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Constructor for the callback/receiver pair
pub struct SampleFeed;

impl SampleFeed {
    pub fn bounded(capacity: usize) -> (SampleCallback, mpsc::Receiver<OrientationSample>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        debug!("Created sample feed with capacity {}", capacity.max(1));
        (
            SampleCallback {
                sender,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preserves_order() {
        let (callback, mut receiver) = SampleFeed::bounded(8);
        for i in 0..5 {
            assert!(callback.deliver(OrientationSample::new(0.0, 0.0, i as f32)));
        }
        drop(callback);

        let mut yaws = Vec::new();
        while let Some(sample) = receiver.recv().await {
            yaws.push(sample.yaw);
        }
        assert_eq!(yaws, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn drops_and_counts_when_full() {
        let (callback, mut receiver) = SampleFeed::bounded(2);
        assert!(callback.deliver(OrientationSample::new(0.0, 0.0, 1.0)));
        assert!(callback.deliver(OrientationSample::new(0.0, 0.0, 2.0)));
        assert!(!callback.deliver(OrientationSample::new(0.0, 0.0, 3.0)));
        assert_eq!(callback.dropped(), 1);

        assert_eq!(receiver.recv().await.map(|s| s.yaw), Some(1.0));
        assert_eq!(receiver.recv().await.map(|s| s.yaw), Some(2.0));
    }

    #[tokio::test]
    async fn reports_closed_consumer() {
        let (callback, receiver) = SampleFeed::bounded(2);
        drop(receiver);
        assert!(callback.is_closed());
        assert!(!callback.deliver(OrientationSample::new(0.0, 0.0, 0.0)));
        assert_eq!(callback.dropped(), 0);
    }

    #[test]
    fn delivers_from_foreign_thread() {
        let (callback, mut receiver) = SampleFeed::bounded(4);
        let handle = std::thread::spawn(move || {
            callback.deliver(OrientationSample::new(1.0, 2.0, 3.0))
        });
        assert!(handle.join().unwrap());
        let sample = receiver.try_recv().unwrap();
        assert_eq!((sample.roll, sample.pitch, sample.yaw), (1.0, 2.0, 3.0));
    }
}
