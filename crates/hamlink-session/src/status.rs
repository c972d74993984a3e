//! Transfer progress reporting.
//!
//! One publisher task runs per in-flight transfer. The transfer loop feeds a
//! watch channel (which never blocks and keeps only the latest value); the
//! publisher wakes every 250 ms, reads the latest progress and hands a
//! [`Status`] to the configured [`StatusReporter`]. Status is informational:
//! it must never back-pressure the transfer, and intermediate values may be
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use hamlink_core::Proposal;

/// How often progress is published.
const PUBLISH_PERIOD: Duration = Duration::from_millis(250);

/// A snapshot of one transfer's progress.
///
/// Exactly one of `sending`/`receiving` is set; the embedded proposal is
/// metadata only (its body buffer is empty).
#[derive(Debug, Clone, Default)]
pub struct Status {
    pub sending: Option<Proposal>,
    pub receiving: Option<Proposal>,
    pub bytes_transferred: usize,
    pub bytes_total: usize,
    pub done: bool,
}

/// Receives progress updates. Implementations must be cheap and
/// non-blocking; they are called from a background task.
pub trait StatusReporter: Send + Sync {
    fn update_status(&self, status: Status);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Sending,
    Receiving,
}

/// Handle held by the transfer loop; dropping it (or calling
/// [`finish`](Monitor::finish)) ends the publisher.
pub(crate) struct Monitor {
    tx: Option<watch::Sender<(usize, bool)>>,
}

impl Monitor {
    /// Spawn a publisher for one transfer. Without a reporter this is a
    /// no-op handle.
    pub fn spawn(
        reporter: Option<Arc<dyn StatusReporter>>,
        prop: &Proposal,
        direction: Direction,
    ) -> Monitor {
        let Some(reporter) = reporter else {
            return Monitor { tx: None };
        };

        let mut meta = prop.clone();
        meta.set_compressed_data(Vec::new());
        let total = prop.compressed_size();

        let (tx, mut rx) = watch::channel((0usize, false));
        tokio::spawn(async move {
            let report = |transferred: usize, done: bool| {
                let mut status = Status {
                    bytes_transferred: transferred,
                    bytes_total: total,
                    done,
                    ..Status::default()
                };
                match direction {
                    Direction::Sending => status.sending = Some(meta.clone()),
                    Direction::Receiving => status.receiving = Some(meta.clone()),
                }
                reporter.update_status(status);
            };

            let mut ticker = interval_at(Instant::now() + PUBLISH_PERIOD, PUBLISH_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let (transferred, done) = *rx.borrow_and_update();
                        report(transferred, done);
                        if done {
                            return;
                        }
                    }
                    changed = rx.changed() => {
                        match changed {
                            Ok(()) if rx.borrow().1 => {
                                let transferred = rx.borrow().0;
                                report(transferred, true);
                                return;
                            }
                            Ok(()) => {} // progress; published on the next tick
                            Err(_) => {
                                // Transfer loop dropped the handle (error
                                // path); publish what we know and stop.
                                let transferred = rx.borrow().0;
                                report(transferred, true);
                                return;
                            }
                        }
                    }
                }
            }
        });

        Monitor { tx: Some(tx) }
    }

    /// Record progress; never blocks.
    pub fn update(&self, transferred: usize) {
        if let Some(tx) = &self.tx {
            let _ = tx.send((transferred, false));
        }
    }

    /// Record the final byte count and end the publisher.
    pub fn finish(self, transferred: usize) {
        if let Some(tx) = &self.tx {
            let _ = tx.send((transferred, true));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collector {
        updates: Mutex<Vec<Status>>,
    }

    impl StatusReporter for Collector {
        fn update_status(&self, status: Status) {
            self.updates.lock().unwrap().push(status);
        }
    }

    fn test_proposal() -> Proposal {
        let mut prop = Proposal::default();
        prop.set_compressed_data(vec![0u8; 1000]);
        prop
    }

    #[tokio::test]
    async fn final_update_is_published() {
        let collector = Arc::new(Collector::default());
        let prop = test_proposal();
        let monitor = Monitor::spawn(
            Some(collector.clone() as Arc<dyn StatusReporter>),
            &prop,
            Direction::Sending,
        );
        monitor.update(500);
        monitor.finish(1000);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let updates = collector.updates.lock().unwrap();
        let last = updates.last().expect("no status published");
        assert!(last.done);
        assert_eq!(last.bytes_transferred, 1000);
        assert!(last.sending.is_some());
        assert!(last.receiving.is_none());
    }

    #[tokio::test]
    async fn dropped_monitor_ends_publisher() {
        let collector = Arc::new(Collector::default());
        let prop = test_proposal();
        let monitor = Monitor::spawn(
            Some(collector.clone() as Arc<dyn StatusReporter>),
            &prop,
            Direction::Receiving,
        );
        monitor.update(10);
        drop(monitor);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let updates = collector.updates.lock().unwrap();
        let last = updates.last().expect("no status published");
        assert!(last.done);
        assert!(last.receiving.is_some());
    }

    #[tokio::test]
    async fn no_reporter_is_a_noop() {
        let prop = test_proposal();
        let monitor = Monitor::spawn(None, &prop, Direction::Sending);
        monitor.update(1);
        monitor.finish(2);
    }
}
