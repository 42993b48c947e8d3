use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Running totals of the pipeline, kept for the lifetime of the process.
///
/// The counters are never reset. They are shared via `Arc<Stats>` between the pipeline loop and
/// the delivery worker of the batched HTTP sink, which is why they are atomics.
#[derive(Debug, Default)]
pub struct Stats {
    consumed: AtomicU64,
    processed: AtomicU64,
    errors: AtomicU64,
}

impl Stats {
    /// Creates a new set of counters starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a record received from the consumer.
    pub fn record_consumed(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a record that went through the full pipeline and had its offset committed.
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a single failure: a dropped point, a failed write or a failed commit.
    pub fn record_error(&self) {
        self.record_errors(1);
    }

    /// Counts `count` failures at once.
    pub fn record_errors(&self, count: u64) {
        if count > 0 {
            self.errors.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Returns the number of records received from the consumer.
    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    /// Returns the number of fully processed records.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Returns the number of errors.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns a consistent-enough copy of all counters for reporting.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            consumed: self.consumed(),
            processed: self.processed(),
            errors: self.errors(),
        }
    }
}

/// Point-in-time copy of [`Stats`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Records received from the consumer.
    pub consumed: u64,
    /// Records whose offsets were committed.
    pub processed: u64,
    /// Dropped points, failed writes and failed commits.
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_counters() {
        let stats = Stats::new();
        stats.record_consumed();
        stats.record_consumed();
        stats.record_processed();
        stats.record_error();
        stats.record_errors(4);
        stats.record_errors(0);

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                consumed: 2,
                processed: 1,
                errors: 5,
            }
        );
    }

    #[test]
    fn test_shared_across_threads() {
        let stats = Arc::new(Stats::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_error();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.errors(), 400);
    }

    #[test]
    fn test_snapshot_serialize() {
        let snapshot = StatsSnapshot {
            consumed: 3,
            processed: 3,
            errors: 1,
        };
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            r#"{"consumed":3,"processed":3,"errors":1}"#
        );
    }
}
