use std::collections::BTreeMap;

use crate::RawRecord;

/// Tracks the next offset to store per topic partition.
///
/// Storing only moves forward, which makes repeated commits of the same record a no-op.
#[derive(Clone, Debug, Default)]
pub struct OffsetTracker {
    next: BTreeMap<(String, i32), i64>,
}

impl OffsetTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances past `offset` and returns the next offset to store.
    ///
    /// Returns `None` if the record at `offset` was already committed.
    pub fn advance(&mut self, topic: &str, partition: i32, offset: i64) -> Option<i64> {
        let next = offset + 1;
        let key = (topic.to_owned(), partition);

        match self.next.get(&key) {
            Some(&stored) if stored >= next => None,
            _ => {
                self.next.insert(key, next);
                Some(next)
            }
        }
    }

    /// Advances past `record` and returns the offset to hand to the client's offset store.
    ///
    /// This is the record's own offset: the client commits the position after the stored offset,
    /// so that the next session resumes at the first unprocessed record. Returns `None` if the
    /// record was already committed.
    pub fn store(&mut self, record: &RawRecord) -> Option<i64> {
        self.advance(&record.topic, record.partition, record.offset)
            .map(|_| record.offset)
    }

    /// Returns the next offset to store for a partition, if any record was committed.
    pub fn next_offset(&self, topic: &str, partition: i32) -> Option<i64> {
        self.next.get(&(topic.to_owned(), partition)).copied()
    }
}
