use std::error::Error;
use std::fmt;
use std::future::Future;

type BoxError = Box<dyn Error + Send + Sync>;

/// A record consumed from the message log.
///
/// Owned by the pipeline for one pass and then committed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawRecord {
    /// The topic the record was read from.
    pub topic: String,
    /// The partition within the topic.
    pub partition: i32,
    /// The offset of the record, monotonic per partition.
    pub offset: i64,
    /// The record key, if the producer set one.
    pub key: Option<Vec<u8>>,
    /// The record payload.
    pub payload: Vec<u8>,
    /// The producer-assigned timestamp in milliseconds since the UNIX epoch.
    pub timestamp: Option<i64>,
}

impl RawRecord {
    /// Creates a record without key and timestamp.
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload,
            timestamp: None,
        }
    }

    /// Returns the record key as text, or an empty string if there is none.
    pub fn key_lossy(&self) -> String {
        self.key
            .as_deref()
            .map(|key| String::from_utf8_lossy(key).into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for RawRecord {
    /// Formats the record as `topic/partition/offset<TAB>key<TAB>value`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}\t{}\t{}",
            self.topic,
            self.partition,
            self.offset,
            self.key_lossy(),
            String::from_utf8_lossy(&self.payload)
        )
    }
}

/// Errors reported by the consumer group collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// The consumer could not be created from its configuration.
    #[error("invalid kafka consumer configuration")]
    InvalidConfig(#[source] BoxError),
    /// Subscribing to the topic failed.
    #[error("failed to subscribe to topic {topic:?}")]
    Subscribe {
        /// The configured topic.
        topic: String,
        /// The client error.
        #[source]
        source: BoxError,
    },
    /// Receiving the next record failed.
    #[error("failed to receive kafka message")]
    Receive(#[source] BoxError),
    /// The client reported an error in the background.
    #[error("kafka client error: {reason}")]
    Client {
        /// Description provided by the client.
        reason: String,
        /// The client error.
        #[source]
        source: BoxError,
    },
    /// Storing the offset of a processed record failed.
    #[error("failed to store offset {offset} for {topic}/{partition}")]
    StoreOffset {
        /// Topic of the record.
        topic: String,
        /// Partition of the record.
        partition: i32,
        /// Offset of the record.
        offset: i64,
        /// The client error.
        #[source]
        source: BoxError,
    },
}

/// An event surfaced by a [`RecordSource`].
#[derive(Debug)]
pub enum ConsumerEvent {
    /// A record to process.
    Record(RawRecord),
    /// A non-fatal consumer error.
    Error(ConsumerError),
    /// A partition rebalance notification.
    Rebalance(String),
}

/// Pull interface to the consumer group.
///
/// Implementations yield records in offset order per partition and surface errors and rebalances
/// as events. Returning `None` from [`next_event`](Self::next_event) signals that the source is
/// exhausted.
pub trait RecordSource {
    /// Waits for the next event.
    fn next_event(&mut self) -> impl Future<Output = Option<ConsumerEvent>> + Send;

    /// Marks a record as processed. Committing the same record twice is a no-op.
    fn commit(&mut self, record: &RawRecord) -> Result<(), ConsumerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_display() {
        let mut record = RawRecord::new(
            "istio-access-logs",
            3,
            42,
            b"hostname=web-1 status=200".to_vec(),
        );
        assert_eq!(
            record.to_string(),
            "istio-access-logs/3/42\t\thostname=web-1 status=200"
        );

        record.key = Some(b"web-1".to_vec());
        assert_eq!(
            record.to_string(),
            "istio-access-logs/3/42\tweb-1\thostname=web-1 status=200"
        );
    }

    #[test]
    fn test_error_display() {
        let error = ConsumerError::StoreOffset {
            topic: "istio-access-logs".to_owned(),
            partition: 1,
            offset: 7,
            source: "no such partition".into(),
        };

        insta::assert_snapshot!(error, @"failed to store offset 7 for istio-access-logs/1");
    }
}
