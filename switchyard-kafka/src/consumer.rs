use std::fmt;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, ConsumerContext, Rebalance, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::{ClientContext, TopicPartitionList};
use tokio::sync::mpsc;

use crate::{
    ConsumerError, ConsumerEvent, KafkaConsumerConfig, OffsetTracker, RawRecord, RecordSource,
};

/// Consumer context forwarding client errors and rebalances to the [`KafkaRecordSource`].
#[derive(Debug)]
pub struct ForwardEventsContext {
    events: mpsc::UnboundedSender<ConsumerEvent>,
}

impl ForwardEventsContext {
    fn forward(&self, event: ConsumerEvent) {
        // The receiver only goes away together with the consumer.
        let _ = self.events.send(event);
    }
}

impl ClientContext for ForwardEventsContext {
    fn error(&self, error: KafkaError, reason: &str) {
        self.forward(ConsumerEvent::Error(ConsumerError::Client {
            reason: reason.to_owned(),
            source: Box::new(error),
        }));
    }
}

impl ConsumerContext for ForwardEventsContext {
    fn post_rebalance(&self, rebalance: &Rebalance<'_>) {
        self.forward(ConsumerEvent::Rebalance(describe_rebalance(rebalance)));
    }
}

fn describe_partitions(list: &TopicPartitionList) -> String {
    list.elements()
        .iter()
        .map(|element| format!("{}/{}", element.topic(), element.partition()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_rebalance(rebalance: &Rebalance<'_>) -> String {
    match rebalance {
        Rebalance::Assign(list) => format!("assigned [{}]", describe_partitions(list)),
        Rebalance::Revoke(list) => format!("revoked [{}]", describe_partitions(list)),
        Rebalance::Error(error) => format!("rebalance failed: {error}"),
    }
}

fn raw_record(message: &BorrowedMessage<'_>) -> RawRecord {
    RawRecord {
        topic: message.topic().to_owned(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        timestamp: message.timestamp().to_millis(),
    }
}

/// A [`RecordSource`] backed by an `rdkafka` stream consumer.
pub struct KafkaRecordSource {
    consumer: StreamConsumer<ForwardEventsContext>,
    events: mpsc::UnboundedReceiver<ConsumerEvent>,
    offsets: OffsetTracker,
    group_id: String,
}

impl fmt::Debug for KafkaRecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaRecordSource")
            .field("group_id", &self.group_id)
            .field("offsets", &self.offsets)
            .finish_non_exhaustive()
    }
}

impl KafkaRecordSource {
    /// Joins the consumer group `group_id` and subscribes to the configured topic.
    ///
    /// Must be called within a tokio runtime.
    pub fn create(config: &KafkaConsumerConfig, group_id: &str) -> Result<Self, ConsumerError> {
        let mut client_config = ClientConfig::new();
        for (name, value) in config.client_params(group_id) {
            client_config.set(name, value);
        }

        let (tx, events) = mpsc::unbounded_channel();
        let consumer: StreamConsumer<ForwardEventsContext> = client_config
            .create_with_context(ForwardEventsContext { events: tx })
            .map_err(|error| ConsumerError::InvalidConfig(Box::new(error)))?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|error| ConsumerError::Subscribe {
                topic: config.topic.clone(),
                source: Box::new(error),
            })?;

        switchyard_log::info!(
            group_id,
            topic = %config.topic,
            brokers = %config.brokers,
            "joined kafka consumer group"
        );

        Ok(Self {
            consumer,
            events,
            offsets: OffsetTracker::new(),
            group_id: group_id.to_owned(),
        })
    }

    /// Returns the name of the joined consumer group.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }
}

impl RecordSource for KafkaRecordSource {
    async fn next_event(&mut self) -> Option<ConsumerEvent> {
        tokio::select! {
            // Surface errors and rebalances before the records that follow them.
            biased;

            Some(event) = self.events.recv() => Some(event),
            result = self.consumer.recv() => Some(match result {
                Ok(message) => ConsumerEvent::Record(raw_record(&message)),
                Err(error) => ConsumerEvent::Error(ConsumerError::Receive(Box::new(error))),
            }),
        }
    }

    /// Stores the offset of `record` for the next background commit.
    ///
    /// The client commits the stored offset plus one, so the record's own offset is stored.
    fn commit(&mut self, record: &RawRecord) -> Result<(), ConsumerError> {
        let Some(offset) = self.offsets.store(record) else {
            return Ok(());
        };

        self.consumer
            .store_offset(&record.topic, record.partition, offset)
            .map_err(|error| ConsumerError::StoreOffset {
                topic: record.topic.clone(),
                partition: record.partition,
                offset,
                source: Box::new(error),
            })
    }
}
