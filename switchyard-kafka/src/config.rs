//! Configuration of the Kafka consumer.

use std::fmt;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Default topic carrying router access logs.
pub const DEFAULT_TOPIC: &str = "istio-access-logs";

/// Default base name of the consumer group.
pub const DEFAULT_GROUP_BASE: &str = "switchyard";

/// Default bootstrap brokers.
pub const DEFAULT_BROKERS: &str = "127.0.0.1:9092";

/// A single parameter passed through to the Kafka client.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct KafkaConfigParam {
    /// Name of the Kafka config parameter.
    pub name: String,
    /// Value of the Kafka config parameter.
    pub value: String,
}

/// Configuration of the consumer group member.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KafkaConsumerConfig {
    /// Comma separated list of bootstrap brokers.
    pub brokers: String,
    /// The topic to consume.
    pub topic: String,
    /// Base name of the consumer group. The startup time is appended.
    pub group_base: String,
    /// Additional client parameters, applied after the built-in ones.
    pub params: Vec<KafkaConfigParam>,
}

impl Default for KafkaConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: DEFAULT_BROKERS.to_owned(),
            topic: DEFAULT_TOPIC.to_owned(),
            group_base: DEFAULT_GROUP_BASE.to_owned(),
            params: Vec::new(),
        }
    }
}

impl KafkaConsumerConfig {
    /// Returns the bootstrap brokers as a list, ignoring empty entries.
    pub fn broker_list(&self) -> Vec<&str> {
        self.brokers
            .split(',')
            .map(str::trim)
            .filter(|broker| !broker.is_empty())
            .collect()
    }

    /// Returns all client parameters for a member of the given group.
    ///
    /// New groups start reading at the latest offset. Offsets are stored explicitly per processed
    /// record and committed automatically.
    pub fn client_params(&self, group_id: &str) -> Vec<(String, String)> {
        let mut params = vec![
            ("bootstrap.servers".to_owned(), self.broker_list().join(",")),
            ("group.id".to_owned(), group_id.to_owned()),
            ("auto.offset.reset".to_owned(), "latest".to_owned()),
            ("enable.auto.commit".to_owned(), "true".to_owned()),
            ("enable.auto.offset.store".to_owned(), "false".to_owned()),
        ];

        for param in &self.params {
            params.push((param.name.clone(), param.value.clone()));
        }

        params
    }
}

/// Returns the name of the consumer group joined at `started`.
///
/// Every process joins its own group: the base name followed by the startup time in RFC 3339
/// format with microseconds.
pub fn consumer_group_name<Tz>(base: &str, started: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("{base}-{}", started.format("%Y-%m-%dT%H:%M:%S%.6f%:z"))
}
