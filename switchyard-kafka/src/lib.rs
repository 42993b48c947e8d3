//! Access to the access-log topic as a member of a Kafka consumer group.
//!
//! The pipeline consumes records through the [`RecordSource`] trait. It yields [`ConsumerEvent`]s
//! (records, consumer errors and rebalance notifications) and accepts commits for processed
//! records. With the `consumer` feature enabled, [`KafkaRecordSource`] implements it on top of
//! `rdkafka`.
//!
//! # Offsets
//!
//! Offsets are stored explicitly for every processed record and committed in the background by
//! the client. Storing an offset that was already stored is a no-op, so committing a record twice
//! never causes redelivery or regression.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod config;
#[cfg(feature = "consumer")]
mod consumer;
mod offsets;
mod source;

pub use crate::config::*;
#[cfg(feature = "consumer")]
pub use crate::consumer::*;
pub use crate::offsets::*;
pub use crate::source::*;
