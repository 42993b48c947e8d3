//! The Switchyard pipeline.
//!
//! The [`Pipeline`] pulls records from a [`RecordSource`](switchyard_kafka::RecordSource), derives
//! metric points from them, hands the points to a [`MetricSink`](switchyard_sink::MetricSink) and
//! commits every record afterwards, whether or not its points were delivered.
//!
//! [`run`] boots the whole application from a [`Config`](switchyard_config::Config): it connects
//! the sink, joins the consumer group and runs the pipeline until a shutdown signal arrives.
#![warn(missing_docs)]

mod pipeline;
mod service;
mod signal;

pub use crate::pipeline::*;
pub use crate::service::*;
pub use crate::signal::*;
