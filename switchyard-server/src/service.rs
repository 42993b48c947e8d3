use std::sync::Arc;

use anyhow::{Context, Result};
use switchyard_common::Stats;
use switchyard_config::Config;
use switchyard_kafka::{KafkaRecordSource, consumer_group_name};
use switchyard_sink::MetricSink;

use crate::{Pipeline, PipelineConfig, shutdown_signal};

/// Indicates the type of failure of the server.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ServerError {
    /// The async runtime could not be created.
    #[error("could not start the async runtime")]
    Runtime,

    /// Connecting to the metric backend failed.
    #[error("could not connect the metric sink")]
    Sink,

    /// Joining the consumer group failed.
    #[error("could not initialize the kafka consumer")]
    Kafka,
}

/// Runs the pipeline until a shutdown signal arrives.
///
/// Blocks the calling thread. Returns once the sink has been released.
pub fn run(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("switchyard")
        .enable_all()
        .build()
        .context(ServerError::Runtime)?;

    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<()> {
    let stats = Arc::new(Stats::new());

    let sink = MetricSink::connect(&config.sink_config(), Arc::clone(&stats))
        .await
        .context(ServerError::Sink)?;

    let kafka = config.kafka();
    let group_id = consumer_group_name(&kafka.group_base, &chrono::Local::now());
    switchyard_log::info!(group = %group_id, topic = %kafka.topic, "joining consumer group");

    let source = KafkaRecordSource::create(kafka, &group_id).context(ServerError::Kafka)?;

    let pipeline = Pipeline::new(source, sink, PipelineConfig::from_config(&config), stats);
    pipeline.run(shutdown_signal()).await;

    Ok(())
}
