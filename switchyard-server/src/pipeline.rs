use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use switchyard_accesslog::{DeriveConfig, RecordFormat, derive, parse};
use switchyard_common::{Stats, StatsSnapshot};
use switchyard_config::Config;
use switchyard_kafka::{ConsumerEvent, RawRecord, RecordSource};
use switchyard_protocol::UnixMillis;
use switchyard_sink::MetricSink;

/// Settings of the [`Pipeline`] that are independent of its source and sink.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineConfig {
    /// The wire shape of records.
    pub format: RecordFormat,
    /// Filter and derivation settings.
    pub derive: DeriveConfig,
    /// Log every consumed record.
    pub echo: bool,
}

impl PipelineConfig {
    /// Extracts the pipeline settings from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            format: config.record_format(),
            derive: config.derive_config().clone(),
            echo: config.echo(),
        }
    }
}

/// Lifecycle states of the [`Pipeline`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PipelineState {
    /// Pulling and processing records.
    Running,
    /// No longer pulling records; releasing the sink.
    Draining,
    /// The sink is released and the final counters are logged.
    Stopped,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        })
    }
}

/// Moves records from a [`RecordSource`] through derivation into a [`MetricSink`].
///
/// Records are processed strictly one at a time. After a record's points were handed to the sink,
/// the record is committed unconditionally.
pub struct Pipeline<S> {
    source: S,
    sink: MetricSink,
    config: PipelineConfig,
    stats: Arc<Stats>,
    state: PipelineState,
}

impl<S> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("sink", &self.sink.kind())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S: RecordSource> Pipeline<S> {
    /// Creates a pipeline in the [`Running`](PipelineState::Running) state.
    pub fn new(source: S, sink: MetricSink, config: PipelineConfig, stats: Arc<Stats>) -> Self {
        Self {
            source,
            sink,
            config,
            stats,
            state: PipelineState::Running,
        }
    }

    /// Returns the counters shared with the sink.
    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    fn transition(&mut self, state: PipelineState) {
        switchyard_log::debug!(from = %self.state, to = %state, "pipeline state change");
        self.state = state;
    }

    /// Runs a single record through parse, derive, delivery and commit.
    pub async fn process_record(&mut self, record: RawRecord) {
        self.stats.record_consumed();

        if self.config.echo {
            switchyard_log::info!("{record}");
        }

        let mapping = parse(&record.payload, self.config.format);
        let emissions = derive(&mapping, &self.config.derive);

        let timestamp = record
            .timestamp
            .and_then(|millis| u64::try_from(millis).ok())
            .map_or_else(UnixMillis::now, UnixMillis::from_millis);
        let coercion = self.sink.coercion();

        let mut points = Vec::with_capacity(emissions.len());
        for emission in emissions {
            match emission.into_point(timestamp, coercion) {
                Ok(point) => points.push(point),
                Err(error) => {
                    self.stats.record_error();
                    switchyard_log::warn!(
                        error = &error as &dyn Error,
                        offset = record.offset,
                        "dropped metric point"
                    );
                }
            }
        }

        self.sink.deliver(points).await;

        if let Err(error) = self.source.commit(&record) {
            self.stats.record_error();
            switchyard_log::error!(error = &error as &dyn Error, "failed to commit record");
        }

        self.stats.record_processed();
    }

    /// Processes events until `shutdown` completes or the source is exhausted.
    ///
    /// Afterwards, the sink is closed and the final counters are logged and returned. A record
    /// that is being processed when the shutdown arrives is completed first.
    pub async fn run<F>(mut self, shutdown: F) -> StatsSnapshot
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        switchyard_log::info!(sink = %self.sink.kind(), "pipeline running");

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    switchyard_log::info!("shutting down pipeline");
                    break;
                }
                event = self.source.next_event() => match event {
                    Some(ConsumerEvent::Record(record)) => self.process_record(record).await,
                    Some(ConsumerEvent::Error(error)) => {
                        switchyard_log::error!(error = &error as &dyn Error, "consumer error");
                    }
                    Some(ConsumerEvent::Rebalance(notification)) => {
                        switchyard_log::info!("consumer group rebalanced: {notification}");
                    }
                    None => {
                        switchyard_log::info!("record source exhausted");
                        break;
                    }
                },
            }
        }

        self.transition(PipelineState::Draining);
        self.sink.close().await;
        self.state = PipelineState::Stopped;

        let snapshot = self.stats.snapshot();
        switchyard_log::info!(
            consumed = snapshot.consumed,
            processed = snapshot.processed,
            errors = snapshot.errors,
            "pipeline {}",
            self.state,
        );

        snapshot
    }
}
