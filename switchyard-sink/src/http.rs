//! Batched delivery through the HTTP write endpoint.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use switchyard_common::Stats;
use switchyard_protocol::{DispatchBatch, MetricPoint, Precision};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::{SinkError, SinkOptions};

/// Precision of timestamps in write requests.
const PRECISION: Precision = Precision::Milliseconds;

/// Builds the write endpoint URL for `backend`.
///
/// Backends without a scheme are addressed via plain `http`.
pub fn write_url(backend: &str, database: &str) -> Result<Url, SinkError> {
    let base = if backend.contains("://") {
        backend.to_owned()
    } else {
        format!("http://{backend}")
    };

    let mut url = Url::parse(&base).map_err(|error| SinkError::InvalidUrl {
        url: backend.to_owned(),
        error,
    })?;

    url.path_segments_mut()
        .map_err(|_| SinkError::CannotBeBase(backend.to_owned()))?
        .pop_if_empty()
        .push("write");

    url.query_pairs_mut()
        .append_pair("db", database)
        .append_pair("precision", PRECISION.as_str());

    Ok(url)
}

/// The delivery worker of the [`HttpSink`].
///
/// Receives batches in submission order and writes each with a single request. Failed requests
/// are logged and counted, never retried.
#[derive(Debug)]
struct BatchDispatcher {
    client: reqwest::Client,
    url: Url,
    stats: Arc<Stats>,
}

impl BatchDispatcher {
    async fn dispatch(&self, batch: DispatchBatch) {
        let count = batch.len();
        let result = self
            .client
            .post(self.url.clone())
            .body(batch.to_line_protocol())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                switchyard_log::trace!(points = count, "metric batch written");
            }
            Ok(response) => {
                self.stats.record_error();
                switchyard_log::error!(
                    status = response.status().as_u16(),
                    points = count,
                    "metric batch rejected by backend"
                );
            }
            Err(error) => {
                self.stats.record_error();
                switchyard_log::error!(
                    error = &error as &dyn Error,
                    points = count,
                    "failed to write metric batch"
                );
            }
        }
    }

    fn spawn_handler(self, mut rx: mpsc::Receiver<DispatchBatch>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                self.dispatch(batch).await;
            }
            switchyard_log::debug!("metric batch dispatcher stopped");
        })
    }
}

/// Collects the points of one record into a [`DispatchBatch`] and hands it to a delivery worker.
///
/// The handoff channel is bounded. When the worker falls behind by more than the configured
/// number of batches, [`deliver`](Self::deliver) waits for capacity.
#[derive(Debug)]
pub struct HttpSink {
    database: String,
    options: SinkOptions,
    stats: Arc<Stats>,
    tx: mpsc::Sender<DispatchBatch>,
    worker: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl HttpSink {
    /// Creates the HTTP client and spawns the delivery worker.
    ///
    /// Must be called within a tokio runtime.
    pub fn connect(
        backend: &str,
        database: &str,
        max_inflight_batches: usize,
        request_timeout: Duration,
        shutdown_timeout: Duration,
        options: SinkOptions,
        stats: Arc<Stats>,
    ) -> Result<Self, SinkError> {
        let url = write_url(backend, database)?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(SinkError::Client)?;

        let (tx, rx) = mpsc::channel(max_inflight_batches.max(1));
        let dispatcher = BatchDispatcher {
            client,
            url,
            stats: stats.clone(),
        };

        Ok(Self {
            database: database.to_owned(),
            options,
            stats,
            tx,
            worker: dispatcher.spawn_handler(rx),
            shutdown_timeout,
        })
    }

    /// Submits all points as one batch. Empty deliveries are skipped.
    pub async fn deliver(&mut self, points: Vec<MetricPoint>) {
        if points.is_empty() {
            return;
        }

        let mut batch = DispatchBatch::new(self.database.clone(), PRECISION);
        batch.extend(points);

        if self.options.echo {
            for line in batch.to_line_protocol().lines() {
                switchyard_log::info!("{line}");
            }
        }

        if self.options.dry_run {
            return;
        }

        if self.tx.send(batch).await.is_err() {
            self.stats.record_error();
            switchyard_log::error!("metric batch dispatcher is not running");
        }
    }

    /// Stops accepting batches and waits for the worker to write the queued ones.
    pub async fn close(self) {
        let Self {
            tx,
            worker,
            shutdown_timeout,
            ..
        } = self;

        drop(tx);

        match tokio::time::timeout(shutdown_timeout, worker).await {
            Ok(Ok(())) => (),
            Ok(Err(error)) => {
                switchyard_log::error!(
                    error = &error as &dyn Error,
                    "metric batch dispatcher failed"
                );
            }
            Err(_) => {
                switchyard_log::warn!(
                    timeout = ?shutdown_timeout,
                    "metric batch dispatcher did not finish in time, dropping queued batches"
                );
            }
        }
    }
}
