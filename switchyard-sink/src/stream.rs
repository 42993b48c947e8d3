//! Sinks writing one line per point to a stream or datagram socket.

use std::error::Error;
use std::sync::Arc;

use switchyard_common::Stats;
use switchyard_protocol::MetricPoint;

use crate::{SinkOptions, Transport};

/// Writes `line` unless running dry, and counts a failed write.
async fn write_line(
    transport: &mut Transport,
    line: &str,
    options: SinkOptions,
    stats: &Stats,
    name: &str,
) {
    if options.echo {
        switchyard_log::info!("{}", line.trim_end());
    }

    if options.dry_run {
        return;
    }

    if let Err(error) = transport.send(line.as_bytes()).await {
        stats.record_error();
        switchyard_log::error!(
            error = &error as &dyn Error,
            metric = name,
            scheme = %transport.scheme(),
            "failed to write metric point"
        );
    }
}

/// Writes points in the put protocol, one line per point.
///
/// Only the value field is written. Extra fields have no representation in this protocol.
#[derive(Debug)]
pub struct PutSink {
    transport: Transport,
    options: SinkOptions,
    stats: Arc<Stats>,
}

impl PutSink {
    /// Creates a put sink on an established connection.
    pub fn new(transport: Transport, options: SinkOptions, stats: Arc<Stats>) -> Self {
        Self {
            transport,
            options,
            stats,
        }
    }

    /// Writes every point as its own put line.
    pub async fn deliver(&mut self, points: Vec<MetricPoint>) {
        for point in points {
            let line = point.to_put_line();
            write_line(
                &mut self.transport,
                &line,
                self.options,
                &self.stats,
                &point.name,
            )
            .await;
        }
    }

    /// Flushes and closes the connection.
    pub async fn close(mut self) {
        if let Err(error) = self.transport.close().await {
            switchyard_log::warn!(
                error = &error as &dyn Error,
                "failed to close put connection"
            );
        }
    }
}

/// Writes points in the line protocol, one line per point.
///
/// Lines carry no timestamp; the backend stamps points on receipt.
#[derive(Debug)]
pub struct LineSink {
    transport: Transport,
    options: SinkOptions,
    stats: Arc<Stats>,
}

impl LineSink {
    /// Creates a line-protocol sink on an established socket.
    pub fn new(transport: Transport, options: SinkOptions, stats: Arc<Stats>) -> Self {
        Self {
            transport,
            options,
            stats,
        }
    }

    /// Writes every point as its own line.
    pub async fn deliver(&mut self, points: Vec<MetricPoint>) {
        for point in points {
            let line = point.to_line(None);
            write_line(
                &mut self.transport,
                &line,
                self.options,
                &self.stats,
                &point.name,
            )
            .await;
        }
    }

    /// Flushes and closes the socket.
    pub async fn close(mut self) {
        if let Err(error) = self.transport.close().await {
            switchyard_log::warn!(
                error = &error as &dyn Error,
                "failed to close line protocol socket"
            );
        }
    }
}
