//! Delivery of metric points to a metric backend.
//!
//! A [`MetricSink`] is selected once at startup by its [`SinkKind`] and exposes a single contract
//! for all backends: [`MetricSink::deliver`] takes the points derived from one record.
//!
//! | Kind | Protocol | Transport | Delivery |
//! |------|----------|-----------|----------|
//! | [`Put`](SinkKind::Put) | put lines | TCP | one write per point |
//! | [`Line`](SinkKind::Line) | line protocol | UDP or TCP | one write per point |
//! | [`Http`](SinkKind::Http) | line protocol | HTTP | one request per record, on a worker |
//!
//! Delivery is best effort. Failed writes are logged and counted in [`Stats`], never retried.
#![warn(missing_docs)]

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchyard_accesslog::Coercion;
use switchyard_common::Stats;
use switchyard_protocol::MetricPoint;

mod http;
mod stream;
mod transport;

pub use crate::http::*;
pub use crate::stream::*;
pub use crate::transport::*;

/// Backend protocol of a [`MetricSink`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Put lines over a persistent TCP stream.
    #[default]
    Put,
    /// Line protocol over UDP, or TCP with a `tcp://` address.
    Line,
    /// Line protocol batches through the HTTP write endpoint.
    Http,
}

impl SinkKind {
    /// Returns the configuration name of this sink kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Line => "line",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`SinkKind`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown sink kind, expected one of put, line, http")]
pub struct ParseSinkKindError;

impl FromStr for SinkKind {
    type Err = ParseSinkKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "put" => Ok(Self::Put),
            "line" => Ok(Self::Line),
            "http" => Ok(Self::Http),
            _ => Err(ParseSinkKindError),
        }
    }
}

/// Debugging switches shared by all sinks.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SinkOptions {
    /// Format points but never send them.
    pub dry_run: bool,
    /// Log every formatted line at `info` level.
    pub echo: bool,
}

/// Settings needed to create a [`MetricSink`].
#[derive(Clone, Debug, PartialEq)]
pub struct SinkConfig {
    /// Backend protocol.
    pub kind: SinkKind,
    /// Address of the backend: `[scheme://]host:port`, or the base URL for [`SinkKind::Http`].
    pub backend: String,
    /// Database name used by [`SinkKind::Http`].
    pub database: String,
    /// Number of batches that may wait for the HTTP delivery worker.
    pub max_inflight_batches: usize,
    /// Timeout of a single HTTP write request.
    pub request_timeout: Duration,
    /// Time to wait for queued HTTP batches on shutdown.
    pub shutdown_timeout: Duration,
    /// Debugging switches.
    pub options: SinkOptions,
}

/// Errors creating a [`MetricSink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The backend could not be reached.
    #[error("failed to connect to {kind} backend at {addr}")]
    Connect {
        /// The sink kind.
        kind: SinkKind,
        /// The configured address.
        addr: String,
        /// The underlying socket error.
        #[source]
        error: std::io::Error,
    },
    /// The backend URL is malformed.
    #[error("invalid backend url {url:?}")]
    InvalidUrl {
        /// The configured URL.
        url: String,
        /// The parse error.
        #[source]
        error: url::ParseError,
    },
    /// The backend URL cannot have a path.
    #[error("backend url {0:?} cannot be used as base url")]
    CannotBeBase(String),
    /// The HTTP client could not be created.
    #[error("failed to create http client")]
    Client(#[source] reqwest::Error),
}

/// A metric backend selected at startup.
#[derive(Debug)]
pub enum MetricSink {
    /// See [`PutSink`].
    Put(PutSink),
    /// See [`LineSink`].
    Line(LineSink),
    /// See [`HttpSink`].
    Http(HttpSink),
}

impl MetricSink {
    /// Connects to the configured backend.
    ///
    /// Stream and datagram sinks dial their socket here. The HTTP sink creates its client and
    /// spawns its delivery worker, so this must run within a tokio runtime.
    pub async fn connect(config: &SinkConfig, stats: Arc<Stats>) -> Result<Self, SinkError> {
        let connect_error = |error| SinkError::Connect {
            kind: config.kind,
            addr: config.backend.clone(),
            error,
        };

        let sink = match config.kind {
            SinkKind::Put => {
                let transport = Transport::connect(&config.backend, Scheme::Tcp)
                    .await
                    .map_err(connect_error)?;
                Self::Put(PutSink::new(transport, config.options, stats))
            }
            SinkKind::Line => {
                let transport = Transport::connect(&config.backend, Scheme::Udp)
                    .await
                    .map_err(connect_error)?;
                Self::Line(LineSink::new(transport, config.options, stats))
            }
            SinkKind::Http => Self::Http(HttpSink::connect(
                &config.backend,
                &config.database,
                config.max_inflight_batches,
                config.request_timeout,
                config.shutdown_timeout,
                config.options,
                stats,
            )?),
        };

        switchyard_log::info!(kind = %config.kind, backend = %config.backend, "connected metric sink");
        Ok(sink)
    }

    /// Returns the kind of this sink.
    pub fn kind(&self) -> SinkKind {
        match self {
            Self::Put(_) => SinkKind::Put,
            Self::Line(_) => SinkKind::Line,
            Self::Http(_) => SinkKind::Http,
        }
    }

    /// Returns how emission values must be coerced for this sink.
    pub fn coercion(&self) -> Coercion {
        match self {
            Self::Put(_) | Self::Line(_) => Coercion::Verbatim,
            Self::Http(_) => Coercion::Float,
        }
    }

    /// Delivers the points derived from one record.
    pub async fn deliver(&mut self, points: Vec<MetricPoint>) {
        match self {
            Self::Put(sink) => sink.deliver(points).await,
            Self::Line(sink) => sink.deliver(points).await,
            Self::Http(sink) => sink.deliver(points).await,
        }
    }

    /// Releases the outbound connection, waiting for queued HTTP batches.
    pub async fn close(self) {
        match self {
            Self::Put(sink) => sink.close().await,
            Self::Line(sink) => sink.close().await,
            Self::Http(sink) => sink.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    fn config(kind: SinkKind, backend: String) -> SinkConfig {
        SinkConfig {
            kind,
            backend,
            database: "router".to_owned(),
            max_inflight_batches: 64,
            request_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(5),
            options: SinkOptions::default(),
        }
    }

    #[test]
    fn test_parse_sink_kind() {
        assert_eq!("put".parse(), Ok(SinkKind::Put));
        assert_eq!("line".parse(), Ok(SinkKind::Line));
        assert_eq!("http".parse(), Ok(SinkKind::Http));
        assert_eq!("tcp".parse::<SinkKind>(), Err(ParseSinkKindError));
    }

    #[tokio::test]
    async fn test_connect_put() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let sink = MetricSink::connect(&config(SinkKind::Put, addr), Arc::new(Stats::new()))
            .await
            .unwrap();

        assert_eq!(sink.kind(), SinkKind::Put);
        assert_eq!(sink.coercion(), Coercion::Verbatim);
        sink.close().await;
    }

    #[tokio::test]
    async fn test_connect_http() {
        let sink = MetricSink::connect(
            &config(SinkKind::Http, "127.0.0.1:8086".to_owned()),
            Arc::new(Stats::new()),
        )
        .await
        .unwrap();

        assert_eq!(sink.kind(), SinkKind::Http);
        assert_eq!(sink.coercion(), Coercion::Float);
        sink.close().await;
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let error = MetricSink::connect(&config(SinkKind::Put, addr.clone()), Arc::new(Stats::new()))
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            format!("failed to connect to put backend at {addr}")
        );
    }
}
