use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchyard_accesslog::{DeriveConfig, RecordFormat};
use switchyard_kafka::KafkaConsumerConfig;
use switchyard_log::LogConfig;
use switchyard_sink::{SinkConfig, SinkKind, SinkOptions};

use crate::{OverridableConfig, parse_bool};

type BoxError = Box<dyn Error + Send + Sync>;

/// Defines the source of a config error.
#[derive(Debug, Default)]
enum ConfigErrorSource {
    /// An error occurring independently.
    #[default]
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error originating in a field override (an env var, or a CLI parameter).
    FieldOverride(String),
}

impl fmt::Display for ConfigErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErrorSource::None => Ok(()),
            ConfigErrorSource::File(file_name) => {
                write!(f, " (file {})", file_name.display())
            }
            ConfigErrorSource::FieldOverride(name) => write!(f, " (field {name})"),
        }
    }
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    source: ConfigErrorSource,
    kind: ConfigErrorKind,
    cause: Option<BoxError>,
}

impl ConfigError {
    #[inline]
    fn new(kind: ConfigErrorKind) -> Self {
        Self {
            source: ConfigErrorSource::None,
            kind,
            cause: None,
        }
    }

    #[inline]
    fn wrap<E>(cause: E, kind: ConfigErrorKind) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            cause: Some(cause.into()),
            ..Self::new(kind)
        }
    }

    #[inline]
    fn for_field<E>(cause: E, field: &'static str) -> Self
    where
        E: Into<BoxError>,
    {
        Self::wrap(cause, ConfigErrorKind::InvalidValue).field(field)
    }

    #[inline]
    fn file(mut self, p: impl AsRef<Path>) -> Self {
        self.source = ConfigErrorSource::File(p.as_ref().to_path_buf());
        self
    }

    #[inline]
    fn field(mut self, name: &'static str) -> Self {
        self.source = ConfigErrorSource::FieldOverride(name.to_owned());
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.source)
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

/// Indicates config related errors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Serializing the configuration failed.
    #[error("could not serialize config")]
    CouldNotSerialize,
    /// Invalid config value.
    #[error("invalid config value")]
    InvalidValue,
    /// A required value is missing or empty.
    #[error("missing config value")]
    MissingValue,
}

/// Kafka consumer settings.
pub type KafkaConfig = KafkaConsumerConfig;

/// Metric backend settings.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
struct Sink {
    /// Backend protocol.
    kind: SinkKind,
    /// Address of the backend, or its base URL for the HTTP sink.
    backend: String,
    /// Database name for the HTTP sink.
    database: String,
    /// Number of HTTP batches that may wait for the delivery worker.
    max_inflight_batches: usize,
    /// Timeout of a single HTTP request in seconds.
    request_timeout: u64,
}

impl Default for Sink {
    fn default() -> Self {
        Self {
            kind: SinkKind::Put,
            backend: "127.0.0.1:4242".to_owned(),
            database: "router".to_owned(),
            max_inflight_batches: 64,
            request_timeout: 10,
        }
    }
}

/// Record decoding settings.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
struct Records {
    /// The wire shape of records.
    format: RecordFormat,
}

/// Debugging switches.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
struct DebugOutput {
    /// Format points but never send them.
    dry_run: bool,
    /// Log every record and formatted line.
    echo: bool,
}

/// Process lifecycle settings.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
struct Limits {
    /// Seconds to wait for queued deliveries on shutdown.
    shutdown_timeout: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            shutdown_timeout: 10,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct ConfigValues {
    logging: LogConfig,
    kafka: KafkaConfig,
    sink: Sink,
    records: Records,
    filters: DeriveConfig,
    debug: DebugOutput,
    limits: Limits,
}

/// Config struct.
#[derive(Clone, Debug, Default)]
pub struct Config {
    values: ConfigValues,
    path: Option<PathBuf>,
}

impl Config {
    /// Loads a config from a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(path))?;

        let mut config = Self::from_yaml_str(&contents).map_err(|e| e.file(path))?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Creates a config from a YAML string.
    ///
    /// Missing values fall back to their defaults. An empty document yields the default config.
    pub fn from_yaml_str(yaml: &str) -> Result<Config, ConfigError> {
        let values = if yaml.trim().is_empty() {
            ConfigValues::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml))?
        };

        Ok(Config { values, path: None })
    }

    /// Override configuration with values coming from other sources (e.g. env variables or
    /// command line parameters).
    pub fn apply_override(
        &mut self,
        overrides: OverridableConfig,
    ) -> Result<&mut Self, ConfigError> {
        let debug = &mut self.values.debug;
        if let Some(dry_run) = overrides.dry_run {
            debug.dry_run = parse_bool(&dry_run).map_err(|e| ConfigError::for_field(e, "dry_run"))?;
        }
        if let Some(echo) = overrides.echo {
            debug.echo = parse_bool(&echo).map_err(|e| ConfigError::for_field(e, "echo"))?;
        }

        let filters = &mut self.values.filters;
        if let Some(enrich) = overrides.enrich {
            filters.enrich = parse_bool(&enrich).map_err(|e| ConfigError::for_field(e, "enrich"))?;
        }
        if let Some(prefix) = overrides.test_host_prefix {
            filters.test_host_prefix = prefix;
        }
        if let Some(marker) = overrides.excluded_port_marker {
            filters.excluded_port_marker = marker;
        }
        if let Some(min_tokens) = overrides.min_tokens {
            filters.min_tokens = min_tokens
                .trim()
                .parse()
                .map_err(|e| ConfigError::for_field(e, "min_tokens"))?;
        }

        let kafka = &mut self.values.kafka;
        if let Some(group_base) = overrides.group_base.filter(|s| !s.is_empty()) {
            kafka.group_base = group_base;
        }
        if let Some(brokers) = overrides.brokers.filter(|s| !s.is_empty()) {
            kafka.brokers = brokers;
        }
        if let Some(topic) = overrides.topic.filter(|s| !s.is_empty()) {
            kafka.topic = topic;
        }

        let sink = &mut self.values.sink;
        if let Some(kind) = overrides.sink.filter(|s| !s.is_empty()) {
            sink.kind = kind
                .parse()
                .map_err(|e| ConfigError::for_field(e, "sink"))?;
        }
        if let Some(backend) = overrides.backend.filter(|s| !s.is_empty()) {
            sink.backend = backend;
        }
        if let Some(database) = overrides.database.filter(|s| !s.is_empty()) {
            sink.database = database;
        }
        if let Some(max_inflight) = overrides.max_inflight_batches {
            sink.max_inflight_batches = max_inflight
                .trim()
                .parse()
                .map_err(|e| ConfigError::for_field(e, "max_inflight_batches"))?;
        }

        if let Some(format) = overrides.record_format.filter(|s| !s.is_empty()) {
            self.values.records.format = format
                .parse()
                .map_err(|e| ConfigError::for_field(e, "record_format"))?;
        }

        let logging = &mut self.values.logging;
        if let Some(level) = overrides.log_level.filter(|s| !s.is_empty()) {
            logging.level = level
                .parse()
                .map_err(|e| ConfigError::for_field(e, "log_level"))?;
        }
        if let Some(format) = overrides.log_format.filter(|s| !s.is_empty()) {
            logging.format = format
                .parse()
                .map_err(|e| ConfigError::for_field(e, "log_format"))?;
        }

        Ok(self)
    }

    /// Checks values that cannot be expressed in their types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.values.kafka.broker_list().is_empty() {
            return Err(ConfigError::new(ConfigErrorKind::MissingValue).field("brokers"));
        }
        if self.values.kafka.topic.is_empty() {
            return Err(ConfigError::new(ConfigErrorKind::MissingValue).field("topic"));
        }
        if self.values.sink.backend.is_empty() {
            return Err(ConfigError::new(ConfigErrorKind::MissingValue).field("backend"));
        }
        if self.values.sink.kind == SinkKind::Http && self.values.sink.database.is_empty() {
            return Err(ConfigError::new(ConfigErrorKind::MissingValue).field("database"));
        }
        if self.values.sink.max_inflight_batches == 0 {
            return Err(ConfigError::new(ConfigErrorKind::InvalidValue).field("max_inflight_batches"));
        }

        Ok(())
    }

    /// Returns the path of the loaded config file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Dumps out a YAML string of the values.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(&self.values)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotSerialize))
    }

    /// Returns the logging configuration.
    pub fn logging(&self) -> &LogConfig {
        &self.values.logging
    }

    /// Returns the Kafka consumer configuration.
    pub fn kafka(&self) -> &KafkaConfig {
        &self.values.kafka
    }

    /// Returns the configured sink kind.
    pub fn sink_kind(&self) -> SinkKind {
        self.values.sink.kind
    }

    /// Returns the backend address or URL.
    pub fn backend(&self) -> &str {
        &self.values.sink.backend
    }

    /// Returns the settings to create the metric sink.
    pub fn sink_config(&self) -> SinkConfig {
        let sink = &self.values.sink;
        SinkConfig {
            kind: sink.kind,
            backend: sink.backend.clone(),
            database: sink.database.clone(),
            max_inflight_batches: sink.max_inflight_batches,
            request_timeout: Duration::from_secs(sink.request_timeout),
            shutdown_timeout: self.shutdown_timeout(),
            options: SinkOptions {
                dry_run: self.dry_run(),
                echo: self.echo(),
            },
        }
    }

    /// Returns the wire shape of records.
    pub fn record_format(&self) -> RecordFormat {
        self.values.records.format
    }

    /// Returns the filter and derivation settings.
    pub fn derive_config(&self) -> &DeriveConfig {
        &self.values.filters
    }

    /// Returns `true` if points should be formatted but never sent.
    pub fn dry_run(&self) -> bool {
        self.values.debug.dry_run
    }

    /// Returns `true` if records and formatted lines should be logged.
    pub fn echo(&self) -> bool {
        self.values.debug.echo
    }

    /// Returns the time to wait for queued deliveries on shutdown.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.values.limits.shutdown_timeout)
    }
}
