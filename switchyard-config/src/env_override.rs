//! Overrides of configuration values from environment variables and command line arguments.

use std::env;

/// Configuration values that can be overridden from the environment or the command line.
///
/// All values are kept as raw strings and validated by
/// [`Config::apply_override`](crate::Config::apply_override).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OverridableConfig {
    /// Format points but never send them.
    pub dry_run: Option<String>,
    /// Log every record and formatted line.
    pub echo: Option<String>,
    /// Attach forwarded-for address and TLS version to points.
    pub enrich: Option<String>,
    /// Base name of the consumer group.
    pub group_base: Option<String>,
    /// Comma separated Kafka brokers.
    pub brokers: Option<String>,
    /// The topic to consume.
    pub topic: Option<String>,
    /// Sink kind: `put`, `line` or `http`.
    pub sink: Option<String>,
    /// Address or URL of the metric backend.
    pub backend: Option<String>,
    /// Database name for the HTTP sink.
    pub database: Option<String>,
    /// Record format: `tokens` or `json`.
    pub record_format: Option<String>,
    /// Prefix of test hosts to drop.
    pub test_host_prefix: Option<String>,
    /// Marker of records from the excluded port.
    pub excluded_port_marker: Option<String>,
    /// Number of significant tokens a record must exceed.
    pub min_tokens: Option<String>,
    /// Number of HTTP batches that may wait for delivery.
    pub max_inflight_batches: Option<String>,
    /// Log level.
    pub log_level: Option<String>,
    /// Log format.
    pub log_format: Option<String>,
}

/// Extracts overrides from the process environment.
pub fn extract_config_env_vars() -> OverridableConfig {
    extract_config_vars(|name| env::var(name).ok())
}

/// Extracts overrides using the given variable lookup.
pub fn extract_config_vars<F>(lookup: F) -> OverridableConfig
where
    F: Fn(&str) -> Option<String>,
{
    OverridableConfig {
        dry_run: lookup("DEBUG_NO_SEND"),
        echo: lookup("DEBUG_OUTPUT"),
        enrich: lookup("SEND_FWD_TLSVERSION"),
        group_base: lookup("CONSUMER_GROUP_NAME"),
        brokers: lookup("KAFKA_BROKERS"),
        topic: lookup("KAFKA_TOPIC"),
        sink: lookup("SINK"),
        backend: lookup("INFLUX"),
        database: lookup("INFLUX_DB"),
        record_format: lookup("RECORD_FORMAT"),
        test_host_prefix: lookup("TEST_HOST_PREFIX"),
        excluded_port_marker: lookup("EXCLUDED_PORT_MARKER"),
        min_tokens: lookup("MIN_TOKENS"),
        max_inflight_batches: lookup("MAX_INFLIGHT_BATCHES"),
        log_level: lookup("SWITCHYARD_LOG_LEVEL"),
        log_format: lookup("SWITCHYARD_LOG_FORMAT"),
    }
}

/// Error returned by [`parse_bool`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid boolean {0:?}")]
pub struct ParseBoolError(String);

/// Parses a boolean switch.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and `0`, `f`, `F`, `FALSE`, `false`, `False`. An
/// empty value is `false`.
pub fn parse_bool(value: &str) -> Result<bool, ParseBoolError> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "" | "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(ParseBoolError(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_parse_bool() {
        for value in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(value), Ok(true), "{value}");
        }
        for value in ["", "0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(value), Ok(false), "{value}");
        }
        assert!(parse_bool("yes").is_err());
        assert!(parse_bool("tRuE").is_err());
    }

    #[test]
    fn test_extract_vars() {
        let env = BTreeMap::from([
            ("DEBUG_NO_SEND", "true"),
            ("INFLUX", "udp://metrics:8089"),
            ("SINK", "line"),
            ("CONSUMER_GROUP_NAME", "router-metrics"),
        ]);

        let overrides = extract_config_vars(|name| env.get(name).map(|v| (*v).to_owned()));

        assert_eq!(
            overrides,
            OverridableConfig {
                dry_run: Some("true".to_owned()),
                backend: Some("udp://metrics:8089".to_owned()),
                sink: Some("line".to_owned()),
                group_base: Some("router-metrics".to_owned()),
                ..OverridableConfig::default()
            }
        );
    }
}
