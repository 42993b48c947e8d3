use std::fmt;

use serde::Serialize;

use crate::{DeriveConfig, FieldMapping, RecordFormat};

/// Identifies which inclusion check dropped a record.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterReason {
    /// The host name starts with the test-host prefix.
    TestHost,
    /// The record does not carry more significant tokens than the configured minimum.
    TooFewTokens,
    /// The payload contains the excluded-port marker.
    ExcludedPort,
}

impl FilterReason {
    /// Returns the string identifier of the filter reason.
    pub fn name(self) -> &'static str {
        match self {
            Self::TestHost => "test-host",
            Self::TooFewTokens => "too-few-tokens",
            Self::ExcludedPort => "excluded-port",
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_test_host(mapping: &FieldMapping, prefix: &str) -> bool {
    !prefix.is_empty() && mapping.get("hostname").starts_with(prefix)
}

fn has_excluded_port(mapping: &FieldMapping, marker: &str) -> bool {
    !marker.is_empty() && mapping.raw().contains(marker)
}

/// Checks whether a record should be dropped before derivation.
///
/// If the record should be dropped, the `Err` contains the reason of the first check that did not
/// pass. The checks only apply to token records; JSON records are always eligible.
pub fn should_filter(mapping: &FieldMapping, config: &DeriveConfig) -> Result<(), FilterReason> {
    if mapping.format() == RecordFormat::Json {
        return Ok(());
    }

    if is_test_host(mapping, &config.test_host_prefix) {
        return Err(FilterReason::TestHost);
    }

    if mapping.significant_tokens() <= config.min_tokens {
        return Err(FilterReason::TooFewTokens);
    }

    if has_excluded_port(mapping, &config.excluded_port_marker) {
        return Err(FilterReason::ExcludedPort);
    }

    Ok(())
}
