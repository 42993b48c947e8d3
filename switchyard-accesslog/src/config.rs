//! Configuration of record filtering and metric derivation.

use serde::{Deserialize, Serialize};

/// Default prefix of host names that are never reported.
pub const DEFAULT_TEST_HOST_PREFIX: &str = "alamotest";

/// Default marker of records that originate from the internal health-check port.
pub const DEFAULT_EXCLUDED_PORT_MARKER: &str = "4813";

/// Default marker of records where the client closed the connection before the response.
pub const DEFAULT_CLIENT_CLOSED_MARKER: &str = "code=H27";

/// Default number of significant tokens a record must exceed.
pub const DEFAULT_MIN_TOKENS: usize = 9;

/// Configuration for [`should_filter`](crate::should_filter) and [`derive`](crate::derive).
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeriveConfig {
    /// Records whose `hostname` starts with this prefix are dropped. Empty disables the filter.
    pub test_host_prefix: String,
    /// Records whose payload contains this text are dropped. Empty disables the filter.
    pub excluded_port_marker: String,
    /// Payloads containing this text emit the client-closed set instead of the service set.
    pub client_closed_marker: String,
    /// Records must carry strictly more significant tokens than this.
    pub min_tokens: usize,
    /// Attach the forwarded-for address and TLS version as extra fields.
    pub enrich: bool,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            test_host_prefix: DEFAULT_TEST_HOST_PREFIX.to_owned(),
            excluded_port_marker: DEFAULT_EXCLUDED_PORT_MARKER.to_owned(),
            client_closed_marker: DEFAULT_CLIENT_CLOSED_MARKER.to_owned(),
            min_tokens: DEFAULT_MIN_TOKENS,
            enrich: false,
        }
    }
}
