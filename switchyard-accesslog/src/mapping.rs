use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The wire shape of access-log records.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// A single line of whitespace-delimited `key=value` tokens.
    #[default]
    Tokens,
    /// A single flat JSON object.
    Json,
}

impl RecordFormat {
    /// Returns the configuration name of this format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tokens => "tokens",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`RecordFormat`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown record format, expected tokens or json")]
pub struct ParseRecordFormatError;

impl FromStr for RecordFormat {
    type Err = ParseRecordFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tokens" => Ok(Self::Tokens),
            "json" => Ok(Self::Json),
            _ => Err(ParseRecordFormatError),
        }
    }
}

/// Fields of a parsed access-log record.
///
/// Reading an absent field yields an empty string. Besides the fields, the mapping keeps the
/// record format, the raw payload text and the number of significant tokens for the inclusion
/// checks in [`should_filter`](crate::should_filter).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldMapping {
    format: RecordFormat,
    fields: BTreeMap<String, String>,
    significant_tokens: usize,
    raw: String,
}

impl FieldMapping {
    /// Returns the value of the given field, or an empty string if it is absent.
    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map_or("", String::as_str)
    }

    /// Returns `true` if the field is present, even if its value is empty.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields were parsed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over all fields ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the format the payload was parsed from.
    pub fn format(&self) -> RecordFormat {
        self.format
    }

    /// Returns the number of significant tokens in the payload.
    ///
    /// Every whitespace-delimited token counts except empty assignments such as `site_domain=`.
    /// JSON records have no tokens and always report zero.
    pub fn significant_tokens(&self) -> usize {
        self.significant_tokens
    }

    /// Returns the raw payload text.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Parses a raw record payload in the given format.
///
/// This never fails. Invalid UTF-8 is replaced, tokens without a single `=` are skipped, and JSON
/// that cannot be decoded is logged and yields a mapping without fields.
pub fn parse(payload: &[u8], format: RecordFormat) -> FieldMapping {
    let raw = String::from_utf8_lossy(payload).into_owned();

    match format {
        RecordFormat::Tokens => parse_tokens(raw),
        RecordFormat::Json => parse_json(raw),
    }
}

fn is_significant(token: &str) -> bool {
    !matches!(token.split_once('='), Some((_, "")))
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_tokens(raw: String) -> FieldMapping {
    let mut mapping = FieldMapping::default();

    for token in raw.split_whitespace() {
        if is_significant(token) {
            mapping.significant_tokens += 1;
        }

        let mut parts = token.split('=');
        if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
            mapping.insert(key, strip_quotes(value));
        }
    }

    mapping.raw = raw;
    mapping
}

fn parse_json(raw: String) -> FieldMapping {
    let mut mapping = FieldMapping {
        format: RecordFormat::Json,
        ..FieldMapping::default()
    };

    match serde_json::from_str::<serde_json::Map<String, Value>>(&raw) {
        Ok(object) => {
            for (key, value) in object {
                let value = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null | Value::Array(_) | Value::Object(_) => continue,
                };
                mapping.insert(key, value);
            }

            if !mapping.contains("hostname") {
                if let Some(host) = mapping.fields.get("host").cloned() {
                    mapping.insert("hostname", host);
                }
            }
        }
        Err(error) => {
            switchyard_log::error!(
                error = &error as &dyn Error,
                "failed to decode json access log record"
            );
        }
    }

    mapping.raw = raw;
    mapping
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_parse_tokens() {
        let mapping = parse(
            b"hostname=web-1 status=200 service=45ms noise fwd=\"10.0.0.1\" a=b=c",
            RecordFormat::Tokens,
        );

        insta::assert_debug_snapshot!(mapping.iter().collect::<Vec<_>>(), @r###"
        [
            (
                "fwd",
                "10.0.0.1",
            ),
            (
                "hostname",
                "web-1",
            ),
            (
                "service",
                "45ms",
            ),
            (
                "status",
                "200",
            ),
        ]
        "###);
        assert_eq!(mapping.significant_tokens(), 6);
        assert_eq!(mapping.format(), RecordFormat::Tokens);
    }

    #[test]
    fn test_absent_field_is_empty() {
        let mapping = parse(b"hostname=web-1", RecordFormat::Tokens);
        assert_eq!(mapping.get("site_domain"), "");
        assert!(!mapping.contains("site_domain"));
    }

    #[test]
    fn test_empty_assignment_not_significant() {
        let mapping = parse(b"hostname=web-1 site_domain= extra", RecordFormat::Tokens);
        assert_eq!(mapping.significant_tokens(), 2);
        assert!(mapping.contains("site_domain"));
        assert_eq!(mapping.get("site_domain"), "");
    }

    #[test]
    fn test_tokens_keep_raw() {
        let payload = "at=info code=H27 hostname=web-2";
        let mapping = parse(payload.as_bytes(), RecordFormat::Tokens);
        assert_eq!(mapping.raw(), payload);
    }

    #[test]
    fn test_tokens_invalid_utf8() {
        let mapping = parse(b"hostname=web-\xff1 status=200", RecordFormat::Tokens);
        assert_eq!(mapping.get("hostname"), "web-\u{fffd}1");
        assert_eq!(mapping.get("status"), "200");
    }

    #[test]
    fn test_parse_json() {
        let payload = br#"{
            "host": "web-1",
            "status": 200,
            "service": "45ms",
            "total": "120ms",
            "bytes": 512,
            "tls": true,
            "headers": {"a": "b"},
            "fwd": null
        }"#;

        let mapping = parse(payload, RecordFormat::Json);

        assert_eq!(mapping.get("hostname"), "web-1");
        assert_eq!(mapping.get("status"), "200");
        assert_eq!(mapping.get("bytes"), "512");
        assert_eq!(mapping.get("tls"), "true");
        assert!(!mapping.contains("headers"));
        assert!(!mapping.contains("fwd"));
        assert_eq!(mapping.format(), RecordFormat::Json);
        assert_eq!(mapping.significant_tokens(), 0);
    }

    #[test]
    fn test_json_hostname_wins() {
        let mapping = parse(
            br#"{"host": "lb-1", "hostname": "web-1"}"#,
            RecordFormat::Json,
        );
        assert_eq!(mapping.get("hostname"), "web-1");
        assert_eq!(mapping.get("host"), "lb-1");
    }

    #[test]
    fn test_invalid_json() {
        switchyard_log::init_test!();

        let mapping = parse(b"{\"host\": ", RecordFormat::Json);
        assert!(mapping.is_empty());
        assert_eq!(mapping.significant_tokens(), 0);
        assert_eq!(mapping.raw(), "{\"host\": ");
    }

    #[test]
    fn test_parse_record_format() {
        assert_eq!("json".parse(), Ok(RecordFormat::Json));
        assert_eq!("tokens".parse(), Ok(RecordFormat::Tokens));
        assert_eq!("xml".parse::<RecordFormat>(), Err(ParseRecordFormatError));
    }
}
