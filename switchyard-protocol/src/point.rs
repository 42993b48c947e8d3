use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::UnixMillis;

/// Name of the field that carries the primary value of a point.
pub const VALUE_FIELD: &str = "value";

/// Name of the tag identifying the host a point was reported for.
pub const HOST_TAG: &str = "host";

/// Tags of a [`MetricPoint`], ordered by key.
pub type Tags = BTreeMap<String, String>;

/// Fields of a [`MetricPoint`], ordered by key.
pub type Fields = BTreeMap<String, FieldValue>;

/// The value of a single field of a [`MetricPoint`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A number kept as the decimal text it was read from.
    ///
    /// The text is written to the wire verbatim. It is not validated, so an empty string produces
    /// a point the backend will reject.
    Number(String),
    /// A number coerced into a float.
    Float(f64),
    /// A string value. The line protocol writes it quoted.
    Text(String),
}

impl FieldValue {
    /// Returns the float value if this field is numeric and parses as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(s) => s.parse().ok(),
            Self::Float(f) => Some(*f),
            Self::Text(_) => None,
        }
    }

    /// Returns `true` for [`FieldValue::Text`].
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => f.write_str(value),
            Self::Float(value) => value.fmt(f),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A single derived metric point.
///
/// Points are immutable once derived. Ownership moves to the sink for the duration of one
/// delivery.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricPoint {
    /// Metric name, for example `router.service.ms`.
    pub name: String,
    /// Index dimensions. Always contains [`HOST_TAG`] for points derived from access logs.
    pub tags: Tags,
    /// Values of the point. The primary value is stored under [`VALUE_FIELD`].
    pub fields: Fields,
    /// Time the point refers to.
    pub timestamp: UnixMillis,
}

impl MetricPoint {
    /// Creates a point without tags or fields.
    pub fn new(name: impl Into<String>, timestamp: UnixMillis) -> Self {
        Self {
            name: name.into(),
            tags: Tags::new(),
            fields: Fields::new(),
            timestamp,
        }
    }

    /// Adds or replaces a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds or replaces a field.
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Returns the primary value of this point.
    pub fn value(&self) -> Option<&FieldValue> {
        self.fields.get(VALUE_FIELD)
    }

    /// Returns the value of the [`HOST_TAG`] tag.
    pub fn host(&self) -> Option<&str> {
        self.tags.get(HOST_TAG).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let point = MetricPoint::new("router.service.ms", UnixMillis::from_millis(4711))
            .with_tag(HOST_TAG, "web-1")
            .with_field(VALUE_FIELD, FieldValue::Number("45".to_owned()));

        insta::assert_debug_snapshot!(point, @r###"
        MetricPoint {
            name: "router.service.ms",
            tags: {
                "host": "web-1",
            },
            fields: {
                "value": Number(
                    "45",
                ),
            },
            timestamp: UnixMillis(4711),
        }
        "###);

        assert_eq!(point.host(), Some("web-1"));
    }

    #[test]
    fn test_field_as_f64() {
        assert_eq!(FieldValue::Number("0.012500".to_owned()).as_f64(), Some(0.0125));
        assert_eq!(FieldValue::Number(String::new()).as_f64(), None);
        assert_eq!(FieldValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(FieldValue::Text("12".to_owned()).as_f64(), None);
    }

    #[test]
    fn test_serialize_json() {
        let point = MetricPoint::new("router.requests.count", UnixMillis::from_millis(1000))
            .with_tag(HOST_TAG, "web-1")
            .with_field(VALUE_FIELD, FieldValue::Float(1.0))
            .with_field("tls_version", FieldValue::Text("TLSv1.2".to_owned()));

        assert_eq!(
            serde_json::to_string(&point).unwrap(),
            r#"{"name":"router.requests.count","tags":{"host":"web-1"},"fields":{"tls_version":"TLSv1.2","value":1.0},"timestamp":1000}"#
        );
    }
}
