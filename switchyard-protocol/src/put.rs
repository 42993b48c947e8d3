use std::fmt::Write;

use crate::{FieldValue, MetricPoint, ParsePointError, UnixMillis, VALUE_FIELD};

impl MetricPoint {
    /// Formats this point as a put-protocol line, including the trailing newline.
    ///
    /// Only the [`VALUE_FIELD`] field is written; the put protocol has no notion of additional
    /// fields. A point without a value is written with an empty value.
    ///
    /// # Example
    ///
    /// ```
    /// use switchyard_protocol::{FieldValue, MetricPoint, UnixMillis, VALUE_FIELD};
    ///
    /// let point = MetricPoint::new("router.total.ms", UnixMillis::from_millis(1000))
    ///     .with_tag("host", "web-1")
    ///     .with_field(VALUE_FIELD, FieldValue::Number("120".to_owned()));
    ///
    /// assert_eq!(point.to_put_line(), "put router.total.ms 1000 120 host=web-1\n");
    /// ```
    pub fn to_put_line(&self) -> String {
        let mut line = String::with_capacity(64);
        line.push_str("put ");
        line.push_str(&self.name);
        line.push(' ');
        let _ = write!(line, "{}", self.timestamp);
        line.push(' ');
        if let Some(value) = self.value() {
            let _ = write!(line, "{value}");
        }

        for (key, value) in &self.tags {
            line.push(' ');
            line.push_str(key);
            line.push('=');
            line.push_str(value);
        }

        line.push('\n');
        line
    }

    /// Parses a single put-protocol line.
    ///
    /// The trailing newline is optional. Components are separated by single spaces, so empty
    /// values survive a round trip. The value is restored as [`FieldValue::Number`].
    pub fn parse_put(line: &str) -> Result<Self, ParsePointError> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let mut components = line.split(' ');
        if components.next() != Some("put") {
            return Err(ParsePointError("missing put command"));
        }

        let name = components
            .next()
            .filter(|name| !name.is_empty())
            .ok_or(ParsePointError("missing metric name"))?;

        let timestamp = components
            .next()
            .and_then(|ts| ts.parse().ok())
            .map(UnixMillis::from_millis)
            .ok_or(ParsePointError("invalid timestamp"))?;

        let value = components
            .next()
            .ok_or(ParsePointError("missing value"))?;

        let mut point = MetricPoint::new(name, timestamp)
            .with_field(VALUE_FIELD, FieldValue::Number(value.to_owned()));

        for component in components {
            let (key, value) = component
                .split_once('=')
                .ok_or(ParsePointError("invalid tag"))?;
            point.tags.insert(key.to_owned(), value.to_owned());
        }

        Ok(point)
    }
}
