use std::fmt::Write;

use crate::{FieldValue, MetricPoint, ParsePointError, Precision, UnixMillis};

/// Characters escaped in measurement names.
const MEASUREMENT_SPECIAL: &[char] = &[',', ' ', '\\'];

/// Characters escaped in tag keys, tag values and field keys.
const KEY_SPECIAL: &[char] = &[',', '=', ' ', '\\'];

/// Characters escaped inside quoted string field values.
const STRING_SPECIAL: &[char] = &['"', '\\'];

fn push_escaped(buf: &mut String, value: &str, special: &[char]) {
    for c in value.chars() {
        if special.contains(&c) {
            buf.push('\\');
        }
        buf.push(c);
    }
}

fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => result.extend(chars.next()),
            c => result.push(c),
        }
    }
    result
}

/// Splits `string` at every unescaped occurrence of `separator`.
///
/// With `quoted_values`, separators inside a double-quoted field value (a `"` directly after `=`
/// up to the next unescaped `"`) are skipped. Quotes anywhere else are literal.
fn split_unescaped(string: &str, separator: char, quoted_values: bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut previous = None;
    let mut chars = string.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' if quoted => quoted = false,
            '"' if quoted_values && previous == Some('=') => quoted = true,
            c if c == separator && !quoted => {
                parts.push(&string[start..index]);
                start = index + c.len_utf8();
            }
            _ => (),
        }
        previous = Some(c);
    }

    parts.push(&string[start..]);
    parts
}

/// Splits `string` at the first unescaped `separator`.
fn split_once_unescaped(string: &str, separator: char) -> Option<(&str, &str)> {
    let mut chars = string.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            c if c == separator => {
                return Some((&string[..index], &string[index + c.len_utf8()..]));
            }
            _ => (),
        }
    }
    None
}

fn parse_field_value(raw: &str) -> Result<FieldValue, ParsePointError> {
    if let Some(quoted) = raw.strip_prefix('"') {
        let inner = quoted
            .strip_suffix('"')
            .ok_or(ParsePointError("unterminated string field"))?;
        return Ok(FieldValue::Text(unescape(inner)));
    }

    Ok(FieldValue::Number(raw.to_owned()))
}

impl MetricPoint {
    /// Formats this point as a line-protocol line, including the trailing newline.
    ///
    /// With `Some(precision)`, the timestamp is appended in units of that precision. With `None`,
    /// the timestamp is omitted and the backend assigns its receive time.
    pub fn to_line(&self, timestamp: Option<Precision>) -> String {
        let mut line = String::with_capacity(96);
        push_escaped(&mut line, &self.name, MEASUREMENT_SPECIAL);

        for (key, value) in &self.tags {
            line.push(',');
            push_escaped(&mut line, key, KEY_SPECIAL);
            line.push('=');
            push_escaped(&mut line, value, KEY_SPECIAL);
        }

        let mut separator = ' ';
        for (key, value) in &self.fields {
            line.push(separator);
            separator = ',';

            push_escaped(&mut line, key, KEY_SPECIAL);
            line.push('=');
            match value {
                FieldValue::Text(text) => {
                    line.push('"');
                    push_escaped(&mut line, text, STRING_SPECIAL);
                    line.push('"');
                }
                value => {
                    let _ = write!(line, "{value}");
                }
            }
        }

        if let Some(precision) = timestamp {
            let _ = write!(line, " {}", self.timestamp.in_precision(precision));
        }

        line.push('\n');
        line
    }

    /// Parses a single line-protocol line.
    ///
    /// A timestamp on the line is interpreted in units of `precision`. Lines without a timestamp
    /// receive `default_timestamp`. Unquoted field values are restored as [`FieldValue::Number`],
    /// quoted values as [`FieldValue::Text`].
    pub fn parse_line(
        line: &str,
        precision: Precision,
        default_timestamp: UnixMillis,
    ) -> Result<Self, ParsePointError> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let (series, rest) = split_once_unescaped(line, ' ')
            .ok_or(ParsePointError("expected series, fields and timestamp"))?;
        let sections = split_unescaped(rest, ' ', true);
        let (fields, timestamp) = match sections.as_slice() {
            [fields] => (*fields, None),
            [fields, timestamp] => (*fields, Some(*timestamp)),
            _ => return Err(ParsePointError("expected series, fields and timestamp")),
        };

        let mut series = split_unescaped(series, ',', false).into_iter();
        let name = series
            .next()
            .filter(|name| !name.is_empty())
            .ok_or(ParsePointError("missing measurement"))?;

        let timestamp = match timestamp {
            Some(ts) => ts
                .parse()
                .map(|ts| UnixMillis::from_precision(ts, precision))
                .map_err(|_| ParsePointError("invalid timestamp"))?,
            None => default_timestamp,
        };

        let mut point = MetricPoint::new(unescape(name), timestamp);

        for tag in series {
            let (key, value) =
                split_once_unescaped(tag, '=').ok_or(ParsePointError("invalid tag"))?;
            point.tags.insert(unescape(key), unescape(value));
        }

        for field in split_unescaped(fields, ',', true) {
            let (key, value) =
                split_once_unescaped(field, '=').ok_or(ParsePointError("invalid field"))?;
            point.fields.insert(unescape(key), parse_field_value(value)?);
        }

        if point.fields.is_empty() {
            return Err(ParsePointError("missing fields"));
        }

        Ok(point)
    }
}
