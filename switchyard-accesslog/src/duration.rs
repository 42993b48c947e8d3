/// Normalizes a router duration to milliseconds.
///
/// Values in milliseconds are returned verbatim without their `ms` suffix. Values in microseconds
/// (`µs`, or `us`) are converted to milliseconds and formatted with six decimals. Any other unit,
/// and microsecond values that are not numbers, yield an empty string.
///
/// # Example
///
/// ```
/// use switchyard_accesslog::normalize_duration;
///
/// assert_eq!(normalize_duration("12ms"), "12");
/// assert_eq!(normalize_duration("12.5µs"), "0.012500");
/// assert_eq!(normalize_duration("3s"), "");
/// ```
pub fn normalize_duration(value: &str) -> String {
    if let Some(millis) = value.strip_suffix("ms") {
        return millis.to_owned();
    }

    let micros = value
        .strip_suffix("µs")
        .or_else(|| value.strip_suffix("us"));

    match micros.and_then(|micros| micros.parse::<f64>().ok()) {
        Some(micros) if micros.is_finite() => format!("{:.6}", micros * 0.001),
        _ => String::new(),
    }
}
