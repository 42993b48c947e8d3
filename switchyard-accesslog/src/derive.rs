use switchyard_protocol::{FieldValue, HOST_TAG, MetricPoint, UnixMillis, VALUE_FIELD};

use crate::{DeriveConfig, FieldMapping, normalize_duration, should_filter};

/// Extra field carrying the first forwarded-for address.
pub const FWD_FIELD: &str = "fwd";

/// Extra field carrying the TLS protocol version.
pub const TLS_VERSION_FIELD: &str = "tls_version";

/// A single derived metric, before it is turned into a [`MetricPoint`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Emission {
    /// The host label, either the host name or the site domain.
    pub host: String,
    /// The metric name.
    pub name: String,
    /// The raw decimal value. May be empty if the record lacked the source field.
    pub value: String,
    /// Additional string fields in emission order.
    pub extra: Vec<(String, String)>,
}

/// How the decimal value of an [`Emission`] is represented in a [`MetricPoint`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Coercion {
    /// Keep the decimal text as [`FieldValue::Number`].
    #[default]
    Verbatim,
    /// Parse the decimal text into [`FieldValue::Float`].
    Float,
}

/// The value of an [`Emission`] could not be coerced into a number.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid value {value:?} for metric {name}")]
pub struct CoercionError {
    /// Name of the affected metric.
    pub name: String,
    /// The rejected value.
    pub value: String,
}

impl Emission {
    /// Converts this emission into a point tagged with its host label.
    ///
    /// The value is stored under [`VALUE_FIELD`], extra fields as [`FieldValue::Text`]. With
    /// [`Coercion::Float`], values that do not parse as a finite float fail this single point.
    pub fn into_point(
        self,
        timestamp: UnixMillis,
        coercion: Coercion,
    ) -> Result<MetricPoint, CoercionError> {
        let value = match coercion {
            Coercion::Verbatim => FieldValue::Number(self.value),
            Coercion::Float => match self.value.parse::<f64>() {
                Ok(value) if value.is_finite() => FieldValue::Float(value),
                _ => {
                    return Err(CoercionError {
                        name: self.name,
                        value: self.value,
                    });
                }
            },
        };

        let mut point = MetricPoint::new(self.name, timestamp)
            .with_tag(HOST_TAG, self.host)
            .with_field(VALUE_FIELD, value);

        for (key, value) in self.extra {
            point = point.with_field(key, FieldValue::Text(value));
        }

        Ok(point)
    }
}

/// Extracts the first forwarded-for address.
///
/// Router logs append a `%` delimited marker to the address and may list several addresses
/// separated by commas.
fn first_forwarded(fwd: &str) -> &str {
    let fwd = fwd.split('%').next().unwrap_or_default();
    let fwd = fwd.split(',').next().unwrap_or_default();
    fwd.trim().trim_matches('"')
}

fn service_set(mapping: &FieldMapping) -> Vec<(String, String)> {
    vec![
        (
            "router.service.ms".to_owned(),
            normalize_duration(mapping.get("service")),
        ),
        (
            "router.connect.ms".to_owned(),
            normalize_duration(mapping.get("connect")),
        ),
        (
            "router.total.ms".to_owned(),
            normalize_duration(mapping.get("total")),
        ),
        (
            format!("router.status.{}", mapping.get("status")),
            "1".to_owned(),
        ),
        ("router.requests.count".to_owned(), "1".to_owned()),
    ]
}

fn client_closed_set(mapping: &FieldMapping) -> Vec<(String, String)> {
    vec![
        ("router.clientclosed.count".to_owned(), "1".to_owned()),
        (
            "router.clientclosed.ms".to_owned(),
            normalize_duration(mapping.get("client_closed_time")),
        ),
        (
            format!("router.status.{}", mapping.get("status")),
            "1".to_owned(),
        ),
        ("router.requests.count".to_owned(), "1".to_owned()),
    ]
}

/// Returns `true` if the record reports a connection closed by the client.
pub fn is_client_closed(mapping: &FieldMapping, config: &DeriveConfig) -> bool {
    !config.client_closed_marker.is_empty() && mapping.raw().contains(&config.client_closed_marker)
}

/// Derives the metric emissions of a parsed record.
///
/// Records rejected by [`should_filter`] derive nothing. Otherwise, the record derives either the
/// client-closed set or the service set. The set is emitted under the `hostname` and, if the
/// record carries a non-empty `site_domain`, a second time under the site domain.
pub fn derive(mapping: &FieldMapping, config: &DeriveConfig) -> Vec<Emission> {
    if let Err(reason) = should_filter(mapping, config) {
        switchyard_log::trace!(%reason, "access log record filtered");
        return Vec::new();
    }

    let set = if is_client_closed(mapping, config) {
        client_closed_set(mapping)
    } else {
        service_set(mapping)
    };

    let extra = if config.enrich {
        vec![
            (
                FWD_FIELD.to_owned(),
                first_forwarded(mapping.get("fwd")).to_owned(),
            ),
            (
                TLS_VERSION_FIELD.to_owned(),
                mapping.get("tls_version").to_owned(),
            ),
        ]
    } else {
        Vec::new()
    };

    let mut hosts = vec![mapping.get("hostname")];
    let site_domain = mapping.get("site_domain");
    if !site_domain.is_empty() {
        hosts.push(site_domain);
    }

    let mut emissions = Vec::with_capacity(set.len() * hosts.len());
    for host in hosts {
        for (name, value) in &set {
            emissions.push(Emission {
                host: host.to_owned(),
                name: name.clone(),
                value: value.clone(),
                extra: extra.clone(),
            });
        }
    }

    emissions
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::{RecordFormat, parse};

    fn derive_tokens(payload: &str, config: &DeriveConfig) -> Vec<Emission> {
        derive(&parse(payload.as_bytes(), RecordFormat::Tokens), config)
    }

    fn summary(emissions: &[Emission]) -> Vec<String> {
        emissions
            .iter()
            .map(|e| format!("{} {}={}", e.host, e.name, e.value))
            .collect()
    }

    #[test]
    fn test_nine_tokens_derive_nothing() {
        let emissions = derive_tokens(
            "hostname=web-1 status=200 service=45ms total=120ms connect=5ms site_domain= extra1 extra2 extra3 extra4",
            &DeriveConfig::default(),
        );
        assert!(emissions.is_empty());
    }

    #[test]
    fn test_service_set() {
        let emissions = derive_tokens(
            "hostname=web-1 status=200 service=45ms total=120ms connect=5ms extra1 extra2 extra3 extra4 extra5",
            &DeriveConfig::default(),
        );

        insta::assert_debug_snapshot!(summary(&emissions), @r###"
        [
            "web-1 router.service.ms=45",
            "web-1 router.connect.ms=5",
            "web-1 router.total.ms=120",
            "web-1 router.status.200=1",
            "web-1 router.requests.count=1",
        ]
        "###);
        assert!(emissions.iter().all(|e| e.extra.is_empty()));
    }

    #[test]
    fn test_site_domain_duplicates_set() {
        let emissions = derive_tokens(
            "hostname=web-1 status=200 service=45ms total=120ms connect=5ms site_domain=example.com extra1 extra2 extra3 extra4 extra5",
            &DeriveConfig::default(),
        );

        assert_eq!(emissions.len(), 10);

        let (web, site): (Vec<_>, Vec<_>) = emissions.iter().partition(|e| e.host == "web-1");
        assert_eq!(web.len(), 5);
        assert_eq!(site.len(), 5);
        assert!(site.iter().all(|e| e.host == "example.com"));

        for (a, b) in web.iter().zip(&site) {
            assert_eq!((&a.name, &a.value), (&b.name, &b.value));
        }
    }

    #[test]
    fn test_client_closed_set() {
        let emissions = derive_tokens(
            "at=error code=H27 hostname=web-2 status=499 client_closed_time=30ms f1 f2 f3 f4 f5",
            &DeriveConfig::default(),
        );

        insta::assert_debug_snapshot!(summary(&emissions), @r###"
        [
            "web-2 router.clientclosed.count=1",
            "web-2 router.clientclosed.ms=30",
            "web-2 router.status.499=1",
            "web-2 router.requests.count=1",
        ]
        "###);
        assert!(!emissions.iter().any(|e| e.name == "router.service.ms"));
    }

    #[test]
    fn test_test_host_derives_nothing() {
        let emissions = derive_tokens(
            "hostname=alamotest-3 status=200 service=45ms total=120ms connect=5ms f1 f2 f3 f4 f5",
            &DeriveConfig::default(),
        );
        assert!(emissions.is_empty());
    }

    #[test]
    fn test_excluded_port_derives_nothing() {
        let emissions = derive_tokens(
            "hostname=web-1 status=200 service=45ms total=120ms connect=5ms port=4813 f1 f2 f3 f4",
            &DeriveConfig::default(),
        );
        assert!(emissions.is_empty());
    }

    #[test]
    fn test_missing_fields_yield_empty_values() {
        let emissions = derive_tokens(
            "hostname=web-1 f1 f2 f3 f4 f5 f6 f7 f8 f9",
            &DeriveConfig::default(),
        );

        assert_eq!(emissions.len(), 5);
        assert_eq!(emissions[0].value, "");
        assert_eq!(emissions[3].name, "router.status.");
    }

    #[test]
    fn test_enrichment() {
        let config = DeriveConfig {
            enrich: true,
            ..DeriveConfig::default()
        };

        let emissions = derive_tokens(
            "hostname=web-1 status=200 service=45ms total=120ms connect=5ms fwd=\"10.1.2.3%0,10.9.9.9\" tls_version=TLSv1.2 f1 f2 f3",
            &config,
        );

        assert_eq!(emissions.len(), 5);
        for emission in &emissions {
            assert_eq!(
                emission.extra,
                vec![
                    ("fwd".to_owned(), "10.1.2.3".to_owned()),
                    ("tls_version".to_owned(), "TLSv1.2".to_owned()),
                ]
            );
        }
    }

    #[test]
    fn test_first_forwarded() {
        assert_eq!(first_forwarded("10.1.2.3%0"), "10.1.2.3");
        assert_eq!(first_forwarded("10.1.2.3, 10.9.9.9"), "10.1.2.3");
        assert_eq!(first_forwarded(" \"10.1.2.3\" "), "10.1.2.3");
        assert_eq!(first_forwarded(""), "");
    }

    #[test]
    fn test_json_record() {
        let payload = r#"{"host":"web-1","status":503,"service":"12.5µs","total":"3ms","connect":"1ms","method":"GET","path":"/","bytes":12,"app":"a","space":"s"}"#.as_bytes();
        let emissions = derive(
            &parse(payload, RecordFormat::Json),
            &DeriveConfig::default(),
        );

        insta::assert_debug_snapshot!(summary(&emissions), @r###"
        [
            "web-1 router.service.ms=0.012500",
            "web-1 router.connect.ms=1",
            "web-1 router.total.ms=3",
            "web-1 router.status.503=1",
            "web-1 router.requests.count=1",
        ]
        "###);
    }

    #[test]
    fn test_short_json_record() {
        let payload = br#"{"host":"web-1","status":200,"service":"45ms","total":"120ms","connect":"5ms"}"#;
        let emissions = derive(
            &parse(payload, RecordFormat::Json),
            &DeriveConfig::default(),
        );

        insta::assert_debug_snapshot!(summary(&emissions), @r###"
        [
            "web-1 router.service.ms=45",
            "web-1 router.connect.ms=5",
            "web-1 router.total.ms=120",
            "web-1 router.status.200=1",
            "web-1 router.requests.count=1",
        ]
        "###);
    }

    fn emission(value: &str) -> Emission {
        Emission {
            host: "web-1".to_owned(),
            name: "router.total.ms".to_owned(),
            value: value.to_owned(),
            extra: vec![("tls_version".to_owned(), "TLSv1.3".to_owned())],
        }
    }

    #[test]
    fn test_into_point_verbatim() {
        let point = emission("120")
            .into_point(UnixMillis::from_millis(1000), Coercion::Verbatim)
            .unwrap();

        assert_eq!(point.host(), Some("web-1"));
        assert_eq!(point.value(), Some(&FieldValue::Number("120".to_owned())));
        assert_eq!(
            point.fields.get("tls_version"),
            Some(&FieldValue::Text("TLSv1.3".to_owned()))
        );
        assert_eq!(point.timestamp, UnixMillis::from_millis(1000));
    }

    #[test]
    fn test_into_point_float() {
        let point = emission("0.012500")
            .into_point(UnixMillis::from_millis(1000), Coercion::Float)
            .unwrap();
        assert_eq!(point.value(), Some(&FieldValue::Float(0.0125)));
    }

    #[test]
    fn test_into_point_float_rejects_empty() {
        let error = emission("")
            .into_point(UnixMillis::from_millis(1000), Coercion::Float)
            .unwrap_err();

        insta::assert_snapshot!(error.to_string(), @r###"invalid value "" for metric router.total.ms"###);
    }

    #[test]
    fn test_into_point_verbatim_keeps_empty() {
        let point = emission("")
            .into_point(UnixMillis::from_millis(1000), Coercion::Verbatim)
            .unwrap();
        assert_eq!(point.value(), Some(&FieldValue::Number(String::new())));
    }
}
