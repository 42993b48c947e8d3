use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use similar_asserts::assert_eq;
use switchyard_accesslog::{DeriveConfig, RecordFormat};
use switchyard_common::{Stats, StatsSnapshot};
use switchyard_kafka::{ConsumerError, ConsumerEvent, OffsetTracker, RawRecord, RecordSource};
use switchyard_server::{Pipeline, PipelineConfig};
use switchyard_sink::{MetricSink, SinkConfig, SinkKind, SinkOptions};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, UdpSocket};

const SITE_RECORD: &str = "hostname=web-1 status=200 service=45ms total=120ms connect=5ms \
    site_domain=example.com extra1 extra2 extra3 extra4 extra5";

/// Replays a fixed list of events and remembers committed offsets.
struct MemorySource {
    events: VecDeque<ConsumerEvent>,
    tracker: OffsetTracker,
    commits: Arc<Mutex<Vec<(i32, i64)>>>,
}

impl MemorySource {
    fn new(events: impl IntoIterator<Item = ConsumerEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            tracker: OffsetTracker::default(),
            commits: Arc::default(),
        }
    }

    fn commits(&self) -> Arc<Mutex<Vec<(i32, i64)>>> {
        Arc::clone(&self.commits)
    }
}

impl RecordSource for MemorySource {
    fn next_event(&mut self) -> impl Future<Output = Option<ConsumerEvent>> + Send {
        std::future::ready(self.events.pop_front())
    }

    fn commit(&mut self, record: &RawRecord) -> Result<(), ConsumerError> {
        if let Some(next) = self
            .tracker
            .advance(&record.topic, record.partition, record.offset)
        {
            self.commits.lock().unwrap().push((record.partition, next));
        }
        Ok(())
    }
}

fn record(offset: i64, payload: &str) -> ConsumerEvent {
    let mut record = RawRecord::new("istio-access-logs", 0, offset, payload.as_bytes().to_vec());
    record.timestamp = Some(1_600_000_000_123);
    ConsumerEvent::Record(record)
}

fn sink_config(kind: SinkKind, backend: String, options: SinkOptions) -> SinkConfig {
    SinkConfig {
        kind,
        backend,
        database: "router".to_owned(),
        max_inflight_batches: 4,
        request_timeout: Duration::from_secs(1),
        shutdown_timeout: Duration::from_secs(1),
        options,
    }
}

fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        format: RecordFormat::Tokens,
        derive: DeriveConfig::default(),
        echo: false,
    }
}

#[tokio::test]
async fn test_site_domain_record_over_put() {
    switchyard_log::init_test!();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let stats = Arc::new(Stats::new());
    let sink = MetricSink::connect(
        &sink_config(SinkKind::Put, addr, SinkOptions::default()),
        Arc::clone(&stats),
    )
    .await
    .unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();

    let source = MemorySource::new([record(41, SITE_RECORD)]);
    let commits = source.commits();

    let snapshot = Pipeline::new(source, sink, pipeline_config(), stats)
        .run(std::future::pending())
        .await;

    let mut received = String::new();
    peer.read_to_string(&mut received).await.unwrap();

    insta::assert_snapshot!(received.trim_end(), @r###"
    put router.service.ms 1600000000123 45 host=web-1
    put router.connect.ms 1600000000123 5 host=web-1
    put router.total.ms 1600000000123 120 host=web-1
    put router.status.200 1600000000123 1 host=web-1
    put router.requests.count 1600000000123 1 host=web-1
    put router.service.ms 1600000000123 45 host=example.com
    put router.connect.ms 1600000000123 5 host=example.com
    put router.total.ms 1600000000123 120 host=example.com
    put router.status.200 1600000000123 1 host=example.com
    put router.requests.count 1600000000123 1 host=example.com
    "###);

    assert_eq!(*commits.lock().unwrap(), vec![(0, 42)]);
    assert_eq!(
        snapshot,
        StatsSnapshot {
            consumed: 1,
            processed: 1,
            errors: 0,
        }
    );
}

#[tokio::test]
async fn test_filtered_records_are_committed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let stats = Arc::new(Stats::new());
    let sink = MetricSink::connect(
        &sink_config(SinkKind::Put, addr, SinkOptions::default()),
        Arc::clone(&stats),
    )
    .await
    .unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();

    let source = MemorySource::new([
        record(7, "hostname=web-1 status=200 too few tokens"),
        record(8, "hostname=alamotest-3 status=200 f1 f2 f3 f4 f5 f6 f7 f8"),
    ]);
    let commits = source.commits();

    let snapshot = Pipeline::new(source, sink, pipeline_config(), stats)
        .run(std::future::pending())
        .await;

    let mut received = String::new();
    peer.read_to_string(&mut received).await.unwrap();

    assert_eq!(received, "");
    assert_eq!(*commits.lock().unwrap(), vec![(0, 8), (0, 9)]);
    assert_eq!(snapshot.consumed, 2);
    assert_eq!(snapshot.processed, 2);
    assert_eq!(snapshot.errors, 0);
}

#[tokio::test]
async fn test_http_coercion_failures_count_errors() {
    let stats = Arc::new(Stats::new());
    let options = SinkOptions {
        dry_run: true,
        echo: false,
    };
    let sink = MetricSink::connect(
        &sink_config(SinkKind::Http, "127.0.0.1:8086".to_owned(), options),
        Arc::clone(&stats),
    )
    .await
    .unwrap();

    // Durations are missing, so three of the five points carry no numeric value.
    let source = MemorySource::new([record(0, "hostname=web-1 f1 f2 f3 f4 f5 f6 f7 f8 f9")]);

    let snapshot = Pipeline::new(source, sink, pipeline_config(), stats)
        .run(std::future::pending())
        .await;

    assert_eq!(
        snapshot,
        StatsSnapshot {
            consumed: 1,
            processed: 1,
            errors: 3,
        }
    );
}

#[tokio::test]
async fn test_consumer_errors_do_not_stop_the_loop() {
    let stats = Arc::new(Stats::new());
    let options = SinkOptions {
        dry_run: true,
        echo: false,
    };
    let sink = MetricSink::connect(
        &sink_config(SinkKind::Http, "127.0.0.1:8086".to_owned(), options),
        Arc::clone(&stats),
    )
    .await
    .unwrap();

    let source = MemorySource::new([
        ConsumerEvent::Error(ConsumerError::Receive("broker transport failure".into())),
        ConsumerEvent::Rebalance("assigned 3 partitions".to_owned()),
        record(5, SITE_RECORD),
        record(5, SITE_RECORD),
    ]);
    let commits = source.commits();

    let snapshot = Pipeline::new(source, sink, pipeline_config(), stats)
        .run(std::future::pending())
        .await;

    // The redelivered record is processed again, but its offset is stored once.
    assert_eq!(*commits.lock().unwrap(), vec![(0, 6)]);
    assert_eq!(snapshot.consumed, 2);
    assert_eq!(snapshot.processed, 2);
    assert_eq!(snapshot.errors, 0);
}

#[tokio::test]
async fn test_json_record_over_line() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let stats = Arc::new(Stats::new());
    let sink = MetricSink::connect(
        &sink_config(SinkKind::Line, addr, SinkOptions::default()),
        Arc::clone(&stats),
    )
    .await
    .unwrap();

    let source = MemorySource::new([record(
        12,
        r#"{"host":"web-1","status":200,"service":"45ms","total":"120ms","connect":"5ms"}"#,
    )]);
    let commits = source.commits();

    let config = PipelineConfig {
        format: RecordFormat::Json,
        ..pipeline_config()
    };
    let snapshot = Pipeline::new(source, sink, config, stats)
        .run(std::future::pending())
        .await;

    let mut buf = [0; 256];
    let mut received = String::new();
    for _ in 0..5 {
        let len = server.recv(&mut buf).await.unwrap();
        received.push_str(&String::from_utf8_lossy(&buf[..len]));
    }

    insta::assert_snapshot!(received.trim_end(), @r###"
    router.service.ms,host=web-1 value=45
    router.connect.ms,host=web-1 value=5
    router.total.ms,host=web-1 value=120
    router.status.200,host=web-1 value=1
    router.requests.count,host=web-1 value=1
    "###);

    assert_eq!(*commits.lock().unwrap(), vec![(0, 13)]);
    assert_eq!(
        snapshot,
        StatsSnapshot {
            consumed: 1,
            processed: 1,
            errors: 0,
        }
    );
}

#[tokio::test]
async fn test_unreachable_http_backend_counts_error() {
    switchyard_log::init_test!();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let stats = Arc::new(Stats::new());
    let sink = MetricSink::connect(
        &sink_config(SinkKind::Http, addr, SinkOptions::default()),
        Arc::clone(&stats),
    )
    .await
    .unwrap();

    let source = MemorySource::new([record(3, SITE_RECORD)]);
    let commits = source.commits();

    let snapshot = Pipeline::new(source, sink, pipeline_config(), stats)
        .run(std::future::pending())
        .await;

    // The whole batch is rejected once; the record is committed regardless.
    assert_eq!(*commits.lock().unwrap(), vec![(0, 4)]);
    assert_eq!(
        snapshot,
        StatsSnapshot {
            consumed: 1,
            processed: 1,
            errors: 1,
        }
    );
}

#[tokio::test]
async fn test_shutdown_before_first_record() {
    let stats = Arc::new(Stats::new());
    let options = SinkOptions {
        dry_run: true,
        echo: true,
    };
    let sink = MetricSink::connect(
        &sink_config(SinkKind::Http, "127.0.0.1:8086".to_owned(), options),
        Arc::clone(&stats),
    )
    .await
    .unwrap();

    let source = MemorySource::new([record(0, SITE_RECORD)]);
    let commits = source.commits();

    let pipeline = Pipeline::new(source, sink, pipeline_config(), Arc::clone(&stats));
    let snapshot = pipeline.run(std::future::ready(())).await;

    assert!(commits.lock().unwrap().is_empty());
    assert_eq!(snapshot, StatsSnapshot::default());
    assert_eq!(stats.consumed(), 0);
}
