use tally_model::{
    metric::{HistogramDataPoint, NumberDataPoint, SummaryDataPoint, ValueAtQuantile},
    AggregationTemporality, InstrumentationScope, KeyValue, Metric, ResourceMetrics,
};
use tally_serializer::{
    DeltaCache, DimensionList, MetricSerializer, OutputFormat, SerializeError, SerializedBatch, SerializerConfiguration,
};

const TIMESTAMP: u64 = 1_641_031_205_000_000_123;
const SECOND: u64 = 1_000_000_000;

fn serializer(config: SerializerConfiguration) -> MetricSerializer {
    let delta_cache = DeltaCache::from_configuration(&config).unwrap();
    MetricSerializer::new(&config, delta_cache)
}

fn serialize(
    config: SerializerConfiguration, resource: Vec<KeyValue>, scope: InstrumentationScope, metric: Metric,
) -> SerializedBatch {
    serializer(config).serialize_batch(&[ResourceMetrics::single_scope(resource, scope, vec![metric])])
}

fn records(batch: &SerializedBatch) -> Vec<String> {
    batch
        .records
        .iter()
        .map(|record| String::from_utf8(record.to_vec()).unwrap())
        .collect()
}

fn instlib() -> InstrumentationScope {
    InstrumentationScope::new("instlib", "v1")
}

#[test]
fn gauge_json() {
    let metric = Metric::gauge("gauge-metric", vec![NumberDataPoint::new(TIMESTAMP, 1i64)]);
    let batch = serialize(SerializerConfiguration::with_defaults(), Vec::new(), instlib(), metric);

    assert_eq!(
        records(&batch),
        vec![
            r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","name":"gauge-metric","scope":{"name":"instlib","version":"v1"},"type":"gauge","value":1}"#
        ]
    );
}

#[test]
fn counter_json() {
    let metric = Metric::sum(
        "requests",
        vec![
            NumberDataPoint::new(TIMESTAMP, 10i64).with_attributes(vec![KeyValue::new("host", "a")]),
            NumberDataPoint::new(TIMESTAMP + SECOND, 15i64).with_attributes(vec![KeyValue::new("host", "a")]),
        ],
        true,
        AggregationTemporality::Cumulative,
    );
    let batch = serialize(
        SerializerConfiguration::with_defaults(),
        Vec::new(),
        InstrumentationScope::default(),
        metric,
    );

    assert_eq!(batch.suppressed, 1);
    assert_eq!(
        records(&batch),
        vec![
            r#"{"@timestamp":"2022-01-01T10:00:06.000000123Z","attributes":{"host":"a"},"name":"requests","type":"counter","value":5}"#
        ]
    );
}

#[test]
fn non_monotonic_sum_json() {
    let metric = Metric::sum(
        "queue",
        vec![NumberDataPoint::new(TIMESTAMP, 2.5)],
        false,
        AggregationTemporality::Cumulative,
    )
    .with_unit("1");
    let batch = serialize(
        SerializerConfiguration::with_defaults(),
        Vec::new(),
        InstrumentationScope::default(),
        metric,
    );

    assert_eq!(
        records(&batch),
        vec![r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","name":"queue","type":"gauge","unit":"1","value":2.5}"#]
    );
}

#[test]
fn summary_json() {
    let metric = Metric::summary(
        "rpc",
        vec![SummaryDataPoint::new(
            TIMESTAMP,
            4,
            10.0,
            vec![ValueAtQuantile::new(0.5, 2.0), ValueAtQuantile::new(0.99, 4.25)],
        )],
    );
    let batch = serialize(
        SerializerConfiguration::with_defaults(),
        Vec::new(),
        InstrumentationScope::default(),
        metric,
    );

    assert_eq!(
        records(&batch),
        vec![
            r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","count":4,"name":"rpc","quantile":0.5,"quantileKey":"0_5","sum":10,"type":"summary","value":2}"#,
            r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","count":4,"name":"rpc","quantile":0.99,"quantileKey":"0_99","sum":10,"type":"summary","value":4.25}"#,
        ]
    );
}

#[test]
fn histogram_json() {
    let metric = Metric::histogram(
        "hist-metric",
        vec![HistogramDataPoint::new(TIMESTAMP, 4, 0.0, vec![5.87], vec![1, 3])],
    );
    let batch = serialize(SerializerConfiguration::with_defaults(), Vec::new(), instlib(), metric);

    assert_eq!(
        records(&batch),
        vec![
            r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","bucket":"5.87","bucketCount":1,"bucketId":0,"bucketText":"0 (5.87)","count":4,"name":"hist-metric","scope":{"name":"instlib","version":"v1"},"sum":0,"type":"histogram"}"#,
            r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","bucket":"+inf","bucketCount":3,"bucketId":1,"bucketText":"1 (+inf)","count":4,"name":"hist-metric","scope":{"name":"instlib","version":"v1"},"sum":0,"type":"histogram"}"#,
        ]
    );
}

#[test]
fn dimension_precedence_and_resource() {
    let config = SerializerConfiguration::with_defaults()
        .with_default_dimensions([("env", "dev"), ("region", "us")].into_iter().collect::<DimensionList>())
        .with_static_dimensions([("team", "core")].into_iter().collect::<DimensionList>());
    let metric = Metric::gauge(
        "g",
        vec![NumberDataPoint::new(TIMESTAMP, 1i64)
            .with_attributes(vec![KeyValue::new("team", "other"), KeyValue::new("env", "prod")])],
    );
    let batch = serialize(
        config,
        vec![KeyValue::new("service.name", "api")],
        InstrumentationScope::default(),
        metric,
    );

    assert_eq!(
        records(&batch),
        vec![
            r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","attributes":{"env":"prod","region":"us","team":"core"},"name":"g","resource":{"service.name":"api"},"type":"gauge","value":1}"#
        ]
    );
}

#[test]
fn attribute_prefix_flattens() {
    let config = SerializerConfiguration::with_defaults().with_attribute_prefix("labels.");
    let metric = Metric::gauge(
        "g",
        vec![NumberDataPoint::new(TIMESTAMP, 1i64).with_attributes(vec![KeyValue::new("host", "a")])],
    );
    let batch = serialize(config, Vec::new(), InstrumentationScope::default(), metric);

    assert_eq!(
        records(&batch),
        vec![r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","labels.host":"a","name":"g","type":"gauge","value":1}"#]
    );
}

#[test]
fn line_protocol() {
    let config = SerializerConfiguration::with_defaults()
        .with_format(OutputFormat::Line)
        .with_metric_prefix("otel.")
        .with_attribute_prefix("ignored.");
    let metric = Metric::gauge(
        "cpu",
        vec![NumberDataPoint::new(TIMESTAMP, 0.5).with_attributes(vec![KeyValue::new("host", "a")])],
    );
    let batch = serialize(config, vec![KeyValue::new("service.name", "api")], instlib(), metric);

    assert_eq!(
        records(&batch),
        vec![
            "otel.cpu,host=a,resource.service.name=api,scope.name=instlib,scope.version=v1 type=\"gauge\",value=0.5 1641031205000000123"
        ]
    );
}

#[test]
fn line_protocol_tag_clash_is_scoped_to_record() {
    let config = SerializerConfiguration::with_defaults().with_format(OutputFormat::Line);
    let metric = Metric::gauge(
        "cpu",
        vec![
            NumberDataPoint::new(TIMESTAMP, 0.5).with_attributes(vec![KeyValue::new("scope.name", "other")]),
            NumberDataPoint::new(TIMESTAMP, 0.75),
        ],
    );
    let batch = serialize(config, Vec::new(), instlib(), metric);

    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].index, 0);
    assert!(matches!(batch.errors[0].error, SerializeError::RenderFailure { .. }));
    assert_eq!(
        records(&batch),
        vec!["cpu,scope.name=instlib,scope.version=v1 type=\"gauge\",value=0.75 1641031205000000123"]
    );
}

#[test]
fn extreme_doubles_stay_compact() {
    let metric = Metric::gauge(
        "g",
        vec![NumberDataPoint::new(TIMESTAMP, 1e300), NumberDataPoint::new(TIMESTAMP, 5e-324)],
    );
    let batch = serialize(
        SerializerConfiguration::with_defaults(),
        Vec::new(),
        InstrumentationScope::default(),
        metric,
    );

    assert_eq!(
        records(&batch),
        vec![
            r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","name":"g","type":"gauge","value":1e300}"#,
            r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","name":"g","type":"gauge","value":5e-324}"#,
        ]
    );
    let decoded: serde_json::Value = serde_json::from_slice(&batch.records[0]).unwrap();
    assert_eq!(decoded["value"], 1e300);
}

#[test]
fn gauge_decodes() {
    let metric = Metric::gauge("g", vec![NumberDataPoint::new(TIMESTAMP, 1i64)]);
    let batch = serialize(
        SerializerConfiguration::with_defaults(),
        Vec::new(),
        InstrumentationScope::default(),
        metric,
    );

    let decoded: serde_json::Value = serde_json::from_slice(&batch.records[0]).unwrap();
    assert_eq!(decoded["value"], 1);
    assert_eq!(decoded["type"], "gauge");
    assert_eq!(decoded["name"], "g");
}

#[test]
fn serialization_is_idempotent() {
    let metric = Metric::histogram(
        "h",
        vec![HistogramDataPoint::new(TIMESTAMP, 3, 1.5, vec![0.1, 0.2], vec![1, 1, 1])
            .with_attributes(vec![KeyValue::new("zone", "b"), KeyValue::new("az", "a")])],
    );

    let first = serialize(SerializerConfiguration::with_defaults(), Vec::new(), instlib(), metric.clone());
    let second = serialize(SerializerConfiguration::with_defaults(), Vec::new(), instlib(), metric);
    assert_eq!(first.records, second.records);
}

#[test]
fn partial_failures() {
    let metrics = vec![
        Metric::gauge(
            "g",
            vec![
                NumberDataPoint::new(TIMESTAMP, 1i64),
                NumberDataPoint::new(TIMESTAMP, f64::INFINITY),
                NumberDataPoint::new(TIMESTAMP, 3i64),
            ],
        ),
        Metric::histogram("h", vec![HistogramDataPoint::new(TIMESTAMP, 1, 1.0, vec![2.0, 1.0], vec![0, 1, 0])]),
        Metric::gauge("after", vec![NumberDataPoint::new(TIMESTAMP, 4i64)]),
    ];
    let batch = serializer(SerializerConfiguration::with_defaults()).serialize_batch(&[ResourceMetrics::single_scope(
        Vec::new(),
        InstrumentationScope::default(),
        metrics,
    )]);

    assert_eq!(batch.records.len(), 3);
    let indexes = batch.errors.iter().map(|e| e.index).collect::<Vec<_>>();
    assert_eq!(indexes, vec![1, 3]);
    assert!(matches!(
        &batch.errors[0].error,
        SerializeError::InvalidNumericValue { metric, field, .. } if metric == "g" && field == "value"
    ));
    assert!(matches!(&batch.errors[1].error, SerializeError::MalformedDataPoint { metric, .. } if metric == "h"));
}

#[test]
fn batch_from_json() {
    let raw = r#"[{
        "resource": [{"key": "host.name", "value": {"string": "web-1"}}],
        "scope_metrics": [{
            "scope": {"name": "instlib", "version": "v1"},
            "metrics": [{
                "name": "temperature",
                "unit": "Cel",
                "data": {"gauge": {"data_points": [
                    {"time_unix_nano": 1641031205000000123, "value": {"as_double": 21.5}}
                ]}}
            }]
        }]
    }]"#;
    let batch: Vec<ResourceMetrics> = serde_json::from_str(raw).unwrap();

    let serialized = serializer(SerializerConfiguration::with_defaults()).serialize_batch(&batch);
    assert_eq!(
        records(&serialized),
        vec![
            r#"{"@timestamp":"2022-01-01T10:00:05.000000123Z","name":"temperature","resource":{"host.name":"web-1"},"scope":{"name":"instlib","version":"v1"},"type":"gauge","unit":"Cel","value":21.5}"#
        ]
    );
}
