use tally_model::metric::Summary;

use super::{EncodeContext, Encoded};

const SUMMARY: &str = "summary";

/// Encodes a summary: one record per quantile.
///
/// A quantile outside `[0, 1]`, or a non-finite quantile value, fails on its own without affecting the other quantiles
/// of the same point.
pub(crate) fn encode_summary(ctx: &EncodeContext<'_>, summary: &Summary, out: &mut Vec<Encoded>) {
    for dp in &summary.data_points {
        if !dp.sum.is_finite() {
            out.push(ctx.invalid_value("sum", dp.sum));
            continue;
        }

        let dimensions = ctx.normalizer.merge(&dp.attributes);
        for qv in &dp.quantile_values {
            if !qv.quantile.is_finite() || !(0.0..=1.0).contains(&qv.quantile) {
                out.push(ctx.invalid_value("quantile", qv.quantile));
                continue;
            }
            if !qv.value.is_finite() {
                out.push(ctx.invalid_value("value", qv.value));
                continue;
            }

            let mut record = ctx.base_record(dp.time_unix_nano, SUMMARY, &dimensions);
            record.add_uint("count", dp.count);
            record.add_double("sum", dp.sum);
            record.add_double("quantile", qv.quantile);
            record.add_string("quantileKey", quantile_key(qv.quantile));
            record.add_double("value", qv.value);
            out.push(Encoded::Record(record));
        }
    }
}

/// Returns the shortest decimal form of a quantile, with `.` replaced by `_`, so that it can be used as a field name.
fn quantile_key(quantile: f64) -> String {
    quantile.to_string().replace('.', "_")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use tally_model::{
        metric::{SummaryDataPoint, ValueAtQuantile},
        Metric, MetricData,
    };

    use super::*;
    use crate::{document::FieldValue, encoders::test_support::Fixture, SerializeError};

    fn encode(points: Vec<SummaryDataPoint>) -> Vec<Encoded> {
        let fixture = Fixture::new(Metric::summary("rpc", points));
        let MetricData::Summary(summary) = &fixture.metric.data else {
            panic!("expected summary");
        };
        let mut out = Vec::new();
        encode_summary(&fixture.context(), summary, &mut out);
        out
    }

    #[test]
    fn keys() {
        assert_eq!(quantile_key(0.9), "0_9");
        assert_eq!(quantile_key(0.99), "0_99");
        assert_eq!(quantile_key(0.0), "0");
        assert_eq!(quantile_key(1.0), "1");
        assert_eq!(quantile_key(0.125), "0_125");
    }

    #[test]
    fn one_record_per_quantile() {
        let encoded = encode(vec![SummaryDataPoint::new(
            1,
            10,
            55.0,
            vec![ValueAtQuantile::new(0.5, 5.0), ValueAtQuantile::new(0.9, 9.0)],
        )]);

        assert_eq!(encoded.len(), 2);
        let Encoded::Record(record) = &encoded[1] else {
            panic!("expected record");
        };
        assert_eq!(record.get("type"), Some(&FieldValue::String("summary".into())));
        assert_eq!(record.get("count"), Some(&FieldValue::UInt(10)));
        assert_eq!(record.get("sum"), Some(&FieldValue::Double(55.0)));
        assert_eq!(record.get("quantile"), Some(&FieldValue::Double(0.9)));
        assert_eq!(record.get("quantileKey"), Some(&FieldValue::String("0_9".into())));
        assert_eq!(record.get("value"), Some(&FieldValue::Double(9.0)));
    }

    #[test]
    fn invalid_quantiles_fail_alone() {
        let encoded = encode(vec![SummaryDataPoint::new(
            1,
            3,
            6.0,
            vec![
                ValueAtQuantile::new(1.5, 1.0),
                ValueAtQuantile::new(0.5, 2.0),
                ValueAtQuantile::new(f64::NAN, 3.0),
                ValueAtQuantile::new(0.99, f64::INFINITY),
            ],
        )]);

        assert_eq!(encoded.len(), 4);
        assert!(matches!(
            &encoded[0],
            Encoded::Failed(SerializeError::InvalidNumericValue { field, .. }) if field == "quantile"
        ));
        assert!(matches!(encoded[1], Encoded::Record(_)));
        assert!(matches!(
            &encoded[2],
            Encoded::Failed(SerializeError::InvalidNumericValue { field, .. }) if field == "quantile"
        ));
        assert!(matches!(
            &encoded[3],
            Encoded::Failed(SerializeError::InvalidNumericValue { field, .. }) if field == "value"
        ));
    }

    proptest! {
        #[test]
        fn property_keys_injective(thousandths in proptest::collection::btree_set(0u32..=1000, 1..50)) {
            let keys = thousandths
                .iter()
                .map(|n| quantile_key(f64::from(*n) / 1000.0))
                .collect::<HashSet<_>>();
            prop_assert_eq!(keys.len(), thousandths.len());
        }
    }
}
