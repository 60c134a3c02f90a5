use tally_model::{
    metric::{Gauge, NumberDataPoint, Sum},
    AggregationTemporality, NumberValue,
};

use super::{EncodeContext, Encoded};
use crate::{
    delta::{DeltaCache, DeltaResolution},
    series::SeriesId,
    CounterResetPolicy, InitialValuePolicy, SumMode,
};

const GAUGE: &str = "gauge";
const COUNTER: &str = "counter";

/// Policies applied to monotonic cumulative sums.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SumPolicies {
    pub sum_mode: SumMode,
    pub counter_reset: CounterResetPolicy,
    pub initial_value: InitialValuePolicy,
}

/// Encodes a gauge: one record per data point, with the value as-is.
pub(crate) fn encode_gauge(ctx: &EncodeContext<'_>, gauge: &Gauge, out: &mut Vec<Encoded>) {
    for dp in &gauge.data_points {
        out.push(number_record(ctx, dp, GAUGE, dp.value));
    }
}

/// Encodes a sum.
///
/// Non-monotonic sums are reported as gauges. Monotonic sums are reported as counters: delta sums as-is, cumulative
/// sums as the difference from the previous observation of the same series, unless configured to report raw values.
pub(crate) fn encode_sum(
    ctx: &EncodeContext<'_>, sum: &Sum, delta_cache: &DeltaCache, policies: SumPolicies, out: &mut Vec<Encoded>,
) {
    for dp in &sum.data_points {
        if !sum.is_monotonic {
            out.push(number_record(ctx, dp, GAUGE, dp.value));
            continue;
        }

        if sum.aggregation_temporality == AggregationTemporality::Delta || policies.sum_mode == SumMode::RawValue {
            out.push(number_record(ctx, dp, COUNTER, dp.value));
            continue;
        }

        // Bad values never reach the cache, so they can't become the baseline for the next delta.
        if !dp.value.is_finite() {
            out.push(ctx.invalid_value("value", dp.value.as_f64()));
            continue;
        }

        let dimensions = ctx.normalizer.merge(&dp.attributes);
        let series = SeriesId::new(ctx.name(), ctx.resource, &dimensions);
        let resolution = delta_cache.resolve(&series, dp.start_time_unix_nano, dp.time_unix_nano, dp.value);

        let value = match resolution {
            DeltaResolution::Delta(delta) => delta,
            DeltaResolution::FirstObservation(value) => match policies.initial_value {
                InitialValuePolicy::Keep => value,
                InitialValuePolicy::Drop => {
                    out.push(suppress(dp, "first observation"));
                    continue;
                }
            },
            DeltaResolution::Reset(value) => match policies.counter_reset {
                CounterResetPolicy::EmitRaw => value,
                CounterResetPolicy::Suppress => {
                    out.push(suppress(dp, "counter reset"));
                    continue;
                }
            },
            DeltaResolution::OutOfOrder => {
                out.push(suppress(dp, "out of order"));
                continue;
            }
        };

        let mut record = ctx.base_record(dp.time_unix_nano, COUNTER, &dimensions);
        record.add_number("value", value);
        out.push(Encoded::Record(record));
    }
}

fn number_record(ctx: &EncodeContext<'_>, dp: &NumberDataPoint, metric_type: &'static str, value: NumberValue) -> Encoded {
    if !value.is_finite() {
        return ctx.invalid_value("value", value.as_f64());
    }

    let dimensions = ctx.normalizer.merge(&dp.attributes);
    let mut record = ctx.base_record(dp.time_unix_nano, metric_type, &dimensions);
    record.add_number("value", value);
    Encoded::Record(record)
}

fn suppress(dp: &NumberDataPoint, reason: &'static str) -> Encoded {
    Encoded::Suppressed {
        reason,
        timestamp: dp.time_unix_nano,
    }
}
