use tally_model::metric::{Histogram, HistogramDataPoint};

use super::{EncodeContext, Encoded};
use crate::error::SerializeError;

const HISTOGRAM: &str = "histogram";
const OVERFLOW_BUCKET: &str = "+inf";

/// Encodes a histogram: one record per bucket, including the overflow bucket above the last explicit bound.
///
/// A point whose buckets don't line up with its bounds produces a single error and no records.
pub(crate) fn encode_histogram(ctx: &EncodeContext<'_>, histogram: &Histogram, out: &mut Vec<Encoded>) {
    for dp in &histogram.data_points {
        if let Err(reason) = validate(dp) {
            out.push(Encoded::Failed(SerializeError::MalformedDataPoint {
                metric: ctx.name().to_string(),
                reason,
            }));
            continue;
        }
        if !dp.sum.is_finite() {
            out.push(ctx.invalid_value("sum", dp.sum));
            continue;
        }

        let dimensions = ctx.normalizer.merge(&dp.attributes);
        let width = dp.bucket_counts.len().to_string().len();
        for (bucket_id, bucket_count) in dp.bucket_counts.iter().enumerate() {
            let bucket = match dp.explicit_bounds.get(bucket_id) {
                Some(bound) => format_bound(*bound),
                None => OVERFLOW_BUCKET.to_string(),
            };
            let bucket_text = format!("{:0width$} ({})", bucket_id, bucket, width = width);

            let mut record = ctx.base_record(dp.time_unix_nano, HISTOGRAM, &dimensions);
            record.add_uint("count", dp.count);
            record.add_double("sum", dp.sum);
            record.add_uint("bucketId", bucket_id as u64);
            record.add_string("bucket", bucket);
            record.add_string("bucketText", bucket_text);
            record.add_uint("bucketCount", *bucket_count);
            out.push(Encoded::Record(record));
        }
    }
}

fn validate(dp: &HistogramDataPoint) -> Result<(), String> {
    if dp.bucket_counts.len() != dp.explicit_bounds.len() + 1 {
        return Err(format!(
            "expected {} bucket counts for {} bounds, got {}",
            dp.explicit_bounds.len() + 1,
            dp.explicit_bounds.len(),
            dp.bucket_counts.len()
        ));
    }
    if let Some(bound) = dp.explicit_bounds.iter().find(|bound| !bound.is_finite()) {
        return Err(format!("bound {} is not finite", bound));
    }
    if let Some(pair) = dp.explicit_bounds.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(format!("bounds are not strictly increasing ({} >= {})", pair[0], pair[1]));
    }
    Ok(())
}

/// Formats a bucket bound with six decimal places, then drops trailing zeros and any trailing decimal point.
fn format_bound(bound: f64) -> String {
    let formatted = format!("{:.6}", bound);
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}
