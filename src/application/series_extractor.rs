// Per-series point extraction
use crate::domain::record::TimedRecord;
use crate::domain::telemetry::{ExtractedSeries, TimeSeriesPoint};
use crate::infrastructure::config::SeriesConfig;

/// Collects `(time, value)` pairs for one series in record order.
///
/// Records whose field is missing or not a finite number are skipped; sparse
/// payloads are normal, so this is not an error.
pub fn extract_series(
    index: usize,
    records: &[TimedRecord],
    config: &SeriesConfig,
) -> ExtractedSeries {
    let points: Vec<TimeSeriesPoint> = records
        .iter()
        .filter_map(|r| {
            let value = r.record.number(&config.data_id)?;
            Some(TimeSeriesPoint::new(r.instant.timestamp_millis(), value))
        })
        .collect();

    let skipped = records.len() - points.len();
    if skipped > 0 {
        tracing::debug!(
            "Skipped {} of {} records without a numeric '{}'",
            skipped,
            records.len(),
            config.data_id
        );
    }

    ExtractedSeries::new(index, points)
}
