// Chart pipeline - Payload to chart specification for one refresh cycle
use crate::application::axis_reconciler::shared_domain;
use crate::application::chart_builder::ChartSpecBuilder;
use crate::application::sensor_source::{json_kind, RetrievalError};
use crate::application::series_extractor::extract_series;
use crate::application::smoother::smooth;
use crate::application::window_filter::WindowFilter;
use crate::domain::chart::{ChartSpec, ChartState, FailureKind, NoDataReason};
use crate::domain::record::{ParsedRecord, RawRecord};
use crate::domain::telemetry::ExtractedSeries;
use crate::domain::timestamp::TimestampNormalizer;
use crate::infrastructure::config::ChartSettings;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error("{0}")]
    NoData(NoDataReason),
}

impl From<NoDataReason> for ChartError {
    fn from(reason: NoDataReason) -> Self {
        ChartError::NoData(reason)
    }
}

impl From<Result<ChartSpec, ChartError>> for ChartState {
    fn from(result: Result<ChartSpec, ChartError>) -> Self {
        match result {
            Ok(chart) => ChartState::Ready { chart },
            Err(ChartError::NoData(reason)) => ChartState::no_data(reason),
            Err(ChartError::Retrieval(e)) => ChartState::Error {
                kind: FailureKind::Retrieval,
                message: e.to_string(),
            },
        }
    }
}

/// Splits a payload into records: an array of objects or a single object.
/// Array entries that are not objects are skipped.
pub fn records_from_payload(payload: Value) -> Result<Vec<RawRecord>, RetrievalError> {
    match payload {
        Value::Array(entries) => {
            let total = entries.len();
            let records: Vec<RawRecord> = entries.into_iter().filter_map(RawRecord::from_value).collect();
            if records.len() < total {
                tracing::warn!("Skipped {} non-object entries in payload", total - records.len());
            }
            Ok(records)
        }
        Value::Object(fields) => Ok(vec![RawRecord::new(fields)]),
        other => Err(RetrievalError::WrongShape(json_kind(&other))),
    }
}

#[derive(Debug, Clone)]
pub struct ChartPipeline {
    settings: Arc<ChartSettings>,
    normalizer: TimestampNormalizer,
    filter: WindowFilter,
}

impl ChartPipeline {
    pub fn new(settings: Arc<ChartSettings>) -> Self {
        let normalizer = TimestampNormalizer::new(
            settings.x_axis.time_format.clone(),
            settings.x_axis.naive_zone,
        );
        let filter = WindowFilter::new(settings.window(), settings.max_points());
        Self {
            settings,
            normalizer,
            filter,
        }
    }

    pub fn settings(&self) -> &ChartSettings {
        &self.settings
    }

    /// Runs every stage on a decoded payload. Nothing here suspends.
    pub fn run(&self, payload: Value, now: DateTime<Utc>) -> Result<ChartSpec, ChartError> {
        let records = records_from_payload(payload)?;
        let parsed = self.parse(records);

        let windowed = self.filter.apply(parsed, now);
        tracing::debug!(
            "Sensor data filtered for chart {}: {} entries in window",
            self.settings.chart_id,
            windowed.len()
        );
        if windowed.is_empty() {
            return Err(NoDataReason::EmptyWindow.into());
        }

        let series: Vec<ExtractedSeries> = self
            .settings
            .series
            .iter()
            .enumerate()
            .map(|(index, config)| {
                let mut extracted = extract_series(index, &windowed, config);
                extracted.points = smooth(extracted.points, config.smoothing);
                extracted
            })
            .collect();

        let shared = shared_domain(&self.settings.series, &series);
        Ok(ChartSpecBuilder::new(&self.settings).build(series, shared, now)?)
    }

    fn parse(&self, records: Vec<RawRecord>) -> Vec<ParsedRecord> {
        let time_field = &self.settings.x_axis.data_id;
        let mut invalid = 0usize;

        let parsed: Vec<ParsedRecord> = records
            .into_iter()
            .map(|record| {
                let instant = self.normalizer.normalize_value(record.get(time_field));
                if instant.is_none() {
                    invalid += 1;
                    tracing::debug!("Invalid or missing '{}' in record {:?}", time_field, record);
                }
                ParsedRecord::new(instant, record)
            })
            .collect();

        if invalid > 0 {
            tracing::warn!(
                "Chart {}: {} records skipped, '{}' missing or not parseable (format '{}')",
                self.settings.chart_id,
                invalid,
                time_field,
                self.settings.x_axis.time_format.as_deref().unwrap_or("auto")
            );
        }
        parsed
    }
}
