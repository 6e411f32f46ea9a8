// Telemetry data domain models
use serde::Serialize;

/// A single plotted sample. Serialized as `{ "x": <epoch ms>, "y": <value> }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    #[serde(rename = "x")]
    pub time_ms: i64,
    #[serde(rename = "y")]
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// The points of one configured series for one refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSeries {
    /// Position of the series in the configuration list.
    pub index: usize,
    pub points: Vec<TimeSeriesPoint>,
}

impl ExtractedSeries {
    pub fn new(index: usize, points: Vec<TimeSeriesPoint>) -> Self {
        Self { index, points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }
}

/// Numeric display range of a y axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisDomain {
    pub min: f64,
    pub max: f64,
}

impl AxisDomain {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Smallest domain containing every value, or `None` for no values.
    pub fn spanning(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Self::new(v, v)),
            Some(d) => Some(Self::new(d.min.min(v), d.max.max(v))),
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}
