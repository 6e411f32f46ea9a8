// Chart specification domain model
use super::telemetry::TimeSeriesPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Horizontal placement of a y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisSide {
    #[default]
    Left,
    Right,
}

impl fmt::Display for AxisSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisSide::Left => f.write_str("left"),
            AxisSide::Right => f.write_str("right"),
        }
    }
}

/// Vertical placement of the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeAxisSide {
    Top,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TickPolicy {
    Auto {
        #[serde(skip_serializing_if = "Option::is_none")]
        max_ticks: Option<u32>,
    },
    Fixed {
        step: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTitle {
    pub display: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeAxisSpec {
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
    pub position: TimeAxisSide,
    pub unit: &'static str,
    pub display_format: String,
    pub tooltip_format: String,
    pub title: AxisTitle,
    pub ticks: TickPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueAxisSpec {
    pub id: String,
    pub display: bool,
    pub position: AxisSide,
    pub title: AxisTitle,
    /// Unit taken from a parenthesised suffix of the axis label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub ticks: TickPolicy,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSpec {
    pub label: String,
    pub show_label: bool,
    pub data: Vec<TimeSeriesPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    pub y_axis_id: String,
    pub tension: f64,
    pub fill: bool,
    pub point_radius: f64,
    pub point_hover_radius: f64,
}

/// Everything a renderer needs to draw one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub chart_id: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub x_axis: TimeAxisSpec,
    pub y_axes: Vec<ValueAxisSpec>,
    pub datasets: Vec<DatasetSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    #[error("no valid records in the time window")]
    EmptyWindow,
    #[error("no series produced any points")]
    NoSeriesPoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Retrieval,
}

/// What the rendering side should show for the latest refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartState {
    Loading,
    Ready { chart: ChartSpec },
    NoData { reason: NoDataReason, message: String },
    Error { kind: FailureKind, message: String },
}

impl ChartState {
    pub fn no_data(reason: NoDataReason) -> Self {
        ChartState::NoData {
            reason,
            message: reason.to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ChartState::Ready { .. })
    }
}
