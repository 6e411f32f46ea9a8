// Chart specification assembly
use crate::application::axis_reconciler::resolve_bounds;
use crate::application::window_filter::window_start;
use crate::domain::chart::{
    AxisTitle, ChartSpec, DatasetSpec, NoDataReason, TimeAxisSpec, ValueAxisSpec,
};
use crate::domain::telemetry::{AxisDomain, ExtractedSeries};
use crate::infrastructure::config::{ChartSettings, SeriesConfig};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

const LINE_TENSION: f64 = 0.1;

/// Axis slot identifier. Series with the same slot and side share an axis.
pub fn axis_slot_id(index: usize, config: &SeriesConfig) -> String {
    format!(
        "yAxis-{}-{}",
        config.axis_slot.unwrap_or(index),
        config.y_axis_position
    )
}

static UNIT_IN_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("unit pattern is a valid regex"));

/// Unit inside the first non-empty parentheses of an axis label.
pub fn unit_from_label(label: &str) -> Option<String> {
    UNIT_IN_LABEL
        .captures(label)
        .map(|captures| captures[1].to_string())
}

pub struct ChartSpecBuilder<'a> {
    settings: &'a ChartSettings,
}

impl<'a> ChartSpecBuilder<'a> {
    pub fn new(settings: &'a ChartSettings) -> Self {
        Self { settings }
    }

    /// Builds the spec for one refresh. Fails with `NoSeriesPoints` rather
    /// than returning a chart without datasets.
    pub fn build(
        &self,
        series: Vec<ExtractedSeries>,
        shared: Option<AxisDomain>,
        now: DateTime<Utc>,
    ) -> Result<ChartSpec, NoDataReason> {
        let datasets: Vec<DatasetSpec> = series
            .into_iter()
            .filter(|s| !s.is_empty())
            .filter_map(|s| {
                let config = self.settings.series.get(s.index)?;
                Some(self.dataset(s, config))
            })
            .collect();

        if datasets.is_empty() {
            return Err(NoDataReason::NoSeriesPoints);
        }

        Ok(ChartSpec {
            chart_id: self.settings.chart_id.clone(),
            title: self.settings.title.clone(),
            width: self.settings.width,
            height: self.settings.height,
            x_axis: self.time_axis(now),
            y_axes: self.value_axes(shared),
            datasets,
        })
    }

    fn dataset(&self, series: ExtractedSeries, config: &SeriesConfig) -> DatasetSpec {
        DatasetSpec {
            label: config.label.clone(),
            show_label: config.show_label,
            y_axis_id: axis_slot_id(series.index, config),
            data: series.points,
            border_color: config.line_color.clone(),
            background_color: config.background_color.clone(),
            tension: LINE_TENSION,
            fill: config.fill,
            point_radius: config.point_radius,
            point_hover_radius: config.point_hover_radius,
        }
    }

    /// One axis per distinct slot; the first series of a slot describes it.
    fn value_axes(&self, shared: Option<AxisDomain>) -> Vec<ValueAxisSpec> {
        let mut axes: Vec<ValueAxisSpec> = Vec::new();
        for (index, config) in self.settings.series.iter().enumerate() {
            let id = axis_slot_id(index, config);
            if axes.iter().any(|a| a.id == id) {
                continue;
            }

            let bounds = resolve_bounds(config, shared);
            axes.push(ValueAxisSpec {
                id,
                display: config.y_axis_show,
                position: config.y_axis_position,
                title: AxisTitle {
                    display: config.y_axis_label_show,
                    text: config.y_axis_label.clone(),
                },
                unit: unit_from_label(&config.y_axis_label),
                ticks: config.tick_policy(),
                min: bounds.min,
                max: bounds.max,
            });
        }
        axes
    }

    /// Rolling window ending at `now`, independent of the data's own span.
    fn time_axis(&self, now: DateTime<Utc>) -> TimeAxisSpec {
        let x = &self.settings.x_axis;
        TimeAxisSpec {
            min: window_start(now, self.settings.window()),
            max: now,
            position: x.position,
            unit: "hour",
            display_format: x.display_format.clone(),
            tooltip_format: x.tooltip_format.clone(),
            title: AxisTitle {
                display: x.label_show,
                text: x.label.clone(),
            },
            ticks: x.tick_policy(),
        }
    }
}
