use crate::domain::chart::{AxisSide, TickPolicy, TimeAxisSide};
use crate::domain::timestamp::NaiveZone;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub chart: ChartSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartSettings {
    #[serde(default = "default_chart_id")]
    pub chart_id: String,
    #[serde(default = "default_title")]
    pub title: String,
    /// HTTP(S) URL or local file path of the JSON payload.
    #[serde(default)]
    pub data_source: String,
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_hours_to_display")]
    pub hours_to_display: f64,
    /// Zero or absent disables the cap.
    #[serde(default)]
    pub max_data_points: Option<usize>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub x_axis: TimeAxisConfig,
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimeAxisConfig {
    #[serde(default = "default_time_field")]
    pub data_id: String,
    /// Any non-empty value enables the fixed-layout matchers.
    #[serde(default)]
    pub time_format: Option<String>,
    #[serde(default)]
    pub naive_zone: NaiveZone,
    #[serde(default = "default_display_format")]
    pub display_format: String,
    #[serde(default = "default_tooltip_format")]
    pub tooltip_format: String,
    #[serde(default)]
    pub position: TimeAxisSide,
    #[serde(default = "default_time_label")]
    pub label: String,
    #[serde(default)]
    pub label_show: bool,
    #[serde(default = "default_true")]
    pub auto_ticks: bool,
    #[serde(default = "default_time_tick_steps")]
    pub tick_steps: f64,
}

impl Default for TimeAxisConfig {
    fn default() -> Self {
        Self {
            data_id: default_time_field(),
            time_format: None,
            naive_zone: NaiveZone::default(),
            display_format: default_display_format(),
            tooltip_format: default_tooltip_format(),
            position: TimeAxisSide::default(),
            label: default_time_label(),
            label_show: false,
            auto_ticks: true,
            tick_steps: default_time_tick_steps(),
        }
    }
}

impl TimeAxisConfig {
    pub fn tick_policy(&self) -> TickPolicy {
        if self.auto_ticks {
            TickPolicy::Auto {
                max_ticks: Some(MAX_AUTO_TIME_TICKS),
            }
        } else {
            TickPolicy::Fixed {
                step: self.tick_steps,
            }
        }
    }
}

/// One plotted line and its y axis.
#[derive(Debug, Deserialize, Clone)]
pub struct SeriesConfig {
    pub data_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_true")]
    pub show_label: bool,
    #[serde(default)]
    pub line_color: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub fill: bool,
    #[serde(default = "default_point_radius")]
    pub point_radius: f64,
    #[serde(default = "default_point_hover_radius")]
    pub point_hover_radius: f64,
    /// Moving-average radius in samples; 0 disables smoothing.
    #[serde(default)]
    pub smoothing: usize,
    #[serde(default = "default_true")]
    pub auto_scale: bool,
    #[serde(default)]
    pub y_min: Option<f64>,
    #[serde(default)]
    pub y_max: Option<f64>,
    #[serde(default = "default_true")]
    pub y_axis_show: bool,
    #[serde(default)]
    pub y_axis_position: AxisSide,
    #[serde(default)]
    pub y_axis_label: String,
    #[serde(default)]
    pub y_axis_label_show: bool,
    #[serde(default = "default_true")]
    pub y_axis_auto_ticks: bool,
    #[serde(default = "default_value_tick_steps")]
    pub y_axis_tick_steps: f64,
    /// Explicit axis slot; series with equal slot and side share one axis.
    #[serde(default)]
    pub axis_slot: Option<usize>,
}

impl SeriesConfig {
    pub fn tick_policy(&self) -> TickPolicy {
        if self.y_axis_auto_ticks {
            TickPolicy::Auto { max_ticks: None }
        } else {
            TickPolicy::Fixed {
                step: self.y_axis_tick_steps,
            }
        }
    }
}

const MAX_AUTO_TIME_TICKS: u32 = 10;
/// One hundred years.
const MAX_HOURS_TO_DISPLAY: f64 = 876_600.0;

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_chart_id() -> String {
    "defaultChart".to_string()
}

fn default_title() -> String {
    "Chart Title".to_string()
}

fn default_update_interval_secs() -> u64 {
    60
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_hours_to_display() -> f64 {
    24.0
}

fn default_width() -> u32 {
    600
}

fn default_height() -> u32 {
    300
}

fn default_time_field() -> String {
    "timestamp".to_string()
}

fn default_display_format() -> String {
    "HH:mm".to_string()
}

fn default_tooltip_format() -> String {
    "dd.MM.yyyy HH:mm:ss".to_string()
}

fn default_time_label() -> String {
    "Record Time".to_string()
}

fn default_time_tick_steps() -> f64 {
    1.0
}

fn default_value_tick_steps() -> f64 {
    1.0
}

fn default_point_radius() -> f64 {
    1.0
}

fn default_point_hover_radius() -> f64 {
    5.0
}

fn default_true() -> bool {
    true
}

impl ChartSettings {
    pub fn window(&self) -> chrono::Duration {
        let millis = (self.hours_to_display * 3_600_000.0).round() as i64;
        chrono::Duration::try_milliseconds(millis).unwrap_or(chrono::Duration::MAX)
    }

    pub fn max_points(&self) -> Option<usize> {
        self.max_data_points.filter(|&n| n > 0)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Values substituted into `${name}` placeholders of the data source.
    pub fn source_vars(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("hours".to_string(), self.hours_to_display.to_string());
        vars.insert("chart_id".to_string(), self.chart_id.clone());
        vars
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.data_source.trim().is_empty(),
            "chart '{}': data_source is not configured",
            self.chart_id
        );
        anyhow::ensure!(
            !self.series.is_empty(),
            "chart '{}': at least one series must be configured",
            self.chart_id
        );
        anyhow::ensure!(
            self.hours_to_display.is_finite() && self.hours_to_display > 0.0,
            "chart '{}': hours_to_display must be positive, got {}",
            self.chart_id,
            self.hours_to_display
        );
        anyhow::ensure!(
            self.hours_to_display <= MAX_HOURS_TO_DISPLAY,
            "chart '{}': hours_to_display must be at most {}, got {}",
            self.chart_id,
            MAX_HOURS_TO_DISPLAY,
            self.hours_to_display
        );
        anyhow::ensure!(
            self.update_interval_secs > 0,
            "chart '{}': update_interval_secs must be positive",
            self.chart_id
        );
        anyhow::ensure!(
            self.fetch_timeout_secs > 0,
            "chart '{}': fetch_timeout_secs must be positive",
            self.chart_id
        );
        if let Some(idx) = self.series.iter().position(|s| s.data_id.trim().is_empty()) {
            anyhow::bail!("chart '{}': series #{} has an empty data_id", self.chart_id, idx);
        }
        Ok(())
    }
}

/// Loads `config/chart.*` overlaid with `LINECHART__`-prefixed environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from("config/chart")
}

pub fn load_app_config_from(path: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(
            config::Environment::with_prefix("LINECHART")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app: AppConfig = settings.try_deserialize()?;
    app.chart.validate()?;
    Ok(app)
}

/// Replace template variables in a data source string
pub fn prepare_source(template: &str, vars: &HashMap<String, String>, url_encode: bool) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        let replacement = if url_encode {
            urlencoding::encode(value).into_owned()
        } else {
            value.clone()
        };
        result = result.replace(&placeholder, &replacement);
    }
    result
}
