// Domain layer - Records, timestamps and chart models
pub mod chart;
pub mod record;
pub mod telemetry;
pub mod timestamp;
