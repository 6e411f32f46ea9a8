// Application layer - Chart pipeline stages and refresh session
pub mod axis_reconciler;
pub mod chart_builder;
pub mod chart_pipeline;
pub mod refresh_service;
pub mod sensor_source;
pub mod series_extractor;
pub mod smoother;
pub mod window_filter;
