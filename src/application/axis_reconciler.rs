// Shared auto-scale domain across series
use crate::domain::telemetry::{AxisDomain, ExtractedSeries};
use crate::infrastructure::config::SeriesConfig;

/// Bounds of one series' y axis after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Domain over every value of every auto-scaled series.
///
/// All auto-scaled series share this single domain, whatever their axis slot
/// or side. `None` if none of them has a point.
pub fn shared_domain(configs: &[SeriesConfig], series: &[ExtractedSeries]) -> Option<AxisDomain> {
    AxisDomain::spanning(
        series
            .iter()
            .filter(|s| configs.get(s.index).is_some_and(|c| c.auto_scale))
            .flat_map(ExtractedSeries::values),
    )
}

/// Axis bounds for one series: the shared domain when auto-scaled and
/// defined, otherwise the configured bounds.
pub fn resolve_bounds(config: &SeriesConfig, shared: Option<AxisDomain>) -> ResolvedBounds {
    match shared {
        Some(domain) if config.auto_scale => ResolvedBounds {
            min: Some(domain.min),
            max: Some(domain.max),
        },
        _ => ResolvedBounds {
            min: config.y_min,
            max: config.y_max,
        },
    }
}
