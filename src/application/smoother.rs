// Symmetric moving average over sample positions
use crate::domain::telemetry::TimeSeriesPoint;

/// Replaces each value with the mean of its neighbours within `radius`
/// positions. The window shrinks at both ends; timestamps are untouched.
/// A radius of zero returns the input as is.
pub fn smooth(points: Vec<TimeSeriesPoint>, radius: usize) -> Vec<TimeSeriesPoint> {
    if radius == 0 || points.len() < 2 {
        return points;
    }

    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let window = &points[i.saturating_sub(radius)..=(i + radius).min(last)];
            let mean = window.iter().map(|w| w.value).sum::<f64>() / window.len() as f64;
            TimeSeriesPoint::new(p.time_ms, mean)
        })
        .collect()
}
