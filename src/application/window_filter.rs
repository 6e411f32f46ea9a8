// Trailing time window and point cap
use crate::domain::record::{ParsedRecord, TimedRecord};
use chrono::{DateTime, Duration, Utc};

/// Start of the trailing window ending at `now`, clamped to the earliest
/// representable instant.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone)]
pub struct WindowFilter {
    window: Duration,
    max_points: Option<usize>,
}

impl WindowFilter {
    /// A `max_points` of zero means no cap.
    pub fn new(window: Duration, max_points: Option<usize>) -> Self {
        Self {
            window,
            max_points: max_points.filter(|&n| n > 0),
        }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        window_start(now, self.window)
    }

    /// Keeps valid records at or after `now - window`, oldest first, at most
    /// `max_points` of the newest.
    pub fn apply(&self, records: Vec<ParsedRecord>, now: DateTime<Utc>) -> Vec<TimedRecord> {
        let cutoff = self.cutoff(now);
        let mut kept: Vec<TimedRecord> = records
            .into_iter()
            .filter_map(ParsedRecord::into_timed)
            .filter(|r| r.instant >= cutoff)
            .collect();

        // Stable: equal instants keep payload order.
        kept.sort_by_key(|r| r.instant);

        if let Some(max) = self.max_points {
            if kept.len() > max {
                let excess = kept.len() - max;
                kept.drain(..excess);
                tracing::debug!("Data limited to the latest {} points", max);
            }
        }

        kept
    }
}
