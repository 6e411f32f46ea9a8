// Timestamp normalization for heterogeneous sensor payloads
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

/// Offset-less date-times carried by the naive layouts below.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Time zone used for timestamps that carry no offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NaiveZone {
    #[default]
    Local,
    Utc,
}

impl NaiveZone {
    pub fn resolve(self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            NaiveZone::Utc => Some(Utc.from_utc_datetime(&naive)),
            // Skipped wall-clock times (DST gaps) have no instant.
            NaiveZone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// A fixed layout recognized when a format hint is configured.
///
/// The first match anywhere in the input counts; the captures are rearranged
/// into a string the general parser understands.
pub struct LayoutMatcher {
    pub name: &'static str,
    pattern: Regex,
    canonical: fn(captures: &Captures, input: &str) -> String,
}

impl LayoutMatcher {
    fn new(
        name: &'static str,
        pattern: &str,
        canonical: fn(&Captures, &str) -> String,
    ) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("layout pattern is a valid regex"),
            canonical,
        }
    }

    /// Canonical string for the general parser, or `None` if the layout is absent.
    pub fn apply(&self, input: &str) -> Option<String> {
        let captures = self.pattern.captures(input)?;
        Some((self.canonical)(&captures, input))
    }
}

fn day_first(c: &Captures, _input: &str) -> String {
    format!("{}-{}-{}T{}:{}:{}", &c[3], &c[2], &c[1], &c[4], &c[5], &c[6])
}

fn year_first(c: &Captures, _input: &str) -> String {
    format!("{}-{}-{}T{}:{}:{}", &c[1], &c[2], &c[3], &c[4], &c[5], &c[6])
}

fn iso_passthrough(_c: &Captures, input: &str) -> String {
    input.to_string()
}

/// Layouts in priority order.
pub static LAYOUT_MATCHERS: LazyLock<[LayoutMatcher; 4]> = LazyLock::new(|| {
    [
        LayoutMatcher::new(
            "DD.MM.YYYY'T'HH:MM:SS",
            r"([0-9]{2})\.([0-9]{2})\.([0-9]{4})T([0-9]{2}):([0-9]{2}):([0-9]{2})",
            day_first,
        ),
        LayoutMatcher::new(
            "YYYY-MM-DD HH:MM:SS",
            r"([0-9]{4})-([0-9]{2})-([0-9]{2}) ([0-9]{2}):([0-9]{2}):([0-9]{2})",
            year_first,
        ),
        LayoutMatcher::new(
            "DD.MM.YYYY HH:MM:SS",
            r"([0-9]{2})\.([0-9]{2})\.([0-9]{4}) ([0-9]{2}):([0-9]{2}):([0-9]{2})",
            day_first,
        ),
        LayoutMatcher::new(
            "YYYY-MM-DD'T'HH:MM:SS[.mmm]['Z']",
            r"([0-9]{4})-([0-9]{2})-([0-9]{2})T([0-9]{2}):([0-9]{2}):([0-9]{2})",
            iso_passthrough,
        ),
    ]
});

/// Converts raw time fields into absolute instants.
#[derive(Debug, Clone, Default)]
pub struct TimestampNormalizer {
    hint: Option<String>,
    zone: NaiveZone,
}

impl TimestampNormalizer {
    pub fn new(hint: Option<String>, zone: NaiveZone) -> Self {
        let hint = hint.filter(|h| !h.trim().is_empty());
        Self { hint, zone }
    }

    /// Normalizes a raw field value. Missing, non-string and empty values fail.
    pub fn normalize_value(&self, value: Option<&Value>) -> Option<DateTime<Utc>> {
        match value {
            Some(Value::String(s)) => self.normalize(s),
            _ => None,
        }
    }

    pub fn normalize(&self, raw: &str) -> Option<DateTime<Utc>> {
        if raw.trim().is_empty() {
            return None;
        }

        if self.hint.is_some() {
            if let Some(canonical) = LAYOUT_MATCHERS.iter().find_map(|m| m.apply(raw)) {
                return parse_general(&canonical, self.zone);
            }
        }

        parse_general(raw, self.zone)
    }
}

/// Best-effort parse of a date string in one of the common layouts.
pub fn parse_general(raw: &str, zone: NaiveZone) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return zone.resolve(naive);
    }

    // ISO date-only strings are UTC midnight; other date-only forms are zone-relative.
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return zone.resolve(date.and_hms_opt(0, 0, 0)?);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use serde_json::json;

    fn hinted() -> TimestampNormalizer {
        TimestampNormalizer::new(Some("auto".to_string()), NaiveZone::Utc)
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_round_trip_per_layout() {
        let t = utc(2024, 3, 9, 7, 5, 42);
        let layouts = [
            "%d.%m.%YT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S",
            "%d.%m.%Y %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M:%SZ",
        ];

        for layout in layouts {
            let raw = t.format(layout).to_string();
            assert_eq!(hinted().normalize(&raw), Some(t), "layout {layout}");
        }
    }

    #[test]
    fn test_round_trip_iso_with_millis() {
        let t = utc(2024, 3, 9, 7, 5, 42).with_nanosecond(123_000_000).unwrap();
        for layout in ["%Y-%m-%dT%H:%M:%S%.3fZ", "%Y-%m-%dT%H:%M:%S%.3f"] {
            let raw = t.format(layout).to_string();
            assert_eq!(hinted().normalize(&raw), Some(t), "layout {layout}");
        }
    }

    #[test]
    fn test_matcher_priority() {
        let day_first = &LAYOUT_MATCHERS[0];
        assert_eq!(
            day_first.apply("31.12.2023T23:59:01").as_deref(),
            Some("2023-12-31T23:59:01")
        );
        assert!(day_first.apply("31.12.2023 23:59:01").is_none());

        let spaced = &LAYOUT_MATCHERS[1];
        assert_eq!(
            spaced.apply("at 2023-12-31 23:59:01 local").as_deref(),
            Some("2023-12-31T23:59:01")
        );

        let iso = &LAYOUT_MATCHERS[3];
        assert_eq!(
            iso.apply("2023-12-31T23:59:01.5Z").as_deref(),
            Some("2023-12-31T23:59:01.5Z")
        );
    }

    #[test]
    fn test_matchers_require_ascii_digits() {
        // Arabic-Indic digits are Unicode digits but not part of any layout.
        assert!(
            LAYOUT_MATCHERS
                .iter()
                .all(|m| m.apply("\u{0661}\u{0662}.03.2024 10:00:00").is_none())
        );
        assert_eq!(
            LAYOUT_MATCHERS[2].apply("logged 09.03.2024 07:05:42 by node-4").as_deref(),
            Some("2024-03-09T07:05:42")
        );
    }

    #[test]
    fn test_matched_but_invalid_date_fails() {
        // Month 13 matches the shape, so no later fallback is attempted.
        assert_eq!(hinted().normalize("01.13.2024 10:00:00"), None);
    }

    #[test]
    fn test_unhinted_uses_general_parser() {
        let normalizer = TimestampNormalizer::new(None, NaiveZone::Utc);
        assert_eq!(
            normalizer.normalize("2024-01-01 10:00:00"),
            Some(utc(2024, 1, 1, 10, 0, 0))
        );
        assert_eq!(
            normalizer.normalize("2024-01-01T10:00:00+02:00"),
            Some(utc(2024, 1, 1, 8, 0, 0))
        );
        // Day-first layouts are only understood through the hinted matchers.
        assert_eq!(normalizer.normalize("01.02.2024 10:00:00"), None);
        assert_eq!(
            hinted().normalize("01.02.2024 10:00:00"),
            Some(utc(2024, 2, 1, 10, 0, 0))
        );
    }

    #[test]
    fn test_blank_hint_counts_as_absent() {
        let normalizer = TimestampNormalizer::new(Some("  ".to_string()), NaiveZone::Utc);
        assert_eq!(normalizer.normalize("01.02.2024 10:00:00"), None);
    }

    #[test]
    fn test_general_parser_fallbacks() {
        let zone = NaiveZone::Utc;
        assert_eq!(
            parse_general("Mon, 01 Jan 2024 10:00:00 +0000", zone),
            Some(utc(2024, 1, 1, 10, 0, 0))
        );
        assert_eq!(
            parse_general("2024/01/01 10:00:00", zone),
            Some(utc(2024, 1, 1, 10, 0, 0))
        );
        assert_eq!(
            parse_general("01/31/2024 10:00:00", zone),
            Some(utc(2024, 1, 31, 10, 0, 0))
        );
        assert_eq!(
            parse_general("2024-01-01T10:30", zone),
            Some(utc(2024, 1, 1, 10, 30, 0))
        );
        assert_eq!(parse_general("2024-01-01", zone), Some(utc(2024, 1, 1, 0, 0, 0)));
        assert_eq!(parse_general("yesterday", zone), None);
    }

    #[test]
    fn test_empty_and_non_string_fail() {
        let normalizer = hinted();
        assert_eq!(normalizer.normalize(""), None);
        assert_eq!(normalizer.normalize("   "), None);
        assert_eq!(normalizer.normalize_value(None), None);
        assert_eq!(normalizer.normalize_value(Some(&json!(1704103200))), None);
        assert_eq!(normalizer.normalize_value(Some(&Value::Null)), None);
        assert_eq!(
            normalizer.normalize_value(Some(&json!("2024-01-01 10:00:00"))),
            Some(utc(2024, 1, 1, 10, 0, 0))
        );
    }

    #[test]
    fn test_local_zone_matches_chrono_local() {
        let naive = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let expected = Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
        let normalizer = TimestampNormalizer::new(None, NaiveZone::Local);
        assert_eq!(normalizer.normalize("2024-06-01 12:00:00"), expected);
    }
}
