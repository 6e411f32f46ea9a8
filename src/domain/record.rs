// Sensor record domain model
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// One decoded sensor record: field name to scalar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Accepts only JSON objects; anything else is not a record.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Finite numeric value of a field.
    ///
    /// JSON numbers and numeric strings qualify. Null, empty strings, booleans
    /// and containers do not, and neither does anything that is not finite.
    pub fn number(&self, field: &str) -> Option<f64> {
        let value = match self.get(field)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// A record with its normalized time field. `instant` is `None` when the
/// timestamp could not be parsed.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub instant: Option<DateTime<Utc>>,
    pub record: RawRecord,
}

impl ParsedRecord {
    pub fn new(instant: Option<DateTime<Utc>>, record: RawRecord) -> Self {
        Self { instant, record }
    }

    pub fn into_timed(self) -> Option<TimedRecord> {
        let instant = self.instant?;
        Some(TimedRecord {
            instant,
            record: self.record,
        })
    }
}

/// A record that survived the time window. The instant is always valid.
#[derive(Debug, Clone)]
pub struct TimedRecord {
    pub instant: DateTime<Utc>,
    pub record: RawRecord,
}
