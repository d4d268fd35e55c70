//! Store-native values.
//!
//! [`Value`] is what a backend persists: primitives, timestamps, geopoints, references to
//! other documents, nested arrays and maps, plus the server-time sentinel that a backend
//! replaces with its own clock on write.

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::path::DocumentPath;

/// Field name to value mapping of one stored document (or embedded object).
pub type ValueMap = IndexMap<String, Value>;

/// A point in time with nanosecond precision, stored as seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanoseconds: u32) -> Self {
        Self { seconds, nanoseconds }
    }

    pub fn now() -> Self {
        Self::from_date(Utc::now())
    }

    pub fn from_date(date: DateTime<Utc>) -> Self {
        Self {
            seconds: date.timestamp(),
            nanoseconds: date.timestamp_subsec_nanos(),
        }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            seconds: millis.div_euclid(1000),
            nanoseconds: (millis.rem_euclid(1000) as u32) * 1_000_000,
        }
    }

    /// Converts to a UTC date. Out-of-range timestamps clamp to the Unix epoch.
    pub fn to_date(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds)
            .single()
            .unwrap_or_default()
    }

    /// Milliseconds since the Unix epoch, saturating at the bounds of `i64`.
    pub fn to_millis(&self) -> i64 {
        self.seconds
            .saturating_mul(1000)
            .saturating_add(i64::from(self.nanoseconds / 1_000_000))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(date: DateTime<Utc>) -> Self {
        Timestamp::from_date(date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(Timestamp),
    GeoPoint(GeoPoint),
    Reference(DocumentPath),
    Array(Vec<Value>),
    Map(ValueMap),
    /// Replaced by the backend with its current time when the document is written.
    ServerTimestamp,
}

impl Value {
    /// Truthiness as used by the serializer: null, `false`, zero, NaN and the empty string
    /// are falsy; everything else, including empty arrays and maps, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(value) => *value,
            Value::Integer(value) => *value != 0,
            Value::Double(value) => *value != 0.0 && !value.is_nan(),
            Value::String(value) => !value.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a dotted field path (`metadata.last_sign_in`) through nested maps.
    pub fn lookup<'a>(map: &'a ValueMap, path: &str) -> Option<&'a Value> {
        let mut segments = path.split('.');
        let mut current = map.get(segments.next()?)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Plain JSON rendering. References become their path string, timestamps RFC 3339.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null | Value::ServerTimestamp => JsonValue::Null,
            Value::Boolean(value) => JsonValue::Bool(*value),
            Value::Integer(value) => JsonValue::from(*value),
            Value::Double(value) => Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(value) => JsonValue::String(value.clone()),
            Value::Timestamp(value) => JsonValue::String(value.to_date().to_rfc3339()),
            Value::GeoPoint(point) => geo_point_json(point),
            Value::Reference(path) => JsonValue::String(path.to_string()),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<JsonMap<_, _>>(),
            ),
        }
    }
}

pub(crate) fn geo_point_json(point: &GeoPoint) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("latitude".to_string(), JsonValue::from(point.latitude));
    out.insert("longitude".to_string(), JsonValue::from(point.longitude));
    JsonValue::Object(out)
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Value::Timestamp(value)
    }
}

impl From<GeoPoint> for Value {
    fn from(value: GeoPoint) -> Self {
        Value::GeoPoint(value)
    }
}

impl From<DocumentPath> for Value {
    fn from(value: DocumentPath) -> Self {
        Value::Reference(value)
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Value::Map(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_mapping_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from(0.0).is_truthy());
        assert!(!Value::from(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());

        assert!(Value::from("x").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
        assert!(Value::Map(ValueMap::new()).is_truthy());
        assert!(Value::ServerTimestamp.is_truthy());
    }

    #[test]
    fn looks_up_dotted_paths() {
        let mut inner = ValueMap::new();
        inner.insert("receive_push_notifications".into(), true.into());
        let mut doc = ValueMap::new();
        doc.insert("metadata".into(), Value::Map(inner));

        assert_eq!(
            Value::lookup(&doc, "metadata.receive_push_notifications"),
            Some(&Value::Boolean(true))
        );
        assert_eq!(Value::lookup(&doc, "metadata.missing"), None);
        assert_eq!(Value::lookup(&doc, "missing"), None);
    }

    #[test]
    fn timestamp_millis_round_trip() {
        let ts = Timestamp::from_millis(1_500);
        assert_eq!(ts, Timestamp::new(1, 500_000_000));
        assert_eq!(ts.to_millis(), 1_500);
        assert_eq!(Timestamp::from_date(ts.to_date()), ts);
    }

    #[test]
    fn timestamp_millis_saturate_instead_of_overflowing() {
        assert_eq!(Timestamp::new(i64::MAX, 999_000_000).to_millis(), i64::MAX);
        assert_eq!(Timestamp::new(i64::MIN, 0).to_millis(), i64::MIN);
    }
}
