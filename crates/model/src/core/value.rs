use crate::core::data_type::{DataType, parse_timestamp};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, hash::Hash};
use uuid::Uuid;

/// A single nullable cell.
///
/// Equality and hashing treat `Null` as an ordinary value so that NULL key
/// components form one group, and floats compare by bit pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Null,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (String(a), String(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            (Json(a), Json(b)) => a == b,
            (Null, Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use Value::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Int(v) => v.hash(state),
            Float(v) => v.to_bits().hash(state),
            String(v) => v.hash(state),
            Boolean(v) => v.hash(state),
            Date(v) => v.hash(state),
            Timestamp(v) => v.hash(state),
            Uuid(v) => v.hash(state),
            Json(v) => {
                // Serialize JSON to a string for hashing
                let json_str = serde_json::to_string(v).unwrap_or_default();
                json_str.hash(state);
            }
            Null => {}
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            Value::String(v) => match v.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Json(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::String(_) => DataType::String,
            Value::Boolean(_) => DataType::Boolean,
            Value::Date(_) => DataType::Date,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Uuid(_) => DataType::Uuid,
            Value::Json(_) => DataType::Json,
            Value::Null => DataType::Null,
        }
    }

    /// Total order used by windowed ordering.
    ///
    /// `Null` sorts below every other value. Int and Float compare numerically,
    /// a Date compares as midnight UTC against a Timestamp, and otherwise
    /// unrelated types fall back to a fixed type rank.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (String(a), String(b)) => a.cmp(b),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (Date(a), Timestamp(b)) => a.and_time(NaiveTime::MIN).and_utc().cmp(b),
            (Timestamp(a), Date(b)) => a.cmp(&b.and_time(NaiveTime::MIN).and_utc()),
            (Uuid(a), Uuid(b)) => a.cmp(b),
            (Json(a), Json(b)) => a.to_string().cmp(&b.to_string()),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Date(_) | Value::Timestamp(_) => 3,
            Value::String(_) => 4,
            Value::Uuid(_) => 5,
            Value::Json(_) => 6,
        }
    }

    /// Best-effort typing of an untyped cell. Empty cells become `Null`.
    pub fn infer(raw: &str) -> Value {
        if raw.is_empty() {
            return Value::Null;
        }
        if let Ok(v) = raw.parse::<i64>() {
            return Value::Int(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            return Value::Float(v);
        }
        match raw {
            "true" => return Value::Boolean(true),
            "false" => return Value::Boolean(false),
            _ => {}
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Value::Date(date);
        }
        if let Some(ts) = parse_timestamp(raw) {
            return Value::Timestamp(ts);
        }
        Value::String(raw.to_string())
    }

    /// Reads an opaque string (e.g. a persisted watermark) as a value of the
    /// same type as `sample`, falling back to a plain string.
    pub fn coerce_like(raw: &str, sample: &Value) -> Value {
        Value::try_coerce_like(raw, sample).unwrap_or_else(|| Value::String(raw.to_string()))
    }

    /// Like [`Value::coerce_like`] but `None` when `raw` does not parse as the
    /// sample's type. NULL and string samples always accept the raw text.
    pub fn try_coerce_like(raw: &str, sample: &Value) -> Option<Value> {
        match sample {
            Value::Null | Value::String(_) => Some(Value::String(raw.to_string())),
            other => other.data_type().get_value(raw),
        }
    }

    /// JSON rendering used by side outputs. Temporal values become RFC 3339
    /// strings and non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Boolean(v) => serde_json::Value::Bool(*v),
            Value::Json(v) => v.clone(),
            Value::Null => serde_json::Value::Null,
            other => serde_json::Value::String(other.to_string()),
        }
    }

    /// Plain text rendering for files and watermarks; `None` for NULL.
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::String(v) => Some(v.clone()),
            Value::Timestamp(v) => Some(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Json(v) => write!(f, "{v}"),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn null_groups_with_null() {
        let mut set = HashSet::new();
        set.insert(vec![Value::Null, Value::Int(1)]);
        assert!(set.contains(&vec![Value::Null, Value::Int(1)]));
        assert!(!set.contains(&vec![Value::Int(1), Value::Null]));
    }

    #[test]
    fn null_sorts_lowest() {
        assert_eq!(Value::Null.total_cmp(&Value::Int(i64::MIN)), Ordering::Less);
        assert_eq!(Value::String(String::new()).total_cmp(&Value::Null), Ordering::Greater);
    }

    #[test]
    fn numbers_compare_across_int_and_float() {
        assert_eq!(Value::Int(2).total_cmp(&Value::Float(1.5)), Ordering::Greater);
        assert_eq!(Value::Float(2.0).total_cmp(&Value::Int(2)), Ordering::Equal);
        // but they are distinct grouping values
        assert_ne!(Value::Float(2.0), Value::Int(2));
    }

    #[test]
    fn dates_compare_against_timestamps() {
        let date = Value::Date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let ts = Value::Timestamp(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 1).unwrap());
        assert_eq!(date.total_cmp(&ts), Ordering::Less);
    }

    #[test]
    fn infer_keeps_op_codes_as_strings() {
        assert_eq!(Value::infer("I"), Value::String("I".into()));
        assert_eq!(Value::infer("42"), Value::Int(42));
        assert_eq!(Value::infer(""), Value::Null);
        assert!(matches!(Value::infer("2025-01-01T10:00:00Z"), Value::Timestamp(_)));
    }

    #[test]
    fn coerce_like_follows_sample_type() {
        let sample = Value::Timestamp(Utc::now());
        assert_eq!(
            Value::coerce_like("2025-01-01", &sample),
            Value::Timestamp(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(Value::coerce_like("17", &Value::Int(3)), Value::Int(17));
        assert_eq!(
            Value::coerce_like("not-a-number", &Value::Int(3)),
            Value::String("not-a-number".into())
        );
        assert_eq!(Value::try_coerce_like("not-a-number", &Value::Int(3)), None);
        assert_eq!(
            Value::try_coerce_like("x", &Value::from("y")),
            Some(Value::from("x"))
        );
    }

    #[test]
    fn to_json_keeps_scalars_native() {
        assert_eq!(Value::Int(3).to_json(), serde_json::json!(3));
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
        let ts = Value::Timestamp(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        assert_eq!(ts.to_json(), serde_json::json!("2025-06-01T12:00:00Z"));
    }

    #[test]
    fn render_uses_rfc3339_for_timestamps() {
        let ts = Value::Timestamp(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        assert_eq!(ts.render().as_deref(), Some("2025-06-01T12:00:00Z"));
        assert_eq!(Value::Null.render(), None);
    }
}
