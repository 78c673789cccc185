use crate::core::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::HashMap, fmt, str::FromStr};
use uuid::Uuid;

/// Logical column types understood by the curation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Float,
    String,
    Boolean,
    Date,
    Timestamp,
    Uuid,
    Json,
    Null,
}

lazy_static! {
    static ref TYPE_ALIASES: HashMap<&'static str, DataType> = build_type_aliases();
}

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Timestamp => "timestamp",
            DataType::Uuid => "uuid",
            DataType::Json => "json",
            DataType::Null => "null",
        }
    }

    /// Parses a raw cell into a value of this type.
    ///
    /// Empty cells yield `None`; callers decide whether that means NULL or an error.
    pub fn get_value(&self, raw: &str) -> Option<Value> {
        if raw.is_empty() {
            return None;
        }

        match self {
            DataType::Int => raw.trim().parse::<i64>().ok().map(Value::Int),
            DataType::Float => raw.trim().parse::<f64>().ok().map(Value::Float),
            DataType::String => Some(Value::String(raw.to_string())),
            DataType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Some(Value::Boolean(true)),
                "false" | "f" | "0" | "no" => Some(Value::Boolean(false)),
                _ => None,
            },
            DataType::Date => parse_date(raw.trim()).map(Value::Date),
            DataType::Timestamp => parse_timestamp(raw.trim()).map(Value::Timestamp),
            DataType::Uuid => Uuid::parse_str(raw.trim()).ok().map(Value::Uuid),
            DataType::Json => serde_json::from_str(raw).ok().map(Value::Json),
            DataType::Null => None,
        }
    }

    /// One type for a whole column of untyped cells.
    ///
    /// Numbers must read back as the same text, so `001` or `+1` keep the
    /// column a string. Int and Float widen to Float; any other mix is a string.
    /// Empty cells are skipped and an all-empty column is a string.
    pub fn infer_column<'a>(cells: impl IntoIterator<Item = &'a str>) -> DataType {
        let mut inferred: Option<DataType> = None;
        for cell in cells.into_iter().filter(|c| !c.is_empty()) {
            let value = Value::infer(cell);
            if matches!(value, Value::Int(_) | Value::Float(_)) && value.to_string() != cell {
                return DataType::String;
            }

            let cell_type = value.data_type();
            inferred = match (inferred, cell_type) {
                (None, t) => Some(t),
                (Some(a), b) if a == b => Some(a),
                (Some(DataType::Int), DataType::Float) | (Some(DataType::Float), DataType::Int) => {
                    Some(DataType::Float)
                }
                _ => return DataType::String,
            };
        }
        inferred.unwrap_or(DataType::String)
    }
}

/// Accepts RFC 3339 and the common naive ISO-8601 layouts (read as UTC).
/// A bare date is read as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Accepts `YYYY-MM-DD`, or any timestamp layout truncated to its date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|ts| ts.date_naive()))
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        TYPE_ALIASES
            .get(normalized.as_str())
            .copied()
            .ok_or_else(|| format!("Unknown column type: {s}"))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn build_type_aliases() -> HashMap<&'static str, DataType> {
    use DataType::*;

    let entries = [
        ("int", Int),
        ("integer", Int),
        ("bigint", Int),
        ("smallint", Int),
        ("long", Int),
        ("float", Float),
        ("double", Float),
        ("real", Float),
        ("decimal", Float),
        ("numeric", Float),
        ("string", String),
        ("str", String),
        ("text", String),
        ("varchar", String),
        ("bool", Boolean),
        ("boolean", Boolean),
        ("date", Date),
        ("timestamp", Timestamp),
        ("datetime", Timestamp),
        ("timestamptz", Timestamp),
        ("uuid", Uuid),
        ("json", Json),
        ("jsonb", Json),
        ("null", Null),
    ];

    let mut map = HashMap::new();
    for (name, data_type) in entries {
        map.insert(name, data_type);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_type_aliases_case_insensitively() {
        assert_eq!("BIGINT".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!("DateTime".parse::<DataType>().unwrap(), DataType::Timestamp);
        assert!("geometry".parse::<DataType>().is_err());
    }

    #[test]
    fn column_inference_keeps_cell_text() {
        assert_eq!(DataType::infer_column(["1", "", "22"]), DataType::Int);
        assert_eq!(DataType::infer_column(["1", "2.5"]), DataType::Float);
        assert_eq!(DataType::infer_column(["001", "1"]), DataType::String);
        assert_eq!(DataType::infer_column(["1", "+2"]), DataType::String);
        assert_eq!(DataType::infer_column(["1", "I"]), DataType::String);
        assert_eq!(DataType::infer_column(["2025-01-01", "2025-01-02"]), DataType::Date);
        assert_eq!(DataType::infer_column(["", ""]), DataType::String);
    }

    #[test]
    fn empty_cells_have_no_value() {
        assert_eq!(DataType::String.get_value(""), None);
        assert_eq!(DataType::Int.get_value(""), None);
    }

    #[test]
    fn timestamps_accept_naive_and_date_only_layouts() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp("2025-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-02 03:04:05"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-01-02"),
            Some(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn dates_truncate_timestamps() {
        assert_eq!(
            parse_date("2025-03-04T10:00:00+00:00"),
            NaiveDate::from_ymd_opt(2025, 3, 4)
        );
    }
}
