use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted progress marker for one `(system, entity)` pair.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Watermark {
    pub system: String,
    pub entity: String,
    pub last_value: String,
    /// ISO-8601 timestamp of the last save.
    pub updated_at: String,
}

impl Watermark {
    pub fn new(system: &str, entity: &str, last_value: &str, updated_at: DateTime<Utc>) -> Self {
        Watermark {
            system: system.to_string(),
            entity: entity.to_string(),
            last_value: last_value.to_string(),
            updated_at: updated_at.to_rfc3339(),
        }
    }

    /// `updated_at` as UTC. Offset-less values are read as UTC.
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.updated_at) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.updated_at, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Hours elapsed between `updated_at` and `now`.
    pub fn age_hours(&self, now: DateTime<Utc>) -> Option<f64> {
        let updated = self.updated_at_utc()?;
        Some((now - updated).num_milliseconds() as f64 / 3_600_000.0)
    }
}
