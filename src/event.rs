//! Event model shared by every stage of the dashboard pipeline
//!
//! Events are immutable once fetched. Timestamps are held as absolute UTC
//! instants; textual forms (RFC 3339 from the HTTP API, naive local-time text
//! from older stores) are normalised at the deserialization boundary.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Canonical local-time text form used for bucket labels
pub const LOCAL_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single timestamped numeric data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(name: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value,
            tag: None,
            additional_info: None,
            timestamp,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_additional_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }

    /// Look up a field by its configuration name
    ///
    /// Used by row rules, which address fields by string. Unknown fields
    /// resolve to `Null` so that conditions on them evaluate to false.
    pub fn field_value(&self, field: &str) -> serde_json::Value {
        match field {
            "name" => serde_json::Value::String(self.name.clone()),
            "value" => serde_json::Number::from_f64(self.value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            "tag" => self
                .tag
                .clone()
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
            "additional_info" => self
                .additional_info
                .clone()
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
            "timestamp" => serde_json::Value::String(format_local_text(&self.timestamp, &Local)),
            _ => serde_json::Value::Null,
        }
    }
}

/// Resolve a wall-clock time in `tz` to an absolute instant
///
/// Ambiguous times (DST fall-back) take the earlier instant. Times that do not
/// exist (DST spring-forward gap) are pushed forward by one hour.
pub fn local_to_utc<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// `now` minus a fractional number of days, saturating at the earliest instant
pub fn days_before(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    let millis = (days * 86_400_000.0) as i64;
    chrono::Duration::try_milliseconds(millis)
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Render an instant as local-time text in `tz`
pub fn format_local_text<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.with_timezone(tz).format(LOCAL_TEXT_FORMAT).to_string()
}

/// Parse any of the accepted timestamp text forms
///
/// RFC 3339 carries its own offset. Naive forms (`2025-01-01 12:00:00.123`,
/// `2025-01-01T12:00:00`, `2025-01-01`) are interpreted as local time.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(local_to_utc(&Local, naive));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| local_to_utc(&Local, naive))
}

/// Serde adapter: RFC 3339 out, any accepted form in
pub mod flexible_timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_timestamp(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp: {}", text)))
    }
}
