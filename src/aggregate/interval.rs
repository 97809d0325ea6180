//! Time intervals: calendar-aware flooring and fixed step widths
//!
//! Day, week, month and year floor on the wall clock of the supplied timezone,
//! so their boundaries land on local midnight across DST changes and months of
//! different lengths. Sub-hour intervals and `hour` floor the instant itself by
//! the local minute, which keeps the two passes through a fall-back hour in
//! separate buckets. Stepping (axis generation) uses fixed durations.

use crate::event::local_to_utc;
use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeInterval {
    #[default]
    Disabled,
    TenMinutes,
    ThirtyMinutes,
    Hour,
    Day,
    Week,
    Month,
    Year,
    /// Any name not listed above; floors and steps by 5 minutes
    Unrecognized,
}

impl TimeInterval {
    /// Lenient parse: unknown names map to `Unrecognized`, never an error
    pub fn parse(s: &str) -> Self {
        match s {
            "disabled" | "" => TimeInterval::Disabled,
            "10m" => TimeInterval::TenMinutes,
            "30m" => TimeInterval::ThirtyMinutes,
            "hour" => TimeInterval::Hour,
            "day" => TimeInterval::Day,
            "week" => TimeInterval::Week,
            "month" => TimeInterval::Month,
            "year" => TimeInterval::Year,
            other => {
                log::debug!("Unrecognised time interval '{}', using 5 minute buckets", other);
                TimeInterval::Unrecognized
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInterval::Disabled => "disabled",
            TimeInterval::TenMinutes => "10m",
            TimeInterval::ThirtyMinutes => "30m",
            TimeInterval::Hour => "hour",
            TimeInterval::Day => "day",
            TimeInterval::Week => "week",
            TimeInterval::Month => "month",
            TimeInterval::Year => "year",
            TimeInterval::Unrecognized => "5m",
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self != TimeInterval::Disabled
    }

    /// Intervals offered by the page-level interval selector, in cycle order
    pub fn selectable() -> [TimeInterval; 8] {
        [
            TimeInterval::Disabled,
            TimeInterval::TenMinutes,
            TimeInterval::ThirtyMinutes,
            TimeInterval::Hour,
            TimeInterval::Day,
            TimeInterval::Week,
            TimeInterval::Month,
            TimeInterval::Year,
        ]
    }

    pub fn next_selectable(&self) -> TimeInterval {
        let all = Self::selectable();
        let pos = all.iter().position(|i| i == self).unwrap_or(0);
        all[(pos + 1) % all.len()]
    }

    /// Fixed step width used when generating axis boundaries
    ///
    /// Month and year are approximated as 30 and 365 days.
    pub fn step(&self) -> Option<Duration> {
        match self {
            TimeInterval::Disabled => None,
            TimeInterval::TenMinutes => Some(Duration::minutes(10)),
            TimeInterval::ThirtyMinutes => Some(Duration::minutes(30)),
            TimeInterval::Hour => Some(Duration::hours(1)),
            TimeInterval::Day => Some(Duration::days(1)),
            TimeInterval::Week => Some(Duration::days(7)),
            TimeInterval::Month => Some(Duration::days(30)),
            TimeInterval::Year => Some(Duration::days(365)),
            TimeInterval::Unrecognized => Some(Duration::minutes(5)),
        }
    }

    /// Floor `ts` to the start of its bucket in `tz`
    ///
    /// The result is never later than `ts`. `Disabled` returns `ts` unchanged.
    pub fn floor<Tz: TimeZone>(&self, ts: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
        let local = ts.with_timezone(tz).naive_local();
        let floored = match self {
            TimeInterval::Disabled => return ts,
            TimeInterval::TenMinutes => return floor_minutes(ts, local, 10),
            TimeInterval::ThirtyMinutes => return floor_minutes(ts, local, 30),
            TimeInterval::Unrecognized => return floor_minutes(ts, local, 5),
            TimeInterval::Hour => return floor_minutes(ts, local, 60),
            TimeInterval::Day => midnight(local.date()),
            TimeInterval::Week => {
                let back = local.weekday().num_days_from_monday() as i64;
                midnight(local.date() - Duration::days(back))
            }
            TimeInterval::Month => midnight(local.date().with_day(1).unwrap_or(local.date())),
            TimeInterval::Year => midnight(
                NaiveDate::from_ymd_opt(local.year(), 1, 1).unwrap_or(local.date()),
            ),
        };
        local_to_utc(tz, floored)
    }
}

/// Step `ts` back to a multiple of `width` local minutes within its hour
fn floor_minutes(ts: DateTime<Utc>, local: NaiveDateTime, width: u32) -> DateTime<Utc> {
    let into_bucket = Duration::minutes((local.minute() % width) as i64)
        + Duration::seconds(local.second() as i64)
        + Duration::nanoseconds(local.nanosecond() as i64);
    ts.checked_sub_signed(into_bucket).unwrap_or(ts)
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

impl Serialize for TimeInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TimeInterval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TimeInterval::parse(&s))
    }
}

/// Per-bucket combine function for time-interval aggregation
///
/// Parsing is lenient: any unrecognised name combines by `Sum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BucketFunction {
    #[default]
    Sum,
    /// Mean to 4 decimal places
    Average,
    /// Mean rounded to an integer
    AverageRound,
    Max,
    Min,
    Count,
}

impl BucketFunction {
    pub fn parse(s: &str) -> Self {
        match s {
            "sum" => BucketFunction::Sum,
            "average" => BucketFunction::Average,
            "average_round" => BucketFunction::AverageRound,
            "max" => BucketFunction::Max,
            "min" => BucketFunction::Min,
            "count" => BucketFunction::Count,
            other => {
                log::debug!("Unrecognised bucket function '{}', defaulting to sum", other);
                BucketFunction::Sum
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BucketFunction::Sum => "sum",
            BucketFunction::Average => "average",
            BucketFunction::AverageRound => "average_round",
            BucketFunction::Max => "max",
            BucketFunction::Min => "min",
            BucketFunction::Count => "count",
        }
    }
}

impl Serialize for BucketFunction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BucketFunction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(BucketFunction::parse(&s))
    }
}

/// A widget's time aggregation setting: interval plus combine function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeAggregation {
    pub interval: TimeInterval,
    pub function: BucketFunction,
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_sub_hour_floors() {
        let ts = utc(2025, 6, 18, 14, 47, 31);
        assert_eq!(TimeInterval::TenMinutes.floor(ts, &Utc), utc(2025, 6, 18, 14, 40, 0));
        assert_eq!(TimeInterval::ThirtyMinutes.floor(ts, &Utc), utc(2025, 6, 18, 14, 30, 0));
        assert_eq!(TimeInterval::Hour.floor(ts, &Utc), utc(2025, 6, 18, 14, 0, 0));
        assert_eq!(TimeInterval::Unrecognized.floor(ts, &Utc), utc(2025, 6, 18, 14, 45, 0));
    }

    #[test]
    fn test_sub_hour_floors_split_fall_back_hour() {
        use super::test_zones::EasternFallBack;

        // 05:30Z is 01:30 EDT, 06:30Z is 01:30 EST
        let first = utc(2025, 11, 2, 5, 30, 0);
        let second = utc(2025, 11, 2, 6, 30, 0);
        let tz = EasternFallBack;

        assert_eq!(TimeInterval::Hour.floor(first, &tz), utc(2025, 11, 2, 5, 0, 0));
        assert_eq!(TimeInterval::Hour.floor(second, &tz), utc(2025, 11, 2, 6, 0, 0));
        assert_eq!(TimeInterval::ThirtyMinutes.floor(first, &tz), first);
        assert_eq!(TimeInterval::TenMinutes.floor(second + Duration::minutes(7), &tz), second);

        // Local midnight is still 04:00Z that day
        assert_eq!(TimeInterval::Day.floor(second, &tz), utc(2025, 11, 2, 4, 0, 0));
    }

    #[test]
    fn test_sub_hour_floor_uses_local_minute_for_half_hour_offsets() {
        // +05:30: 14:47:31Z is 20:17:31 local, so the local hour began at 14:30Z
        let tz = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let ts = utc(2025, 6, 18, 14, 47, 31);
        assert_eq!(TimeInterval::Hour.floor(ts, &tz), utc(2025, 6, 18, 14, 30, 0));
        assert_eq!(TimeInterval::TenMinutes.floor(ts, &tz), utc(2025, 6, 18, 14, 40, 0));
    }

    #[test]
    fn test_calendar_floors() {
        // 2025-06-18 is a Wednesday
        let ts = utc(2025, 6, 18, 14, 47, 31);
        assert_eq!(TimeInterval::Day.floor(ts, &Utc), utc(2025, 6, 18, 0, 0, 0));
        assert_eq!(TimeInterval::Week.floor(ts, &Utc), utc(2025, 6, 16, 0, 0, 0));
        assert_eq!(TimeInterval::Month.floor(ts, &Utc), utc(2025, 6, 1, 0, 0, 0));
        assert_eq!(TimeInterval::Year.floor(ts, &Utc), utc(2025, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_day_floor_uses_local_midnight() {
        // 01:30 UTC is 03:30 at +02:00; local midnight is 22:00 UTC the day before
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let ts = utc(2025, 6, 18, 1, 30, 0);
        assert_eq!(TimeInterval::Day.floor(ts, &tz), utc(2025, 6, 17, 22, 0, 0));
    }

    #[test]
    fn test_week_floor_on_monday_is_same_day() {
        let ts = utc(2025, 6, 16, 9, 0, 0);
        assert_eq!(TimeInterval::Week.floor(ts, &Utc), utc(2025, 6, 16, 0, 0, 0));
    }

    #[test]
    fn test_lenient_parsing() {
        assert_eq!(TimeInterval::parse("hour"), TimeInterval::Hour);
        assert_eq!(TimeInterval::parse("fortnight"), TimeInterval::Unrecognized);
        assert_eq!(BucketFunction::parse("median"), BucketFunction::Sum);
        assert_eq!(BucketFunction::parse("count"), BucketFunction::Count);
    }

    #[test]
    fn test_selector_cycles() {
        assert_eq!(TimeInterval::Disabled.next_selectable(), TimeInterval::TenMinutes);
        assert_eq!(TimeInterval::Year.next_selectable(), TimeInterval::Disabled);
    }
}
