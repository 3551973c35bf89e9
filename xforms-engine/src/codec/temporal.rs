//! `date`, `time` and `dateTime` codecs (chrono).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};

use super::{ValueCodec, ValueType};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const NAIVE_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Cut a trailing `Z` or `±hh:mm` offset off a time of day.
fn strip_offset(value: &str) -> &str {
    let value = value.strip_suffix('Z').unwrap_or(value);
    match value.rfind(['+', '-']) {
        Some(index) if index >= 5 => &value[..index],
        _ => value,
    }
}

/// Calendar dates. A date-time decodes to its date part.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCodec;

impl ValueCodec for DateCodec {
    type Runtime = Option<NaiveDate>;

    fn value_type(&self) -> ValueType {
        ValueType::Date
    }

    fn encode(&self, value: &Option<NaiveDate>) -> String {
        value
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }

    fn decode(&self, value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        let date = value.split_once('T').map_or(value, |(date, _)| date);
        NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
    }
}

/// Times of day. Offsets are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeCodec;

impl ValueCodec for TimeCodec {
    type Runtime = Option<NaiveTime>;

    fn value_type(&self) -> ValueType {
        ValueType::Time
    }

    fn encode(&self, value: &Option<NaiveTime>) -> String {
        value
            .map(|time| time.format(TIME_FORMAT).to_string())
            .unwrap_or_default()
    }

    fn decode(&self, value: &str) -> Option<NaiveTime> {
        let value = strip_offset(value.trim());
        NaiveTime::parse_from_str(value, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
            .ok()
    }
}

/// Instants with an offset. Offset-less input is read as UTC; a bare date
/// is read as midnight UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeCodec;

impl ValueCodec for DateTimeCodec {
    type Runtime = Option<DateTime<FixedOffset>>;

    fn value_type(&self) -> ValueType {
        ValueType::DateTime
    }

    fn encode(&self, value: &Option<DateTime<FixedOffset>>) -> String {
        value
            .map(|value| value.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            .unwrap_or_default()
    }

    fn decode(&self, value: &str) -> Option<DateTime<FixedOffset>> {
        let value = value.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed);
        }
        let naive = NaiveDateTime::parse_from_str(value, NAIVE_DATE_TIME_FORMAT)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, DATE_FORMAT)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })?;
        Some(naive.and_utc().fixed_offset())
    }
}
