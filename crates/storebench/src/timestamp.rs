//! Deterministic timestamps for generated records.
//!
//! Every backend derives record timestamps from the same `(hour, day_offset)`
//! pair so that the relational and wide-column compilers emit identical
//! literals and the document compiler binds the same instant.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};

/// Format used for timestamp literals.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `(hour, day_offset)` of the lower bound used by `select_date`.
pub const RANGE_BOUNDARY: (i64, i64) = (1, 1);

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .expect("2020-01-01 is a valid date")
        .and_time(NaiveTime::MIN)
}

/// The instant `2020-01-01 + day_offset days` at `hour:00:00`, naive time.
pub fn generate(hour: i64, day_offset: i64) -> Result<NaiveDateTime> {
    if !(0..=23).contains(&hour) {
        return Err(Error::invalid(format!(
            "hour must be within 0..=23, got {hour}"
        )));
    }
    if day_offset < 0 {
        return Err(Error::invalid(format!(
            "day offset must be non-negative, got {day_offset}"
        )));
    }

    Duration::try_days(day_offset)
        .and_then(|days| epoch().checked_add_signed(days))
        .and_then(|day| day.checked_add_signed(Duration::hours(hour)))
        .ok_or_else(|| Error::invalid(format!("day offset {day_offset} out of range")))
}

/// Same instant as [`generate`], rendered with [`TIMESTAMP_FORMAT`].
pub fn generate_string(hour: i64, day_offset: i64) -> Result<String> {
    generate(hour, day_offset).map(|ts| format_timestamp(&ts))
}

/// Same instant as [`generate`], as Unix seconds.
///
/// The naive value is read as UTC so the result does not depend on the
/// host time zone.
pub fn generate_epoch(hour: i64, day_offset: i64) -> Result<i64> {
    generate(hour, day_offset).map(|ts| ts.and_utc().timestamp())
}

/// Render a timestamp the way every SQL-shaped compiler embeds it.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// The `select_date` lower bound.
pub fn range_boundary() -> NaiveDateTime {
    let (hour, day_offset) = RANGE_BOUNDARY;
    epoch() + Duration::days(day_offset) + Duration::hours(hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_epoch_anchor() {
        assert_eq!(generate_string(0, 0).unwrap(), "2020-01-01 00:00:00");
        assert_eq!(generate_epoch(0, 0).unwrap(), 1_577_836_800);
    }

    #[test]
    fn test_range_boundary() {
        assert_eq!(generate_string(1, 1).unwrap(), "2020-01-02 01:00:00");
        assert_eq!(generate_epoch(1, 1).unwrap(), 1_577_926_800);
        assert_eq!(range_boundary(), generate(1, 1).unwrap());
    }

    #[test]
    fn test_day_offset_crosses_months() {
        assert_eq!(generate_string(23, 31).unwrap(), "2020-02-01 23:00:00");
        // 2020 is a leap year
        assert_eq!(generate_string(5, 59).unwrap(), "2020-02-29 05:00:00");
        assert_eq!(generate_string(12, 366).unwrap(), "2021-01-01 12:00:00");
    }

    #[test]
    fn test_deterministic_and_forms_agree() {
        for hour in 0..24 {
            for day_offset in [0, 1, 7, 29, 30, 365, 1000] {
                let first = generate_string(hour, day_offset).unwrap();
                let second = generate_string(hour, day_offset).unwrap();
                assert_eq!(first, second);

                let epoch = generate_epoch(hour, day_offset).unwrap();
                let back = DateTime::from_timestamp(epoch, 0).unwrap().naive_utc();
                assert_eq!(format_timestamp(&back), first);
            }
        }
    }

    #[test]
    fn test_rejects_invalid_hour() {
        for hour in [-1, 24, 100] {
            assert!(matches!(
                generate(hour, 0),
                Err(Error::InvalidArgument(_))
            ));
        }
        assert!(generate_epoch(24, 3).is_err());
        assert!(generate_string(-5, 3).is_err());
    }

    #[test]
    fn test_rejects_negative_offset() {
        assert!(matches!(generate(0, -1), Err(Error::InvalidArgument(_))));
        assert!(generate_epoch(10, -30).is_err());
    }
}
