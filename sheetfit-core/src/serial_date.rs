//! Spreadsheet serial dates.
//!
//! A serial date counts days since 1899-12-30; the fractional part is the
//! time of day. Serial values carry no zone information, they hold a
//! wall-clock reading, so every conversion goes through a [`TimeZone`].
//!
//! Conversions are lossy below one second: residues are floored, never
//! rounded.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use thiserror::Error;

/// Serial number of 1970-01-01 (days between 1899-12-30 and the Unix epoch).
pub const UNIX_EPOCH_SERIAL: f64 = 25569.0;

const SECONDS_PER_DAY: f64 = 86_400.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Added to the day fraction before flooring to whole seconds so that
/// values such as `0.647337962962…` do not land one second short.
const FRACTION_EPSILON: f64 = 0.000_000_1;

/// `NaiveDate::num_days_from_ce()` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Largest day offset accepted from the Unix epoch (well inside chrono's range).
const MAX_DAY_OFFSET: f64 = 100_000_000.0;

/// Errors produced while converting serial dates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerialDateError {
    #[error("Serial date is not a finite number: {0}")]
    NotFinite(f64),

    #[error("Serial date out of range: {0}")]
    OutOfRange(f64),

    #[error("Wall-clock time {0} does not exist in the target time zone")]
    NonexistentLocalTime(NaiveDateTime),
}

/// Converts a serial date into the wall-clock date/time it represents.
pub fn serial_to_naive(serial: f64) -> Result<NaiveDateTime, SerialDateError> {
    if !serial.is_finite() {
        return Err(SerialDateError::NotFinite(serial));
    }

    let whole_days = serial.floor();
    let unix_days = whole_days - UNIX_EPOCH_SERIAL;
    if unix_days.abs() > MAX_DAY_OFFSET {
        return Err(SerialDateError::OutOfRange(serial));
    }

    let fractional_day = serial - whole_days + FRACTION_EPSILON;
    let total_seconds = (SECONDS_PER_DAY * fractional_day).floor() as i64;

    let midnight = i32::try_from(unix_days as i64 + UNIX_EPOCH_DAYS_FROM_CE)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or(SerialDateError::OutOfRange(serial))?;

    // A fraction that floors to a full day rolls over to the next midnight.
    midnight
        .checked_add_signed(Duration::seconds(total_seconds))
        .ok_or(SerialDateError::OutOfRange(serial))
}

/// Converts a wall-clock date/time into its serial number.
pub fn naive_to_serial(datetime: NaiveDateTime) -> f64 {
    UNIX_EPOCH_SERIAL + datetime.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY
}

/// Decodes a serial date as a wall-clock time in `tz`.
///
/// Ambiguous wall-clock times (DST fold) resolve to the earliest instant.
pub fn decode<Tz: TimeZone>(serial: f64, tz: &Tz) -> Result<DateTime<Tz>, SerialDateError> {
    let naive = serial_to_naive(serial)?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(datetime) => Ok(datetime),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(SerialDateError::NonexistentLocalTime(naive)),
    }
}

/// Encodes a date/time as the serial number of its wall-clock reading.
pub fn encode<Tz: TimeZone>(datetime: &DateTime<Tz>) -> f64 {
    naive_to_serial(datetime.naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveTime, Timelike, Utc};

    const ONE_SECOND: f64 = 1.0 / 86_400.0;

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_decode_known_serials() {
        let cases = [
            (44865.64733796296, utc(2022, 10, 31, 15, 32, 10)),
            (44866.65453703704, utc(2022, 11, 1, 15, 42, 32)),
            (44866.667708333334, utc(2022, 11, 1, 16, 1, 30)),
            (44868.556296296294, utc(2022, 11, 3, 13, 21, 4)),
        ];

        for (serial, expected) in cases {
            assert_eq!(decode(serial, &Utc).unwrap(), expected, "serial {}", serial);
        }
    }

    #[test]
    fn test_encode_known_date() {
        let serial = encode(&utc(2022, 11, 22, 17, 35, 20));
        assert!((serial - 44887.73287037037).abs() < 1e-9);
    }

    #[test]
    fn test_epoch_values() {
        let unix = serial_to_naive(UNIX_EPOCH_SERIAL).unwrap();
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(unix, epoch.and_hms_opt(0, 0, 0).unwrap());

        let origin = serial_to_naive(0.0).unwrap();
        assert_eq!(origin.date(), NaiveDate::from_ymd_opt(1899, 12, 30).unwrap());
        assert_eq!(origin.time(), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_decode_uses_wall_clock_of_zone() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let decoded = decode(44865.64733796296, &plus_two).unwrap();

        assert_eq!(decoded.naive_local().time(), NaiveTime::from_hms_opt(15, 32, 10).unwrap());
        assert_eq!(decoded.with_timezone(&Utc), utc(2022, 10, 31, 13, 32, 10));
    }

    #[test]
    fn test_encode_shifts_by_zone_offset() {
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        let instant = utc(2022, 11, 22, 17, 35, 20).with_timezone(&minus_five);

        // 12:35:20 wall clock in UTC-5
        let expected = encode(&utc(2022, 11, 22, 12, 35, 20));
        assert!((encode(&instant) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_within_one_second() {
        let plus_nine = FixedOffset::east_opt(9 * 3600).unwrap();
        let mut serial = 40000.0;
        while serial < 50000.0 {
            let back = encode(&decode(serial, &Utc).unwrap());
            assert!((back - serial).abs() <= ONE_SECOND, "serial {} came back as {}", serial, back);

            let back = encode(&decode(serial, &plus_nine).unwrap());
            assert!((back - serial).abs() <= ONE_SECOND, "serial {} came back as {}", serial, back);

            serial += 123.456_789;
        }
    }

    #[test]
    fn test_sub_second_residue_is_floored() {
        // 12:00:00.9
        let serial = 44000.5 + 0.9 / 86_400.0;
        let decoded = decode(serial, &Utc).unwrap();
        assert_eq!(decoded.naive_utc().time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(decoded.nanosecond(), 0);
    }

    #[test]
    fn test_fraction_rolls_over_to_next_day() {
        let decoded = serial_to_naive(44865.99999995).unwrap();
        assert_eq!(decoded.date(), NaiveDate::from_ymd_opt(2022, 11, 1).unwrap());
        assert_eq!(decoded.time(), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_rejects_non_finite_and_huge_serials() {
        assert!(matches!(serial_to_naive(f64::NAN), Err(SerialDateError::NotFinite(_))));
        assert!(matches!(
            serial_to_naive(f64::INFINITY),
            Err(SerialDateError::NotFinite(_))
        ));
        assert!(matches!(serial_to_naive(1e12), Err(SerialDateError::OutOfRange(_))));
    }
}
