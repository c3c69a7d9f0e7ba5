use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::Serializer;

pub mod error;
pub mod response;

use error::AppError;

pub fn serialize_oid<S>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&id.to_hex())
}

/// Parses a hex id taken from a path or a request body. `what` names the
/// entity in the error message.
pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| AppError::Validation(format!("Invalid {what} id")))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp and keeps only the UTC
/// calendar day.
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| AppError::Validation(format!("Invalid date '{raw}', expected YYYY-MM-DD")))
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// First and last millisecond of a UTC day, both inclusive.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = midnight_utc(date);
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

/// Parses a comma separated seat list such as `"4, 5,12"`.
pub fn parse_seat_list(raw: &str) -> Result<Vec<u32>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map_err(|_| AppError::Validation(format!("Invalid seat number '{part}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_plain_and_rfc3339_dates() {
        let plain = parse_calendar_date("2030-05-17").unwrap();
        assert_eq!((plain.year(), plain.month(), plain.day()), (2030, 5, 17));

        let stamped = parse_calendar_date("2030-05-17T22:30:00-03:00").unwrap();
        // 22:30 at -03:00 is already the next day in UTC.
        assert_eq!(stamped, NaiveDate::from_ymd_opt(2030, 5, 18).unwrap());
    }

    #[test]
    fn rejects_garbage_dates() {
        let err = parse_calendar_date("next friday").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 31).unwrap();
        let (start, end) = day_bounds(date);

        assert_eq!(start.date_naive(), date);
        assert_eq!((start.hour(), start.minute(), start.second()), (0, 0, 0));
        assert_eq!(end.date_naive(), date);
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
        assert_eq!(end.timestamp_subsec_millis(), 999);
    }

    #[test]
    fn object_ids_must_be_hex() {
        assert!(parse_object_id("65f1c0ffee0000000000abcd", "show").is_ok());
        match parse_object_id("not-an-id", "show") {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Invalid show id"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn seat_lists_ignore_blanks() {
        assert_eq!(parse_seat_list(" 4, 5,,12 ").unwrap(), vec![4, 5, 12]);
        assert!(parse_seat_list("").unwrap().is_empty());
        assert!(parse_seat_list("4,-1").is_err());
    }
}
