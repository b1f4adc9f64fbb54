//! Calendar-day arithmetic for booking ranges.
//!
//! All normalization uses UTC calendar days: a booking occupies whole days,
//! starting at 00:00:00 and ending at 23:59:59 of its end day. Overdue and
//! projection math therefore never depends on the host machine's locale.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;

/// Returns 00:00:00 UTC of the given calendar day.
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).expect("valid midnight"))
}

/// Returns 23:59:59 UTC of the given calendar day.
pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(23, 59, 59).expect("valid day end"))
}

/// Midnight UTC of the calendar day after the one containing `ts`.
///
/// This is the pivot of the same-day-handover rule: a booking ending on day D
/// does not conflict with one starting on day D, because the comparison uses
/// the next day's midnight rather than the start instant itself.
pub fn next_calendar_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(ts.date_naive() + Duration::days(1))
}

/// Today's calendar day in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Whole calendar days from `from` to `to`; negative when `to` is earlier.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Overdue days at `as_of` for a booking originally ending on `end`.
///
/// Counted in whole calendar days, floored at zero: a booking ending Jan 5
/// and returned Jan 8 is 3 days overdue regardless of the time of day.
pub fn overdue_days(end: DateTime<Utc>, as_of: DateTime<Utc>) -> i64 {
    days_between(end.date_naive(), as_of.date_naive()).max(0)
}

/// Converts a SeaORM timestamptz into UTC for engine arithmetic.
pub fn to_utc(ts: DateTimeWithTimeZone) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

/// Converts a UTC instant into the SeaORM column representation.
pub fn to_fixed(ts: DateTime<Utc>) -> DateTimeWithTimeZone {
    ts.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_boundaries_span_the_whole_day() {
        let d = day(2025, 1, 5);
        assert_eq!(start_of_day(d).to_rfc3339(), "2025-01-05T00:00:00+00:00");
        assert_eq!(end_of_day(d).to_rfc3339(), "2025-01-05T23:59:59+00:00");
    }

    #[test]
    fn next_calendar_day_ignores_time_of_day() {
        let late = end_of_day(day(2025, 1, 5));
        let early = start_of_day(day(2025, 1, 5));
        assert_eq!(next_calendar_day(late), start_of_day(day(2025, 1, 6)));
        assert_eq!(next_calendar_day(early), start_of_day(day(2025, 1, 6)));
    }

    #[test]
    fn overdue_days_floor_at_zero() {
        let end = end_of_day(day(2025, 1, 5));
        assert_eq!(overdue_days(end, start_of_day(day(2025, 1, 8))), 3);
        assert_eq!(overdue_days(end, end_of_day(day(2025, 1, 5))), 0);
        assert_eq!(overdue_days(end, start_of_day(day(2025, 1, 2))), 0);
    }

    #[test]
    fn days_between_is_signed() {
        assert_eq!(days_between(day(2025, 1, 3), day(2025, 1, 10)), 7);
        assert_eq!(days_between(day(2025, 1, 10), day(2025, 1, 3)), -7);
    }
}
