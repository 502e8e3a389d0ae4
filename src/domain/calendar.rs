//! UTC calendar-day helpers.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

/// Midnight UTC at the start of `date`.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Half-open window `[start of day, start of next day)` containing `now`.
#[must_use]
pub fn day_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let start = start_of_day(today);
    let end = today
        .checked_add_days(Days::new(1))
        .map_or(DateTime::<Utc>::MAX_UTC, start_of_day);
    (start, end)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        let Some(ts) = Utc.with_ymd_and_hms(y, m, d, h, min, 0).single() else {
            panic!("valid timestamp");
        };
        ts
    }

    #[test]
    fn window_spans_one_utc_day() {
        let now = at(2024, 3, 15, 17, 45);
        let (start, end) = day_window(now);
        assert_eq!(start, at(2024, 3, 15, 0, 0));
        assert_eq!(end, at(2024, 3, 16, 0, 0));
        assert!(start <= now && now < end);
    }

    #[test]
    fn midnight_belongs_to_its_own_day() {
        let midnight = at(2024, 12, 31, 0, 0);
        let (start, end) = day_window(midnight);
        assert_eq!(start, midnight);
        assert_eq!(end, at(2025, 1, 1, 0, 0));
    }

    #[test]
    fn start_of_day_truncates_time() {
        let Some(date) = NaiveDate::from_ymd_opt(2024, 2, 29) else {
            panic!("valid date");
        };
        assert_eq!(start_of_day(date), at(2024, 2, 29, 0, 0));
    }
}
