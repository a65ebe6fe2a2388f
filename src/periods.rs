//! Period boundary calculations.
//!
//! Pure functions deciding whether a period boundary was crossed
//! between two instants, and where the next boundary lies. Weekly
//! boundaries compare ISO year + ISO week number, giving Monday-start
//! weeks that behave consistently across calendar year transitions.
//!
//! `next_boundary` zeroes all finer-grained fields, so chaining it from
//! a stored reset instant always lands on an exact period start.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

use crate::types::PeriodKind;

/// Has a `period` boundary been crossed between `last` and `now`?
///
/// Lifetime has no boundaries and always returns `false`.
pub fn is_new(period: PeriodKind, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match period {
        PeriodKind::Hourly => {
            (last.year(), last.month(), last.day(), last.hour())
                != (now.year(), now.month(), now.day(), now.hour())
        }
        PeriodKind::Daily => {
            (last.year(), last.month(), last.day()) != (now.year(), now.month(), now.day())
        }
        PeriodKind::Weekly => {
            let (a, b) = (last.iso_week(), now.iso_week());
            (a.year(), a.week()) != (b.year(), b.week())
        }
        PeriodKind::Monthly => (last.year(), last.month()) != (now.year(), now.month()),
        PeriodKind::Yearly => last.year() != now.year(),
        PeriodKind::Lifetime => false,
    }
}

/// Start of the `period` bucket immediately following `now`.
///
/// Always strictly greater than `now` for recurring periods. Lifetime
/// never advances and returns `now` unchanged.
pub fn next_boundary(period: PeriodKind, now: DateTime<Utc>) -> DateTime<Utc> {
    match period {
        PeriodKind::Hourly => start_of_hour(now) + Duration::hours(1),
        PeriodKind::Daily => start_of_day(now) + Duration::days(1),
        PeriodKind::Weekly => {
            // 7 when already Monday, else days remaining until Monday.
            let days_ahead = i64::from(7 - now.weekday().num_days_from_monday());
            start_of_day(now) + Duration::days(days_ahead)
        }
        PeriodKind::Monthly => {
            if now.month() == 12 {
                start_of_month(now.year() + 1, 1)
            } else {
                start_of_month(now.year(), now.month() + 1)
            }
        }
        PeriodKind::Yearly => start_of_month(now.year() + 1, 1),
        PeriodKind::Lifetime => now,
    }
}

fn start_of_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(t.year(), t.month(), t.day(), t.hour(), 0, 0)
        .single()
        .unwrap_or(t)
}

fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(t.year(), t.month(), t.day(), 0, 0, 0)
        .single()
        .unwrap_or(t)
}

fn start_of_month(year: i32, month: u32) -> DateTime<Utc> {
    // Day 1 of any month is always a valid single UTC instant.
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
    }

    #[test]
    fn same_bucket_is_not_new() {
        let t1 = at(2024, 3, 15, 10, 5, 0);
        let t2 = at(2024, 3, 15, 10, 55, 59);
        for period in PeriodKind::ALL {
            assert!(!is_new(period, t1, t2), "{period} flagged same bucket");
        }
    }

    #[test]
    fn following_bucket_is_new() {
        let t1 = at(2024, 3, 15, 10, 59, 59);
        assert!(is_new(PeriodKind::Hourly, t1, at(2024, 3, 15, 11, 0, 0)));
        assert!(is_new(PeriodKind::Daily, t1, at(2024, 3, 16, 0, 0, 0)));
        // 2024-03-15 is a Friday; the next ISO week starts Monday 03-18.
        assert!(is_new(PeriodKind::Weekly, t1, at(2024, 3, 18, 0, 0, 0)));
        assert!(is_new(PeriodKind::Monthly, t1, at(2024, 4, 1, 0, 0, 0)));
        assert!(is_new(PeriodKind::Yearly, t1, at(2025, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn lifetime_never_crosses() {
        let t1 = at(2020, 1, 1, 0, 0, 0);
        let t2 = at(2030, 12, 31, 23, 59, 59);
        assert!(!is_new(PeriodKind::Lifetime, t1, t2));
    }

    #[test]
    fn weekly_uses_iso_weeks_across_year_boundary() {
        // 2024-12-30 (Monday) and 2025-01-03 (Friday) share ISO week
        // 2025-W01 even though the calendar year differs.
        let mon = at(2024, 12, 30, 8, 0, 0);
        let fri = at(2025, 1, 3, 8, 0, 0);
        assert!(!is_new(PeriodKind::Weekly, mon, fri));
        // The following Monday starts a new ISO week.
        assert!(is_new(PeriodKind::Weekly, fri, at(2025, 1, 6, 0, 0, 0)));
    }

    #[test]
    fn next_hour_zeroes_and_advances() {
        let t = at(2024, 3, 15, 10, 42, 17);
        assert_eq!(next_boundary(PeriodKind::Hourly, t), at(2024, 3, 15, 11, 0, 0));
        // End of day rolls into the next day.
        let late = at(2024, 3, 15, 23, 30, 0);
        assert_eq!(next_boundary(PeriodKind::Hourly, late), at(2024, 3, 16, 0, 0, 0));
    }

    #[test]
    fn next_day_zeroes_time_of_day() {
        let t = at(2024, 2, 28, 13, 1, 2);
        // 2024 is a leap year.
        assert_eq!(next_boundary(PeriodKind::Daily, t), at(2024, 2, 29, 0, 0, 0));
    }

    #[test]
    fn next_week_lands_on_monday() {
        // Friday 2024-03-15 → Monday 2024-03-18.
        let fri = at(2024, 3, 15, 10, 0, 0);
        assert_eq!(next_boundary(PeriodKind::Weekly, fri), at(2024, 3, 18, 0, 0, 0));
        // A Monday advances a full week, not zero days.
        let mon = at(2024, 3, 18, 10, 0, 0);
        assert_eq!(next_boundary(PeriodKind::Weekly, mon), at(2024, 3, 25, 0, 0, 0));
    }

    #[test]
    fn next_month_rolls_over_december() {
        let dec = at(2024, 12, 15, 9, 30, 0);
        assert_eq!(next_boundary(PeriodKind::Monthly, dec), at(2025, 1, 1, 0, 0, 0));
        let jun = at(2024, 6, 30, 23, 59, 59);
        assert_eq!(next_boundary(PeriodKind::Monthly, jun), at(2024, 7, 1, 0, 0, 0));
    }

    #[test]
    fn next_year_is_january_first() {
        let t = at(2024, 7, 4, 12, 0, 0);
        assert_eq!(next_boundary(PeriodKind::Yearly, t), at(2025, 1, 1, 0, 0, 0));
    }

    #[test]
    fn boundaries_strictly_increase() {
        let t = at(2024, 12, 31, 23, 59, 59);
        for period in PeriodKind::RECURRING {
            assert!(next_boundary(period, t) > t, "{period} did not advance");
        }
    }

    #[test]
    fn chained_boundaries_replay_a_gap() {
        // Chaining from an old reset instant visits every missed hour.
        let mut boundary = next_boundary(PeriodKind::Hourly, at(2024, 3, 15, 10, 15, 0));
        let now = at(2024, 3, 15, 14, 5, 0);
        let mut crossings = 0;
        while is_new(PeriodKind::Hourly, boundary, now) {
            boundary = next_boundary(PeriodKind::Hourly, boundary);
            crossings += 1;
        }
        assert_eq!(boundary, at(2024, 3, 15, 14, 0, 0));
        assert_eq!(crossings, 3);
    }
}
