//! Holiday calendars, calendar weeks and critical-day identification.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

/// External holiday lookup. Country-specific and opaque to the generator.
pub trait HolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// Calendar without holidays.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}

/// Explicit set of holiday dates.
#[derive(Clone, Debug, Default)]
pub struct HolidaySet {
    dates: FxHashSet<NaiveDate>,
}

impl HolidaySet {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }
}

impl HolidayCalendar for HolidaySet {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

/// Holidays that fall on the same (month, day) every year.
#[derive(Clone, Debug, Default)]
pub struct RecurringHolidays {
    days: FxHashSet<(u32, u32)>,
}

impl RecurringHolidays {
    pub fn new(days: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self {
            days: days.into_iter().collect(),
        }
    }

    /// Colombian public holidays observed in 2025.
    pub fn colombia_2025() -> Self {
        Self::new([
            (1, 1),
            (1, 6),
            (3, 24),
            (4, 17),
            (4, 18),
            (5, 1),
            (6, 2),
            (6, 23),
            (6, 30),
            (7, 7),
            (7, 20),
            (8, 7),
            (8, 18),
            (10, 13),
            (11, 3),
            (11, 17),
            (12, 8),
            (12, 25),
        ])
    }
}

impl HolidayCalendar for RecurringHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.days.contains(&(date.month(), date.day()))
    }
}

#[inline]
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Iterate every date in `start..=end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Monday-to-Sunday weeks covering `start..=end`, clipped to the range.
pub fn weeks_in_range(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut weeks = Vec::new();
    let mut week_start = start;
    while week_start <= end {
        let to_sunday = 6 - week_start.weekday().num_days_from_monday() as u64;
        let week_end = week_start
            .checked_add_days(Days::new(to_sunday))
            .map_or(end, |d| d.min(end));
        weeks.push((week_start, week_end));
        match week_end.succ_opt() {
            Some(next) => week_start = next,
            None => break,
        }
    }
    weeks
}

/// Weekend and holiday dates of a generation run, staffed with priority.
#[derive(Clone, Debug, Default)]
pub struct CriticalDays {
    dates: BTreeSet<NaiveDate>,
    holidays: BTreeSet<NaiveDate>,
}

impl CriticalDays {
    pub fn identify(start: NaiveDate, end: NaiveDate, calendar: &dyn HolidayCalendar) -> Self {
        let mut dates = BTreeSet::new();
        let mut holidays = BTreeSet::new();
        for date in date_range(start, end) {
            let holiday = calendar.is_holiday(date);
            if holiday {
                holidays.insert(date);
            }
            if holiday || is_weekend(date) {
                dates.insert(date);
            }
        }
        Self { dates, holidays }
    }

    #[inline]
    pub fn is_critical(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    #[inline]
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// 0 for critical days, 1 otherwise. Lower is processed first.
    pub fn priority(&self, date: NaiveDate) -> u8 {
        if self.is_critical(date) {
            0
        } else {
            1
        }
    }

    /// Dates of the range sorted by (priority, date).
    pub fn processing_order(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut order: Vec<NaiveDate> = date_range(start, end).collect();
        order.sort_by_key(|d| (self.priority(*d), *d));
        order
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_weekends_and_holidays_are_critical() {
        // 2025-04-28 is a Monday, May 1st a holiday
        let critical = CriticalDays::identify(
            d(2025, 4, 28),
            d(2025, 5, 4),
            &RecurringHolidays::colombia_2025(),
        );
        assert!(critical.is_critical(d(2025, 5, 1)));
        assert!(critical.is_holiday(d(2025, 5, 1)));
        assert!(critical.is_critical(d(2025, 5, 3)));
        assert!(critical.is_critical(d(2025, 5, 4)));
        assert!(!critical.is_critical(d(2025, 4, 30)));
        assert_eq!(critical.len(), 3);
    }

    #[test]
    fn test_processing_order_puts_critical_days_first() {
        let critical =
            CriticalDays::identify(d(2025, 1, 6), d(2025, 1, 12), &HolidaySet::new([d(2025, 1, 8)]));
        let order = critical.processing_order(d(2025, 1, 6), d(2025, 1, 12));
        assert_eq!(
            order,
            vec![
                d(2025, 1, 8),
                d(2025, 1, 11),
                d(2025, 1, 12),
                d(2025, 1, 6),
                d(2025, 1, 7),
                d(2025, 1, 9),
                d(2025, 1, 10),
            ]
        );
    }

    #[test]
    fn test_weeks_are_clipped_to_range() {
        // Wednesday to the Tuesday twelve days later
        let weeks = weeks_in_range(d(2025, 1, 1), d(2025, 1, 14));
        assert_eq!(
            weeks,
            vec![
                (d(2025, 1, 1), d(2025, 1, 5)),
                (d(2025, 1, 6), d(2025, 1, 12)),
                (d(2025, 1, 13), d(2025, 1, 14)),
            ]
        );
    }

    #[test]
    fn test_no_holidays() {
        assert!(!NoHolidays.is_holiday(d(2025, 12, 25)));
        assert!(HolidaySet::new([d(2025, 12, 25)]).is_holiday(d(2025, 12, 25)));
    }
}
