/// Planting Engine — Work Calendar
///
/// Day index -> workday/weekend. Pure function of `(offset + day) % 7`
/// where offset is the weekday of day 0 (Monday = 0).
/// Arrivals and acclimatization ignore the calendar; field work does not.

use chrono::{Datelike, Days, NaiveDate};

/// Days 0..=4 of a week (Monday..Friday) are workdays.
const WORKDAYS_PER_WEEK: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkCalendar {
    start_date: NaiveDate,
    offset: u32,
}

impl WorkCalendar {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            offset: start_date.weekday().num_days_from_monday(),
        }
    }

    /// Weekday of day 0, Monday = 0.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn is_workday(&self, day: u32) -> bool {
        (self.offset + day % 7) % 7 < WORKDAYS_PER_WEEK
    }

    /// Calendar date of a day index. Saturates at the last representable date.
    pub fn date_for(&self, day: u32) -> NaiveDate {
        self.start_date
            .checked_add_days(Days::new(u64::from(day)))
            .unwrap_or(NaiveDate::MAX)
    }
}
