use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::model::attendance::AttendanceRecord;
use crate::model::holiday::Holiday;
use crate::model::work_schedule::{SUNDAY, weekday_index};

/// One entry of the history view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarEntry {
    Working { date: NaiveDate, record: AttendanceRecord },
    Sunday { date: NaiveDate },
    Holiday { date: NaiveDate, name: String },
}

impl CalendarEntry {
    pub fn date(&self) -> NaiveDate {
        match self {
            CalendarEntry::Working { date, .. }
            | CalendarEntry::Sunday { date }
            | CalendarEntry::Holiday { date, .. } => *date,
        }
    }
}

/// First and last day of a month, `None` for an invalid year/month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

/// Every date from `start` to `end`, both inclusive.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        days.push(day);
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

pub fn sundays_in_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some((first, last)) = month_bounds(year, month) else {
        return Vec::new();
    };
    days_in_range(first, last)
        .into_iter()
        .filter(|day| weekday_index(*day) == SUNDAY)
        .collect()
}

/// Chronological merge of attendance, Sundays and holidays.
///
/// Entries are never deduplicated: a Sunday that is also a holiday, or a Sunday with
/// an attendance row, produces one entry per source. Entries sharing a date keep the
/// order working, Sunday, holiday.
pub fn merge(
    attendance: Vec<AttendanceRecord>,
    holidays: Vec<Holiday>,
    sundays: Vec<NaiveDate>,
) -> Vec<CalendarEntry> {
    let mut entries = Vec::with_capacity(attendance.len() + holidays.len() + sundays.len());

    entries.extend(attendance.into_iter().map(|record| CalendarEntry::Working {
        date: record.date,
        record,
    }));
    entries.extend(sundays.into_iter().map(|date| CalendarEntry::Sunday { date }));
    entries.extend(holidays.into_iter().map(|h| CalendarEntry::Holiday {
        date: h.date,
        name: h.name,
    }));

    entries.sort_by_key(CalendarEntry::date);
    entries
}
