//! Calendar projections for the date dimension

use chrono::{Datelike, NaiveDate};

/// One row of the date dimension table, keyed by the calendar date.
///
/// `day_of_week` follows the warehouse convention of Sunday = 0 through
/// Saturday = 6, and `iso_week` is the ISO 8601 week number. Field types are
/// `i32` to match the INT columns they load into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateDimensionRow {
    pub date: NaiveDate,
    pub day_of_month: i32,
    pub iso_week: i32,
    pub month: i32,
    pub year: i32,
    pub quarter: i32,
    pub day_of_week: i32,
    pub day_of_year: i32,
}

impl From<NaiveDate> for DateDimensionRow {
    fn from(date: NaiveDate) -> Self {
        DateDimensionRow {
            date,
            day_of_month: date.day() as i32,
            iso_week: date.iso_week().week() as i32,
            month: date.month() as i32,
            year: date.year(),
            quarter: (date.month0() / 3 + 1) as i32,
            day_of_week: date.weekday().num_days_from_sunday() as i32,
            day_of_year: date.ordinal() as i32,
        }
    }
}
