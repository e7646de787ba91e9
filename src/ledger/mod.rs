//! Double-entry logic shared by the bill/payment writers, the statement
//! aggregator and the depreciation batch. Nothing here touches MongoDB; the
//! `state` layer feeds rows in and persists what comes out.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use mongodb::bson::DateTime;

mod depreciation;
mod journal;
mod statements;

pub use depreciation::*;
pub use journal::*;
pub use statements::*;

/// Converts a currency amount to integer cents for exact comparisons.
#[inline]
pub fn to_cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

#[inline]
pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[inline]
pub fn round_money(value: f64) -> f64 {
    from_cents(to_cents(value))
}

/// Midnight UTC of the given calendar date.
pub fn date_to_bson(date: NaiveDate) -> DateTime {
    DateTime::from_chrono(date.and_time(NaiveTime::MIN).and_utc())
}

pub fn bson_to_date(value: DateTime) -> NaiveDate {
    value.to_chrono().date_naive()
}

/// Parses a `YYYY-MM` billing month into its first and last day.
pub fn month_bounds(month: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (year, month) = month.trim().split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    Some((first, last_day_of_month(first)))
}

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|next| next - Duration::days(1))
        .unwrap_or(date)
}

/// Last day of each month whose month end falls within `start..=end`.
pub fn month_end_dates(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = first_day_of_month(start);
    while current <= end {
        let last = last_day_of_month(current);
        if last >= start && last <= end {
            dates.push(last);
        }
        current = last + Duration::days(1);
    }
    dates
}
