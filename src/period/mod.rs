//! Period windows (day / week / month) in a caller-supplied time zone.
//!
//! All windows run from local midnight to local midnight and are returned in UTC.
//! Weeks run Monday to Sunday. A local midnight that does not exist (DST gap)
//! resolves to the first valid local instant after it.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{TargetDay, Window};
use crate::error::DegreeDayError;

pub mod history;

pub use history::DailyHistory;

/// Named periods the CLI and pipeline know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// The last complete day.
    Yesterday,
    Today,
    Tomorrow,
    /// Monday to Sunday containing today.
    Week,
    /// First to last day of the current month.
    Month,
}

impl Period {
    pub fn window<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Result<Window, DegreeDayError> {
        match self {
            Period::Yesterday => previous_day(now),
            Period::Today => today(now),
            Period::Tomorrow => tomorrow(now),
            Period::Week => current_week(now),
            Period::Month => current_month(now),
        }
    }
}

/// UTC instant of local midnight starting `date`.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let mut local = midnight;
    // DST gaps are at most a couple of hours; walk forward in 15 minute steps.
    for _ in 0..=12 {
        if let Some(t) = tz.from_local_datetime(&local).earliest() {
            return t.with_timezone(&Utc);
        }
        local += Duration::minutes(15);
    }
    midnight.and_utc()
}

/// `[midnight(date), midnight(date + 1))`.
pub fn day_window<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<Window, DegreeDayError> {
    let next = date + Duration::days(1);
    Window::new(local_midnight(tz, date), local_midnight(tz, next))
}

/// `[first, last + 1 day)` for an inclusive date range.
pub fn date_range_window<Tz: TimeZone>(
    tz: &Tz,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Window, DegreeDayError> {
    Window::new(local_midnight(tz, first), local_midnight(tz, last + Duration::days(1)))
}

pub fn previous_day<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Window, DegreeDayError> {
    day_window(&now.timezone(), now.date_naive() - Duration::days(1))
}

pub fn today<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Window, DegreeDayError> {
    day_window(&now.timezone(), now.date_naive())
}

pub fn tomorrow<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Window, DegreeDayError> {
    day_window(&now.timezone(), now.date_naive() + Duration::days(1))
}

pub fn target_day<Tz: TimeZone>(now: &DateTime<Tz>, target: TargetDay) -> Result<Window, DegreeDayError> {
    match target {
        TargetDay::Today => today(now),
        TargetDay::Tomorrow => tomorrow(now),
    }
}

pub fn current_week<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Window, DegreeDayError> {
    let (first, last) = week_dates(now.date_naive());
    date_range_window(&now.timezone(), first, last)
}

pub fn current_month<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Window, DegreeDayError> {
    let (first, last) = month_dates(now.date_naive());
    date_range_window(&now.timezone(), first, last)
}

/// Monday and Sunday of the week containing `date`.
pub fn week_dates(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

/// First and last day of the month containing `date`.
pub fn month_dates(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first
        .checked_add_months(Months::new(1))
        .map(|next| next - Duration::days(1))
        .unwrap_or(date);
    (first, last)
}

/// Inclusive iterator over `first..=last`.
pub fn dates_between(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    first.iter_days().take_while(move |d| *d <= last)
}
