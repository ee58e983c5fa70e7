//! Daily degree-day history.
//!
//! Weekly and monthly sensors are sums of stored daily values rather than one
//! integration over raw samples: raw samples are only fetched for the last
//! complete day, so the daily values are what survives between runs.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::domain::Mode;
use crate::period::{dates_between, month_dates, week_dates};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyHistory {
    heating: BTreeMap<NaiveDate, f64>,
    cooling: BTreeMap<NaiveDate, f64>,
}

impl DailyHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_maps(heating: BTreeMap<NaiveDate, f64>, cooling: BTreeMap<NaiveDate, f64>) -> Self {
        Self { heating, cooling }
    }

    pub fn values(&self, mode: Mode) -> &BTreeMap<NaiveDate, f64> {
        match mode {
            Mode::Heating => &self.heating,
            Mode::Cooling => &self.cooling,
        }
    }

    fn values_mut(&mut self, mode: Mode) -> &mut BTreeMap<NaiveDate, f64> {
        match mode {
            Mode::Heating => &mut self.heating,
            Mode::Cooling => &mut self.cooling,
        }
    }

    /// Store (or overwrite) the value for `date`.
    pub fn record(&mut self, mode: Mode, date: NaiveDate, value: f64) {
        self.values_mut(mode).insert(date, value);
    }

    pub fn get(&self, mode: Mode, date: NaiveDate) -> Option<f64> {
        self.values(mode).get(&date).copied()
    }

    pub fn len(&self, mode: Mode) -> usize {
        self.values(mode).len()
    }

    pub fn is_empty(&self) -> bool {
        self.heating.is_empty() && self.cooling.is_empty()
    }

    /// Sum of stored values over `first..=last`; missing days count as zero.
    pub fn total(&self, mode: Mode, first: NaiveDate, last: NaiveDate) -> f64 {
        self.values(mode).range(first..=last).map(|(_, v)| v).sum()
    }

    /// Days in `first..=last` with no stored value.
    pub fn missing_dates(&self, mode: Mode, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
        let values = self.values(mode);
        dates_between(first, last).filter(|d| !values.contains_key(d)).collect()
    }

    /// Monday..Sunday total for the week containing `reference`.
    ///
    /// Days after `reference` are not expected to have data yet and are not
    /// reported as missing.
    pub fn week_total(&self, mode: Mode, reference: NaiveDate) -> f64 {
        let (first, last) = week_dates(reference);
        debug!(
            "Calculating weekly {} from {} to {}",
            mode.display_name(),
            first,
            last
        );
        self.log_missing(mode, first, last.min(reference), "week");
        self.total(mode, first, last)
    }

    /// First..last day total for the month containing `reference`.
    pub fn month_total(&self, mode: Mode, reference: NaiveDate) -> f64 {
        let (first, last) = month_dates(reference);
        debug!(
            "Calculating monthly {} from {} to {}",
            mode.display_name(),
            first,
            last
        );
        self.log_missing(mode, first, last.min(reference), "month");
        self.total(mode, first, last)
    }

    /// Drop values older than `today - keep_days`; returns `(heating, cooling)` removed.
    ///
    /// A cutoff before the earliest representable date keeps everything.
    pub fn prune(&mut self, today: NaiveDate, keep_days: u32) -> (usize, usize) {
        let Some(cutoff) = today.checked_sub_days(Days::new(u64::from(keep_days))) else {
            return (0, 0);
        };
        let before = (self.heating.len(), self.cooling.len());
        self.heating.retain(|d, _| *d >= cutoff);
        self.cooling.retain(|d, _| *d >= cutoff);
        (before.0 - self.heating.len(), before.1 - self.cooling.len())
    }

    fn log_missing(&self, mode: Mode, first: NaiveDate, last: NaiveDate, period: &str) {
        if last < first {
            return;
        }
        let missing = self.missing_dates(mode, first, last);
        if missing.is_empty() {
            return;
        }
        let shown: Vec<String> = missing.iter().take(5).map(|d| d.to_string()).collect();
        let more = if missing.len() > 5 {
            format!(" and {} more", missing.len() - 5)
        } else {
            String::new()
        };
        debug!(
            "Missing {} data for dates in current {period}: {}{more}",
            mode.display_name(),
            shown.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_history() -> DailyHistory {
        let mut h = DailyHistory::new();
        // Week of Mon 2024-01-15.
        h.record(Mode::Heating, d(2024, 1, 14), 9.0);
        h.record(Mode::Heating, d(2024, 1, 15), 6.5);
        h.record(Mode::Heating, d(2024, 1, 16), 7.0);
        h.record(Mode::Heating, d(2024, 1, 18), 5.5);
        h.record(Mode::Cooling, d(2024, 1, 16), 0.4);
        h
    }

    #[test]
    fn week_total_sums_monday_to_sunday() {
        let h = sample_history();
        assert!((h.week_total(Mode::Heating, d(2024, 1, 18)) - 19.0).abs() < 1e-9);
        assert!((h.week_total(Mode::Cooling, d(2024, 1, 18)) - 0.4).abs() < 1e-9);
        // Previous week only holds Sunday the 14th.
        assert!((h.week_total(Mode::Heating, d(2024, 1, 14)) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn month_total_covers_whole_month() {
        let mut h = sample_history();
        h.record(Mode::Heating, d(2024, 2, 1), 100.0);
        h.record(Mode::Heating, d(2023, 12, 31), 100.0);
        assert!((h.month_total(Mode::Heating, d(2024, 1, 2)) - 28.0).abs() < 1e-9);
    }

    #[test]
    fn missing_dates_are_listed() {
        let h = sample_history();
        let missing = h.missing_dates(Mode::Heating, d(2024, 1, 15), d(2024, 1, 18));
        assert_eq!(missing, vec![d(2024, 1, 17)]);
    }

    #[test]
    fn record_overwrites_same_day() {
        let mut h = DailyHistory::new();
        h.record(Mode::Heating, d(2024, 1, 15), 1.0);
        h.record(Mode::Heating, d(2024, 1, 15), 2.0);
        assert_eq!(h.get(Mode::Heating, d(2024, 1, 15)), Some(2.0));
        assert_eq!(h.len(Mode::Heating), 1);
    }

    #[test]
    fn prune_keeps_retention_window() {
        let mut h = DailyHistory::new();
        let today = d(2024, 3, 31);
        for offset in 0..70 {
            h.record(Mode::Heating, today - Duration::days(offset), 1.0);
        }
        h.record(Mode::Cooling, today - Duration::days(61), 1.0);

        let (heating, cooling) = h.prune(today, 60);
        assert_eq!(heating, 9);
        assert_eq!(cooling, 1);
        assert_eq!(h.len(Mode::Heating), 61);
        assert!(h.get(Mode::Heating, today - Duration::days(60)).is_some());
    }

    #[test]
    fn huge_retention_keeps_everything() {
        let mut h = sample_history();
        assert_eq!(h.prune(d(2024, 3, 31), u32::MAX), (0, 0));
        assert_eq!(h, sample_history());
    }
}
