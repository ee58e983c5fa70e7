//! Degree-day integration over an irregular temperature series.
//!
//! The series is treated as piecewise linear between samples. For every pair of
//! consecutive samples that overlaps the window:
//!
//! ```text
//! duration  = clipped span, in days
//! rep       = (v(from) + v(to)) / 2
//! dd       += duration * max(0, base - rep)   (heating)
//! dd       += duration * max(0, rep - base)   (cooling)
//! ```
//!
//! Window edges are clip points: when a pair straddles an edge, the value at the
//! edge is linearly interpolated between the two samples. Nothing is extrapolated
//! beyond the first or last sample, so unobserved parts of a window contribute 0.
//!
//! Rounding happens once, in [`integrate`]. [`accumulate`] returns the raw sums so
//! adjacent windows can be combined before rounding (see `forecast::blend`).

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{BaseTemperature, DegreeDayResult, Mode, Sample, Window, duration_days};
use crate::error::DegreeDayError;

/// Raw, unrounded integration sums for one window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Accumulation {
    /// Accumulated degree days (unrounded).
    pub degree_days: f64,
    /// Σ duration × representative temperature.
    pub weighted_temperature: f64,
    /// Σ duration, in days.
    pub covered_days: f64,
    /// Samples that took part, boundary neighbors included.
    pub sample_count: usize,
    /// Intervals with a non-zero overlap.
    pub intervals: usize,
    /// Intervals with a non-zero degree contribution.
    pub contributing_intervals: usize,
}

impl Accumulation {
    fn empty(sample_count: usize) -> Self {
        Self {
            sample_count,
            ..Self::default()
        }
    }

    /// Sum of two accumulations over disjoint windows.
    pub fn combine(&self, other: &Accumulation) -> Accumulation {
        Accumulation {
            degree_days: self.degree_days + other.degree_days,
            weighted_temperature: self.weighted_temperature + other.weighted_temperature,
            covered_days: self.covered_days + other.covered_days,
            sample_count: self.sample_count + other.sample_count,
            intervals: self.intervals + other.intervals,
            contributing_intervals: self.contributing_intervals + other.contributing_intervals,
        }
    }

    /// Duration-weighted mean of representative temperatures.
    pub fn mean_temperature(&self) -> Option<f64> {
        if self.covered_days > 0.0 {
            Some(self.weighted_temperature / self.covered_days)
        } else {
            None
        }
    }

    /// Fewer than two usable samples, or nothing overlapped the window.
    pub fn is_empty(&self) -> bool {
        self.sample_count < 2 || self.intervals == 0
    }

    /// Turn raw sums into a rounded, labelled result.
    pub fn into_result(self, window: Window, mode: Mode, base: BaseTemperature) -> DegreeDayResult {
        let value = if self.is_empty() {
            0.0
        } else {
            round_one_decimal(self.degree_days)
        };
        DegreeDayResult {
            value,
            unit_label: base.unit.degree_day_label(),
            mode,
            base_temperature: base,
            window,
            mean_temperature: if self.is_empty() { None } else { self.mean_temperature() },
            sample_count: self.sample_count,
            covered_fraction: (self.covered_days / window.duration_days()).clamp(0.0, 1.0),
        }
    }
}

/// Integrate `samples` over `window` and round the result to one decimal.
///
/// Fewer than two usable samples is not an error: the result is `0.0` with no mean.
pub fn integrate(
    samples: &[Sample],
    window: Window,
    mode: Mode,
    base: BaseTemperature,
) -> Result<DegreeDayResult, DegreeDayError> {
    let base = base.validate()?;
    let acc = accumulate(samples, &window, mode, base.value);

    if acc.is_empty() {
        debug!(
            mode = mode.display_name(),
            samples = acc.sample_count,
            "Insufficient temperature readings in {window}"
        );
    } else {
        debug!(
            "{} calculation: {:.1} degree-days from {}/{} intervals ({:.1}% contributed)",
            mode.display_name(),
            acc.degree_days,
            acc.contributing_intervals,
            acc.intervals,
            acc.contributing_intervals as f64 / acc.intervals as f64 * 100.0
        );
    }

    Ok(acc.into_result(window, mode, base))
}

/// Unrounded integration of `samples` over `window` against `base`.
///
/// Unsorted input is sorted into a local copy; non-finite values are dropped.
pub fn accumulate(samples: &[Sample], window: &Window, mode: Mode, base: f64) -> Accumulation {
    let samples = prepare(samples);

    let lo = samples.partition_point(|s| s.timestamp < window.start());
    let hi = samples.partition_point(|s| s.timestamp < window.end());
    if lo == hi {
        return Accumulation::empty(0);
    }

    // Include one neighbor on each side so the edges can be interpolated.
    let first = lo.saturating_sub(1);
    let last = (hi + 1).min(samples.len());
    let used = &samples[first..last];
    if used.len() < 2 {
        return Accumulation::empty(used.len());
    }

    let span = used[used.len() - 1].timestamp - used[0].timestamp;
    debug!(
        "Calculating {} from {} readings spanning {:.1} hours ({:.2} days)",
        mode.display_name(),
        used.len(),
        span.num_seconds() as f64 / 3600.0,
        duration_days(span)
    );

    let mut acc = Accumulation::empty(used.len());
    for pair in used.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let from = a.timestamp.max(window.start());
        let to = b.timestamp.min(window.end());
        if to <= from {
            continue;
        }

        let days = duration_days(to - from);
        let representative = (interpolate(a, b, from) + interpolate(a, b, to)) / 2.0;
        let contribution = days * mode.contribution(base, representative);

        acc.degree_days += contribution;
        acc.weighted_temperature += days * representative;
        acc.covered_days += days;
        acc.intervals += 1;
        if contribution > 0.0 {
            acc.contributing_intervals += 1;
        }
    }

    acc
}

/// Round to one decimal place.
pub fn round_one_decimal(value: f64) -> f64 {
    round_to(value, 1)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let rounded = (value * scale).round() / scale;
    // Avoid reporting "-0.0".
    if rounded == 0.0 { 0.0 } else { rounded }
}

fn prepare(samples: &[Sample]) -> Cow<'_, [Sample]> {
    let finite = samples.iter().all(|s| s.value.is_finite());
    let sorted = samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp);
    if finite && sorted {
        return Cow::Borrowed(samples);
    }

    let mut owned: Vec<Sample> = samples.iter().copied().filter(|s| s.value.is_finite()).collect();
    owned.sort_by_key(|s| s.timestamp);
    Cow::Owned(owned)
}

/// Linear interpolation of the segment `a..b` at `at` (assumed within the segment).
fn interpolate(a: &Sample, b: &Sample, at: DateTime<Utc>) -> f64 {
    if at <= a.timestamp {
        return a.value;
    }
    if at >= b.timestamp {
        return b.value;
    }
    let total = duration_days(b.timestamp - a.timestamp);
    let part = duration_days(at - a.timestamp);
    a.value + (b.value - a.value) * (part / total)
}
