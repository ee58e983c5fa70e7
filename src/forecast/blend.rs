//! Actual + forecast blending for "today" and "tomorrow" estimates.
//!
//! The target window is split at `now`:
//!
//! ```text
//! [start, now)  -> observed samples
//! [now, end)    -> forecast samples
//! ```
//!
//! Each side is integrated on its own and the raw sums are added before the single
//! rounding step. The two sides are adjacent and disjoint, so the sums are additive.

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::domain::{
    BaseTemperature, BlendedEstimate, ForecastSample, Mode, Sample, TargetDay, Window,
    duration_days,
};
use crate::error::DegreeDayError;
use crate::math::{Accumulation, accumulate, round_one_decimal};
use crate::period;

/// Coverage shortfalls below this (in days, ~1 s) are not reported as partial.
const PARTIAL_TOLERANCE_DAYS: f64 = 1.0 / 86_400.0;

/// Blend observed samples and a forecast for `target` relative to `now`.
///
/// `now`'s time zone decides where local midnight falls.
pub fn blend_estimate<Tz: TimeZone>(
    actual: &[Sample],
    forecast: &[ForecastSample],
    mode: Mode,
    base: BaseTemperature,
    target: TargetDay,
    now: &DateTime<Tz>,
) -> Result<BlendedEstimate, DegreeDayError> {
    let window = period::target_day(now, target)?;
    blend_window(actual, forecast, window, now.with_timezone(&Utc), mode, base)
}

/// Blend over an explicit window.
///
/// Errors with `ForecastUnavailable` when part of the window lies after `now` and
/// the forecast has no interval overlapping it. A forecast that stops early, or
/// observed samples that stop before `now`, are integrated as far as they go and
/// flagged `partial`; `actual_coverage` tells how much of `[start, now)` was observed.
pub fn blend_window(
    actual: &[Sample],
    forecast: &[ForecastSample],
    window: Window,
    now: DateTime<Utc>,
    mode: Mode,
    base: BaseTemperature,
) -> Result<BlendedEstimate, DegreeDayError> {
    let base = base.validate()?;
    let (past, future) = window.split_at(now);

    let observed = past
        .map(|w| accumulate(actual, &w, mode, base.value))
        .unwrap_or_default();
    let actual_coverage = match past {
        Some(w) => (observed.covered_days / w.duration_days()).clamp(0.0, 1.0),
        None => 1.0,
    };
    let actual_gap = past.is_some_and(|w| w.duration_days() - observed.covered_days > PARTIAL_TOLERANCE_DAYS);
    if actual_gap {
        debug!(
            "Observed samples cover {:.0}% of the elapsed part of {window}; the rest counts as zero",
            actual_coverage * 100.0
        );
    }

    let (predicted, partial) = match future {
        None => (Accumulation::default(), false),
        Some(w) => {
            let samples: Vec<Sample> = forecast.iter().map(ForecastSample::as_sample).collect();
            let acc = accumulate(&samples, &w, mode, base.value);
            if acc.is_empty() {
                let reason = if forecast.is_empty() {
                    "no forecast samples".to_string()
                } else {
                    format!("{} forecast samples, none covering the window", forecast.len())
                };
                return Err(DegreeDayError::ForecastUnavailable { window: w, reason });
            }
            let shortfall = w.duration_days() - acc.covered_days;
            if shortfall > PARTIAL_TOLERANCE_DAYS {
                debug!(
                    "Forecast covers {:.2} of {:.2} days after now; integrating available data only",
                    acc.covered_days,
                    w.duration_days()
                );
            }
            (acc, shortfall > PARTIAL_TOLERANCE_DAYS)
        }
    };

    let combined = observed.combine(&predicted);
    debug!(
        "{} estimate for {window}: actual {:.3} + forecast {:.3}",
        mode.display_name(),
        observed.degree_days,
        predicted.degree_days
    );

    Ok(BlendedEstimate {
        value: round_one_decimal(combined.degree_days),
        unit_label: base.unit.degree_day_label(),
        mode,
        base_temperature: base,
        window,
        actual_fraction: actual_fraction(&window, now),
        actual_coverage,
        forecast_fraction: (predicted.covered_days / window.duration_days()).clamp(0.0, 1.0),
        partial: partial || actual_gap,
    })
}

/// `(now - start) / (end - start)` clamped to `[0, 1]`.
pub fn actual_fraction(window: &Window, now: DateTime<Utc>) -> f64 {
    let elapsed = duration_days(now - window.start());
    (elapsed / window.duration_days()).clamp(0.0, 1.0)
}
