//! Shared "update" logic used by the CLI commands.
//!
//! One call to [`run_update`] is one refresh of every sensor:
//! yesterday's integration -> daily history -> weekly/monthly totals -> estimates.
//!
//! The pipeline owns no I/O. Callers load samples, forecasts and history, and
//! decide what to do with the snapshot (print it, save the history).

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{
    BlendedEstimate, DegreeDayConfig, DegreeDayResult, ForecastSample, Mode, Sample, TargetDay,
    Window,
};
use crate::error::DegreeDayError;
use crate::forecast::blend_estimate;
use crate::math::{integrate, round_one_decimal};
use crate::period::{self, DailyHistory, month_dates, week_dates};

/// What kind of sensor a state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Daily,
    Weekly,
    Monthly,
    EstimatedToday,
    EstimatedTomorrow,
}

impl SensorKind {
    pub fn suffix(self) -> &'static str {
        match self {
            SensorKind::Daily => "daily",
            SensorKind::Weekly => "weekly",
            SensorKind::Monthly => "monthly",
            SensorKind::EstimatedToday => "estimated_today",
            SensorKind::EstimatedTomorrow => "estimated_tomorrow",
        }
    }
}

/// Sensor key such as `hdd_daily` or `cdd_estimated_tomorrow`.
pub fn sensor_key(mode: Mode, kind: SensorKind) -> String {
    format!("{}_{}", mode.short_name(), kind.suffix())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorAttributes {
    pub base_temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_fraction: Option<f64>,
    /// Share of the elapsed part of the day backed by observed samples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_coverage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_fraction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
    /// Why the state is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

/// One sensor's state. `value == None` means "unavailable", never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub key: String,
    pub mode: Mode,
    pub kind: SensorKind,
    pub value: Option<f64>,
    pub unit_label: String,
    pub attributes: SensorAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSnapshot {
    pub generated_at: DateTime<Utc>,
    pub sensors: Vec<SensorState>,
}

impl SensorSnapshot {
    pub fn get(&self, key: &str) -> Option<&SensorState> {
        self.sensors.iter().find(|s| s.key == key)
    }
}

/// Forecast data handed to the pipeline.
#[derive(Debug, Clone, Copy)]
pub enum ForecastInput<'a> {
    /// No forecast source configured: no estimate sensors at all.
    NotConfigured,
    /// A source is configured but could not deliver (fetch failure etc.).
    Unavailable(&'a str),
    Available(&'a [ForecastSample]),
}

/// Output of one update.
#[derive(Debug, Clone)]
pub struct UpdateOutput {
    pub snapshot: SensorSnapshot,
    /// History was modified and should be persisted.
    pub history_changed: bool,
}

/// Refresh every enabled sensor.
///
/// `samples` should cover yesterday and today so far; `now`'s time zone decides
/// where days start.
pub fn run_update<Tz: TimeZone>(
    config: &DegreeDayConfig,
    history: &mut DailyHistory,
    samples: &[Sample],
    forecast: ForecastInput<'_>,
    now: &DateTime<Tz>,
) -> Result<UpdateOutput, DegreeDayError> {
    let base = config.base().validate()?;
    let today = now.date_naive();
    let yesterday = today - Duration::days(1);
    let yesterday_window = period::previous_day(now)?;
    debug!("Starting data update for period {yesterday_window}");

    let mut sensors = Vec::new();
    let mut history_changed = false;

    for mode in config.modes() {
        let result = integrate(samples, yesterday_window, mode, base)?;
        if result.has_data() {
            history.record(mode, yesterday, result.value);
            history_changed = true;
            debug!(
                "Calculated daily {} for {}: {:.1} (from {} readings)",
                mode.display_name(),
                yesterday,
                result.value,
                result.sample_count
            );
        } else {
            warn!(
                "No temperature readings found between {} and {}",
                yesterday_window.start().to_rfc3339(),
                yesterday_window.end().to_rfc3339()
            );
        }
        sensors.push(daily_state(&result, yesterday));
    }

    let (removed_heating, removed_cooling) = history.prune(today, config.retention_days);
    if removed_heating + removed_cooling > 0 {
        history_changed = true;
        debug!(
            "Cleaned up {} old HDD values and {} old CDD values",
            removed_heating, removed_cooling
        );
    }

    for mode in config.modes() {
        if config.include_weekly {
            let (first, last) = week_dates(yesterday);
            let total = history.week_total(mode, yesterday);
            sensors.push(total_state(config, mode, SensorKind::Weekly, total, first, last));
        }
        if config.include_monthly {
            let (first, last) = month_dates(yesterday);
            let total = history.month_total(mode, yesterday);
            sensors.push(total_state(config, mode, SensorKind::Monthly, total, first, last));
        }
    }

    match forecast {
        ForecastInput::NotConfigured => {
            debug!("No forecast source configured, skipping estimates");
        }
        ForecastInput::Unavailable(reason) => {
            for mode in config.modes() {
                for kind in [SensorKind::EstimatedToday, SensorKind::EstimatedTomorrow] {
                    sensors.push(unavailable_state(config, mode, kind, reason.to_string()));
                }
            }
        }
        ForecastInput::Available(forecast) => {
            for mode in config.modes() {
                let today_est = blend_estimate(samples, forecast, mode, base, TargetDay::Today, now);
                sensors.push(estimate_state(config, mode, SensorKind::EstimatedToday, today_est)?);

                let tomorrow_est =
                    blend_estimate(&[], forecast, mode, base, TargetDay::Tomorrow, now);
                sensors.push(estimate_state(config, mode, SensorKind::EstimatedTomorrow, tomorrow_est)?);
            }
        }
    }

    Ok(UpdateOutput {
        snapshot: SensorSnapshot {
            generated_at: now.with_timezone(&Utc),
            sensors,
        },
        history_changed,
    })
}

fn daily_state(result: &DegreeDayResult, date: NaiveDate) -> SensorState {
    SensorState {
        key: sensor_key(result.mode, SensorKind::Daily),
        mode: result.mode,
        kind: SensorKind::Daily,
        value: Some(result.value),
        unit_label: result.unit_label.clone(),
        attributes: SensorAttributes {
            base_temperature: result.base_temperature.value,
            date_range: Some(date.to_string()),
            mean_temperature: result.mean_temperature.map(round_one_decimal),
            sample_count: Some(result.sample_count),
            ..SensorAttributes::default()
        },
    }
}

fn total_state(
    config: &DegreeDayConfig,
    mode: Mode,
    kind: SensorKind,
    total: f64,
    first: NaiveDate,
    last: NaiveDate,
) -> SensorState {
    SensorState {
        key: sensor_key(mode, kind),
        mode,
        kind,
        value: Some(round_one_decimal(total)),
        unit_label: config.unit.degree_day_label(),
        attributes: SensorAttributes {
            base_temperature: config.base_temperature,
            date_range: Some(format!("{first} to {last}")),
            ..SensorAttributes::default()
        },
    }
}

fn estimate_state(
    config: &DegreeDayConfig,
    mode: Mode,
    kind: SensorKind,
    estimate: Result<BlendedEstimate, DegreeDayError>,
) -> Result<SensorState, DegreeDayError> {
    match estimate {
        Ok(est) => Ok(SensorState {
            key: sensor_key(mode, kind),
            mode,
            kind,
            value: Some(est.value),
            unit_label: est.unit_label,
            attributes: SensorAttributes {
                base_temperature: est.base_temperature.value,
                date_range: Some(window_dates(&est.window)),
                actual_fraction: Some(est.actual_fraction),
                actual_coverage: Some(est.actual_coverage),
                forecast_fraction: Some(est.forecast_fraction),
                partial: Some(est.partial),
                ..SensorAttributes::default()
            },
        }),
        Err(DegreeDayError::ForecastUnavailable { reason, .. }) => {
            warn!("{} unavailable: {reason}", sensor_key(mode, kind));
            Ok(unavailable_state(config, mode, kind, reason))
        }
        Err(other) => Err(other),
    }
}

fn unavailable_state(config: &DegreeDayConfig, mode: Mode, kind: SensorKind, reason: String) -> SensorState {
    SensorState {
        key: sensor_key(mode, kind),
        mode,
        kind,
        value: None,
        unit_label: config.unit.degree_day_label(),
        attributes: SensorAttributes {
            base_temperature: config.base_temperature,
            unavailable_reason: Some(reason),
            ..SensorAttributes::default()
        },
    }
}

fn window_dates(window: &Window) -> String {
    window.start().date_naive().to_string()
}

/// Summary of a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillSummary {
    pub days_recorded: usize,
    pub days_without_data: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

/// Compute daily values for every complete local day in `samples` before `today`.
///
/// Days are integrated in parallel; results are recorded in date order.
pub fn backfill<Tz: TimeZone>(
    config: &DegreeDayConfig,
    history: &mut DailyHistory,
    samples: &[Sample],
    tz: &Tz,
    today: NaiveDate,
) -> Result<BackfillSummary, DegreeDayError> {
    let base = config.base().validate()?;
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return Ok(BackfillSummary::default());
    };

    let first_date = first.timestamp.with_timezone(tz).date_naive();
    let last_date = last.timestamp.with_timezone(tz).date_naive();
    let mut days = Vec::new();
    for date in period::dates_between(first_date, last_date) {
        if date >= today {
            break;
        }
        let window = period::day_window(tz, date)?;
        if window.start() >= first.timestamp && window.end() <= last.timestamp {
            days.push((date, window));
        }
    }
    info!("Backfilling {} complete days", days.len());

    let modes = config.modes();
    let computed: Vec<(NaiveDate, Vec<DegreeDayResult>)> = days
        .par_iter()
        .map(|(date, window)| -> Result<_, DegreeDayError> {
            let results = modes
                .iter()
                .map(|&mode| integrate(samples, *window, mode, base))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((*date, results))
        })
        .collect::<Result<Vec<_>, DegreeDayError>>()?;

    let mut summary = BackfillSummary::default();
    for (date, results) in computed {
        if results.iter().all(|r| !r.has_data()) {
            summary.days_without_data += 1;
            continue;
        }
        for r in results.iter().filter(|r| r.has_data()) {
            history.record(r.mode, date, r.value);
        }
        summary.days_recorded += 1;
        summary.first = summary.first.or(Some(date));
        summary.last = Some(date);
    }
    Ok(summary)
}
