//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - passed by value into the pure integrator/blender
//! - rendered as sensor attributes or JSON output
//! - stored in the daily history

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DegreeDayError;

/// Seconds in one day; every duration in this crate is expressed as a fraction of it.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Temperature unit of samples, forecasts and the base temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[value(alias = "c")]
    Celsius,
    #[value(alias = "f")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Label for an accumulated value, e.g. `°C·d`.
    pub fn degree_day_label(self) -> String {
        format!("{}·d", self.symbol())
    }

    /// Conventional base temperature for the unit (18 °C / 65 °F).
    pub fn default_base(self) -> f64 {
        match self {
            TemperatureUnit::Celsius => 18.0,
            TemperatureUnit::Fahrenheit => 65.0,
        }
    }

    /// Convert an absolute temperature from `self` into `target`.
    pub fn convert(self, value: f64, target: TemperatureUnit) -> f64 {
        match (self, target) {
            (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => value * 9.0 / 5.0 + 32.0,
            (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => (value - 32.0) * 5.0 / 9.0,
            _ => value,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" | "°c" => Some(TemperatureUnit::Celsius),
            "f" | "fahrenheit" | "°f" => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }
}

/// Heating or cooling accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Heating,
    Cooling,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Heating, Mode::Cooling];

    /// Degree contribution of a single temperature against `base`.
    ///
    /// - Heating: `max(0, base - t)`
    /// - Cooling: `max(0, t - base)`
    pub fn contribution(self, base: f64, temperature: f64) -> f64 {
        match self {
            Mode::Heating => (base - temperature).max(0.0),
            Mode::Cooling => (temperature - base).max(0.0),
        }
    }

    /// Prefix used for sensor keys (`hdd` / `cdd`).
    pub fn short_name(self) -> &'static str {
        match self {
            Mode::Heating => "hdd",
            Mode::Cooling => "cdd",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Mode::Heating => "HDD",
            Mode::Cooling => "CDD",
        }
    }
}

/// Threshold temperature, in the same unit as the samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseTemperature {
    pub value: f64,
    pub unit: TemperatureUnit,
}

impl BaseTemperature {
    pub const fn new(value: f64, unit: TemperatureUnit) -> Self {
        Self { value, unit }
    }

    pub const fn celsius(value: f64) -> Self {
        Self::new(value, TemperatureUnit::Celsius)
    }

    pub const fn fahrenheit(value: f64) -> Self {
        Self::new(value, TemperatureUnit::Fahrenheit)
    }

    pub fn validate(self) -> Result<Self, DegreeDayError> {
        if self.value.is_finite() {
            Ok(self)
        } else {
            Err(DegreeDayError::InvalidBaseTemperature(self.value))
        }
    }
}

/// One observed temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One hourly forecast entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    /// Forecast low, when the provider reports one. Not used for integration.
    pub templow: Option<f64>,
}

impl ForecastSample {
    pub fn new(timestamp: DateTime<Utc>, temperature: f64) -> Self {
        Self {
            timestamp,
            temperature,
            templow: None,
        }
    }

    pub fn as_sample(&self) -> Sample {
        Sample::new(self.timestamp, self.temperature)
    }
}

/// Half-open interval `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DegreeDayError> {
        if start >= end {
            return Err(DegreeDayError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_days(&self) -> f64 {
        duration_days(self.duration())
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// Split at `at` into `[start, at)` and `[at, end)`.
    ///
    /// A side is `None` when it would be empty (`at` at or outside a bound).
    pub fn split_at(&self, at: DateTime<Utc>) -> (Option<Window>, Option<Window>) {
        let at = at.clamp(self.start, self.end);
        (Window::new(self.start, at).ok(), Window::new(at, self.end).ok())
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Express a chrono duration as a fraction of one day.
pub fn duration_days(d: Duration) -> f64 {
    match d.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0 / SECONDS_PER_DAY,
        None => d.num_seconds() as f64 / SECONDS_PER_DAY,
    }
}

/// Output of one integration over a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeDayResult {
    /// Accumulated degree days, rounded to one decimal.
    pub value: f64,
    /// Unit-day label such as `°C·d`.
    pub unit_label: String,
    pub mode: Mode,
    pub base_temperature: BaseTemperature,
    pub window: Window,
    /// Duration-weighted mean temperature; `None` when nothing was integrated.
    pub mean_temperature: Option<f64>,
    /// Samples that took part in the integration (including the boundary neighbors).
    pub sample_count: usize,
    /// Share of the window actually covered by sample intervals.
    pub covered_fraction: f64,
}

impl DegreeDayResult {
    /// `false` for the "no data yet" result (fewer than two usable samples).
    pub fn has_data(&self) -> bool {
        self.mean_temperature.is_some()
    }
}

/// Which day an estimate targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetDay {
    Today,
    Tomorrow,
}

/// Actual + forecast estimate for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlendedEstimate {
    /// Combined degree days, rounded once to one decimal.
    pub value: f64,
    pub unit_label: String,
    pub mode: Mode,
    pub base_temperature: BaseTemperature,
    pub window: Window,
    /// `(now - start) / (end - start)`, clamped to `[0, 1]`.
    pub actual_fraction: f64,
    /// Share of `[start, now)` covered by observed samples (1 when nothing has elapsed).
    pub actual_coverage: f64,
    /// Share of the window integrated from forecast samples.
    pub forecast_fraction: f64,
    /// Observed or forecast data stopped short of its part of the window.
    pub partial: bool,
}

/// Where to fetch an hourly forecast from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Immutable settings for one computation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeDayConfig {
    pub base_temperature: f64,
    pub unit: TemperatureUnit,
    pub cooling_enabled: bool,
    pub include_weekly: bool,
    pub include_monthly: bool,
    /// Days of daily history kept before pruning.
    pub retention_days: u32,
    pub forecast_location: Option<ForecastLocation>,
}

impl DegreeDayConfig {
    pub const DEFAULT_RETENTION_DAYS: u32 = 60;
    /// Upper bound accepted for `retention_days` (about a century).
    pub const MAX_RETENTION_DAYS: u32 = 36_500;

    pub fn for_unit(unit: TemperatureUnit) -> Self {
        Self {
            base_temperature: unit.default_base(),
            unit,
            cooling_enabled: false,
            include_weekly: true,
            include_monthly: true,
            retention_days: Self::DEFAULT_RETENTION_DAYS,
            forecast_location: None,
        }
    }

    pub fn base(&self) -> BaseTemperature {
        BaseTemperature::new(self.base_temperature, self.unit)
    }

    /// Modes to compute: heating always, cooling when enabled.
    pub fn modes(&self) -> Vec<Mode> {
        if self.cooling_enabled {
            Mode::ALL.to_vec()
        } else {
            vec![Mode::Heating]
        }
    }
}

impl Default for DegreeDayConfig {
    fn default() -> Self {
        Self::for_unit(TemperatureUnit::Celsius)
    }
}
