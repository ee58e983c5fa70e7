//! Open-Meteo hourly forecast client.
//!
//! Requests `temperature_2m` in the configured unit with `timezone=UTC`, so the
//! returned `time` values are naive UTC timestamps (`YYYY-MM-DDTHH:MM`).

use std::time::Duration;

use chrono::NaiveDateTime;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{ForecastLocation, ForecastSample, TemperatureUnit};
use crate::error::AppError;

const BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
const FORECAST_DAYS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct OpenMeteoClient {
    client: Client,
    location: ForecastLocation,
}

impl OpenMeteoClient {
    pub fn new(location: ForecastLocation) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, location })
    }

    /// Fetch the hourly forecast, converted to [`ForecastSample`]s in `unit`.
    pub fn fetch_hourly(&self, unit: TemperatureUnit) -> Result<Vec<ForecastSample>, AppError> {
        let temperature_unit = match unit {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        };
        debug!(
            "Fetching hourly forecast for {:.4},{:.4}",
            self.location.latitude, self.location.longitude
        );

        let resp = self
            .client
            .get(BASE_URL)
            .query(&[
                ("latitude", self.location.latitude.to_string()),
                ("longitude", self.location.longitude.to_string()),
                ("hourly", "temperature_2m".to_string()),
                ("temperature_unit", temperature_unit.to_string()),
                ("timezone", "UTC".to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
            ])
            .send()
            .map_err(|e| AppError::new(4, format!("Forecast request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Forecast request failed with status {}.", resp.status()),
            ));
        }

        let body: ForecastResponse = resp
            .json()
            .map_err(|e| AppError::new(4, format!("Failed to parse forecast response: {e}")))?;

        let samples = hourly_to_samples(body.hourly)?;
        if samples.is_empty() {
            warn!("No hourly forecast data returned");
        } else {
            debug!("Retrieved {} hourly forecast entries", samples.len());
        }
        Ok(samples)
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
}

/// Parse a raw Open-Meteo response body.
pub fn parse_forecast_body(body: &str) -> Result<Vec<ForecastSample>, AppError> {
    let parsed: ForecastResponse = serde_json::from_str(body)
        .map_err(|e| AppError::new(4, format!("Failed to parse forecast response: {e}")))?;
    hourly_to_samples(parsed.hourly)
}

fn hourly_to_samples(block: HourlyBlock) -> Result<Vec<ForecastSample>, AppError> {
    if block.time.len() != block.temperature_2m.len() {
        return Err(AppError::new(
            4,
            format!(
                "Forecast response has {} times but {} temperatures.",
                block.time.len(),
                block.temperature_2m.len()
            ),
        ));
    }

    let mut out = Vec::with_capacity(block.time.len());
    for (raw, temperature) in block.time.iter().zip(block.temperature_2m) {
        let Some(temperature) = temperature.filter(|t| t.is_finite()) else {
            continue;
        };
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
            .map_err(|e| AppError::new(4, format!("Invalid forecast time '{raw}': {e}")))?;
        out.push(ForecastSample::new(naive.and_utc(), temperature));
    }
    Ok(out)
}
