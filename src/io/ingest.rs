//! CSV / JSON ingest and normalization.
//!
//! This module turns a sensor-history CSV and a forecast JSON document into clean,
//! sorted series:
//!
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Host states are not temperatures**: `unknown` / `unavailable` / non-numeric
//!   states are counted and dropped, not treated as errors

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{ForecastSample, Sample, TemperatureUnit};
use crate::error::AppError;

const TIMESTAMP_COLUMNS: [&str; 4] = ["timestamp", "last_updated", "time", "datetime"];
const VALUE_COLUMNS: [&str; 3] = ["temperature", "state", "value"];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: sorted, deduplicated samples plus what was skipped.
#[derive(Debug, Clone, Default)]
pub struct IngestedSamples {
    pub samples: Vec<Sample>,
    pub rows_read: usize,
    /// Rows whose state was `unknown`, `unavailable`, empty or non-numeric.
    pub invalid_states: usize,
    pub row_errors: Vec<RowError>,
}

pub fn load_samples_csv(path: &Path) -> Result<IngestedSamples, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let ingested = read_samples_csv(file)?;
    if ingested.samples.is_empty() {
        warn!(
            "No valid temperature readings found in {} after filtering",
            path.display()
        );
    }
    Ok(ingested)
}

pub fn read_samples_csv<R: Read>(reader: R) -> Result<IngestedSamples, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let ts_col = find_column(&header_map, &TIMESTAMP_COLUMNS).ok_or_else(|| {
        AppError::new(
            2,
            format!("CSV is missing a timestamp column (one of: {}).", TIMESTAMP_COLUMNS.join(", ")),
        )
    })?;
    let value_col = find_column(&header_map, &VALUE_COLUMNS).ok_or_else(|| {
        AppError::new(
            2,
            format!("CSV is missing a temperature column (one of: {}).", VALUE_COLUMNS.join(", ")),
        )
    })?;

    let mut out = IngestedSamples::default();
    let mut samples = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        out.rows_read += 1;

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                out.row_errors.push(RowError {
                    line,
                    message: format!("Unreadable row: {e}"),
                });
                continue;
            }
        };

        let raw_value = record.get(value_col).unwrap_or("");
        let Some(value) = parse_state(raw_value) else {
            out.invalid_states += 1;
            continue;
        };

        let raw_ts = record.get(ts_col).unwrap_or("");
        let Some(timestamp) = parse_timestamp(raw_ts) else {
            out.row_errors.push(RowError {
                line,
                message: format!("Invalid timestamp '{raw_ts}'"),
            });
            continue;
        };

        samples.push(Sample::new(timestamp, value));
    }

    if out.invalid_states > 0 {
        debug!(
            "Filtered out {} invalid states (unknown, unavailable, or non-numeric)",
            out.invalid_states
        );
    }
    if !out.row_errors.is_empty() {
        warn!("Skipped {} malformed CSV rows", out.row_errors.len());
    }

    out.samples = normalize_samples(samples);
    debug!("Retrieved {} valid temperature readings", out.samples.len());
    Ok(out)
}

/// Sort ascending by timestamp and keep the last value reported at each timestamp.
pub fn normalize_samples(mut samples: Vec<Sample>) -> Vec<Sample> {
    samples.retain(|s| s.value.is_finite());
    samples.sort_by_key(|s| s.timestamp);

    let mut out: Vec<Sample> = Vec::with_capacity(samples.len());
    for s in samples {
        match out.last_mut() {
            Some(prev) if prev.timestamp == s.timestamp => *prev = s,
            _ => out.push(s),
        }
    }
    out
}

/// RFC 3339, or a naive `YYYY-MM-DD[ T]HH:MM[:SS]` read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_state(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown") || trimmed.eq_ignore_ascii_case("unavailable") {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect()
}

fn find_column(header_map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| header_map.get(*name).copied())
}

/// One forecast entry as a weather provider reports it.
///
/// Providers may send `temperature`, `native_temperature`, or both; the plain key wins.
#[derive(Debug, Deserialize)]
struct RawForecastEntry {
    datetime: Option<String>,
    temperature: Option<f64>,
    native_temperature: Option<f64>,
    templow: Option<f64>,
    native_templow: Option<f64>,
}

/// Load an hourly forecast from JSON.
///
/// `source_unit` converts the values into `target_unit` when they differ.
pub fn load_forecast_json(
    path: &Path,
    source_unit: Option<TemperatureUnit>,
    target_unit: TemperatureUnit,
) -> Result<Vec<ForecastSample>, AppError> {
    let mut text = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut text))
        .map_err(|e| AppError::new(2, format!("Failed to read forecast '{}': {e}", path.display())))?;
    parse_forecast_json(&text, source_unit, target_unit)
}

/// Accepts a bare list of entries, `{"forecast": [...]}`, or
/// `{"weather.home": {"forecast": [...]}}`.
pub fn parse_forecast_json(
    text: &str,
    source_unit: Option<TemperatureUnit>,
    target_unit: TemperatureUnit,
) -> Result<Vec<ForecastSample>, AppError> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| AppError::new(2, format!("Invalid forecast JSON: {e}")))?;
    let list = find_forecast_list(root)
        .ok_or_else(|| AppError::new(2, "Forecast JSON has no list of forecast entries."))?;

    let entries: Vec<RawForecastEntry> = serde_json::from_value(list)
        .map_err(|e| AppError::new(2, format!("Invalid forecast entry: {e}")))?;

    let convert = |v: f64| match source_unit {
        Some(unit) => unit.convert(v, target_unit),
        None => v,
    };

    let total = entries.len();
    let mut out = Vec::with_capacity(total);
    for entry in entries {
        let temperature = entry.temperature.or(entry.native_temperature);
        let templow = entry.templow.or(entry.native_templow);
        let (Some(raw_ts), Some(temperature)) = (entry.datetime, temperature) else {
            continue;
        };
        let Some(timestamp) = parse_timestamp(&raw_ts) else {
            continue;
        };
        if !temperature.is_finite() {
            continue;
        }
        out.push(ForecastSample {
            timestamp,
            temperature: convert(temperature),
            templow: templow.map(convert),
        });
    }
    // Stable sort, then the last entry reported for a timestamp wins, as for samples.
    out.sort_by_key(|f| f.timestamp);
    let mut deduped: Vec<ForecastSample> = Vec::with_capacity(out.len());
    for f in out {
        match deduped.last_mut() {
            Some(prev) if prev.timestamp == f.timestamp => *prev = f,
            _ => deduped.push(f),
        }
    }

    if deduped.len() < total {
        debug!("Skipped {} incomplete or duplicate forecast entries", total - deduped.len());
    }
    Ok(deduped)
}

fn find_forecast_list(root: Value) -> Option<Value> {
    match root {
        Value::Array(_) => Some(root),
        Value::Object(mut map) => {
            if let Some(list @ Value::Array(_)) = map.remove("forecast") {
                return Some(list);
            }
            map.into_iter().find_map(|(_, v)| match v {
                Value::Object(_) => find_forecast_list(v),
                _ => None,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reads_host_history_export() {
        let csv = "entity_id,state,last_updated\n\
                   sensor.outdoor,10.5,2024-01-15T00:00:00+00:00\n\
                   sensor.outdoor,unavailable,2024-01-15T01:00:00+00:00\n\
                   sensor.outdoor,unknown,2024-01-15T02:00:00+00:00\n\
                   sensor.outdoor,11.0,2024-01-15 03:00:00\n\
                   sensor.outdoor,abc,2024-01-15T04:00:00Z\n\
                   sensor.outdoor,12.0,not-a-time\n";
        let ingested = read_samples_csv(csv.as_bytes()).unwrap();
        assert_eq!(ingested.rows_read, 6);
        assert_eq!(ingested.invalid_states, 3);
        assert_eq!(ingested.row_errors.len(), 1);
        assert_eq!(ingested.row_errors[0].line, 7);
        assert_eq!(ingested.samples.len(), 2);
        assert_eq!(
            ingested.samples[1].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 3, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_columns_are_schema_errors() {
        let err = read_samples_csv("when,temperature\n2024-01-15T00:00:00Z,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = read_samples_csv("timestamp,humidity\n2024-01-15T00:00:00Z,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn normalize_sorts_and_keeps_last_duplicate() {
        let t = |h| Utc.with_ymd_and_hms(2024, 1, 15, h, 0, 0).unwrap();
        let samples = vec![
            Sample::new(t(2), 3.0),
            Sample::new(t(1), 1.0),
            Sample::new(t(1), 2.0),
            Sample::new(t(0), f64::NAN),
        ];
        let out = normalize_samples(samples);
        assert_eq!(out, vec![Sample::new(t(1), 2.0), Sample::new(t(2), 3.0)]);
    }

    #[test]
    fn timestamps_accept_offsets_and_naive_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15T11:30:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 10:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:30:00.000"), Some(expected));
        assert_eq!(parse_timestamp("15/01/2024"), None);
    }

    #[test]
    fn forecast_shapes_and_conversion() {
        let nested = r#"{"weather.home": {"forecast": [
            {"datetime": "2024-01-15T01:00:00+00:00", "temperature": 50.0, "templow": 41.0},
            {"datetime": "2024-01-15T00:00:00+00:00", "native_temperature": 32.0},
            {"datetime": "2024-01-15T02:00:00+00:00"},
            {"temperature": 40.0}
        ]}}"#;
        let out = parse_forecast_json(
            nested,
            Some(TemperatureUnit::Fahrenheit),
            TemperatureUnit::Celsius,
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0].temperature.abs() < 1e-9);
        assert!((out[1].temperature - 10.0).abs() < 1e-9);
        assert!((out[1].templow.unwrap() - 5.0).abs() < 1e-9);

        let bare = r#"[{"datetime": "2024-01-15T00:00:00Z", "temperature": 3.0}]"#;
        let out = parse_forecast_json(bare, None, TemperatureUnit::Celsius).unwrap();
        assert_eq!(out[0].temperature, 3.0);

        assert!(parse_forecast_json(r#"{"state": "sunny"}"#, None, TemperatureUnit::Celsius).is_err());
    }

    #[test]
    fn forecast_prefers_plain_temperature_over_native() {
        let both = r#"[{"datetime": "2024-01-15T00:00:00Z", "temperature": 3.0, "native_temperature": 37.4,
                        "templow": 1.0, "native_templow": 33.8}]"#;
        let out = parse_forecast_json(both, None, TemperatureUnit::Celsius).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].temperature, 3.0);
        assert_eq!(out[0].templow, Some(1.0));
    }

    #[test]
    fn forecast_duplicate_timestamp_keeps_last() {
        let dup = r#"[
            {"datetime": "2024-01-15T01:00:00Z", "temperature": 5.0},
            {"datetime": "2024-01-15T00:00:00Z", "temperature": 1.0},
            {"datetime": "2024-01-15T00:00:00Z", "temperature": 2.0}
        ]"#;
        let out = parse_forecast_json(dup, None, TemperatureUnit::Celsius).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].temperature, 2.0);
        assert_eq!(out[1].temperature, 5.0);
    }
}
