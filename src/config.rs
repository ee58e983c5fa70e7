//! Build a [`DegreeDayConfig`]: built-in defaults, then `DD_*` environment
//! variables (a `.env` file is honored), then CLI flags.

use crate::cli::ConfigArgs;
use crate::domain::{BaseTemperature, DegreeDayConfig, ForecastLocation, TemperatureUnit};
use crate::error::AppError;

pub const ENV_BASE_TEMPERATURE: &str = "DD_BASE_TEMPERATURE";
pub const ENV_UNIT: &str = "DD_UNIT";
pub const ENV_INCLUDE_COOLING: &str = "DD_INCLUDE_COOLING";
pub const ENV_INCLUDE_WEEKLY: &str = "DD_INCLUDE_WEEKLY";
pub const ENV_INCLUDE_MONTHLY: &str = "DD_INCLUDE_MONTHLY";
pub const ENV_RETENTION_DAYS: &str = "DD_RETENTION_DAYS";
pub const ENV_LATITUDE: &str = "DD_LATITUDE";
pub const ENV_LONGITUDE: &str = "DD_LONGITUDE";

/// Resolve the configuration from the process environment and `args`.
pub fn resolve_config(args: &ConfigArgs) -> Result<DegreeDayConfig, AppError> {
    dotenvy::dotenv().ok();
    resolve_with(args, |key| std::env::var(key).ok())
}

/// Same as [`resolve_config`] with an explicit variable lookup.
pub fn resolve_with<F>(args: &ConfigArgs, lookup: F) -> Result<DegreeDayConfig, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let unit = match (args.unit, env(ENV_UNIT)) {
        (Some(unit), _) => unit,
        (None, Some(raw)) => TemperatureUnit::parse(&raw)
            .ok_or_else(|| AppError::new(2, format!("{ENV_UNIT}: unknown unit '{raw}' (use c or f).")))?,
        (None, None) => TemperatureUnit::Celsius,
    };
    let mut config = DegreeDayConfig::for_unit(unit);

    if let Some(base) = args.base {
        config.base_temperature = base;
    } else if let Some(raw) = env(ENV_BASE_TEMPERATURE) {
        config.base_temperature = parse_number(ENV_BASE_TEMPERATURE, &raw)?;
    }
    BaseTemperature::new(config.base_temperature, unit).validate()?;

    config.cooling_enabled = args.cooling || env_flag(&env, ENV_INCLUDE_COOLING, false)?;
    config.include_weekly = !args.no_weekly && env_flag(&env, ENV_INCLUDE_WEEKLY, true)?;
    config.include_monthly = !args.no_monthly && env_flag(&env, ENV_INCLUDE_MONTHLY, true)?;

    if let Some(days) = args.retention_days {
        config.retention_days = days;
    } else if let Some(raw) = env(ENV_RETENTION_DAYS) {
        config.retention_days = raw
            .parse()
            .map_err(|_| AppError::new(2, format!("{ENV_RETENTION_DAYS}: expected a day count, got '{raw}'.")))?;
    }
    if !(1..=DegreeDayConfig::MAX_RETENTION_DAYS).contains(&config.retention_days) {
        return Err(AppError::new(
            2,
            format!(
                "Retention must be between 1 and {} days, got {}.",
                DegreeDayConfig::MAX_RETENTION_DAYS,
                config.retention_days
            ),
        ));
    }

    let latitude = match args.lat {
        Some(v) => Some(v),
        None => env(ENV_LATITUDE).map(|raw| parse_number(ENV_LATITUDE, &raw)).transpose()?,
    };
    let longitude = match args.lon {
        Some(v) => Some(v),
        None => env(ENV_LONGITUDE).map(|raw| parse_number(ENV_LONGITUDE, &raw)).transpose()?,
    };
    config.forecast_location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(location(latitude, longitude)?),
        (None, None) => None,
        _ => {
            return Err(AppError::new(
                2,
                "Forecast location needs both latitude and longitude (--lat/--lon or DD_LATITUDE/DD_LONGITUDE).",
            ));
        }
    };

    Ok(config)
}

fn location(latitude: f64, longitude: f64) -> Result<ForecastLocation, AppError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::new(
            2,
            format!("Forecast location out of range: lat={latitude}, lon={longitude}."),
        ));
    }
    Ok(ForecastLocation { latitude, longitude })
}

fn parse_number(key: &str, raw: &str) -> Result<f64, AppError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::new(2, format!("{key}: expected a number, got '{raw}'.")))
}

fn env_flag<F>(env: &F, key: &str, default: bool) -> Result<bool, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw)
            .ok_or_else(|| AppError::new(2, format!("{key}: expected true/false, got '{raw}'."))),
    }
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(args: &ConfigArgs, vars: &[(&str, &str)]) -> Result<DegreeDayConfig, AppError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        resolve_with(args, |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env_or_flags() {
        let config = resolve(&ConfigArgs::default(), &[]).unwrap();
        assert_eq!(config, DegreeDayConfig::default());
    }

    #[test]
    fn fahrenheit_unit_switches_default_base() {
        let config = resolve(&ConfigArgs::default(), &[(ENV_UNIT, "F")]).unwrap();
        assert_eq!(config.unit, TemperatureUnit::Fahrenheit);
        assert_eq!(config.base_temperature, 65.0);
    }

    #[test]
    fn flags_override_env() {
        let args = ConfigArgs {
            base: Some(15.5),
            no_monthly: true,
            lat: Some(52.5),
            ..ConfigArgs::default()
        };
        let config = resolve(
            &args,
            &[
                (ENV_BASE_TEMPERATURE, "17"),
                (ENV_INCLUDE_COOLING, "yes"),
                (ENV_INCLUDE_WEEKLY, "off"),
                (ENV_RETENTION_DAYS, "90"),
                (ENV_LATITUDE, "10"),
                (ENV_LONGITUDE, "13.4"),
            ],
        )
        .unwrap();
        assert_eq!(config.base_temperature, 15.5);
        assert!(config.cooling_enabled);
        assert!(!config.include_weekly);
        assert!(!config.include_monthly);
        assert_eq!(config.retention_days, 90);
        assert_eq!(
            config.forecast_location,
            Some(ForecastLocation {
                latitude: 52.5,
                longitude: 13.4
            })
        );
    }

    #[test]
    fn bad_values_are_config_errors() {
        let err = resolve(&ConfigArgs::default(), &[(ENV_BASE_TEMPERATURE, "warm")]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(resolve(&ConfigArgs::default(), &[(ENV_INCLUDE_COOLING, "maybe")]).is_err());
        assert!(resolve(&ConfigArgs::default(), &[(ENV_UNIT, "kelvin")]).is_err());
        assert!(resolve(&ConfigArgs::default(), &[(ENV_LATITUDE, "40.0")]).is_err());
        let args = ConfigArgs {
            lat: Some(100.0),
            lon: Some(0.0),
            ..ConfigArgs::default()
        };
        assert!(resolve(&args, &[]).is_err());
    }

    #[test]
    fn retention_out_of_range_is_rejected() {
        let args = ConfigArgs {
            retention_days: Some(u32::MAX),
            ..ConfigArgs::default()
        };
        assert_eq!(resolve(&args, &[]).unwrap_err().exit_code(), 2);
        assert!(resolve(&ConfigArgs::default(), &[(ENV_RETENTION_DAYS, "0")]).is_err());
        assert!(resolve(&ConfigArgs::default(), &[(ENV_RETENTION_DAYS, "36500")]).is_ok());
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = resolve(&ConfigArgs::default(), &[(ENV_BASE_TEMPERATURE, "  ")]).unwrap();
        assert_eq!(config.base_temperature, 18.0);
    }

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("y"), None);
    }
}
