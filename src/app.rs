//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - resolves configuration (defaults, env, flags)
//! - loads samples, forecasts and history
//! - runs the integration / blending / update pipeline
//! - prints text or JSON and saves the history

use chrono::{DateTime, Local, Utc};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{BackfillArgs, Cli, Command, ComputeArgs, EstimateArgs, ForecastArgs, UpdateArgs};
use crate::config::resolve_config;
use crate::domain::{DegreeDayConfig, ForecastSample, Window};
use crate::error::AppError;
use crate::forecast::{OpenMeteoClient, blend_estimate};
use crate::io::{IngestedSamples, load_forecast_json, load_history, load_samples_csv, parse_timestamp, save_history};
use crate::math::integrate;
use crate::report;

pub mod pipeline;

use pipeline::ForecastInput;

/// Entry point for the `dd` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Compute(args) => handle_compute(args),
        Command::Estimate(args) => handle_estimate(args),
        Command::Update(args) => handle_update(args),
        Command::Backfill(args) => handle_backfill(args),
    }
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Already installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_compute(args: ComputeArgs) -> Result<(), AppError> {
    let config = resolve_config(&args.config)?;
    let now = resolve_now(args.config.now.as_deref())?;
    let ingest = read_samples(&args.samples)?;

    let window = match args.period.period() {
        Some(period) => period.window(&now)?,
        None => Window::new(
            parse_instant("--start", args.start.as_deref())?,
            parse_instant("--end", args.end.as_deref())?,
        )?,
    };

    let results = args
        .mode
        .modes()
        .into_iter()
        .map(|mode| integrate(&ingest.samples, window, mode, config.base()))
        .collect::<Result<Vec<_>, _>>()?;

    if args.json {
        println!("{}", report::to_json(&results)?);
    } else {
        print!("{}", report::format_ingest_summary(&ingest));
        print!("{}", report::format_results(&results));
    }
    Ok(())
}

fn handle_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let config = resolve_config(&args.config)?;
    let now = resolve_now(args.config.now.as_deref())?;
    let samples = match &args.samples {
        Some(path) => read_samples(path)?.samples,
        None => Vec::new(),
    };
    let forecast = load_forecast(&args.forecast, &config)
        .ok_or_else(|| AppError::new(2, "estimate needs --forecast FILE or --fetch."))??;

    let estimates = args
        .mode
        .modes()
        .into_iter()
        .map(|mode| blend_estimate(&samples, &forecast, mode, config.base(), args.day, &now))
        .collect::<Result<Vec<_>, _>>()?;

    if args.json {
        println!("{}", report::to_json(&estimates)?);
    } else {
        print!("{}", report::format_estimates(&estimates));
    }
    Ok(())
}

fn handle_update(args: UpdateArgs) -> Result<(), AppError> {
    let config = resolve_config(&args.config)?;
    let now = resolve_now(args.config.now.as_deref())?;
    let ingest = read_samples(&args.samples)?;
    let mut history = load_history(&args.history);

    // A failing forecast source degrades the estimate sensors, not the update.
    let forecast: Option<Result<Vec<ForecastSample>, String>> = load_forecast(&args.forecast, &config).map(|r| {
        r.map_err(|e| {
            warn!("Forecast unavailable: {e}");
            e.to_string()
        })
    });
    let input = match &forecast {
        None => ForecastInput::NotConfigured,
        Some(Ok(samples)) => ForecastInput::Available(samples),
        Some(Err(reason)) => ForecastInput::Unavailable(reason),
    };

    let output = pipeline::run_update(&config, &mut history, &ingest.samples, input, &now)?;
    if output.history_changed {
        save_history(&args.history, &history)?;
    }

    if args.json {
        println!("{}", report::to_json(&output.snapshot)?);
    } else {
        print!("{}", report::format_snapshot(&output.snapshot));
    }
    Ok(())
}

fn handle_backfill(args: BackfillArgs) -> Result<(), AppError> {
    let config = resolve_config(&args.config)?;
    let now = resolve_now(args.config.now.as_deref())?;
    let ingest = read_samples(&args.samples)?;
    let mut history = load_history(&args.history);

    let summary = pipeline::backfill(&config, &mut history, &ingest.samples, &Local, now.date_naive())?;
    if summary.days_recorded > 0 {
        save_history(&args.history, &history)?;
        info!("Saved history with {} new days", summary.days_recorded);
    }

    if args.json {
        println!("{}", report::to_json(&summary)?);
    } else {
        print!("{}", report::format_backfill(&summary));
    }
    Ok(())
}

fn read_samples(path: &std::path::Path) -> Result<IngestedSamples, AppError> {
    let ingest = load_samples_csv(path)?;
    debug!(
        "Read {} samples from {} rows ({} invalid states, {} bad rows)",
        ingest.samples.len(),
        ingest.rows_read,
        ingest.invalid_states,
        ingest.row_errors.len()
    );
    for row in ingest.row_errors.iter().take(5) {
        warn!("{}: line {}: {}", path.display(), row.line, row.message);
    }
    Ok(ingest)
}

/// `None` when no forecast source was requested.
fn load_forecast(args: &ForecastArgs, config: &DegreeDayConfig) -> Option<Result<Vec<ForecastSample>, AppError>> {
    if let Some(path) = &args.forecast {
        return Some(load_forecast_json(path, args.forecast_unit, config.unit));
    }
    if !args.fetch {
        return None;
    }
    let fetched = config
        .forecast_location
        .ok_or_else(|| AppError::new(2, "--fetch needs --lat/--lon or DD_LATITUDE/DD_LONGITUDE."))
        .and_then(OpenMeteoClient::new)
        .and_then(|client| client.fetch_hourly(config.unit));
    Some(fetched)
}

/// `--now` in the local time zone, or the current time.
fn resolve_now(raw: Option<&str>) -> Result<DateTime<Local>, AppError> {
    match raw {
        None => Ok(Local::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Local))
            .map_err(|e| AppError::new(2, format!("Invalid --now '{raw}': {e}"))),
    }
}

fn parse_instant(flag: &str, raw: Option<&str>) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.ok_or_else(|| AppError::new(2, format!("{flag} is required for --period custom.")))?;
    parse_timestamp(raw).ok_or_else(|| AppError::new(2, format!("Invalid {flag} '{raw}' (expected RFC 3339).")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_override_keeps_the_instant() {
        let now = resolve_now(Some("2024-01-15T12:00:00Z")).unwrap();
        assert_eq!(now.with_timezone(&Utc).to_rfc3339(), "2024-01-15T12:00:00+00:00");
        assert_eq!(resolve_now(Some("yesterday")).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn custom_bounds_must_parse() {
        assert!(parse_instant("--start", Some("2024-01-15T00:00:00Z")).is_ok());
        assert!(parse_instant("--start", None).is_err());
        assert!(parse_instant("--end", Some("soon")).is_err());
    }

    #[test]
    fn no_forecast_source_is_none() {
        let config = DegreeDayConfig::default();
        assert!(load_forecast(&ForecastArgs::default(), &config).is_none());

        let fetch_without_location = ForecastArgs {
            fetch: true,
            ..ForecastArgs::default()
        };
        let err = load_forecast(&fetch_without_location, &config).unwrap().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
