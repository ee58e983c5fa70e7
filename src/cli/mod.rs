//! Command-line parsing for the degree-day calculator.
//!
//! Argument parsing and command dispatch stay separate from the integration code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{Mode, TargetDay, TemperatureUnit};
use crate::period::Period;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dd", version, about = "Heating/cooling degree days from temperature history")]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Integrate degree days over a period from a sample CSV.
    Compute(ComputeArgs),
    /// Blend observed samples with a forecast for today or tomorrow.
    Estimate(EstimateArgs),
    /// Refresh every sensor: record yesterday, totals, estimates.
    Update(UpdateArgs),
    /// Fill the history with every complete day in a sample CSV.
    Backfill(BackfillArgs),
}

/// Which modes to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeSelection {
    Heating,
    Cooling,
    Both,
}

impl ModeSelection {
    pub fn modes(self) -> Vec<Mode> {
        match self {
            ModeSelection::Heating => vec![Mode::Heating],
            ModeSelection::Cooling => vec![Mode::Cooling],
            ModeSelection::Both => Mode::ALL.to_vec(),
        }
    }
}

/// `compute --period` choices; `custom` needs `--start` and `--end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Yesterday,
    Today,
    Week,
    Month,
    Custom,
}

impl PeriodArg {
    pub fn period(self) -> Option<Period> {
        match self {
            PeriodArg::Yesterday => Some(Period::Yesterday),
            PeriodArg::Today => Some(Period::Today),
            PeriodArg::Week => Some(Period::Week),
            PeriodArg::Month => Some(Period::Month),
            PeriodArg::Custom => None,
        }
    }
}

/// Settings shared by every command. Unset flags fall back to `DD_*` env vars.
#[derive(Debug, Args, Clone, Default)]
pub struct ConfigArgs {
    /// Base temperature (default 18 °C / 65 °F).
    #[arg(long)]
    pub base: Option<f64>,

    /// Temperature unit of samples and base.
    #[arg(long, value_enum)]
    pub unit: Option<TemperatureUnit>,

    /// Reference time (RFC 3339); defaults to the current time.
    #[arg(long, value_name = "RFC3339")]
    pub now: Option<String>,

    /// Also compute cooling degree days.
    #[arg(long)]
    pub cooling: bool,

    /// Skip the weekly total.
    #[arg(long)]
    pub no_weekly: bool,

    /// Skip the monthly total.
    #[arg(long)]
    pub no_monthly: bool,

    /// Days of daily history to keep.
    #[arg(long)]
    pub retention_days: Option<u32>,

    /// Forecast latitude (for `--fetch`).
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Forecast longitude (for `--fetch`).
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

/// Where forecast data comes from.
#[derive(Debug, Args, Clone, Default)]
pub struct ForecastArgs {
    /// Hourly forecast JSON file.
    #[arg(long, value_name = "JSON", conflicts_with = "fetch")]
    pub forecast: Option<PathBuf>,

    /// Fetch an hourly forecast from Open-Meteo (needs --lat/--lon or DD_LATITUDE/DD_LONGITUDE).
    #[arg(long)]
    pub fetch: bool,

    /// Unit of temperatures in the forecast file, if different from --unit.
    #[arg(long, value_enum)]
    pub forecast_unit: Option<TemperatureUnit>,
}

#[derive(Debug, Parser, Clone)]
pub struct ComputeArgs {
    /// Sensor history CSV.
    #[arg(long, value_name = "CSV")]
    pub samples: PathBuf,

    #[arg(long, value_enum, default_value_t = PeriodArg::Yesterday)]
    pub period: PeriodArg,

    /// Window start for `--period custom` (RFC 3339).
    #[arg(long, required_if_eq("period", "custom"))]
    pub start: Option<String>,

    /// Window end for `--period custom` (RFC 3339).
    #[arg(long, required_if_eq("period", "custom"))]
    pub end: Option<String>,

    #[arg(long, value_enum, default_value_t = ModeSelection::Heating)]
    pub mode: ModeSelection,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct EstimateArgs {
    /// Sensor history CSV (observed part of today).
    #[arg(long, value_name = "CSV")]
    pub samples: Option<PathBuf>,

    #[command(flatten)]
    pub forecast: ForecastArgs,

    #[arg(long, value_enum, default_value_t = TargetDay::Today)]
    pub day: TargetDay,

    #[arg(long, value_enum, default_value_t = ModeSelection::Heating)]
    pub mode: ModeSelection,

    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct UpdateArgs {
    #[arg(long, value_name = "CSV")]
    pub samples: PathBuf,

    /// Daily history JSON (created if missing).
    #[arg(long, value_name = "JSON")]
    pub history: PathBuf,

    #[command(flatten)]
    pub forecast: ForecastArgs,

    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct BackfillArgs {
    #[arg(long, value_name = "CSV")]
    pub samples: PathBuf,

    #[arg(long, value_name = "JSON")]
    pub history: PathBuf,

    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}
