//! Error types.
//!
//! Two layers:
//!
//! - `DegreeDayError` is what the pure computation core reports. It only covers
//!   caller mistakes and the "forecast unavailable" signal; too few samples is a
//!   legitimate zero result, not an error.
//! - `AppError` is what the `dd` binary reports: a message plus a process exit code.

use chrono::{DateTime, Utc};

use crate::domain::Window;

/// Errors raised by the integrator, blender and window helpers.
#[derive(Debug, Clone, PartialEq)]
pub enum DegreeDayError {
    /// A window with `start >= end`.
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Forecast data is required for part of the window but none is usable.
    ForecastUnavailable { window: Window, reason: String },
    /// Base temperature is NaN or infinite.
    InvalidBaseTemperature(f64),
}

impl std::fmt::Display for DegreeDayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegreeDayError::InvalidWindow { start, end } => write!(
                f,
                "Invalid window: start {} must be before end {}.",
                start.to_rfc3339(),
                end.to_rfc3339()
            ),
            DegreeDayError::ForecastUnavailable { window, reason } => write!(
                f,
                "Forecast unavailable for {}: {reason}",
                window
            ),
            DegreeDayError::InvalidBaseTemperature(value) => {
                write!(f, "Invalid base temperature: {value} (must be finite).")
            }
        }
    }
}

impl std::error::Error for DegreeDayError {}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<DegreeDayError> for AppError {
    fn from(err: DegreeDayError) -> Self {
        let exit_code = match err {
            DegreeDayError::InvalidWindow { .. } | DegreeDayError::InvalidBaseTemperature(_) => 2,
            DegreeDayError::ForecastUnavailable { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}
