//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - input series (`Sample`, `ForecastSample`) and the `Window` they are integrated over
//! - computation settings (`Mode`, `BaseTemperature`, `DegreeDayConfig`)
//! - outputs (`DegreeDayResult`, `BlendedEstimate`)

pub mod types;

pub use types::*;
