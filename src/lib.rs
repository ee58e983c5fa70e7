//! `degree-days` library crate.
//!
//! Heating and cooling degree days from irregular temperature samples, plus
//! blended actual + forecast estimates for today and tomorrow.
//!
//! The binary (`dd`) is a thin wrapper around this library so the core
//! integration stays testable without spawning processes.

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod math;
pub mod period;
pub mod report;
