//! Forecast handling: blending observed data with an hourly forecast, and fetching one.

pub mod blend;
pub mod open_meteo;

pub use blend::*;
pub use open_meteo::OpenMeteoClient;
