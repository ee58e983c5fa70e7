//! Numerical core: degree-day integration over irregular series.

pub mod integrate;

pub use integrate::*;
