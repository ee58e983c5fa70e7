//! Input/output helpers.
//!
//! - sensor-history CSV and forecast JSON ingest (`ingest`)
//! - daily history JSON read/write (`history`)

pub mod history;
pub mod ingest;

pub use history::*;
pub use ingest::*;
