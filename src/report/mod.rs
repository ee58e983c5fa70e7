//! Reporting: terminal text (`format`) and `--json` output.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::error::AppError;

/// Pretty JSON for `--json` output.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::new(4, format!("Failed to serialize output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{SensorAttributes, SensorKind, SensorState};
    use crate::domain::Mode;

    #[test]
    fn unavailable_sensor_serializes_as_null() {
        let state = SensorState {
            key: "cdd_estimated_today".to_string(),
            mode: Mode::Cooling,
            kind: SensorKind::EstimatedToday,
            value: None,
            unit_label: "°F·d".to_string(),
            attributes: SensorAttributes {
                base_temperature: 65.0,
                ..SensorAttributes::default()
            },
        };
        let json = to_json(&state).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["value"].is_null());
        assert_eq!(parsed["kind"], "estimated_today");
        assert_eq!(parsed["attributes"]["base_temperature"], 65.0);
        assert!(parsed["attributes"].get("mean_temperature").is_none());
    }
}
