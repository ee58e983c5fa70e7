//! Formatted terminal output.
//!
//! Formatting stays in one place so the integration code stays clean and
//! output changes are localized.

use crate::app::pipeline::{BackfillSummary, SensorSnapshot, SensorState};
use crate::domain::{BlendedEstimate, DegreeDayResult};
use crate::io::IngestedSamples;

/// Summary of an ingested sample file.
pub fn format_ingest_summary(ingest: &IngestedSamples) -> String {
    let mut out = format!(
        "Samples: n={} | rows={} | skipped states={} | bad rows={}\n",
        ingest.samples.len(),
        ingest.rows_read,
        ingest.invalid_states,
        ingest.row_errors.len()
    );
    if let (Some(first), Some(last)) = (ingest.samples.first(), ingest.samples.last()) {
        out.push_str(&format!(
            "Span: {} .. {}\n",
            first.timestamp.to_rfc3339(),
            last.timestamp.to_rfc3339()
        ));
    }
    out
}

/// One block per integration result.
pub fn format_results(results: &[DegreeDayResult]) -> String {
    let mut out = String::new();
    for r in results {
        out.push_str(&format!(
            "{} {} {} (base {}{})\n",
            r.mode.display_name(),
            fmt_value(Some(r.value)),
            r.unit_label,
            r.base_temperature.value,
            r.base_temperature.unit.symbol()
        ));
        out.push_str(&format!("  window : {}\n", r.window));
        match r.mean_temperature {
            Some(mean) => out.push_str(&format!(
                "  mean   : {mean:.1}{} from {} samples, {:.0}% covered\n",
                r.base_temperature.unit.symbol(),
                r.sample_count,
                r.covered_fraction * 100.0
            )),
            None => out.push_str("  mean   : no data\n"),
        }
    }
    out
}

pub fn format_estimates(estimates: &[BlendedEstimate]) -> String {
    let mut out = String::new();
    for e in estimates {
        out.push_str(&format!(
            "{} estimate {} {}{}\n",
            e.mode.display_name(),
            fmt_value(Some(e.value)),
            e.unit_label,
            if e.partial { " (partial data)" } else { "" }
        ));
        out.push_str(&format!("  window : {}\n", e.window));
        out.push_str(&format!(
            "  actual : {:.0}% ({:.0}% observed) | forecast: {:.0}%\n",
            e.actual_fraction * 100.0,
            e.actual_coverage * 100.0,
            e.forecast_fraction * 100.0
        ));
    }
    out
}

/// Sensor table, one row per sensor.
pub fn format_snapshot(snapshot: &SensorSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== dd - degree days @ {} ===\n", snapshot.generated_at.to_rfc3339()));
    out.push_str(format!("{:<24} {:>10} {:<6} {:<26} {:>6}\n", "sensor", "value", "unit", "dates", "mean").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<24} {:->10} {:-<6} {:-<26} {:->6}\n", "", "", "", "", "").trim_end());
    out.push('\n');
    for s in &snapshot.sensors {
        out.push_str(format_row(s).trim_end());
        out.push('\n');
    }
    out
}

fn format_row(s: &SensorState) -> String {
    let mean = s
        .attributes
        .mean_temperature
        .map(|m| format!("{m:.1}"))
        .unwrap_or_default();
    let mut row = format!(
        "{:<24} {:>10} {:<6} {:<26} {:>6}",
        s.key,
        fmt_value(s.value),
        s.unit_label,
        s.attributes.date_range.as_deref().unwrap_or(""),
        mean
    );
    if let Some(reason) = &s.attributes.unavailable_reason {
        row.push_str(&format!("  ({reason})"));
    }
    row
}

pub fn format_backfill(summary: &BackfillSummary) -> String {
    match (summary.first, summary.last) {
        (Some(first), Some(last)) => format!(
            "Backfilled {} days ({first} .. {last}), {} days without data\n",
            summary.days_recorded, summary.days_without_data
        ),
        _ => format!(
            "No complete days to backfill ({} days without data)\n",
            summary.days_without_data
        ),
    }
}

fn fmt_value(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.1}"),
        None => "unavailable".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{SensorAttributes, SensorKind};
    use crate::domain::{BaseTemperature, Mode, Window};
    use chrono::{TimeZone, Utc};

    fn window() -> Window {
        Window::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn results_show_value_and_missing_mean() {
        let result = DegreeDayResult {
            value: 6.5,
            unit_label: "°C·d".to_string(),
            mode: Mode::Heating,
            base_temperature: BaseTemperature::celsius(18.0),
            window: window(),
            mean_temperature: None,
            sample_count: 0,
            covered_fraction: 0.0,
        };
        let text = format_results(&[result]);
        assert!(text.starts_with("HDD 6.5 °C·d (base 18°C)"));
        assert!(text.contains("no data"));
    }

    #[test]
    fn snapshot_marks_unavailable_sensors() {
        let snapshot = SensorSnapshot {
            generated_at: Utc.with_ymd_and_hms(2024, 1, 16, 12, 0, 0).unwrap(),
            sensors: vec![
                SensorState {
                    key: "hdd_daily".to_string(),
                    mode: Mode::Heating,
                    kind: SensorKind::Daily,
                    value: Some(6.5),
                    unit_label: "°C·d".to_string(),
                    attributes: SensorAttributes {
                        base_temperature: 18.0,
                        date_range: Some("2024-01-15".to_string()),
                        mean_temperature: Some(11.5),
                        ..SensorAttributes::default()
                    },
                },
                SensorState {
                    key: "hdd_estimated_tomorrow".to_string(),
                    mode: Mode::Heating,
                    kind: SensorKind::EstimatedTomorrow,
                    value: None,
                    unit_label: "°C·d".to_string(),
                    attributes: SensorAttributes {
                        base_temperature: 18.0,
                        unavailable_reason: Some("no forecast samples".to_string()),
                        ..SensorAttributes::default()
                    },
                },
            ],
        };
        let text = format_snapshot(&snapshot);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[3].starts_with("hdd_daily"));
        assert!(lines[3].contains("6.5"));
        assert!(lines[3].ends_with("11.5"));
        assert!(lines[4].contains("unavailable"));
        assert!(lines[4].ends_with("(no forecast samples)"));
    }

    #[test]
    fn backfill_summary_text() {
        let empty = BackfillSummary::default();
        assert!(format_backfill(&empty).starts_with("No complete days"));
    }
}
