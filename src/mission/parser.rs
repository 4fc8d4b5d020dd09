//! Mission report parsing.
//!
//! The report is a JSON object of `key -> { Value, Status, Time }` entries
//! whose values are often free text. Every extraction here fails softly:
//! a missing or malformed parameter only blanks its own readout.

use crate::config::{DisplayClock, MissionKeys};
use crate::error::{Result, TelemetryError};
use crate::mission::types::{
    BatteryReading, MissionParameter, MissionReadouts, MissionReport, ParameterValue, Readout,
    UNAVAILABLE,
};
use crate::telemetry::fetcher::parse_timestamp;
use chrono::FixedOffset;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

static BATTERY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Battery (\S+) ([0-9.]+) percent\.").expect("battery pattern compiles")
});

/// Parse a raw mission report body.
///
/// The top level must be a JSON object; entries that are not objects are
/// skipped rather than failing the whole report.
pub fn parse_report(body: &str) -> Result<MissionReport> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(obj) = value else {
        return Err(TelemetryError::malformed("mission report: expected json object"));
    };

    let mut report = MissionReport::default();
    for (key, entry) in obj.iter() {
        let Some(fields) = entry.as_object() else {
            debug!(key = %key, "mission report: skipping non-object entry");
            continue;
        };
        report.parameters.insert(key.clone(), parse_parameter(fields));
    }
    Ok(report)
}

fn parse_parameter(fields: &Map<String, Value>) -> MissionParameter {
    let value = match fields.get("Value") {
        None | Some(Value::Null) => ParameterValue::Missing,
        Some(Value::Number(num)) => num
            .as_f64()
            .map(ParameterValue::Number)
            .unwrap_or(ParameterValue::Missing),
        Some(Value::String(text)) => ParameterValue::Text(text.clone()),
        Some(other) => ParameterValue::Text(other.to_string()),
    };
    MissionParameter {
        value,
        status: field_text(fields, "Status").unwrap_or_default(),
        time: field_text(fields, "Time").unwrap_or_default(),
        date: field_text(fields, "Date"),
    }
}

fn field_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Coerce a parameter's value to a finite number.
pub fn numeric_value(report: &MissionReport, key: &str) -> Result<f64> {
    let param = report.lookup(key)?;
    let parsed = match &param.value {
        ParameterValue::Number(n) => Some(*n),
        ParameterValue::Text(text) => text.trim().parse::<f64>().ok(),
        ParameterValue::Missing => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| TelemetryError::NonNumericValue {
            key: key.to_string(),
            value: param.value.as_text(),
        })
}

pub fn numeric_readout(report: &MissionReport, key: &str) -> Readout {
    match numeric_value(report, key) {
        Ok(value) => Readout::Available(value),
        Err(err) => {
            debug!(key, error = %err, "readout unavailable");
            Readout::Unavailable
        }
    }
}

/// en-US number formatting: comma thousands separators, at most three
/// fraction digits (ties round away from zero), trailing zeros trimmed.
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return UNAVAILABLE.to_string();
    }
    let rounded = (value.abs() * 1000.0).round() / 1000.0;
    let fixed = format!("{rounded:.3}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if value < 0.0 && (int_part != "0" || !frac.is_empty()) {
        out.push('-');
    }
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a report time for display: parse, add the fixed shift, convert to
/// the fixed civil offset, e.g. `11/22/2022, 8:00:00 AM EST`.
pub fn format_report_time(
    raw: &str,
    shift: chrono::Duration,
    zone: FixedOffset,
    label: &str,
) -> Option<String> {
    let utc = parse_timestamp(raw)?;
    let local = (utc + shift).with_timezone(&zone);
    let formatted = local.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string();
    if label.is_empty() {
        Some(formatted)
    } else {
        Some(format!("{formatted} {label}"))
    }
}

/// Extract every `Battery <name> <percent> percent.` statement, in order.
pub fn parse_batteries(text: &str) -> Vec<BatteryReading> {
    BATTERY_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let percent = caps[2].parse::<f64>().ok().filter(|p| p.is_finite())?;
            Some(BatteryReading {
                name: caps[1].to_string(),
                percent,
            })
        })
        .collect()
}

/// Derive every readout from a report. Each one degrades independently.
pub fn derive_readouts(
    report: &MissionReport,
    keys: &MissionKeys,
    clock: &DisplayClock,
) -> MissionReadouts {
    let updated = match (report.lookup(&keys.file), clock.zone()) {
        (Ok(param), Some(zone)) => param
            .date
            .as_deref()
            .and_then(|raw| format_report_time(raw, clock.shift(), zone, &clock.zone_label)),
        (Err(err), _) => {
            debug!(error = %err, "report time unavailable");
            None
        }
        (Ok(_), None) => None,
    };

    let batteries = match report.lookup(&keys.battery) {
        Ok(param) => parse_batteries(&param.value.as_text()),
        Err(err) => {
            debug!(error = %err, "battery state unavailable");
            Vec::new()
        }
    };

    MissionReadouts {
        updated,
        velocity: numeric_readout(report, &keys.velocity),
        distance_to_moon: numeric_readout(report, &keys.distance_to_moon),
        distance_to_earth: numeric_readout(report, &keys.distance_to_earth),
        batteries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "File": {"Date": "2022-11-22 12:00:00", "Activity": "MIS", "Type": "3"},
        "Parameter_1": {"Value": "24568.1234", "Status": "Good", "Time": "2022:326:12:00:00.000"},
        "Parameter_2": {"Value": 42001.9, "Status": "Good", "Time": "2022:326:12:00:00.000"},
        "Parameter_3": {"Value": "  230117  ", "Status": "Good", "Time": "2022:326:12:00:00.000"},
        "Parameter_32": {
            "Value": "Battery A1 98.5 percent. Battery B2 10 percent.",
            "Status": "Good",
            "Time": "2022:326:12:00:00.000"
        },
        "Note": "free text at the top level"
    }"#;

    fn keys() -> MissionKeys {
        MissionKeys::default()
    }

    #[test]
    fn parses_parameters_and_skips_non_objects() {
        let report = parse_report(REPORT).unwrap();
        assert_eq!(report.parameters.len(), 5);
        let p1 = report.lookup("Parameter_1").unwrap();
        assert_eq!(p1.value, ParameterValue::Text("24568.1234".into()));
        assert_eq!(p1.status, "Good");
        assert_eq!(p1.time, "2022:326:12:00:00.000");
        assert_eq!(
            report.lookup("File").unwrap().date.as_deref(),
            Some("2022-11-22 12:00:00")
        );
        assert!(matches!(
            report.lookup("Note"),
            Err(TelemetryError::MissingParameter(_))
        ));
    }

    #[test]
    fn rejects_non_object_report() {
        assert!(matches!(
            parse_report(r#"["Parameter_1"]"#),
            Err(TelemetryError::MalformedPayload(_))
        ));
        assert!(parse_report("Battery A1 98.5 percent.").is_err());
    }

    #[test]
    fn battery_statements_in_order() {
        let batteries = parse_batteries("Battery A1 98.5 percent. Battery B2 10 percent.");
        assert_eq!(
            batteries,
            vec![
                BatteryReading {
                    name: "A1".into(),
                    percent: 98.5
                },
                BatteryReading {
                    name: "B2".into(),
                    percent: 10.0
                },
            ]
        );
    }

    #[test]
    fn battery_without_matches_is_empty() {
        assert!(parse_batteries("").is_empty());
        assert!(parse_batteries("All batteries nominal.").is_empty());
    }

    #[test]
    fn battery_malformed_statements_produce_nothing() {
        assert!(parse_batteries("Battery A1 98.5 percent").is_empty());
        assert!(parse_batteries("Battery A1 98.5percent.").is_empty());
        assert!(parse_batteries("Battery A1 full percent.").is_empty());
        // Digits and dots match the pattern but are not a number.
        assert!(parse_batteries("Battery A1 1.2.3 percent.").is_empty());

        let mixed = parse_batteries("Battery A1 50 percent Battery B2 75 percent.");
        assert_eq!(mixed.len(), 1);
        assert_eq!(mixed[0].name, "B2");
    }

    #[test]
    fn grouped_formatting() {
        assert_eq!(format_grouped(0.0), "0");
        assert_eq!(format_grouped(999.0), "999");
        assert_eq!(format_grouped(1000.0), "1,000");
        assert_eq!(format_grouped(24568.1234), "24,568.123");
        assert_eq!(format_grouped(1234567.5), "1,234,567.5");
        assert_eq!(format_grouped(-9876543.21), "-9,876,543.21");
        assert_eq!(format_grouped(-0.0001), "0");
        assert_eq!(format_grouped(f64::NAN), UNAVAILABLE);
        assert_eq!(format_grouped(1.0625), "1.063");
        assert_eq!(format_grouped(-1.0625), "-1.063");
    }

    #[test]
    fn numeric_coercion() {
        let report = parse_report(
            r#"{
                "n": {"Value": 12.5, "Status": "", "Time": ""},
                "s": {"Value": " 7e3 ", "Status": "", "Time": ""},
                "text": {"Value": "1,234", "Status": "", "Time": ""},
                "empty": {"Value": "", "Status": "", "Time": ""},
                "nan": {"Value": "NaN", "Status": "", "Time": ""},
                "none": {"Status": "", "Time": ""}
            }"#,
        )
        .unwrap();
        assert_eq!(numeric_value(&report, "n").unwrap(), 12.5);
        assert_eq!(numeric_value(&report, "s").unwrap(), 7000.0);
        for key in ["text", "empty", "nan", "none"] {
            assert!(matches!(
                numeric_value(&report, key),
                Err(TelemetryError::NonNumericValue { .. })
            ));
        }
        assert!(matches!(
            numeric_value(&report, "absent"),
            Err(TelemetryError::MissingParameter(_))
        ));
    }

    #[test]
    fn report_time_adds_fixed_hour_before_zone() {
        let est = FixedOffset::west_opt(5 * 3600).unwrap();
        let shown = format_report_time(
            "2022-11-22 12:00:00",
            chrono::Duration::hours(1),
            est,
            "EST",
        );
        // 12:00 UTC + 1h = 13:00 UTC = 08:00 at UTC-5.
        assert_eq!(shown.as_deref(), Some("11/22/2022, 8:00:00 AM EST"));

        let utc = FixedOffset::east_opt(0).unwrap();
        let shown = format_report_time("2022-11-22T23:30:05Z", chrono::Duration::hours(1), utc, "");
        assert_eq!(shown.as_deref(), Some("11/23/2022, 12:30:05 AM"));

        assert!(format_report_time("not a date", chrono::Duration::hours(1), utc, "").is_none());
    }

    #[test]
    fn full_readouts() {
        let report = parse_report(REPORT).unwrap();
        let readouts = derive_readouts(&report, &keys(), &DisplayClock::default());
        assert_eq!(readouts.updated.as_deref(), Some("11/22/2022, 8:00:00 AM EST"));
        assert_eq!(readouts.velocity.to_string(), "24,568.123");
        assert_eq!(readouts.distance_to_moon.to_string(), "42,001.9");
        assert_eq!(readouts.distance_to_earth.to_string(), "230,117");
        assert_eq!(readouts.batteries.len(), 2);
    }

    #[test]
    fn slash_dated_report_time() {
        let report = parse_report(
            r#"{"File": {"Date": "2022/11/22 12:00:00", "Activity": "MIS", "Type": 3}}"#,
        )
        .unwrap();
        let readouts = derive_readouts(&report, &keys(), &DisplayClock::default());
        assert_eq!(readouts.updated.as_deref(), Some("11/22/2022, 8:00:00 AM EST"));
    }

    #[test]
    fn missing_velocity_only_blanks_velocity() {
        let mut report = parse_report(REPORT).unwrap();
        report.parameters.remove("Parameter_1");
        let readouts = derive_readouts(&report, &keys(), &DisplayClock::default());
        assert_eq!(readouts.velocity, Readout::Unavailable);
        assert_eq!(readouts.velocity.to_string(), UNAVAILABLE);
        assert_eq!(readouts.distance_to_moon, Readout::Available(42001.9));
        assert_eq!(readouts.distance_to_earth, Readout::Available(230117.0));
        assert_eq!(readouts.batteries.len(), 2);
        assert!(readouts.updated.is_some());
    }

    #[test]
    fn empty_report_yields_all_unavailable() {
        let report = parse_report("{}").unwrap();
        let readouts = derive_readouts(&report, &keys(), &DisplayClock::default());
        assert_eq!(readouts, MissionReadouts::default());
    }
}
