//! Mission report data types.

use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel shown for readouts that cannot be derived.
pub const UNAVAILABLE: &str = "unavailable";

/// Raw `Value` field of a mission parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
    Missing,
}

impl ParameterValue {
    /// Text form, as it would be fed to the free-text extractors.
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Missing => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionParameter {
    pub value: ParameterValue,
    pub status: String,
    pub time: String,
    /// `Date` field, carried by header entries such as the report's `File`.
    pub date: Option<String>,
}

/// A parsed mission report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissionReport {
    pub parameters: BTreeMap<String, MissionParameter>,
}

impl MissionReport {
    /// Look up a named parameter. Absence is an error for this key only.
    pub fn lookup(&self, key: &str) -> Result<&MissionParameter> {
        self.parameters
            .get(key)
            .ok_or_else(|| TelemetryError::MissingParameter(key.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub name: String,
    pub percent: f64,
}

/// A numeric readout, or the "unavailable" sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Readout {
    Available(f64),
    #[default]
    Unavailable,
}

impl Readout {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Available(v) => Some(*v),
            Self::Unavailable => None,
        }
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(v) => f.write_str(&crate::mission::parser::format_grouped(*v)),
            Self::Unavailable => f.write_str(UNAVAILABLE),
        }
    }
}

/// Human-facing values derived from the latest mission report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissionReadouts {
    /// Report time, shifted and formatted for display.
    pub updated: Option<String>,
    /// mph
    pub velocity: Readout,
    /// miles
    pub distance_to_moon: Readout,
    /// miles
    pub distance_to_earth: Readout,
    pub batteries: Vec<BatteryReading>,
}

impl MissionReadouts {
    pub fn updated_display(&self) -> &str {
        self.updated.as_deref().unwrap_or(UNAVAILABLE)
    }
}
