//! Mission report ingestion
//!
//! Parses the free-text/JSON mission report into named parameters and derives
//! the human-facing readouts (velocity, distances, report time, batteries).

pub mod parser;
pub mod types;

pub use parser::{derive_readouts, parse_batteries, parse_report};
pub use types::{
    BatteryReading, MissionParameter, MissionReadouts, MissionReport, ParameterValue, Readout,
};
