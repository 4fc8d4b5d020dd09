//! Telemetry data types shared by the fetcher, poller and scene state.

use crate::core::coordinates::{BodyName, Point3};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Historical path per body, oldest point first.
pub type Orbits = BTreeMap<BodyName, Vec<Point3>>;

/// Current body positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Targets {
    pub positions: BTreeMap<BodyName, Point3>,
    /// Time of the snapshot, from the payload when it carries one.
    pub updated_utc: Option<DateTime<Utc>>,
}

impl Targets {
    /// Merge a newer snapshot into this one.
    ///
    /// Bodies present in `update` replace their entries; bodies it omits keep
    /// their previous position. Entries are never removed.
    pub fn merge(&mut self, update: Targets) {
        self.positions.extend(update.positions);
        if update.updated_utc.is_some() {
            self.updated_utc = update.updated_utc;
        }
    }

    pub fn get(&self, body: &str) -> Option<Point3> {
        self.positions.get(body).copied()
    }
}

/// The three independently polled sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryFeed {
    Positions,
    Orbits,
    Mission,
}

impl TelemetryFeed {
    pub const ALL: [TelemetryFeed; 3] = [Self::Positions, Self::Orbits, Self::Mission];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Positions => "positions",
            Self::Orbits => "orbits",
            Self::Mission => "mission",
        }
    }
}

impl fmt::Display for TelemetryFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-feed health, surfaced alongside the data for observability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedHealth {
    pub last_success_utc: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    /// Sequence number of the last applied response.
    pub applied_seq: Option<u64>,
}
