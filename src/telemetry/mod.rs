//! Telemetry ingestion: positions and orbit-path payloads, the injectable
//! fetch capability, and the poller driving all three sources.

pub mod backoff;
pub mod fetcher;
pub mod poller;
pub mod types;

pub use fetcher::{FetchSource, HttpSource, parse_orbits, parse_positions};
pub use poller::{PollerHandle, TelemetryPoller};
pub use types::{FeedHealth, Orbits, Targets, TelemetryFeed};
