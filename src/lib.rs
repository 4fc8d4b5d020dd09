//! Live telemetry tracker for the Artemis mission.
//!
//! Polls body positions, orbit paths and the free-text mission report,
//! normalises coordinates into one shared scale, and keeps a coherent
//! [`scene::SceneSnapshot`] for renderers.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod mission;
pub mod scene;
pub mod telemetry;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use config::TrackerConfig;
pub use error::{Result, TelemetryError};
pub use scene::{SceneHandle, SceneSnapshot, SceneState};
pub use telemetry::{HttpSource, PollerHandle, TelemetryPoller};
