//! Scene state shared between the poller (writer) and renderers (readers).

pub mod snapshot;
pub mod state;

pub use snapshot::SceneSnapshot;
pub use state::{SceneHandle, SceneState};
