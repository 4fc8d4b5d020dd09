//! Coordinate types and scene normalisation.

pub mod coordinates;
pub mod scale;

pub use coordinates::{BodyName, Point3};
pub use scale::{compute_scale, rescale};
