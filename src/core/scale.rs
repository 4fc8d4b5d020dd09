//! Scene normalisation.
//!
//! One scale factor is shared by every body so the whole scene fits a bounded
//! render volume: `max(1, max |component|) / divisor` over all orbit points
//! and all current targets.

use crate::core::coordinates::Point3;
use crate::telemetry::types::{Orbits, Targets};

/// Largest absolute coordinate component, floored at 1.
///
/// Non-finite components are ignored so a single bad sample cannot poison
/// the scene scale.
pub fn max_abs_component<'a>(points: impl IntoIterator<Item = &'a Point3>) -> f64 {
    points
        .into_iter()
        .flat_map(|p| p.components())
        .filter(|c| c.is_finite())
        .map(f64::abs)
        .fold(1.0_f64, f64::max)
}

/// Scale factor for the current scene.
///
/// Always finite and at least `1 / divisor`. A divisor that is not a positive
/// finite number is treated as 1; configuration validation rejects those
/// before they get here.
pub fn compute_scale(orbits: &Orbits, targets: &Targets, divisor: f64) -> f64 {
    let divisor = if divisor.is_finite() && divisor > 0.0 {
        divisor
    } else {
        1.0
    };
    let points = orbits
        .values()
        .flatten()
        .chain(targets.positions.values());
    max_abs_component(points) / divisor
}

/// Map a raw point into render space.
pub fn rescale(point: Point3, scale: f64) -> Point3 {
    Point3::new(point.x / scale, point.y / scale, point.z / scale)
}
