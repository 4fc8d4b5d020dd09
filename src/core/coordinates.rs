//! Raw telemetry coordinates.
//!
//! Points stay in the units the telemetry API reports (kilometres from the
//! Earth-Moon barycenter). Nothing here is scaled; see [`crate::core::scale`].

use serde_json::Value;

/// Kilometres to statute miles.
pub const KM_TO_MI: f64 = 0.621371;

/// Body identifier as it appears in payloads (`artemis`, `moon`, ...).
///
/// Kept as a plain string key so new bodies need no code changes.
pub type BodyName = String;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ZERO: Point3 = Point3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn components(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn distance_km(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_mi(&self) -> f64 {
        self.distance_km() * KM_TO_MI
    }

    /// Read a point from a JSON triple.
    ///
    /// Accepts `[x, y, z]` (extra elements ignored) or `{"x":..,"y":..,"z":..}`.
    /// Anything short of three numeric components yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => {
                if items.len() < 3 {
                    return None;
                }
                let x = items[0].as_f64()?;
                let y = items[1].as_f64()?;
                let z = items[2].as_f64()?;
                Some(Self::new(x, y, z))
            }
            Value::Object(map) => {
                let x = map.get("x")?.as_f64()?;
                let y = map.get("y")?.as_f64()?;
                let z = map.get("z")?.as_f64()?;
                Some(Self::new(x, y, z))
            }
            _ => None,
        }
    }
}

impl From<[f64; 3]> for Point3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_array_and_object_triples() {
        assert_eq!(
            Point3::from_json(&json!([1.0, -2.5, 3])),
            Some(Point3::new(1.0, -2.5, 3.0))
        );
        assert_eq!(
            Point3::from_json(&json!({"x": 4, "y": 5, "z": 6})),
            Some(Point3::new(4.0, 5.0, 6.0))
        );
        assert_eq!(
            Point3::from_json(&json!([7, 8, 9, 10])),
            Some(Point3::new(7.0, 8.0, 9.0))
        );
    }

    #[test]
    fn rejects_partial_triples() {
        assert_eq!(Point3::from_json(&json!([1, 2])), None);
        assert_eq!(Point3::from_json(&json!([1, "2", 3])), None);
        assert_eq!(Point3::from_json(&json!({"x": 1, "y": 2})), None);
        assert_eq!(Point3::from_json(&json!("2022-11-22 12:00:00")), None);
    }

    #[test]
    fn distance_in_miles() {
        let p = Point3::new(3.0, 4.0, 0.0);
        assert!((p.distance_km() - 5.0).abs() < 1e-12);
        assert!((p.distance_mi() - 5.0 * KM_TO_MI).abs() < 1e-12);
    }
}
