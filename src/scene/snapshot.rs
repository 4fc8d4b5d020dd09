//! Immutable scene snapshots handed to renderers.

use crate::core::coordinates::{BodyName, Point3};
use crate::core::scale::rescale;
use crate::mission::types::{MissionReadouts, MissionReport};
use crate::telemetry::types::{FeedHealth, Orbits, TelemetryFeed, Targets};
use std::collections::{BTreeMap, HashMap};

/// Owned copy of the scene at one instant.
///
/// Raw coordinates are kept; render positions are derived on read with
/// [`SceneSnapshot::rescaled_targets`] and [`SceneSnapshot::rescaled_orbits`].
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSnapshot {
    pub targets: Targets,
    pub orbits: Orbits,
    pub scale: f64,
    pub mission: Option<MissionReport>,
    pub readouts: MissionReadouts,
    pub health: HashMap<TelemetryFeed, FeedHealth>,
}

impl SceneSnapshot {
    pub fn rescaled(&self, body: &str) -> Option<Point3> {
        self.targets.get(body).map(|p| rescale(p, self.scale))
    }

    pub fn rescaled_targets(&self) -> BTreeMap<BodyName, Point3> {
        self.targets
            .positions
            .iter()
            .map(|(body, p)| (body.clone(), rescale(*p, self.scale)))
            .collect()
    }

    pub fn rescaled_orbits(&self) -> BTreeMap<BodyName, Vec<Point3>> {
        self.orbits
            .iter()
            .map(|(body, path)| {
                (
                    body.clone(),
                    path.iter().map(|p| rescale(*p, self.scale)).collect(),
                )
            })
            .collect()
    }

    pub fn health(&self, feed: TelemetryFeed) -> FeedHealth {
        self.health.get(&feed).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::coordinates::Point3;
    use crate::scene::state::{SceneHandle, SceneState};
    use crate::telemetry::fetcher::{parse_orbits, parse_positions};

    #[test]
    fn end_to_end_render_positions() {
        let handle = SceneHandle::new(SceneState::new(10.0));
        let orbits =
            parse_orbits(r#"{"artemis": [[1, 0, 0], [2, 0, 0]], "moon": [[0, 5, 0]]}"#).unwrap();
        let targets =
            parse_positions(r#"{"artemis": [2, 0, 0], "earth": [0, 0, 0], "moon": [0, 5, 0]}"#)
                .unwrap();
        handle.apply_orbits(1, orbits);
        handle.apply_positions(1, targets);

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.scale, 0.5);
        assert_eq!(snapshot.rescaled("artemis"), Some(Point3::new(4.0, 0.0, 0.0)));
        assert_eq!(snapshot.rescaled("moon"), Some(Point3::new(0.0, 10.0, 0.0)));
        assert_eq!(snapshot.rescaled("sun"), None);

        let paths = snapshot.rescaled_orbits();
        assert_eq!(
            paths["artemis"],
            vec![Point3::new(2.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0)]
        );
        assert_eq!(snapshot.rescaled_targets().len(), 3);
    }
}
