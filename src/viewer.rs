//! Bevy bridge for the scene (feature `viewer`).
//!
//! Mirrors the latest [`SceneSnapshot`] into a [`RenderScene`] resource of
//! rescaled `Vec3` positions and orbit polylines, and optionally draws the
//! paths with gizmos. Scene graph, camera and materials stay with the app.

use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::core::coordinates::Point3;
use crate::mission::types::MissionReadouts;
use crate::scene::{SceneHandle, SceneSnapshot};

/// Shared scene written by the poller.
#[derive(Resource, Clone)]
pub struct TrackerScene(pub SceneHandle);

/// Render-ready copy of the scene, refreshed every frame the scene changes.
#[derive(Resource, Default, Debug, Clone)]
pub struct RenderScene {
    pub bodies: BTreeMap<String, Vec3>,
    pub orbit_paths: BTreeMap<String, Vec<Vec3>>,
    pub scale: f64,
    pub readouts: MissionReadouts,
    last: Option<SceneSnapshot>,
}

impl RenderScene {
    pub fn body(&self, name: &str) -> Option<Vec3> {
        self.bodies.get(name).copied()
    }
}

pub struct TrackerViewerPlugin {
    pub scene: SceneHandle,
    /// Draw orbit paths with gizmos. Requires bevy's gizmo plugin.
    pub draw_paths: bool,
}

impl TrackerViewerPlugin {
    pub fn new(scene: SceneHandle) -> Self {
        Self {
            scene,
            draw_paths: true,
        }
    }
}

impl Plugin for TrackerViewerPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(TrackerScene(self.scene.clone()))
            .init_resource::<RenderScene>()
            .add_systems(Update, sync_render_scene);
        if self.draw_paths {
            app.add_systems(Update, draw_orbit_paths.after(sync_render_scene));
        }
    }
}

fn to_vec3(p: Point3) -> Vec3 {
    Vec3::new(p.x as f32, p.y as f32, p.z as f32)
}

pub fn sync_render_scene(scene: Res<TrackerScene>, mut render: ResMut<RenderScene>) {
    let snapshot = scene.0.snapshot();
    if render.last.as_ref() == Some(&snapshot) {
        return;
    }

    render.bodies = snapshot
        .rescaled_targets()
        .into_iter()
        .map(|(name, p)| (name, to_vec3(p)))
        .collect();
    render.orbit_paths = snapshot
        .rescaled_orbits()
        .into_iter()
        .map(|(name, path)| (name, path.into_iter().map(to_vec3).collect()))
        .collect();
    render.scale = snapshot.scale;
    render.readouts = snapshot.readouts.clone();
    render.last = Some(snapshot);
}

pub fn draw_orbit_paths(render: Res<RenderScene>, mut gizmos: Gizmos) {
    let color = Color::srgba(0.5, 0.9, 0.95, 0.8);
    for path in render.orbit_paths.values() {
        for segment in path.windows(2) {
            gizmos.line(segment[0], segment[1], color);
        }
    }
}
