//! Reconciled scene state.
//!
//! `SceneState` is written only by the poller's completion handlers and read
//! by renderers through owned snapshots. Each facet (targets, orbits, mission)
//! is updated under one write lock, so readers never see a half-applied update.

use crate::core::coordinates::Point3;
use crate::core::scale::compute_scale;
use crate::error::TelemetryError;
use crate::mission::types::{MissionReadouts, MissionReport};
use crate::scene::snapshot::SceneSnapshot;
use crate::telemetry::types::{FeedHealth, Orbits, TelemetryFeed, Targets};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SceneState {
    targets: Targets,
    orbits: Orbits,
    scale: f64,
    divisor: f64,
    mission: Option<MissionReport>,
    readouts: MissionReadouts,
    health: HashMap<TelemetryFeed, FeedHealth>,
}

impl SceneState {
    pub fn new(divisor: f64) -> Self {
        let mut state = Self {
            targets: Targets::default(),
            orbits: Orbits::new(),
            scale: 0.0,
            divisor,
            mission: None,
            readouts: MissionReadouts::default(),
            health: TelemetryFeed::ALL
                .into_iter()
                .map(|feed| (feed, FeedHealth::default()))
                .collect(),
        };
        state.recompute_scale();
        state
    }

    /// Place the default bodies before the first positions fetch: artemis,
    /// earth and moon at the origin, the sun on +z as a light direction.
    pub fn with_seed_bodies(mut self) -> Self {
        for body in ["artemis", "earth", "moon"] {
            self.targets.positions.insert(body.to_string(), Point3::ZERO);
        }
        self.targets
            .positions
            .insert("sun".to_string(), Point3::new(0.0, 0.0, 10.0));
        self.recompute_scale();
        self
    }

    /// Merge a positions snapshot. Returns `false` if `seq` is stale.
    pub fn apply_positions(&mut self, seq: u64, update: Targets) -> bool {
        if !self.accept(TelemetryFeed::Positions, seq) {
            return false;
        }
        let stamp = update.updated_utc.unwrap_or_else(Utc::now);
        self.targets.merge(update);
        self.targets.updated_utc = Some(stamp);
        self.recompute_scale();
        self.mark_success(TelemetryFeed::Positions, seq);
        true
    }

    /// Replace orbit paths wholesale. Returns `false` if `seq` is stale.
    pub fn apply_orbits(&mut self, seq: u64, orbits: Orbits) -> bool {
        if !self.accept(TelemetryFeed::Orbits, seq) {
            return false;
        }
        self.orbits = orbits;
        self.recompute_scale();
        self.mark_success(TelemetryFeed::Orbits, seq);
        true
    }

    /// Replace the mission report and every readout derived from it.
    pub fn apply_mission(
        &mut self,
        seq: u64,
        report: MissionReport,
        readouts: MissionReadouts,
    ) -> bool {
        if !self.accept(TelemetryFeed::Mission, seq) {
            return false;
        }
        self.mission = Some(report);
        self.readouts = readouts;
        self.mark_success(TelemetryFeed::Mission, seq);
        true
    }

    /// Note a failed cycle. Data facets are left untouched.
    pub fn record_failure(&mut self, feed: TelemetryFeed, error: &TelemetryError) {
        let health = self.health.entry(feed).or_default();
        health.last_error = Some(error.to_string());
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    pub fn orbits(&self) -> &Orbits {
        &self.orbits
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn mission(&self) -> Option<&MissionReport> {
        self.mission.as_ref()
    }

    pub fn readouts(&self) -> &MissionReadouts {
        &self.readouts
    }

    pub fn health(&self, feed: TelemetryFeed) -> FeedHealth {
        self.health.get(&feed).cloned().unwrap_or_default()
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            targets: self.targets.clone(),
            orbits: self.orbits.clone(),
            scale: self.scale,
            mission: self.mission.clone(),
            readouts: self.readouts.clone(),
            health: self.health.clone(),
        }
    }

    fn accept(&self, feed: TelemetryFeed, seq: u64) -> bool {
        let last = self.health.get(&feed).and_then(|h| h.applied_seq);
        let fresh = last.is_none_or(|last| seq > last);
        if !fresh {
            debug!(%feed, seq, ?last, "discarding stale response");
        }
        fresh
    }

    fn mark_success(&mut self, feed: TelemetryFeed, seq: u64) {
        let health = self.health.entry(feed).or_default();
        health.applied_seq = Some(seq);
        health.last_success_utc = Some(Utc::now());
        health.last_error = None;
        health.consecutive_failures = 0;
    }

    fn recompute_scale(&mut self) {
        self.scale = compute_scale(&self.orbits, &self.targets, self.divisor);
    }
}

/// Shared handle to the scene. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SceneHandle {
    inner: Arc<RwLock<SceneState>>,
}

impl SceneHandle {
    pub fn new(state: SceneState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    // Updates replace whole values, so a poisoned lock still guards a
    // consistent state.
    fn read(&self) -> RwLockReadGuard<'_, SceneState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SceneState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply_positions(&self, seq: u64, update: Targets) -> bool {
        self.write().apply_positions(seq, update)
    }

    pub fn apply_orbits(&self, seq: u64, orbits: Orbits) -> bool {
        self.write().apply_orbits(seq, orbits)
    }

    pub fn apply_mission(
        &self,
        seq: u64,
        report: MissionReport,
        readouts: MissionReadouts,
    ) -> bool {
        self.write().apply_mission(seq, report, readouts)
    }

    pub fn record_failure(&self, feed: TelemetryFeed, error: &TelemetryError) {
        self.write().record_failure(feed, error)
    }

    pub fn current_targets(&self) -> Targets {
        self.read().targets().clone()
    }

    pub fn current_orbits(&self) -> Orbits {
        self.read().orbits().clone()
    }

    pub fn current_scale(&self) -> f64 {
        self.read().scale()
    }

    pub fn current_mission_readouts(&self) -> MissionReadouts {
        self.read().readouts().clone()
    }

    pub fn current_mission_report(&self) -> Option<MissionReport> {
        self.read().mission().cloned()
    }

    pub fn health(&self, feed: TelemetryFeed) -> FeedHealth {
        self.read().health(feed)
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        self.read().snapshot()
    }
}
