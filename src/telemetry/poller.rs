//! Telemetry poller.
//!
//! Two cycles run as independent tokio tasks:
//! - the live cycle, where one shared interval drives the positions and
//!   mission-report sources so related readings never drift apart;
//! - the orbit cycle, which loads orbit paths at startup (retrying until the
//!   first success) and refreshes them afterwards only when configured.
//!
//! Fetches run concurrently in a `JoinSet`, so a slow source never delays the
//! ticks of another. A source with a fetch still outstanding is skipped for
//! that tick, and every response carries a per-source sequence number that
//! [`SceneState`](crate::scene::SceneState) uses to drop stale results.

use crate::config::{DisplayClock, MissionKeys, TrackerConfig};
use crate::error::{Result, TelemetryError};
use crate::mission::parser::{derive_readouts, parse_report};
use crate::scene::SceneHandle;
use crate::telemetry::backoff::Backoff;
use crate::telemetry::fetcher::{FetchSource, parse_orbits, parse_positions};
use crate::telemetry::types::TelemetryFeed;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{Id, JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// When a source is due, given that its tick has come around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    EveryTick,
    /// Until the first success.
    Once,
    /// At most once per period, measured between dispatches.
    Every(Duration),
}

#[derive(Debug)]
struct SourceCycle {
    feed: TelemetryFeed,
    url: String,
    schedule: Schedule,
    in_flight: bool,
    next_seq: u64,
    backoff: Backoff,
    last_success: Option<Instant>,
    done: bool,
}

impl SourceCycle {
    fn new(
        feed: TelemetryFeed,
        url: String,
        schedule: Schedule,
        base: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            feed,
            url,
            schedule,
            in_flight: false,
            next_seq: 0,
            backoff: Backoff::new(base, max_backoff),
            last_success: None,
            done: false,
        }
    }

    fn is_due(&self, now: Instant) -> bool {
        if self.done || !self.backoff.ready(now) {
            return false;
        }
        match self.schedule {
            Schedule::EveryTick | Schedule::Once => true,
            Schedule::Every(period) => self
                .last_success
                .is_none_or(|at| at.checked_add(period).is_some_and(|due| now >= due)),
        }
    }
}

/// Outcome of one fetch, reported back to its cycle.
#[derive(Debug)]
struct Completion {
    seq: u64,
    dispatched_at: Instant,
    outcome: Result<bool>,
}

/// Everything a fetch task needs to turn a body into a scene update.
struct FetchContext {
    source: Arc<dyn FetchSource>,
    scene: SceneHandle,
    timeout: Duration,
    mission_keys: MissionKeys,
    display: DisplayClock,
}

struct Cycle {
    name: &'static str,
    period: Duration,
    sources: Vec<SourceCycle>,
    tasks: HashMap<Id, usize>,
}

impl Cycle {
    fn dispatch(
        &mut self,
        now: Instant,
        ctx: &Arc<FetchContext>,
        join_set: &mut JoinSet<Completion>,
    ) {
        for (index, source) in self.sources.iter_mut().enumerate() {
            if source.in_flight {
                debug!(feed = %source.feed, "previous fetch still in flight, skipping tick");
                continue;
            }
            if !source.is_due(now) {
                continue;
            }
            source.next_seq += 1;
            source.in_flight = true;
            let seq = source.next_seq;
            let task = join_set.spawn(run_fetch(
                Arc::clone(ctx),
                source.feed,
                source.url.clone(),
                seq,
                now,
            ));
            self.tasks.insert(task.id(), index);
        }
    }

    fn complete(&mut self, id: Id, completion: Option<Completion>, scene: &SceneHandle) {
        let Some(index) = self.tasks.remove(&id) else {
            return;
        };
        let source = &mut self.sources[index];
        source.in_flight = false;

        let Some(Completion {
            seq,
            dispatched_at,
            outcome,
        }) = completion
        else {
            warn!(feed = %source.feed, "fetch task ended abnormally");
            return;
        };

        match outcome {
            Ok(applied) => {
                if source.feed == TelemetryFeed::Orbits && source.last_success.is_none() {
                    info!(seq, "orbit paths loaded");
                }
                source.backoff.reset();
                source.last_success = Some(dispatched_at);
                if source.schedule == Schedule::Once {
                    source.done = true;
                }
                debug!(feed = %source.feed, seq, applied, "fetch complete");
            }
            Err(err) => {
                if err.is_network() {
                    source.backoff.record_failure(dispatched_at);
                }
                warn!(
                    feed = %source.feed,
                    seq,
                    failures = source.backoff.failures(),
                    error = %err,
                    "fetch failed"
                );
                scene.record_failure(source.feed, &err);
            }
        }
    }

    fn finished(&self) -> bool {
        self.sources.iter().all(|s| s.done)
    }
}

async fn run_fetch(
    ctx: Arc<FetchContext>,
    feed: TelemetryFeed,
    url: String,
    seq: u64,
    dispatched_at: Instant,
) -> Completion {
    let outcome = fetch_and_apply(&ctx, feed, &url, seq).await;
    Completion {
        seq,
        dispatched_at,
        outcome,
    }
}

async fn fetch_and_apply(
    ctx: &FetchContext,
    feed: TelemetryFeed,
    url: &str,
    seq: u64,
) -> Result<bool> {
    let body = match tokio::time::timeout(ctx.timeout, ctx.source.fetch(feed, url)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(TelemetryError::Timeout {
                url: url.to_string(),
                after: ctx.timeout,
            });
        }
    };
    apply_body(ctx, feed, seq, &body)
}

/// Parse a body for `feed` and apply it to the scene.
///
/// Returns whether the scene accepted it (`false` for a stale sequence).
fn apply_body(ctx: &FetchContext, feed: TelemetryFeed, seq: u64, body: &str) -> Result<bool> {
    let applied = match feed {
        TelemetryFeed::Positions => ctx.scene.apply_positions(seq, parse_positions(body)?),
        TelemetryFeed::Orbits => ctx.scene.apply_orbits(seq, parse_orbits(body)?),
        TelemetryFeed::Mission => {
            let report = parse_report(body)?;
            let readouts = derive_readouts(&report, &ctx.mission_keys, &ctx.display);
            ctx.scene.apply_mission(seq, report, readouts)
        }
    };
    Ok(applied)
}

async fn run_cycle(mut cycle: Cycle, ctx: Arc<FetchContext>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(cycle.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut join_set: JoinSet<Completion> = JoinSet::new();
    debug!(cycle = cycle.name, period = ?cycle.period, "cycle started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            now = ticker.tick() => {
                cycle.dispatch(now, &ctx, &mut join_set);
            }
            Some(joined) = join_set.join_next_with_id(), if !join_set.is_empty() => {
                match joined {
                    Ok((id, completion)) => cycle.complete(id, Some(completion), &ctx.scene),
                    Err(err) => cycle.complete(err.id(), None, &ctx.scene),
                }
                if cycle.finished() && join_set.is_empty() {
                    debug!(cycle = cycle.name, "all sources done");
                    break;
                }
            }
        }
    }

    join_set.abort_all();
    debug!(cycle = cycle.name, "cycle stopped");
}

/// Builds the polling tasks for one scene.
pub struct TelemetryPoller {
    ctx: Arc<FetchContext>,
    live: Cycle,
    orbits: Cycle,
}

impl TelemetryPoller {
    pub fn new(config: &TrackerConfig, source: Arc<dyn FetchSource>, scene: SceneHandle) -> Self {
        let period = config.poll_interval;
        let max_backoff = config.max_backoff;
        let ctx = Arc::new(FetchContext {
            source,
            scene,
            timeout: config.effective_fetch_timeout(),
            mission_keys: config.mission_keys.clone(),
            display: config.display.clone(),
        });

        let live = Cycle {
            name: "live",
            period,
            sources: vec![
                SourceCycle::new(
                    TelemetryFeed::Positions,
                    config.positions_url(),
                    Schedule::EveryTick,
                    period,
                    max_backoff,
                ),
                SourceCycle::new(
                    TelemetryFeed::Mission,
                    config.mission_url.clone(),
                    Schedule::EveryTick,
                    period,
                    max_backoff,
                ),
            ],
            tasks: HashMap::new(),
        };

        let orbit_schedule = config
            .orbit_refresh
            .map(Schedule::Every)
            .unwrap_or(Schedule::Once);
        let orbits = Cycle {
            name: "orbits",
            period,
            sources: vec![SourceCycle::new(
                TelemetryFeed::Orbits,
                config.orbits_url(),
                orbit_schedule,
                period,
                max_backoff,
            )],
            tasks: HashMap::new(),
        };

        Self { ctx, live, orbits }
    }

    /// Start both cycles on the current tokio runtime.
    pub fn spawn(self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        info!(
            interval = ?self.live.period,
            timeout = ?self.ctx.timeout,
            "telemetry poller started"
        );
        let tasks = vec![
            tokio::spawn(run_cycle(self.live, Arc::clone(&self.ctx), shutdown_rx.clone())),
            tokio::spawn(run_cycle(self.orbits, self.ctx, shutdown_rx)),
        ];
        PollerHandle {
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

/// Owner of the running cycles.
///
/// [`PollerHandle::shutdown`] stops them and cancels in-flight fetches;
/// dropping the handle aborts them outright.
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                warn!(error = %err, "poller task ended abnormally");
            }
        }
        info!("telemetry poller stopped");
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
