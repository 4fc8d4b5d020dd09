//! Headless tracker: polls telemetry and prints periodic scene readouts.

use anyhow::{Context, Result};
use artemis_tracker::config::TrackerConfig;
use artemis_tracker::logging;
use artemis_tracker::scene::{SceneHandle, SceneSnapshot, SceneState};
use artemis_tracker::telemetry::{HttpSource, TelemetryFeed, TelemetryPoller};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "artemis-tracker", about = "Live Artemis telemetry tracker")]
struct Cli {
    /// TOML config file. Defaults to the platform config directory.
    #[arg(long, env = "ARTEMIS_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the positions/orbits API.
    #[arg(long)]
    api_base_url: Option<String>,

    #[arg(long)]
    mission_url: Option<String>,

    /// Poll interval for positions and the mission report.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Scale divisor K.
    #[arg(long)]
    divisor: Option<f64>,

    /// Refresh orbit paths on this period instead of once at startup.
    #[arg(long)]
    refresh_orbits_secs: Option<u64>,

    /// Console readout period.
    #[arg(long, default_value_t = 5)]
    report_every_secs: u64,
}

impl Cli {
    fn apply_overrides(&self, config: &mut TrackerConfig) {
        if let Some(url) = &self.api_base_url {
            config.api_base_url = url.clone();
        }
        if let Some(url) = &self.mission_url {
            config.mission_url = url.clone();
        }
        if let Some(ms) = self.interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(divisor) = self.divisor {
            config.scale_divisor = divisor;
        }
        if let Some(secs) = self.refresh_orbits_secs {
            config.orbit_refresh = Some(Duration::from_secs(secs));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = TrackerConfig::resolve_path(cli.config.as_deref());
    let mut config = TrackerConfig::load(config_path.as_deref())?;
    cli.apply_overrides(&mut config);
    logging::init(&config.log_filter);
    match &config_path {
        Some(path) => info!(path = %path.display(), "config loaded"),
        None => info!("no config file found, using defaults"),
    }
    config.validate().context("invalid configuration")?;

    let mut state = SceneState::new(config.scale_divisor);
    if config.seed_default_bodies {
        state = state.with_seed_bodies();
    }
    let scene = SceneHandle::new(state);

    info!(
        positions = %config.positions_url(),
        orbits = %config.orbits_url(),
        mission = %config.mission_url,
        "starting tracker"
    );
    let poller = TelemetryPoller::new(&config, Arc::new(HttpSource::new()), scene.clone()).spawn();

    let mut readout = tokio::time::interval(Duration::from_secs(cli.report_every_secs.max(1)));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = readout.tick() => log_snapshot(&scene.snapshot()),
        }
    }

    info!("shutting down");
    poller.shutdown().await;
    Ok(())
}

fn log_snapshot(snapshot: &SceneSnapshot) {
    for (body, position) in &snapshot.targets.positions {
        let rendered = snapshot.rescaled(body).unwrap_or(*position);
        info!(
            body = %body,
            x = position.x,
            y = position.y,
            z = position.z,
            range_km = position.distance_km(),
            range_mi = position.distance_mi(),
            render = ?rendered.components(),
            "position"
        );
    }

    let readouts = &snapshot.readouts;
    info!(
        scale = snapshot.scale,
        paths = snapshot.orbits.len(),
        updated = readouts.updated_display(),
        velocity = %readouts.velocity,
        distance_to_moon = %readouts.distance_to_moon,
        distance_to_earth = %readouts.distance_to_earth,
        "mission"
    );
    for battery in &readouts.batteries {
        info!(battery = %battery.name, percent = battery.percent, "battery");
    }

    for feed in TelemetryFeed::ALL {
        let health = snapshot.health(feed);
        if let Some(error) = &health.last_error {
            warn!(%feed, failures = health.consecutive_failures, error = %error, "feed degraded");
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        tokio::select! {
            _ = ctrl_c() => {},
            _ = terminate() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(?err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(err) => {
            warn!(?err, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}
