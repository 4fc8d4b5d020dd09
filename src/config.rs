//! Tracker configuration.
//!
//! Loaded from TOML. Resolution order: explicit path, then
//! `<platform config dir>/artemis-tracker/tracker.toml`, then built-in
//! defaults. Every field is optional in the file.

use anyhow::{Context, Result, bail};
use chrono::FixedOffset;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, DurationSeconds, serde_as};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE: &str = "tracker.toml";

/// Upper bound for every configured period.
pub const MAX_PERIOD: Duration = Duration::from_secs(30 * 24 * 3600);

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Base URL of the telemetry API serving positions and orbit paths.
    pub api_base_url: String,
    pub positions_path: String,
    pub orbits_path: String,
    /// Absolute URL of the mission report.
    pub mission_url: String,
    /// Shared cadence of the positions and mission-report cycles.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,
    /// Per-fetch bound. Defaults to three poll intervals.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub fetch_timeout: Option<Duration>,
    /// Periodic orbit-path refresh. `None` fetches paths once at startup.
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub orbit_refresh: Option<Duration>,
    /// Upper bound on the backoff applied after repeated network failures.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub max_backoff: Duration,
    /// Divisor K in `max(1, max |component|) / K`.
    pub scale_divisor: f64,
    /// Seed artemis/earth/moon at the origin and the sun on +z before the
    /// first positions fetch.
    pub seed_default_bodies: bool,
    pub display: DisplayClock,
    pub mission_keys: MissionKeys,
    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub log_filter: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            positions_path: "/api/v1/positions".to_string(),
            orbits_path: "/api/v1/orbits".to_string(),
            mission_url: "https://orion.rory.coffee/api/mission/Orion_flight104_mission.txt"
                .to_string(),
            poll_interval: Duration::from_secs(1),
            fetch_timeout: None,
            orbit_refresh: None,
            max_backoff: Duration::from_secs(30),
            scale_divisor: 10.0,
            seed_default_bodies: false,
            display: DisplayClock::default(),
            mission_keys: MissionKeys::default(),
            log_filter: "info".to_string(),
        }
    }
}

/// Display convention for the mission report time.
///
/// The report's `File.Date` runs one hour behind; the fixed `shift_secs`
/// is added before converting to the fixed civil offset. This is not zone
/// database math: `utc_offset_secs` never changes with daylight saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayClock {
    pub shift_secs: i64,
    pub utc_offset_secs: i32,
    pub zone_label: String,
}

impl Default for DisplayClock {
    fn default() -> Self {
        Self {
            shift_secs: 3600,
            utc_offset_secs: -5 * 3600,
            zone_label: "EST".to_string(),
        }
    }
}

impl DisplayClock {
    pub fn shift(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.shift_secs)
    }

    pub fn zone(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_secs)
    }
}

/// Report keys feeding each readout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionKeys {
    pub velocity: String,
    pub distance_to_moon: String,
    pub distance_to_earth: String,
    pub battery: String,
    pub file: String,
}

impl Default for MissionKeys {
    fn default() -> Self {
        Self {
            velocity: "Parameter_1".to_string(),
            distance_to_moon: "Parameter_2".to_string(),
            distance_to_earth: "Parameter_3".to_string(),
            battery: "Parameter_32".to_string(),
            file: "File".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Platform config file location, e.g. `~/.config/artemis-tracker/tracker.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "artemis-tracker").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// The file `load` would read: `explicit`, else the platform path if it
    /// exists. `None` means built-in defaults.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.exists()),
        }
    }

    /// Read the config without validating it, so command-line overrides can
    /// still be applied. Call [`TrackerConfig::validate`] afterwards.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::resolve_path(explicit) {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a config file. Not validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("invalid config toml in {}", path.display()))?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse and validate.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("invalid config toml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            bail!("poll_interval must be greater than zero");
        }
        let periods = [
            ("poll_interval", Some(self.poll_interval)),
            ("fetch_timeout", self.fetch_timeout),
            ("orbit_refresh", self.orbit_refresh),
            ("max_backoff", Some(self.max_backoff)),
        ];
        for (name, period) in periods {
            if period.is_some_and(|p| p > MAX_PERIOD) {
                bail!("{name} must not exceed {} days", MAX_PERIOD.as_secs() / 86_400);
            }
        }
        if self.fetch_timeout.is_some_and(|t| t.is_zero()) {
            bail!("fetch_timeout must be greater than zero");
        }
        if self.orbit_refresh.is_some_and(|t| t.is_zero()) {
            bail!("orbit_refresh must be greater than zero when set");
        }
        if !(self.scale_divisor.is_finite() && self.scale_divisor > 0.0) {
            bail!("scale_divisor must be a positive number, got {}", self.scale_divisor);
        }
        if self.display.zone().is_none() {
            bail!(
                "display.utc_offset_secs out of range: {}",
                self.display.utc_offset_secs
            );
        }
        for url in [self.positions_url(), self.orbits_url(), self.mission_url.clone()] {
            reqwest::Url::parse(&url).with_context(|| format!("invalid url {url:?}"))?;
        }
        Ok(())
    }

    pub fn positions_url(&self) -> String {
        join_url(&self.api_base_url, &self.positions_path)
    }

    pub fn orbits_url(&self) -> String {
        join_url(&self.api_base_url, &self.orbits_path)
    }

    pub fn effective_fetch_timeout(&self) -> Duration {
        self.fetch_timeout
            .unwrap_or_else(|| self.poll_interval.saturating_mul(3))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(test_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "artemis-tracker-config-{}-{}-{}",
            test_name,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn defaults_are_valid() {
        let config = TrackerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.positions_url(), "http://localhost:5000/api/v1/positions");
        assert_eq!(config.orbits_url(), "http://localhost:5000/api/v1/orbits");
        assert_eq!(config.effective_fetch_timeout(), Duration::from_secs(3));
        assert_eq!(config.display.shift(), chrono::Duration::hours(1));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = TrackerConfig::from_toml_str(
            r#"
            api_base_url = "http://telemetry.local:8080/"
            poll_interval = 500
            orbit_refresh = 600
            scale_divisor = 1.0

            [mission_keys]
            velocity = "Parameter_7"
            "#,
        )
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.orbit_refresh, Some(Duration::from_secs(600)));
        assert_eq!(config.scale_divisor, 1.0);
        assert_eq!(config.positions_url(), "http://telemetry.local:8080/api/v1/positions");
        assert_eq!(config.mission_keys.velocity, "Parameter_7");
        assert_eq!(config.mission_keys.battery, "Parameter_32");
        assert_eq!(config.display, DisplayClock::default());
        assert_eq!(config.effective_fetch_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(TrackerConfig::from_toml_str("poll_interval = 0").is_err());
        assert!(TrackerConfig::from_toml_str("scale_divisor = 0.0").is_err());
        assert!(TrackerConfig::from_toml_str("scale_divisor = -10.0").is_err());
        assert!(TrackerConfig::from_toml_str("orbit_refresh = 0").is_err());
        assert!(TrackerConfig::from_toml_str("mission_url = \"not a url\"").is_err());
        assert!(TrackerConfig::from_toml_str("orbit_refresh = 9223372036854775807").is_err());
        assert!(TrackerConfig::from_toml_str("max_backoff = 9223372036854775807").is_err());
        assert!(TrackerConfig::from_toml_str("poll_interval = 9223372036854775807").is_err());
        assert!(TrackerConfig::from_toml_str("orbit_refresh = 2592000").is_ok());
        assert!(
            TrackerConfig::from_toml_str("[display]\nutc_offset_secs = 200000").is_err()
        );
    }

    #[test]
    fn loads_from_explicit_file() {
        let dir = unique_temp_dir("explicit");
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(CONFIG_FILE);
        fs::write(
            &path,
            "poll_interval = 2000\n[display]\nzone_label = \"UTC\"\nutc_offset_secs = 0\n",
        )
        .expect("write config");

        let config = TrackerConfig::load(Some(&path)).expect("load config");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.display.zone_label, "UTC");
        assert_eq!(config.display.shift_secs, 3600);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = unique_temp_dir("missing").join(CONFIG_FILE);
        assert!(TrackerConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn load_defers_validation() {
        let dir = unique_temp_dir("unvalidated");
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(CONFIG_FILE);
        fs::write(&path, "scale_divisor = 0.0\n").expect("write config");

        let mut config = TrackerConfig::load(Some(&path)).expect("load config");
        assert!(config.validate().is_err());
        config.scale_divisor = 4.0;
        config.validate().unwrap();
        assert_eq!(TrackerConfig::resolve_path(Some(&path)), Some(path));
    }
}
