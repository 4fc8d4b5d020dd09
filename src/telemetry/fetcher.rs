//! Telemetry fetching: the injectable transport plus payload parsers for the
//! positions and orbit-path endpoints.

use crate::core::coordinates::Point3;
use crate::error::{Result, TelemetryError};
use crate::telemetry::types::{Orbits, TelemetryFeed, Targets};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

/// Transport capability used by the poller.
///
/// Returns the raw response body. Implementations map transport failures and
/// non-success statuses to [`TelemetryError::Network`].
#[async_trait]
pub trait FetchSource: Send + Sync + 'static {
    async fn fetch(&self, feed: TelemetryFeed, url: &str) -> Result<String>;
}

/// HTTP transport backed by a shared `reqwest` client.
#[derive(Clone, Default)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchSource for HttpSource {
    async fn fetch(&self, feed: TelemetryFeed, url: &str) -> Result<String> {
        let body = fetch_body(&self.client, url).await?;
        debug!(%feed, url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .header("accept", "application/json")
        .send()
        .await
        .map_err(|err| TelemetryError::network(url, err))?;
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|err| TelemetryError::network(url, format!("read response: {err}")))?;
    if !status.is_success() {
        return Err(TelemetryError::network(url, format!("http {status}")));
    }
    Ok(body)
}

/// Parse a `/positions` payload: `{ "<body>": [x, y, z], ..., "timestamp": "..." }`.
pub fn parse_positions(body: &str) -> Result<Targets> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(obj) = value else {
        return Err(TelemetryError::malformed("positions: expected json object"));
    };

    let mut targets = Targets::default();
    for (key, value) in obj.iter() {
        if key == "timestamp" {
            targets.updated_utc = value.as_str().and_then(parse_timestamp);
            continue;
        }
        match Point3::from_json(value) {
            Some(point) => {
                targets.positions.insert(key.clone(), point);
            }
            None => debug!(body = %key, "positions: ignoring non-point entry"),
        }
    }
    Ok(targets)
}

/// Parse an `/orbits` payload: `{ "<body>": [[x, y, z], ...], ... }`.
///
/// Invalid points are dropped from their path; the rest keep their order.
pub fn parse_orbits(body: &str) -> Result<Orbits> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(obj) = value else {
        return Err(TelemetryError::malformed("orbits: expected json object"));
    };

    let mut orbits = Orbits::new();
    for (key, value) in obj.iter() {
        let Some(items) = value.as_array() else {
            debug!(body = %key, "orbits: ignoring non-array entry");
            continue;
        };
        let path: Vec<Point3> = items.iter().filter_map(Point3::from_json).collect();
        if path.len() != items.len() {
            debug!(
                body = %key,
                skipped = items.len() - path.len(),
                "orbits: dropped invalid points"
            );
        }
        orbits.insert(key.clone(), path);
    }
    Ok(orbits)
}

/// Lenient timestamp parsing for payload time fields. Naive times are UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim();
    if value.is_empty() || value == "null" {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    None
}
