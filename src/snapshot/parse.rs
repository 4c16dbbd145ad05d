use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawSnapshot {
    #[serde(default)]
    pub(super) nodes: Vec<RawPeer>,
    #[serde(default)]
    pub(super) histograms: Vec<RawHistogram>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawPeer {
    #[serde(default)]
    pub(super) address: String,
    #[serde(default)]
    pub(super) betweenness: Option<f64>,
    #[serde(default)]
    pub(super) closeness: Option<f64>,
    #[serde(default)]
    pub(super) connections: Vec<i64>,
    #[serde(default)]
    pub(super) geolocation: Option<RawGeolocation>,
    #[serde(default)]
    pub(super) network: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawGeolocation {
    #[serde(default)]
    pub(super) lat: Option<f64>,
    #[serde(default, alias = "lon", alias = "lng")]
    pub(super) long: Option<f64>,
    #[serde(default)]
    pub(super) city: Option<String>,
    #[serde(default)]
    pub(super) country: Option<String>,
}

impl RawGeolocation {
    /// Returns the coordinates only when both are present and on the globe.
    pub(super) fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.lat.filter(|lat| lat.is_finite() && lat.abs() <= 90.0)?;
        let long = self.long.filter(|long| long.is_finite() && long.abs() <= 180.0)?;
        Some((lat, long))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawHistogram {
    pub(super) metric: String,
    #[serde(default)]
    pub(super) min: f64,
    #[serde(default)]
    pub(super) max: f64,
    #[serde(default)]
    pub(super) buckets: Vec<u64>,
}

pub(super) fn parse_snapshot(raw: &str) -> Result<RawSnapshot> {
    serde_json::from_str(raw).context("invalid snapshot JSON")
}
