//! OSRM-compatible walking-route requests.

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

pub const DEFAULT_OSRM_BASE: &str = "https://router.project-osrm.org";
pub const WALKING_PROFILE: &str = "foot";

/// `None` when fewer than two waypoints are given.
pub fn route_url(base: &str, profile: &str, waypoints: &[LatLng]) -> Option<String> {
    if waypoints.len() < 2 {
        return None;
    }
    let coordinates = waypoints
        .iter()
        .map(|p| format!("{:.6},{:.6}", p.lng, p.lat))
        .collect::<Vec<_>>()
        .join(";");
    Some(format!(
        "{}/route/v1/{profile}/{coordinates}?overview=full&geometries=geojson",
        base.trim_end_matches('/')
    ))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OsrmResponse {
    pub code: String,
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OsrmRoute {
    pub geometry: OsrmGeometry,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
}

/// GeoJSON line string; coordinates are `[lng, lat]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OsrmGeometry {
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
}

/// Polyline of the first route when the service answered `Ok`.
pub fn route_polyline(response: &OsrmResponse) -> Option<Vec<LatLng>> {
    if response.code != "Ok" {
        return None;
    }
    let route = response.routes.first()?;
    let line: Vec<LatLng> = route
        .geometry
        .coordinates
        .iter()
        .map(|[lng, lat]| LatLng::new(*lat, *lng))
        .filter(LatLng::is_finite)
        .collect();
    (line.len() >= 2).then_some(line)
}

/// Fallback line straight through the waypoints.
pub fn straight_polyline(waypoints: &[LatLng]) -> Vec<LatLng> {
    if waypoints.len() < 2 {
        return Vec::new();
    }
    waypoints.to_vec()
}
