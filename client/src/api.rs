//! One-shot GET wrappers for the occupancy backend and the routing service.
//! Every failure is logged and collapses to the empty value.

use std::collections::BTreeMap;

use crowd_shared::api::{
    access_point_path, building_path, building_prediction_path, campus_path,
    campus_prediction_path, trajectory_path,
};
use crowd_shared::routing::{
    DEFAULT_OSRM_BASE, OsrmResponse, WALKING_PROFILE, route_polyline, route_url, straight_polyline,
};
use crowd_shared::{
    AccessPointOccupancy, BuildingOccupancy, BuildingStats, CampusPrediction, Granularity, LatLng,
    TrajectorySegment, decode_access_points, decode_building_prediction, decode_building_stats,
    decode_campus, decode_campus_predictions, decode_trajectory,
};
use serde::de::DeserializeOwned;

/// Status check and JSON decode of a finished response.
fn read_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, String> {
    if !(200..300).contains(&status) {
        return Err(format!("HTTP {status}"));
    }
    serde_json::from_str(body).map_err(|e| format!("parse error: {e}"))
}

/// Collapses a failed fetch to the empty value, handing the error to `report`.
fn or_empty<T: Default>(result: Result<T, String>, report: impl FnOnce(&str)) -> T {
    result.unwrap_or_else(|err| {
        report(&err);
        T::default()
    })
}

async fn get_json<T: DeserializeOwned>(url: &str) -> Result<T, String> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    read_body(status, &body)
}

fn warn(context: &str, err: &str) {
    web_sys::console::warn_1(&format!("{context}: {err}").into());
}

/// Fetches `path` as loose JSON; `None` after logging on any failure.
async fn get_value(context: &str, path: Result<String, String>) -> Option<serde_json::Value> {
    let result = match path {
        Ok(url) => get_json::<serde_json::Value>(&url).await.map(Some),
        Err(err) => Err(err),
    };
    or_empty(result, |err| warn(context, err))
}

pub async fn fetch_campus_occupancy(
    date: &str,
    time: &str,
    granularity: Granularity,
) -> Vec<BuildingOccupancy> {
    get_value("campus occupancy", Ok(campus_path(date, time, granularity)))
        .await
        .map(|body| decode_campus(&body))
        .unwrap_or_default()
}

pub async fn fetch_building_occupancy(
    building: &str,
    date: &str,
    time: &str,
    granularity: Granularity,
) -> Option<BuildingStats> {
    let body = get_value(
        "building occupancy",
        building_path(building, date, time, granularity),
    )
    .await?;
    decode_building_stats(&body)
}

pub async fn fetch_access_points(
    building: &str,
    date: &str,
    time: &str,
    granularity: Granularity,
    floor: u32,
) -> Vec<AccessPointOccupancy> {
    get_value(
        "access points",
        access_point_path(building, date, time, granularity, floor),
    )
    .await
    .map(|body| decode_access_points(&body))
    .unwrap_or_default()
}

pub async fn fetch_trajectory(device_id: &str, date: &str) -> Option<Vec<TrajectorySegment>> {
    let body = get_value("trajectory", trajectory_path(device_id, date)).await?;
    decode_trajectory(&body)
}

pub async fn fetch_campus_predictions(date: &str, time: &str) -> BTreeMap<String, CampusPrediction> {
    get_value("campus predictions", Ok(campus_prediction_path(date, time)))
        .await
        .map(|body| decode_campus_predictions(&body))
        .unwrap_or_default()
}

pub async fn fetch_building_prediction(building: &str, date: &str, time: &str) -> Option<f64> {
    let body = get_value(
        "building prediction",
        building_prediction_path(building, date, time),
    )
    .await?;
    decode_building_prediction(&body)
}

/// Walking route through `waypoints`. Straight segments when the routing
/// service is unavailable; empty for fewer than two waypoints.
pub async fn fetch_walking_route(waypoints: &[LatLng]) -> Vec<LatLng> {
    let Some(url) = route_url(DEFAULT_OSRM_BASE, WALKING_PROFILE, waypoints) else {
        return Vec::new();
    };
    match get_json::<OsrmResponse>(&url).await {
        Ok(response) => match route_polyline(&response) {
            Some(polyline) => polyline,
            None => {
                warn("walking route", &format!("no route ({})", response.code));
                straight_polyline(waypoints)
            }
        },
        Err(err) => {
            warn("walking route", &err);
            straight_polyline(waypoints)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_success_status_is_an_error() {
        let not_found = read_body::<serde_json::Value>(404, r#"{"detail":"Not found."}"#);
        assert_eq!(not_found, Err("HTTP 404".to_string()));
        assert!(read_body::<serde_json::Value>(500, "").is_err());
        assert!(read_body::<serde_json::Value>(204, "").is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = read_body::<serde_json::Value>(200, "<html>").expect_err("html body");
        assert!(err.starts_with("parse error:"), "{err}");
    }

    #[test]
    fn missing_campus_data_draws_an_empty_heatmap() {
        let mut reported = Vec::new();
        let body = or_empty(
            read_body::<serde_json::Value>(404, "").map(Some),
            |err| reported.push(err.to_string()),
        );
        let records = body.map(|body| decode_campus(&body)).unwrap_or_default();
        assert!(records.is_empty());
        assert_eq!(reported, vec!["HTTP 404".to_string()]);
    }

    #[test]
    fn successful_body_passes_through_without_report() {
        let mut reported = false;
        let value: Option<serde_json::Value> = or_empty(
            read_body(200, r#"{"data":[]}"#).map(Some),
            |_| reported = true,
        );
        assert_eq!(value, Some(serde_json::json!({"data": []})));
        assert!(!reported);
    }
}
