use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::LatLng;

/// One building entry of the campus occupancy payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingOccupancy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub building: String,
    pub building_lat: f64,
    pub building_long: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
}

impl BuildingOccupancy {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.building_lat, self.building_long)
    }

    pub fn intensity(&self) -> Option<f64> {
        pick_intensity(self.prediction, self.connection_count)
    }
}

/// Building endpoint payload. `average` and `standard_deviation` are only
/// present for hourly granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingStats {
    pub building: String,
    pub building_lat: f64,
    pub building_long: f64,
    #[serde(default)]
    pub connection_count: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_deviation: Option<f64>,
    #[serde(default)]
    pub no_floors: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
}

impl BuildingStats {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.building_lat, self.building_long)
    }

    pub fn intensity(&self) -> f64 {
        pick_intensity(self.prediction, Some(self.connection_count)).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPointOccupancy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub access_point: String,
    #[serde(default)]
    pub connection_count: f64,
    pub building_lat: f64,
    pub building_long: f64,
}

impl AccessPointOccupancy {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.building_lat, self.building_long)
    }
}

/// A stay of one device inside one building. Times are 12-hour clock
/// strings such as `"1:05 pm"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySegment {
    pub building: String,
    pub building_lat: f64,
    pub building_long: f64,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub total_time: f64,
}

impl TrajectorySegment {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.building_lat, self.building_long)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampusPrediction {
    pub lat: f64,
    pub long: f64,
    #[serde(default)]
    pub predicted_occupancy: Vec<Vec<f64>>,
}

impl CampusPrediction {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.long)
    }

    pub fn first_value(&self) -> Option<f64> {
        first_nested(&self.predicted_occupancy)
    }
}

// A zero prediction falls through to the observed count.
fn pick_intensity(prediction: Option<f64>, connection_count: Option<f64>) -> Option<f64> {
    match (prediction, connection_count) {
        (Some(p), _) if p != 0.0 && p.is_finite() => Some(p),
        (_, Some(c)) if c.is_finite() => Some(c),
        (Some(p), None) if p.is_finite() => Some(p),
        _ => None,
    }
}

fn first_nested(values: &[Vec<f64>]) -> Option<f64> {
    values.first()?.first().copied().filter(|v| v.is_finite())
}

fn decode_list<T: DeserializeOwned>(body: &Value, key: &str) -> Vec<T> {
    match body.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// `data` of the campus endpoint. Malformed entries are skipped.
pub fn decode_campus(body: &Value) -> Vec<BuildingOccupancy> {
    decode_list(body, "data")
}

/// `data` of the building endpoint, or `None` for "Data Unavailable".
pub fn decode_building_stats(body: &Value) -> Option<BuildingStats> {
    let data = body.get("data")?;
    if !data.is_object() {
        return None;
    }
    serde_json::from_value(data.clone()).ok()
}

pub fn decode_access_points(body: &Value) -> Vec<AccessPointOccupancy> {
    decode_list(body, "data")
}

/// First non-empty session of the trajectory payload.
pub fn decode_trajectory(body: &Value) -> Option<Vec<TrajectorySegment>> {
    let Value::Array(sessions) = body.get("data")? else {
        return None;
    };
    sessions.iter().find_map(|session| {
        let Value::Array(items) = session else {
            return None;
        };
        let segments: Vec<TrajectorySegment> = items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect();
        (!segments.is_empty()).then_some(segments)
    })
}

pub fn decode_campus_predictions(body: &Value) -> BTreeMap<String, CampusPrediction> {
    let Some(Value::Object(entries)) = body.get("predictions") else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(name, raw)| {
            serde_json::from_value::<CampusPrediction>(raw.clone())
                .ok()
                .map(|prediction| (name.clone(), prediction))
        })
        .collect()
}

pub fn decode_building_prediction(body: &Value) -> Option<f64> {
    let nested: Vec<Vec<f64>> = serde_json::from_value(body.get("prediction")?.clone()).ok()?;
    first_nested(&nested)
}

/// Counts render without a trailing `.0`; fractional values keep up to two
/// decimals.
pub fn format_occupancy(value: f64) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn campus_decode_skips_malformed_entries() {
        let body = json!({
            "data": [
                {"date": "2021-03-01T13:00", "building": "LGRT", "building_lat": 42.39, "building_long": -72.53, "connection_count": 120},
                {"building": "BAD"},
                {"building": "ILC", "building_lat": 42.391, "building_long": -72.526}
            ]
        });
        let records = decode_campus(&body);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].intensity(), Some(120.0));
        assert_eq!(records[1].intensity(), None);
    }

    #[test]
    fn unavailable_payloads_degrade_to_defaults() {
        let body = json!({"data": "Data Unavailable"});
        assert!(decode_campus(&body).is_empty());
        assert!(decode_building_stats(&body).is_none());
        assert!(decode_access_points(&body).is_empty());
        assert!(decode_trajectory(&body).is_none());
        assert!(decode_campus_predictions(&json!({})).is_empty());
        assert!(decode_building_prediction(&json!({"prediction": null})).is_none());
    }

    #[test]
    fn prediction_takes_precedence_unless_zero() {
        let mut record = BuildingOccupancy {
            date: None,
            building: "LGRC".into(),
            building_lat: 0.0,
            building_long: 0.0,
            connection_count: Some(40.0),
            prediction: Some(12.5),
        };
        assert_eq!(record.intensity(), Some(12.5));
        record.prediction = Some(0.0);
        assert_eq!(record.intensity(), Some(40.0));
        record.connection_count = None;
        assert_eq!(record.intensity(), Some(0.0));
    }

    #[test]
    fn building_stats_decode_hourly_fields() {
        let body = json!({
            "data": {
                "building": "LGRT",
                "building_lat": 42.39,
                "building_long": -72.53,
                "connection_count": 88,
                "average": 33.5,
                "standard_deviation": 4.25,
                "no_floors": 4
            }
        });
        let stats = decode_building_stats(&body).expect("stats should decode");
        assert_eq!(stats.no_floors, 4);
        assert_eq!(stats.average, Some(33.5));
        assert_eq!(stats.intensity(), 88.0);
    }

    #[test]
    fn trajectory_uses_first_non_empty_session() {
        let body = json!({
            "data": [
                [],
                [
                    {"building": "LGRT", "building_lat": 42.39, "building_long": -72.53,
                     "start_time": "9:05 am", "end_time": "10:40 am", "total_time": 95}
                ],
                [
                    {"building": "ILC", "building_lat": 42.391, "building_long": -72.526,
                     "start_time": "1:00 pm", "end_time": "2:00 pm", "total_time": 60}
                ]
            ]
        });
        let segments = decode_trajectory(&body).expect("trajectory should decode");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].building, "LGRT");
        assert!(decode_trajectory(&json!({"data": []})).is_none());
    }

    #[test]
    fn predictions_take_first_nested_value() {
        let body = json!({
            "predictions": {
                "LGRT": {"lat": 42.39, "long": -72.53, "predicted_occupancy": [[3.25], [1.0]]},
                "ILC": {"lat": 42.391, "long": -72.526, "predicted_occupancy": []}
            }
        });
        let predictions = decode_campus_predictions(&body);
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions["LGRT"].first_value(), Some(3.25));
        assert_eq!(predictions["ILC"].first_value(), None);

        assert_eq!(
            decode_building_prediction(&json!({"prediction": [[7.5]]})),
            Some(7.5)
        );
    }

    #[test]
    fn occupancy_formatting_drops_integral_decimals() {
        assert_eq!(format_occupancy(12.0), "12");
        assert_eq!(format_occupancy(12.3), "12.3");
        assert_eq!(format_occupancy(1.0 / 3.0), "0.33");
        assert_eq!(format_occupancy(f64::NAN), "N/A");
    }
}
