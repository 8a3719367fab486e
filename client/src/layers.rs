use std::collections::{BTreeMap, HashSet};

use crowd_shared::geo::{BUILDING_RADIUS_METERS, haversine_meters};
use crowd_shared::trajectory::RouteSummary;
use crowd_shared::{AccessPointOccupancy, BuildingOccupancy, CampusPrediction, LatLng};

use crate::colors::{END_MARKER_COLOR, START_MARKER_COLOR};
use crate::viewport::Viewport;

/// A clickable building: hover circle plus a button in the building list.
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub name: String,
    pub position: LatLng,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerStyle {
    /// Bold text label centred on the point (access points).
    Label,
    /// 30 px white disc with a black border and the visit number.
    Numbered(usize),
    /// 10 px filled circle (route start and end).
    Dot((u8, u8, u8)),
}

impl MarkerStyle {
    /// Screen-space hit radius in CSS pixels.
    pub fn hit_radius(&self) -> f64 {
        match self {
            Self::Label | Self::Numbered(_) => 15.0,
            Self::Dot(_) => 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub position: LatLng,
    pub style: MarkerStyle,
    pub label: String,
    pub popup: Vec<String>,
}

/// Popup anchored at a map position; lines are rendered top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub position: LatLng,
    pub lines: Vec<String>,
}

/// Everything drawn for a plotted trajectory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteLayer {
    pub polyline: Vec<LatLng>,
    pub markers: Vec<MapMarker>,
}

fn dedupe(entries: impl Iterator<Item = (String, LatLng)>) -> Vec<Building> {
    let mut seen = HashSet::new();
    entries
        .filter(|(_, position)| position.is_finite())
        .filter(|(name, _)| seen.insert(name.clone()))
        .map(|(name, position)| Building { name, position })
        .collect()
}

pub fn buildings_from_campus(records: &[BuildingOccupancy]) -> Vec<Building> {
    dedupe(
        records
            .iter()
            .map(|record| (record.building.clone(), record.position())),
    )
}

pub fn buildings_from_predictions(predictions: &BTreeMap<String, CampusPrediction>) -> Vec<Building> {
    dedupe(
        predictions
            .iter()
            .map(|(name, prediction)| (name.clone(), prediction.position())),
    )
}

pub fn access_point_markers(access_points: &[AccessPointOccupancy]) -> Vec<MapMarker> {
    access_points
        .iter()
        .map(|ap| MapMarker {
            position: ap.position(),
            style: MarkerStyle::Label,
            label: ap.access_point.clone(),
            popup: vec![format!("Access Point: {}", ap.access_point)],
        })
        .collect()
}

/// Numbered visit markers followed by the start and end circles.
pub fn route_layer(summary: &RouteSummary, polyline: Vec<LatLng>) -> RouteLayer {
    let mut markers: Vec<MapMarker> = summary
        .markers
        .iter()
        .map(|visit| MapMarker {
            position: visit.position,
            style: MarkerStyle::Numbered(visit.number),
            label: visit.number.to_string(),
            popup: visit.popup.clone(),
        })
        .collect();
    markers.push(MapMarker {
        position: summary.start.position(),
        style: MarkerStyle::Dot(START_MARKER_COLOR),
        label: String::new(),
        popup: summary.start_popup(),
    });
    markers.push(MapMarker {
        position: summary.end.position(),
        style: MarkerStyle::Dot(END_MARKER_COLOR),
        label: String::new(),
        popup: summary.end_popup(),
    });
    RouteLayer { polyline, markers }
}

/// Topmost marker under the cursor. Later markers are drawn on top, so the
/// search runs back to front.
pub fn marker_at<'a>(
    markers: impl DoubleEndedIterator<Item = &'a MapMarker>,
    vp: &Viewport,
    sx: f64,
    sy: f64,
) -> Option<&'a MapMarker> {
    markers.rev().find(|marker| {
        let (mx, my) = vp.to_screen(marker.position);
        let r = marker.style.hit_radius();
        (mx - sx).powi(2) + (my - sy).powi(2) <= r * r
    })
}

/// Nearest building whose 50 m circle contains the cursor.
pub fn building_at<'a>(buildings: &'a [Building], vp: &Viewport, sx: f64, sy: f64) -> Option<&'a Building> {
    let cursor = vp.to_latlng(sx, sy);
    buildings
        .iter()
        .map(|building| (building, haversine_meters(cursor, building.position)))
        .filter(|(_, distance)| *distance <= BUILDING_RADIUS_METERS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(building, _)| building)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowd_shared::TrajectorySegment;
    use crowd_shared::trajectory::summarize_route;

    fn record(name: &str, lat: f64, lng: f64) -> BuildingOccupancy {
        BuildingOccupancy {
            date: None,
            building: name.to_string(),
            building_lat: lat,
            building_long: lng,
            connection_count: Some(3.0),
            prediction: None,
        }
    }

    fn segment(name: &str, lat: f64, start: &str, end: &str) -> TrajectorySegment {
        TrajectorySegment {
            building: name.to_string(),
            building_lat: lat,
            building_long: -72.527,
            start_time: start.to_string(),
            end_time: end.to_string(),
            total_time: 10.0,
        }
    }

    #[test]
    fn campus_buildings_are_deduplicated_in_order() {
        let buildings = buildings_from_campus(&[
            record("Library", 42.39, -72.52),
            record("Gym", 42.391, -72.53),
            record("Library", 42.39, -72.52),
            record("Broken", f64::NAN, -72.52),
        ]);
        let names: Vec<_> = buildings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Library", "Gym"]);
    }

    #[test]
    fn access_points_become_labels() {
        let markers = access_point_markers(&[AccessPointOccupancy {
            date: None,
            access_point: "AP-2-14".into(),
            connection_count: 4.0,
            building_lat: 42.39,
            building_long: -72.52,
        }]);
        assert_eq!(markers[0].style, MarkerStyle::Label);
        assert_eq!(markers[0].popup, vec!["Access Point: AP-2-14".to_string()]);
    }

    #[test]
    fn route_layer_ends_with_start_and_end_circles() {
        let segments = vec![
            segment("Library", 42.390, "9:00 am", "9:30 am"),
            segment("Gym", 42.393, "10:00 am", "11:00 am"),
        ];
        let summary = summarize_route(&segments, &[Some(5.0), None]).expect("route");
        let layer = route_layer(&summary, summary.waypoints.clone());
        assert_eq!(layer.markers.len(), 4);
        assert_eq!(layer.markers[2].style, MarkerStyle::Dot(START_MARKER_COLOR));
        assert_eq!(layer.markers[2].popup[0], "Start: Library");
        assert_eq!(layer.markers[3].popup[0], "End: Gym");
        assert_eq!(layer.polyline.len(), 2);
    }

    #[test]
    fn hit_testing_prefers_topmost_marker() {
        let vp = Viewport::default();
        let position = vp.center;
        let markers = vec![
            MapMarker {
                position,
                style: MarkerStyle::Numbered(1),
                label: "1".into(),
                popup: vec!["first".into()],
            },
            MapMarker {
                position,
                style: MarkerStyle::Dot(END_MARKER_COLOR),
                label: String::new(),
                popup: vec!["second".into()],
            },
        ];
        let hit = marker_at(markers.iter(), &vp, 603.0, 398.0).expect("hit");
        assert_eq!(hit.popup[0], "second");
        assert!(marker_at(markers.iter(), &vp, 640.0, 400.0).is_none());
    }

    #[test]
    fn building_hover_uses_fifty_metre_radius() {
        let vp = Viewport::default();
        let buildings = vec![Building {
            name: "Library".into(),
            position: vp.center,
        }];
        // ~56 px is 50 m at zoom 17 on campus.
        assert!(building_at(&buildings, &vp, 640.0, 400.0).is_some());
        assert!(building_at(&buildings, &vp, 700.0, 400.0).is_none());
    }
}
