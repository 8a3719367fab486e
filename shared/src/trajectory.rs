use crate::clock::{MINUTES_PER_DAY, parse_clock_minutes};
use crate::geo::LatLng;
use crate::heat::{HeatPoint, HeatSource};
use crate::occupancy::{TrajectorySegment, format_occupancy};

/// Heat intensity multiplier for per-visit building occupancy.
pub const ROUTE_HEAT_SCALE: f64 = 10.0;

/// One numbered marker per distinct building, numbered in first-visit order.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitMarker {
    pub number: usize,
    pub building: String,
    pub position: LatLng,
    /// Building name followed by one line per visit.
    pub popup: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub waypoints: Vec<LatLng>,
    pub markers: Vec<VisitMarker>,
    pub places_visited: Vec<String>,
    pub start: TrajectorySegment,
    pub end: TrajectorySegment,
    /// Slider bounds in minutes, when both ends parse. A route that crosses
    /// midnight ends past `MINUTES_PER_DAY`; read values modulo a day.
    pub window: Option<(u32, u32)>,
    pub heat: Vec<HeatPoint>,
}

impl RouteSummary {
    pub fn start_popup(&self) -> Vec<String> {
        vec![
            format!("Start: {}", self.start.building),
            self.start.start_time.clone(),
        ]
    }

    pub fn end_popup(&self) -> Vec<String> {
        vec![
            format!("End: {}", self.end.building),
            self.end.end_time.clone(),
        ]
    }
}

/// Builds every route layer from the first trajectory session. `occupancy`
/// holds the building occupancy observed at each segment's start time, in
/// segment order; missing entries read as "N/A".
pub fn summarize_route(
    segments: &[TrajectorySegment],
    occupancy: &[Option<f64>],
) -> Option<RouteSummary> {
    let start = segments.first()?.clone();
    let end = segments.last()?.clone();

    let mut markers: Vec<VisitMarker> = Vec::new();
    let mut places_visited = Vec::with_capacity(segments.len());
    let mut heat = Vec::new();

    for (idx, segment) in segments.iter().enumerate() {
        let observed = occupancy.get(idx).copied().flatten();
        let occupancy_text = observed.map_or_else(|| "N/A".to_string(), format_occupancy);
        if let Some(value) = observed {
            heat.push(HeatPoint::new(
                segment.position(),
                value * ROUTE_HEAT_SCALE,
                HeatSource::Raw,
            ));
        }

        let visit = format!(
            "{} - {} (Occupancy: {occupancy_text})",
            segment.start_time, segment.end_time
        );
        match markers.iter_mut().find(|m| m.building == segment.building) {
            Some(marker) => marker.popup.push(visit),
            None => markers.push(VisitMarker {
                number: markers.len() + 1,
                building: segment.building.clone(),
                position: segment.position(),
                popup: vec![segment.building.clone(), visit],
            }),
        }

        places_visited.push(format!(
            "{} ({} - {})",
            segment.building, segment.start_time, segment.end_time
        ));
    }

    let window = match (
        parse_clock_minutes(&start.start_time),
        parse_clock_minutes(&end.end_time),
    ) {
        (Some(from), Some(to)) if to < from => Some((from, to + MINUTES_PER_DAY)),
        (Some(from), Some(to)) => Some((from, to)),
        _ => None,
    };

    Some(RouteSummary {
        waypoints: segments.iter().map(TrajectorySegment::position).collect(),
        markers,
        places_visited,
        start,
        end,
        window,
        heat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(building: &str, lat: f64, start: &str, end: &str) -> TrajectorySegment {
        TrajectorySegment {
            building: building.to_string(),
            building_lat: lat,
            building_long: -72.53,
            start_time: start.to_string(),
            end_time: end.to_string(),
            total_time: 0.0,
        }
    }

    #[test]
    fn empty_session_has_no_summary() {
        assert!(summarize_route(&[], &[]).is_none());
    }

    #[test]
    fn markers_group_repeat_visits_in_first_visit_order() {
        let segments = vec![
            segment("LGRT", 42.390, "9:05 am", "10:40 am"),
            segment("ILC", 42.391, "11:00 am", "12:15 pm"),
            segment("LGRT", 42.390, "1:00 pm", "2:30 pm"),
        ];
        let summary =
            summarize_route(&segments, &[Some(12.0), None, Some(7.5)]).expect("summary");

        assert_eq!(summary.markers.len(), 2);
        assert_eq!(summary.markers[0].number, 1);
        assert_eq!(summary.markers[0].building, "LGRT");
        assert_eq!(
            summary.markers[0].popup,
            vec![
                "LGRT".to_string(),
                "9:05 am - 10:40 am (Occupancy: 12)".to_string(),
                "1:00 pm - 2:30 pm (Occupancy: 7.5)".to_string(),
            ]
        );
        assert_eq!(summary.markers[1].number, 2);
        assert_eq!(summary.markers[1].popup[1], "11:00 am - 12:15 pm (Occupancy: N/A)");

        assert_eq!(summary.places_visited.len(), 3);
        assert_eq!(summary.places_visited[1], "ILC (11:00 am - 12:15 pm)");
        assert_eq!(summary.waypoints.len(), 3);
    }

    #[test]
    fn heat_is_scaled_occupancy_of_known_visits() {
        let segments = vec![
            segment("LGRT", 42.390, "9:05 am", "10:40 am"),
            segment("ILC", 42.391, "11:00 am", "12:15 pm"),
        ];
        let summary = summarize_route(&segments, &[Some(3.0)]).expect("summary");
        assert_eq!(summary.heat.len(), 1);
        assert_eq!(summary.heat[0].intensity, 30.0);
        assert_eq!(summary.heat[0].source, HeatSource::Raw);
    }

    #[test]
    fn window_spans_start_to_end_in_minutes() {
        let segments = vec![
            segment("LGRT", 42.390, "9:05 am", "10:40 am"),
            segment("ILC", 42.391, "11:00 am", "1:15 pm"),
        ];
        let summary = summarize_route(&segments, &[]).expect("summary");
        assert_eq!(summary.window, Some((545, 795)));
        assert_eq!(summary.start_popup(), vec!["Start: LGRT", "9:05 am"]);
        assert_eq!(summary.end_popup(), vec!["End: ILC", "1:15 pm"]);
    }

    #[test]
    fn window_past_midnight_continues_into_the_next_day() {
        let segments = vec![
            segment("LGRT", 42.390, "11:30 pm", "11:50 pm"),
            segment("ILC", 42.391, "11:55 pm", "12:20 am"),
        ];
        let summary = summarize_route(&segments, &[]).expect("summary");
        assert_eq!(summary.window, Some((1410, 1460)));
    }
}
