use leptos::prelude::*;

use crowd_shared::heat::PREDICTION_SCALE;
use crowd_shared::trajectory::RouteSummary;
use crowd_shared::{BuildingStats, ViewMode, format_occupancy};

use crate::dashboard::Dashboard;

#[derive(Debug, Clone, PartialEq)]
pub struct StatsPanel {
    pub title: String,
    pub lines: Vec<String>,
}

fn minutes_text(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), format_occupancy)
}

pub fn building_stats_panel(stats: &BuildingStats, mode: ViewMode) -> StatsPanel {
    let occupancy = format_occupancy(stats.connection_count);
    let lines = match mode {
        ViewMode::ByHour => vec![
            format!("Hourly Occupancy: {occupancy}"),
            format!("Avg Stay: {} min", minutes_text(stats.average)),
            format!("Std Dev: {} min", minutes_text(stats.standard_deviation)),
            format!("Floors: {}", stats.no_floors),
        ],
        ViewMode::ByMinute => vec![format!("Current Occupancy: {occupancy}")],
    };
    StatsPanel {
        title: format!("{} Stats:", stats.building),
        lines,
    }
}

/// Predicted values are shown on the same scale as the occupancy counter.
pub fn prediction_stats_panel(building: &str, value: f64, mode: ViewMode) -> StatsPanel {
    let shown = format_occupancy(value * PREDICTION_SCALE);
    let line = match mode {
        ViewMode::ByHour => format!("Predicted Hourly Occupancy: {shown}"),
        ViewMode::ByMinute => format!("Predicted Current Occupancy: {shown}"),
    };
    StatsPanel {
        title: format!("{building} Stats:"),
        lines: vec![line],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteDetails {
    pub start_time: String,
    pub end_time: String,
    pub places_visited: Vec<String>,
}

pub fn route_details(summary: &RouteSummary) -> RouteDetails {
    RouteDetails {
        start_time: summary.start.start_time.clone(),
        end_time: summary.end.end_time.clone(),
        places_visited: summary.places_visited.clone(),
    }
}

const PANEL_STYLE: &str = "background: #13161f; border: 1px solid #282c3e; border-radius: 6px; padding: 10px 12px; color: #e2e0d8; font-family: 'Inter', sans-serif; font-size: 0.8rem; min-width: 200px; max-width: 280px; pointer-events: auto;";

/// Building stats and route details, stacked in the top-right corner.
#[component]
pub fn InfoPanels() -> impl IntoView {
    let dashboard: Dashboard = expect_context();

    view! {
        <div style="position: absolute; top: 12px; right: 12px; display: flex; flex-direction: column; gap: 8px; z-index: 10; pointer-events: none;">
            {move || dashboard.stats.get().map(|panel| view! {
                <div style=PANEL_STYLE>
                    <div style="font-weight: 600; color: #f5c542; margin-bottom: 6px;">{panel.title}</div>
                    {panel.lines.into_iter().map(|line| view! {
                        <div style="font-family: 'JetBrains Mono', monospace; font-size: 0.74rem; line-height: 1.5;">{line}</div>
                    }).collect_view()}
                </div>
            })}
            {move || dashboard.route.get().map(|route| {
                let details = route.details;
                view! {
                    <div style=PANEL_STYLE>
                        <div style="font-weight: 600; color: #f5c542; margin-bottom: 6px;">"Route Details"</div>
                        <div><strong>"Start Time: "</strong>{details.start_time}</div>
                        <div><strong>"End Time: "</strong>{details.end_time}</div>
                        <div style="margin-top: 6px;"><strong>"Places Visited:"</strong></div>
                        <ul style="margin: 4px 0 0 0; padding-left: 18px; max-height: 220px; overflow-y: auto;">
                            {details.places_visited.into_iter().map(|place| view! {
                                <li style="font-size: 0.74rem; color: #9a9590;">{place}</li>
                            }).collect_view()}
                        </ul>
                    </div>
                }
            })}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowd_shared::TrajectorySegment;
    use crowd_shared::trajectory::summarize_route;

    fn stats() -> BuildingStats {
        BuildingStats {
            building: "Library".into(),
            building_lat: 42.39,
            building_long: -72.52,
            connection_count: 120.0,
            average: Some(34.5),
            standard_deviation: None,
            no_floors: 4,
            prediction: None,
        }
    }

    #[test]
    fn hourly_stats_list_all_fields() {
        let panel = building_stats_panel(&stats(), ViewMode::ByHour);
        assert_eq!(panel.title, "Library Stats:");
        assert_eq!(
            panel.lines,
            [
                "Hourly Occupancy: 120",
                "Avg Stay: 34.5 min",
                "Std Dev: N/A min",
                "Floors: 4",
            ]
        );
    }

    #[test]
    fn minute_stats_show_current_occupancy_only() {
        let panel = building_stats_panel(&stats(), ViewMode::ByMinute);
        assert_eq!(panel.lines, ["Current Occupancy: 120"]);
    }

    #[test]
    fn prediction_stats_use_counter_scale() {
        let panel = prediction_stats_panel("Library", 1.23, ViewMode::ByMinute);
        assert_eq!(panel.lines, ["Predicted Current Occupancy: 12.3"]);
        let hourly = prediction_stats_panel("Library", 2.0, ViewMode::ByHour);
        assert_eq!(hourly.lines, ["Predicted Hourly Occupancy: 20"]);
    }

    #[test]
    fn route_details_cover_whole_trip() {
        let segment = |name: &str, start: &str, end: &str| TrajectorySegment {
            building: name.into(),
            building_lat: 42.39,
            building_long: -72.52,
            start_time: start.into(),
            end_time: end.into(),
            total_time: 5.0,
        };
        let segments = vec![
            segment("Library", "9:00 am", "9:40 am"),
            segment("Gym", "10:05 am", "11:00 am"),
        ];
        let summary = summarize_route(&segments, &[]).expect("summary");
        let details = route_details(&summary);
        assert_eq!(details.start_time, "9:00 am");
        assert_eq!(details.end_time, "11:00 am");
        assert_eq!(
            details.places_visited,
            ["Library (9:00 am - 9:40 am)", "Gym (10:05 am - 11:00 am)"]
        );
    }
}
