//! View state shared by the map and the controls, and the operations the
//! DOM handlers call. Fetches run as independent `spawn_local` futures;
//! every result is applied only if its request ticket is still the latest.

use std::cell::RefCell;

use gloo_timers::callback::{Interval, Timeout};
use leptos::prelude::*;
use serde::{Deserialize, Serialize};
use wasm_bindgen_futures::spawn_local;

use crowd_shared::clock::{
    DEFAULT_OBSERVED_DATE, DEFAULT_PREDICTED_DATE, DEFAULT_TRAJECTORY_DATE, MINUTES_PER_DAY,
    SliderMemory, clean_time_format, format_time, is_valid_date, parse_clock_minutes, resolve_date,
};
use crowd_shared::geo::{BUILDING_ZOOM, CAMPUS_CENTER, CAMPUS_ZOOM};
use crowd_shared::heat::{
    GradientStops, OCCUPANCY_GRADIENT, PREDICTION_GRADIENT, PREDICTION_SCALE,
    access_point_heat_points, as_raw, building_heat_point, campus_heat_points,
    predicted_counter_value, prediction_heat_points, total_count,
};
use crowd_shared::trajectory::summarize_route;
use crowd_shared::{
    AccessPointOccupancy, Granularity, HeatPoint, HeatSource, ViewMode, format_occupancy,
};

use crate::api;
use crate::layers::{
    Building, MapMarker, Popup, RouteLayer, access_point_markers, buildings_from_campus,
    buildings_from_predictions, route_layer,
};
use crate::panels::{
    RouteDetails, StatsPanel, building_stats_panel, prediction_stats_panel, route_details,
};
use crate::viewport::Viewport;

pub const SLIDER_DEBOUNCE_MS: u32 = 300;
pub const ANIMATION_STEP_MS: u32 = 1_000;
pub const REFRESH_INTERVAL_MS: u32 = 10_000;
/// Time of day used to discover the building list.
const BUILDING_DISCOVERY_TIME: &str = "13:00";

thread_local! {
    static SLIDER_DEBOUNCE: RefCell<Option<Timeout>> = const { RefCell::new(None) };
    static ANIMATION_INTERVAL: RefCell<Option<Interval>> = const { RefCell::new(None) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataSource {
    #[default]
    Observed,
    Predicted,
}

impl DataSource {
    pub fn default_date(self) -> &'static str {
        match self {
            Self::Observed => DEFAULT_OBSERVED_DATE,
            Self::Predicted => DEFAULT_PREDICTED_DATE,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Observed => Self::Predicted,
            Self::Predicted => Self::Observed,
        }
    }

    /// Label of the button that switches away from this source.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Self::Observed => "View Predictions",
            Self::Predicted => "View Observed",
        }
    }

    pub fn gradient(self) -> GradientStops {
        match self {
            Self::Observed => OCCUPANCY_GRADIENT,
            Self::Predicted => PREDICTION_GRADIENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteView {
    pub layer: RouteLayer,
    pub details: RouteDetails,
}

/// Occupancy counter text. Campus totals are shown in both view modes; a
/// selected building only has a counter in by-minute mode.
pub fn counter_text(
    source: DataSource,
    mode: ViewMode,
    building: Option<&str>,
    total: f64,
) -> String {
    let (verb, shown) = match source {
        DataSource::Observed => ("current", format_occupancy(total)),
        DataSource::Predicted => ("predicted", format_occupancy(predicted_counter_value(total))),
    };
    match (mode, building) {
        (ViewMode::ByMinute, Some(name)) => format!("{name} {verb} occupancy: {shown}"),
        (ViewMode::ByHour, Some(_)) => String::new(),
        (_, None) => format!("Campus {verb} occupancy: {shown}"),
    }
}

/// Slider range: the route's time window during trajectory playback,
/// otherwise the whole day at the mode's resolution.
pub fn slider_bounds(mode: ViewMode, window: Option<(u32, u32)>) -> (u32, u32) {
    window.unwrap_or((0, mode.slider_max()))
}

/// Minute of day a slider value stands for. Route windows may run past
/// midnight, so their values wrap.
pub fn display_minutes(mode: ViewMode, window: Option<(u32, u32)>, value: u32) -> u32 {
    match window {
        Some((from, to)) => value.clamp(from, to) % MINUTES_PER_DAY,
        None => mode.slider_to_minutes(value),
    }
}

/// Next slider value for one animation step; `None` once playback passes the
/// end of the route window.
pub fn animation_step(mode: ViewMode, window: Option<(u32, u32)>, value: u32) -> Option<u32> {
    match window {
        Some((_, to)) => (value < to).then_some(value + 1),
        None => Some(mode.advance(value)),
    }
}

/// The dashboard opens at 13:00.
fn initial_slider(mode: ViewMode) -> u32 {
    match mode {
        ViewMode::ByMinute => 13 * 60,
        ViewMode::ByHour => 13,
    }
}

/// Alert for the "View occupancy" button, `None` when the input (trimmed,
/// as [`resolve_date`] sees it) is a usable date.
pub fn invalid_date_message(input: &str, source: DataSource) -> Option<String> {
    (!is_valid_date(input.trim())).then(|| {
        format!(
            "Invalid date format. Using default date: {}.",
            source.default_date()
        )
    })
}

/// Tickets for one family of requests. A response is applied only while
/// its ticket is the newest one issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestGate {
    latest: u64,
}

impl RequestGate {
    pub fn issue(&mut self) -> u64 {
        self.latest = self.latest.wrapping_add(1);
        self.latest
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest == ticket
    }
}

fn issue(gate: RwSignal<RequestGate>) -> u64 {
    let mut next = gate.get_untracked();
    let ticket = next.issue();
    gate.set(next);
    ticket
}

fn is_current(gate: RwSignal<RequestGate>, ticket: u64) -> bool {
    gate.with_untracked(|g| g.is_current(ticket))
}

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

/// Heat points plus the raw total feeding the counter.
struct HeatFrame {
    points: Vec<HeatPoint>,
    total: f64,
}

#[derive(Clone, Copy)]
pub struct Dashboard {
    pub viewport: RwSignal<Viewport>,
    pub date_input: RwSignal<String>,
    pub trajectory_date: RwSignal<String>,
    pub device_id: RwSignal<String>,
    pub source: RwSignal<DataSource>,
    pub view_mode: RwSignal<ViewMode>,
    pub slider: RwSignal<u32>,
    slider_memory: StoredValue<SliderMemory>,
    pub buildings: RwSignal<Vec<Building>>,
    pub selected_building: RwSignal<Option<Building>>,
    pub selected_floor: RwSignal<Option<u32>>,
    pub floor_count: RwSignal<u32>,
    pub access_points: RwSignal<Vec<AccessPointOccupancy>>,
    pub access_point_markers: RwSignal<Vec<MapMarker>>,
    /// Unscaled heat; zoom-dependent divisors are applied at draw time.
    pub heat: RwSignal<Vec<HeatPoint>>,
    pub counter: RwSignal<String>,
    pub stats: RwSignal<Option<StatsPanel>>,
    pub route: RwSignal<Option<RouteView>>,
    pub playback_window: RwSignal<Option<(u32, u32)>>,
    pub playing: RwSignal<bool>,
    pub popup: RwSignal<Option<Popup>>,
    pub last_updated: RwSignal<Option<String>>,
    heat_gate: RwSignal<RequestGate>,
    stats_gate: RwSignal<RequestGate>,
    access_gate: RwSignal<RequestGate>,
    route_gate: RwSignal<RequestGate>,
    buildings_gate: RwSignal<RequestGate>,
}

impl Dashboard {
    pub fn new(
        viewport: RwSignal<Viewport>,
        source: DataSource,
        view_mode: ViewMode,
        date: String,
        trajectory_date: String,
    ) -> Self {
        Self {
            viewport,
            date_input: RwSignal::new(date),
            trajectory_date: RwSignal::new(trajectory_date),
            device_id: RwSignal::new(String::new()),
            source: RwSignal::new(source),
            view_mode: RwSignal::new(view_mode),
            slider: RwSignal::new(initial_slider(view_mode)),
            slider_memory: StoredValue::new(SliderMemory::default()),
            buildings: RwSignal::new(Vec::new()),
            selected_building: RwSignal::new(None),
            selected_floor: RwSignal::new(None),
            floor_count: RwSignal::new(0),
            access_points: RwSignal::new(Vec::new()),
            access_point_markers: RwSignal::new(Vec::new()),
            heat: RwSignal::new(Vec::new()),
            counter: RwSignal::new(String::new()),
            stats: RwSignal::new(None),
            route: RwSignal::new(None),
            playback_window: RwSignal::new(None),
            playing: RwSignal::new(false),
            popup: RwSignal::new(None),
            last_updated: RwSignal::new(None),
            heat_gate: RwSignal::new(RequestGate::default()),
            stats_gate: RwSignal::new(RequestGate::default()),
            access_gate: RwSignal::new(RequestGate::default()),
            route_gate: RwSignal::new(RequestGate::default()),
            buildings_gate: RwSignal::new(RequestGate::default()),
        }
    }

    /// Date typed by the user, or the source's default when it does not
    /// parse.
    pub fn current_date(&self) -> String {
        let source = self.source.get_untracked();
        self.date_input
            .with_untracked(|input| resolve_date(input, source.default_date()).to_string())
    }

    pub fn slider_bounds(&self) -> (u32, u32) {
        slider_bounds(self.view_mode.get(), self.playback_window.get())
    }

    pub fn display_minutes(&self) -> u32 {
        display_minutes(
            self.view_mode.get(),
            self.playback_window.get(),
            self.slider.get(),
        )
    }

    fn request_time(&self) -> String {
        format_time(display_minutes(
            self.view_mode.get_untracked(),
            self.playback_window.get_untracked(),
            self.slider.get_untracked(),
        ))
    }

    /// Discovers the building list at 13:00 of the current date, then draws
    /// the heatmap.
    pub fn initialize_buildings(self) {
        let ticket = issue(self.buildings_gate);
        let source = self.source.get_untracked();
        let date = self.current_date();
        spawn_local(async move {
            let buildings = match source {
                DataSource::Observed => {
                    let records =
                        api::fetch_campus_occupancy(&date, BUILDING_DISCOVERY_TIME, Granularity::Minute)
                            .await;
                    buildings_from_campus(&records)
                }
                DataSource::Predicted => {
                    let predictions =
                        api::fetch_campus_predictions(&date, BUILDING_DISCOVERY_TIME).await;
                    buildings_from_predictions(&predictions)
                }
            };
            if !is_current(self.buildings_gate, ticket) {
                return;
            }
            self.buildings.set(buildings);
            self.update_heatmap();
        });
    }

    /// Fetches data for the slider time and replaces the heat layer, the
    /// counter and, with a building selected, the stats panel.
    pub fn update_heatmap(self) {
        let ticket = issue(self.heat_gate);
        let date = self.current_date();
        let time = self.request_time();

        if self.playback_window.get_untracked().is_some() {
            spawn_local(async move {
                let records = api::fetch_campus_occupancy(&date, &time, Granularity::Minute).await;
                if !is_current(self.heat_gate, ticket) {
                    return;
                }
                self.heat.set(as_raw(campus_heat_points(&records)));
                self.mark_updated();
            });
            return;
        }

        let source = self.source.get_untracked();
        let mode = self.view_mode.get_untracked();
        let granularity = mode.granularity();
        let building = self.selected_building.get_untracked();
        let floor = self.selected_floor.get_untracked();

        spawn_local(async move {
            let frame = match (source, building.as_ref()) {
                (DataSource::Observed, Some(building)) => {
                    let stats =
                        api::fetch_building_occupancy(&building.name, &date, &time, granularity)
                            .await;
                    match stats {
                        Some(stats) => HeatFrame {
                            points: vec![building_heat_point(&stats)],
                            total: stats.connection_count,
                        },
                        None => {
                            web_sys::console::warn_1(
                                &format!("No data found for selected building: {}", building.name)
                                    .into(),
                            );
                            HeatFrame {
                                points: Vec::new(),
                                total: 0.0,
                            }
                        }
                    }
                }
                (DataSource::Observed, None) => {
                    let records = api::fetch_campus_occupancy(&date, &time, granularity).await;
                    let points = campus_heat_points(&records);
                    let total = total_count(&points);
                    HeatFrame { points, total }
                }
                (DataSource::Predicted, Some(building)) => {
                    let value = api::fetch_building_prediction(&building.name, &date, &time)
                        .await
                        .unwrap_or(0.0);
                    HeatFrame {
                        points: vec![HeatPoint::new(
                            building.position,
                            value * PREDICTION_SCALE,
                            HeatSource::Prediction,
                        )],
                        total: value,
                    }
                }
                (DataSource::Predicted, None) => {
                    let predictions = api::fetch_campus_predictions(&date, &time).await;
                    let total = predictions.values().filter_map(|p| p.first_value()).sum();
                    HeatFrame {
                        points: prediction_heat_points(&predictions),
                        total,
                    }
                }
            };

            if !is_current(self.heat_gate, ticket) {
                return;
            }

            let mut points = frame.points;
            if source == DataSource::Observed && building.is_some() && floor.is_some() {
                let access = self
                    .access_points
                    .with_untracked(|aps| access_point_heat_points(aps));
                if !access.is_empty() {
                    points = access;
                }
            }
            self.heat.set(points);
            self.counter.set(counter_text(
                source,
                mode,
                building.as_ref().map(|b| b.name.as_str()),
                frame.total,
            ));
            self.mark_updated();

            if building.is_some() {
                self.update_building_stats();
            }
        });
    }

    fn mark_updated(&self) {
        self.last_updated
            .set(Some(chrono::Local::now().format("%H:%M:%S").to_string()));
    }

    /// Refreshes the stats panel and floor buttons for the selected building.
    /// A failed fetch keeps the previous panel.
    pub fn update_building_stats(self) {
        let Some(building) = self.selected_building.get_untracked() else {
            return;
        };
        let ticket = issue(self.stats_gate);
        let source = self.source.get_untracked();
        let mode = self.view_mode.get_untracked();
        let date = self.current_date();
        let time = self.request_time();

        spawn_local(async move {
            match source {
                DataSource::Observed => {
                    let stats = api::fetch_building_occupancy(
                        &building.name,
                        &date,
                        &time,
                        mode.granularity(),
                    )
                    .await;
                    let Some(stats) = stats else {
                        return;
                    };
                    if !is_current(self.stats_gate, ticket) {
                        return;
                    }
                    self.stats.set(Some(building_stats_panel(&stats, mode)));
                    self.floor_count.set(stats.no_floors);
                }
                DataSource::Predicted => {
                    let Some(value) =
                        api::fetch_building_prediction(&building.name, &date, &time).await
                    else {
                        return;
                    };
                    if !is_current(self.stats_gate, ticket) {
                        return;
                    }
                    self.stats
                        .set(Some(prediction_stats_panel(&building.name, value, mode)));
                    self.floor_count.set(0);
                }
            }
        });
    }

    pub fn select_building(self, building: Building) {
        self.viewport
            .update(|vp| vp.set_view(building.position, BUILDING_ZOOM));
        self.popup.set(None);
        self.clear_access_points();
        self.selected_building.set(Some(building));
        match self.source.get_untracked() {
            DataSource::Observed => {
                self.selected_floor.set(Some(1));
                self.load_access_points();
            }
            DataSource::Predicted => {
                self.selected_floor.set(None);
                self.update_heatmap();
            }
        }
    }

    pub fn select_campus(self) {
        self.selected_building.set(None);
        self.selected_floor.set(None);
        self.floor_count.set(0);
        issue(self.stats_gate);
        self.stats.set(None);
        self.popup.set(None);
        self.clear_access_points();
        self.viewport
            .update(|vp| vp.set_view(CAMPUS_CENTER, CAMPUS_ZOOM));
        self.update_heatmap();
    }

    pub fn select_floor(self, floor: u32) {
        if self.selected_building.get_untracked().is_none() {
            return;
        }
        self.selected_floor.set(Some(floor));
        self.popup.set(None);
        self.load_access_points();
    }

    fn clear_access_points(&self) {
        issue(self.access_gate);
        self.access_points.set(Vec::new());
        self.access_point_markers.set(Vec::new());
    }

    /// Loads access points for the selected floor, plots their labels and
    /// redraws the heatmap with them.
    fn load_access_points(self) {
        let (Some(building), Some(floor)) = (
            self.selected_building.get_untracked(),
            self.selected_floor.get_untracked(),
        ) else {
            return;
        };
        let ticket = issue(self.access_gate);
        let date = self.current_date();
        let time = self.request_time();
        let granularity = self.view_mode.get_untracked().granularity();

        spawn_local(async move {
            let access_points =
                api::fetch_access_points(&building.name, &date, &time, granularity, floor).await;
            if !is_current(self.access_gate, ticket) {
                return;
            }
            self.access_point_markers
                .set(access_point_markers(&access_points));
            self.access_points.set(access_points);
            self.update_heatmap();
        });
    }

    pub fn toggle_view_mode(self) {
        let from = self.view_mode.get_untracked();
        let value = self.slider.get_untracked();
        let next = self
            .slider_memory
            .try_update_value(|memory| memory.toggle(from, value))
            .unwrap_or(0);
        self.playback_window.set(None);
        self.view_mode.set(from.toggled());
        self.slider.set(next);
        self.update_heatmap();
    }

    /// Switches between observed occupancy and predictions. The building
    /// list is rediscovered because the two feeds name buildings
    /// independently.
    pub fn toggle_data_source(self) {
        let from = self.source.get_untracked();
        let to = from.toggled();
        if self.date_input.get_untracked() == from.default_date() {
            self.date_input.set(to.default_date().to_string());
        }
        self.source.set(to);
        self.selected_building.set(None);
        self.selected_floor.set(None);
        self.floor_count.set(0);
        issue(self.stats_gate);
        self.stats.set(None);
        self.popup.set(None);
        self.clear_access_points();
        self.initialize_buildings();
    }

    /// Moves the slider immediately and schedules a debounced heatmap update.
    pub fn set_slider(self, value: u32) {
        let (min, max) = slider_bounds(
            self.view_mode.get_untracked(),
            self.playback_window.get_untracked(),
        );
        self.slider.set(value.clamp(min, max));
        let timeout = Timeout::new(SLIDER_DEBOUNCE_MS, move || self.update_heatmap());
        SLIDER_DEBOUNCE.with(|slot| {
            // Dropping the previous timeout cancels it.
            slot.borrow_mut().replace(timeout);
        });
    }

    pub fn start_animation(self) {
        let already_running = ANIMATION_INTERVAL.with(|slot| slot.borrow().is_some());
        if already_running {
            return;
        }
        let interval = Interval::new(ANIMATION_STEP_MS, move || self.animation_tick());
        ANIMATION_INTERVAL.with(|slot| *slot.borrow_mut() = Some(interval));
        self.playing.set(true);
    }

    pub fn stop_animation(self) {
        let _ = ANIMATION_INTERVAL.with(|slot| slot.borrow_mut().take());
        self.playing.set(false);
    }

    pub fn toggle_animation(self) {
        if self.playing.get_untracked() {
            self.stop_animation();
        } else {
            self.start_animation();
        }
    }

    fn animation_tick(self) {
        let next = animation_step(
            self.view_mode.get_untracked(),
            self.playback_window.get_untracked(),
            self.slider.get_untracked(),
        );
        match next {
            Some(value) => {
                self.slider.set(value);
                self.update_heatmap();
            }
            // The interval cannot be dropped from inside its own callback.
            None => {
                Timeout::new(0, move || self.stop_animation()).forget();
            }
        }
    }

    /// "View occupancy" button: an invalid date is reported and the default
    /// date is used instead.
    pub fn view_occupancy(self) {
        let source = self.source.get_untracked();
        let message = self
            .date_input
            .with_untracked(|input| invalid_date_message(input, source));
        if let Some(message) = message {
            alert(&message);
        }
        self.update_heatmap();
    }

    /// Plots the device's first trajectory session: numbered visit markers,
    /// start and end circles, the walking route, route details and per-visit
    /// heat. The slider switches to the route's time window.
    pub fn plot_trajectory(self) {
        let device_id = self.device_id.get_untracked().trim().to_string();
        let trajectory_date = self
            .trajectory_date
            .with_untracked(|input| resolve_date(input, DEFAULT_TRAJECTORY_DATE).to_string());
        let occupancy_date = self.current_date();
        let ticket = issue(self.route_gate);

        spawn_local(async move {
            let Some(segments) = api::fetch_trajectory(&device_id, &trajectory_date).await else {
                if is_current(self.route_gate, ticket) {
                    alert("Invalid ID");
                }
                return;
            };
            if !is_current(self.route_gate, ticket) {
                return;
            }
            self.viewport
                .update(|vp| vp.set_view(CAMPUS_CENTER, CAMPUS_ZOOM));

            let mut occupancy = Vec::with_capacity(segments.len());
            for segment in &segments {
                let time = parse_clock_minutes(&segment.start_time)
                    .map(format_time)
                    .unwrap_or_else(|| clean_time_format(&segment.start_time));
                let stats = api::fetch_building_occupancy(
                    &segment.building,
                    &occupancy_date,
                    &time,
                    Granularity::Minute,
                )
                .await;
                occupancy.push(stats.map(|s| s.intensity()));
            }

            let Some(summary) = summarize_route(&segments, &occupancy) else {
                return;
            };
            let polyline = api::fetch_walking_route(&summary.waypoints).await;
            if !is_current(self.route_gate, ticket) {
                return;
            }

            // Pending heat fetches must not overwrite the route heat.
            issue(self.heat_gate);
            self.stop_animation();
            self.popup.set(None);
            self.heat.set(summary.heat.clone());
            self.route.set(Some(RouteView {
                layer: route_layer(&summary, polyline),
                details: route_details(&summary),
            }));
            if let Some((from, to)) = summary.window {
                self.playback_window.set(Some((from, to)));
                self.slider.set(from);
            }
        });
    }

    /// Removes the plotted route and returns the slider to the whole day.
    pub fn clear_trajectory(self) {
        issue(self.route_gate);
        self.stop_animation();
        self.route.set(None);
        self.popup.set(None);
        if self.playback_window.get_untracked().is_some() {
            self.playback_window.set(None);
            let max = self.view_mode.get_untracked().slider_max();
            self.slider.update(|value| *value = (*value).min(max));
        }
        self.update_heatmap();
    }

    /// Periodic refresh entry point.
    pub fn refresh(self) {
        self.update_heatmap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_counter_texts() {
        assert_eq!(
            counter_text(DataSource::Observed, ViewMode::ByMinute, None, 42.0),
            "Campus current occupancy: 42"
        );
        assert_eq!(
            counter_text(DataSource::Observed, ViewMode::ByMinute, Some("Library"), 7.0),
            "Library current occupancy: 7"
        );
        assert_eq!(
            counter_text(DataSource::Observed, ViewMode::ByHour, None, 300.0),
            "Campus current occupancy: 300"
        );
        assert_eq!(
            counter_text(DataSource::Observed, ViewMode::ByHour, Some("Library"), 7.0),
            ""
        );
    }

    #[test]
    fn predicted_counter_is_scaled() {
        assert_eq!(
            counter_text(DataSource::Predicted, ViewMode::ByMinute, None, 1.234),
            "Campus predicted occupancy: 12.3"
        );
        assert_eq!(
            counter_text(DataSource::Predicted, ViewMode::ByMinute, Some("Gym"), 2.0),
            "Gym predicted occupancy: 20"
        );
    }

    #[test]
    fn playback_window_overrides_slider_range() {
        assert_eq!(slider_bounds(ViewMode::ByMinute, None), (0, 1439));
        assert_eq!(slider_bounds(ViewMode::ByHour, None), (0, 23));
        assert_eq!(slider_bounds(ViewMode::ByHour, Some((540, 660))), (540, 660));
    }

    #[test]
    fn display_minutes_follow_mode() {
        assert_eq!(display_minutes(ViewMode::ByHour, None, 13), 780);
        assert_eq!(display_minutes(ViewMode::ByMinute, None, 785), 785);
        assert_eq!(display_minutes(ViewMode::ByHour, Some((540, 660)), 600), 600);
    }

    #[test]
    fn animation_wraps_the_day_but_stops_at_route_end() {
        assert_eq!(animation_step(ViewMode::ByMinute, None, 1439), Some(0));
        assert_eq!(animation_step(ViewMode::ByHour, None, 23), Some(0));
        assert_eq!(animation_step(ViewMode::ByMinute, Some((10, 12)), 11), Some(12));
        assert_eq!(animation_step(ViewMode::ByMinute, Some((10, 12)), 12), None);
    }

    #[test]
    fn sources_have_their_own_defaults() {
        assert_eq!(DataSource::Observed.default_date(), "2021-03-01");
        assert_eq!(DataSource::Predicted.default_date(), "2021-03-10");
        assert_eq!(DataSource::Observed.toggled(), DataSource::Predicted);
    }

    #[test]
    fn route_window_across_midnight_wraps_the_clock() {
        let window = Some((1410, 1460));
        assert_eq!(slider_bounds(ViewMode::ByMinute, window), (1410, 1460));
        assert_eq!(display_minutes(ViewMode::ByMinute, window, 1439), 1439);
        assert_eq!(display_minutes(ViewMode::ByMinute, window, 1450), 10);
        assert_eq!(animation_step(ViewMode::ByMinute, window, 1439), Some(1440));
        assert_eq!(animation_step(ViewMode::ByMinute, window, 1460), None);
    }

    #[test]
    fn stale_tickets_are_dropped() {
        let mut gate = RequestGate::default();
        let first = gate.issue();
        let second = gate.issue();
        assert_ne!(first, second);
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));

        // A reset (e.g. select_campus) invalidates in-flight work without a new request.
        let in_flight = gate.issue();
        gate.issue();
        assert!(!gate.is_current(in_flight));
    }

    #[test]
    fn latest_issued_response_wins_regardless_of_arrival_order() {
        let mut gate = RequestGate::default();
        let mut applied = None;
        let slow = gate.issue();
        let fast = gate.issue();
        for (ticket, body) in [(fast, "13:01"), (slow, "13:00")] {
            if gate.is_current(ticket) {
                applied = Some(body);
            }
        }
        assert_eq!(applied, Some("13:01"));
    }

    #[test]
    fn date_alert_agrees_with_the_date_used() {
        let padded = " 2021-03-05 ";
        assert_eq!(invalid_date_message(padded, DataSource::Observed), None);
        assert_eq!(resolve_date(padded, DataSource::Observed.default_date()), "2021-03-05");

        assert_eq!(
            invalid_date_message("2021-02-30", DataSource::Predicted).as_deref(),
            Some("Invalid date format. Using default date: 2021-03-10.")
        );
        assert_eq!(resolve_date("2021-02-30", DataSource::Predicted.default_date()), "2021-03-10");
    }
}
