use std::collections::BTreeMap;

use crate::geo::LatLng;
use crate::occupancy::{AccessPointOccupancy, BuildingOccupancy, BuildingStats, CampusPrediction};

/// Where a heat point came from. Display scaling depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatSource {
    Building,
    AccessPoint,
    /// Model output, already multiplied by [`PREDICTION_SCALE`].
    Prediction,
    /// Values shown as-is, such as trajectory occupancy.
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatPoint {
    pub position: LatLng,
    pub intensity: f64,
    pub source: HeatSource,
}

impl HeatPoint {
    pub fn new(position: LatLng, intensity: f64, source: HeatSource) -> Self {
        Self {
            position,
            intensity,
            source,
        }
    }
}

pub const PREDICTION_SCALE: f64 = 10.0;
pub const BUILDING_LEVEL_ZOOM: f64 = 18.0;
const CAMPUS_DIVISOR: f64 = 1.5;
const ACCESS_POINT_DIVISOR: f64 = 0.5;
const BUILDING_DIVISOR: f64 = 6.5;

/// Heat layer rendering parameters, shared by both colour schemes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatLayerOptions {
    pub radius: f64,
    pub blur: f64,
    pub max_zoom: f64,
    pub max_opacity: f64,
    pub min_opacity: f64,
}

pub const HEAT_LAYER_OPTIONS: HeatLayerOptions = HeatLayerOptions {
    radius: 30.0,
    blur: 20.0,
    max_zoom: 22.0,
    max_opacity: 0.9,
    min_opacity: 0.05,
};

pub type GradientStops = &'static [(f64, (u8, u8, u8))];

pub const OCCUPANCY_GRADIENT: GradientStops = &[
    (0.1, (75, 0, 130)),
    (0.3, (0, 0, 255)),
    (0.5, (255, 255, 0)),
    (0.7, (255, 165, 0)),
    (1.0, (255, 0, 0)),
];

pub const PREDICTION_GRADIENT: GradientStops = &[
    (0.1, (0, 0, 255)),
    (0.3, (0, 255, 255)),
    (0.5, (0, 128, 128)),
    (0.7, (255, 255, 0)),
    (1.0, (255, 165, 0)),
];

pub fn campus_heat_points(records: &[BuildingOccupancy]) -> Vec<HeatPoint> {
    records
        .iter()
        .filter_map(|record| {
            let intensity = record.intensity()?;
            let position = record.position();
            position
                .is_finite()
                .then(|| HeatPoint::new(position, intensity, HeatSource::Building))
        })
        .collect()
}

pub fn building_heat_point(stats: &BuildingStats) -> HeatPoint {
    HeatPoint::new(stats.position(), stats.intensity(), HeatSource::Building)
}

pub fn access_point_heat_points(access_points: &[AccessPointOccupancy]) -> Vec<HeatPoint> {
    access_points
        .iter()
        .filter(|ap| ap.position().is_finite() && ap.connection_count.is_finite())
        .map(|ap| HeatPoint::new(ap.position(), ap.connection_count, HeatSource::AccessPoint))
        .collect()
}

pub fn prediction_heat_points(predictions: &BTreeMap<String, CampusPrediction>) -> Vec<HeatPoint> {
    predictions
        .values()
        .filter_map(|prediction| {
            let value = prediction.first_value()?;
            Some(HeatPoint::new(
                prediction.position(),
                value * PREDICTION_SCALE,
                HeatSource::Prediction,
            ))
        })
        .collect()
}

/// Re-tags points so that [`scale_for_display`] leaves them untouched.
pub fn as_raw(points: Vec<HeatPoint>) -> Vec<HeatPoint> {
    points
        .into_iter()
        .map(|point| HeatPoint {
            source: HeatSource::Raw,
            ..point
        })
        .collect()
}

pub fn total_count(points: &[HeatPoint]) -> f64 {
    points.iter().map(|point| point.intensity).sum()
}

/// Counter value for predictions: the raw total rounded to two decimals,
/// times the prediction scale.
pub fn predicted_counter_value(raw_total: f64) -> f64 {
    (raw_total * 100.0).round() / 100.0 * PREDICTION_SCALE
}

/// Zoom-dependent intensity divisors for observed data. At building level
/// access points are drawn at double intensity and building points are
/// damped so that a single building does not saturate the screen.
pub fn scale_for_display(points: &[HeatPoint], zoom: f64) -> Vec<HeatPoint> {
    let building_level = zoom > BUILDING_LEVEL_ZOOM;
    let has_access_points = points
        .iter()
        .any(|point| point.source == HeatSource::AccessPoint);

    points
        .iter()
        .filter_map(|point| {
            let divisor = match point.source {
                HeatSource::Prediction | HeatSource::Raw => 1.0,
                HeatSource::AccessPoint if building_level => ACCESS_POINT_DIVISOR,
                HeatSource::Building if building_level && has_access_points => return None,
                HeatSource::Building if building_level => BUILDING_DIVISOR,
                HeatSource::AccessPoint | HeatSource::Building => CAMPUS_DIVISOR,
            };
            Some(HeatPoint {
                intensity: point.intensity / divisor,
                ..*point
            })
        })
        .collect()
}

/// Intensity multiplier applied per point when the map is zoomed out from the
/// heat layer's max zoom; at most twelve halvings.
pub fn zoom_intensity_factor(zoom: f64, max_zoom: f64) -> f64 {
    let halvings = (max_zoom - zoom).clamp(0.0, 12.0);
    1.0 / 2f64.powf(halvings)
}

/// Stamp alpha for an aggregated heat cell.
pub fn point_alpha(weighted_intensity: f64, min_opacity: f64) -> f64 {
    weighted_intensity.clamp(min_opacity, 1.0)
}

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    let t = t.clamp(0.0, 1.0);
    let value = a as f64 + (b as f64 - a as f64) * t;
    value.round().clamp(0.0, 255.0) as u8
}

/// Colour of `t` in `[0, 1]` on a stop list. Positions before the first stop
/// take the first colour.
pub fn gradient_color(stops: GradientStops, t: f64) -> (u8, u8, u8) {
    let t = t.clamp(0.0, 1.0);
    let Some(&(first_pos, first_color)) = stops.first() else {
        return (0, 0, 0);
    };
    if t <= first_pos {
        return first_color;
    }
    for window in stops.windows(2) {
        let (left_pos, left_color) = window[0];
        let (right_pos, right_color) = window[1];
        if t >= left_pos && t <= right_pos {
            let span = (right_pos - left_pos).max(f64::EPSILON);
            let local = (t - left_pos) / span;
            return (
                lerp_u8(left_color.0, right_color.0, local),
                lerp_u8(left_color.1, right_color.1, local),
                lerp_u8(left_color.2, right_color.2, local),
            );
        }
    }
    stops.last().map(|(_, color)| *color).unwrap_or(first_color)
}

/// 256-entry lookup table indexed by the alpha channel of the grey stamp
/// buffer.
pub fn build_palette(stops: GradientStops) -> Vec<[u8; 3]> {
    (0..256)
        .map(|i| {
            let (r, g, b) = gradient_color(stops, i as f64 / 255.0);
            [r, g, b]
        })
        .collect()
}
