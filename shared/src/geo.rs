use serde::{Deserialize, Serialize};

/// WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

pub const CAMPUS_CENTER: LatLng = LatLng::new(42.392, -72.527);
pub const CAMPUS_ZOOM: f64 = 17.0;
pub const BUILDING_ZOOM: f64 = 19.0;

/// Radius of the hoverable circle drawn around each building.
pub const BUILDING_RADIUS_METERS: f64 = 50.0;

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Great-circle distance in meters.
pub fn haversine_meters(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_is_zero_for_same_point() {
        assert_eq!(haversine_meters(CAMPUS_CENTER, CAMPUS_CENTER), 0.0);
    }

    #[test]
    fn haversine_matches_known_campus_distance() {
        // One thousandth of a degree of latitude is roughly 111 m.
        let north = LatLng::new(CAMPUS_CENTER.lat + 0.001, CAMPUS_CENTER.lng);
        let d = haversine_meters(CAMPUS_CENTER, north);
        assert!((d - 111.2).abs() < 0.5, "got {d}");
    }

    #[test]
    fn non_finite_coordinates_are_flagged() {
        assert!(!LatLng::new(f64::NAN, 0.0).is_finite());
        assert!(CAMPUS_CENTER.is_finite());
    }
}
