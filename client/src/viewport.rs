use std::f64::consts::{LN_2, PI};

use crowd_shared::LatLng;
use crowd_shared::geo::{CAMPUS_CENTER, CAMPUS_ZOOM};

/// Viewport maps WGS84 coordinates to screen pixels through Web Mercator.
/// `zoom` is fractional; one zoom level doubles the scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: f64 = 13.0;
pub const MAX_ZOOM: f64 = 22.0;
const ZOOM_SENSITIVITY: f64 = 0.001;
const MAX_LATITUDE_SIN: f64 = 0.9999;
const METERS_PER_PIXEL_AT_ZOOM_0: f64 = 156_543.033_92;

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: CAMPUS_CENTER,
            zoom: CAMPUS_ZOOM,
            width: 1200.0,
            height: 800.0,
        }
    }
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Project to global pixel coordinates at `zoom`.
pub fn project(point: LatLng, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let x = (point.lng + 180.0) / 360.0 * size;
    let sin = point
        .lat
        .to_radians()
        .sin()
        .clamp(-MAX_LATITUDE_SIN, MAX_LATITUDE_SIN);
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * size;
    (x, y)
}

pub fn unproject(x: f64, y: f64, zoom: f64) -> LatLng {
    let size = world_size(zoom);
    let lng = x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / size;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

impl Viewport {
    pub fn to_screen(&self, point: LatLng) -> (f64, f64) {
        let (px, py) = project(point, self.zoom);
        let (cx, cy) = project(self.center, self.zoom);
        (px - cx + self.width / 2.0, py - cy + self.height / 2.0)
    }

    pub fn to_latlng(&self, sx: f64, sy: f64) -> LatLng {
        let (cx, cy) = project(self.center, self.zoom);
        unproject(
            cx + sx - self.width / 2.0,
            cy + sy - self.height / 2.0,
            self.zoom,
        )
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        if center.is_finite() {
            self.center = center;
        }
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.width = width;
            self.height = height;
        }
    }

    /// Pan by screen-space delta; dragging right moves the map right.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let (cx, cy) = project(self.center, self.zoom);
        self.center = unproject(cx - dx, cy - dy, self.zoom);
    }

    /// Zoom toward a focus point (screen coordinates), keeping the point
    /// under the cursor fixed.
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let new_zoom = (self.zoom - delta * ZOOM_SENSITIVITY / LN_2).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        let anchor = self.to_latlng(screen_x, screen_y);
        let (ax, ay) = project(anchor, new_zoom);
        self.center = unproject(
            ax - (screen_x - self.width / 2.0),
            ay - (screen_y - self.height / 2.0),
            new_zoom,
        );
        self.zoom = new_zoom;
    }

    pub fn meters_to_pixels(&self, meters: f64, lat: f64) -> f64 {
        let meters_per_pixel =
            METERS_PER_PIXEL_AT_ZOOM_0 * lat.to_radians().cos() / 2f64.powf(self.zoom);
        meters / meters_per_pixel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn projection_of_null_island_is_world_center() {
        let (x, y) = project(LatLng::new(0.0, 0.0), 0.0);
        assert!(approx(x, 128.0, 1e-9));
        assert!(approx(y, 128.0, 1e-9));
    }

    #[test]
    fn unproject_inverts_project() {
        let (x, y) = project(CAMPUS_CENTER, 17.0);
        let back = unproject(x, y, 17.0);
        assert!(approx(back.lat, CAMPUS_CENTER.lat, 1e-9));
        assert!(approx(back.lng, CAMPUS_CENTER.lng, 1e-9));
    }

    #[test]
    fn center_maps_to_middle_of_screen() {
        let vp = Viewport::default();
        let (sx, sy) = vp.to_screen(vp.center);
        assert!(approx(sx, 600.0, 1e-6));
        assert!(approx(sy, 400.0, 1e-6));
    }

    #[test]
    fn zoom_at_keeps_anchor_fixed() {
        let mut vp = Viewport::default();
        let anchor = vp.to_latlng(200.0, 150.0);
        vp.zoom_at(-500.0, 200.0, 150.0);
        assert!(vp.zoom > CAMPUS_ZOOM);
        let (sx, sy) = vp.to_screen(anchor);
        assert!(approx(sx, 200.0, 1e-6));
        assert!(approx(sy, 150.0, 1e-6));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = Viewport::default();
        vp.zoom_at(1.0e6, 0.0, 0.0);
        assert_eq!(vp.zoom, MIN_ZOOM);
        vp.set_view(CAMPUS_CENTER, 40.0);
        assert_eq!(vp.zoom, MAX_ZOOM);
    }

    #[test]
    fn pan_moves_content_with_pointer() {
        let mut vp = Viewport::default();
        let before = vp.to_screen(CAMPUS_CENTER);
        vp.pan(30.0, -20.0);
        let after = vp.to_screen(CAMPUS_CENTER);
        assert!(approx(after.0 - before.0, 30.0, 1e-6));
        assert!(approx(after.1 - before.1, -20.0, 1e-6));
    }

    #[test]
    fn fifty_meters_at_campus_zoom() {
        let vp = Viewport::default();
        let px = vp.meters_to_pixels(50.0, CAMPUS_CENTER.lat);
        assert!(approx(px, 56.7, 0.5), "got {px}");
    }
}
