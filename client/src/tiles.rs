#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

use crate::viewport::{TILE_SIZE, Viewport, project};

pub const TILE_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_MAX_ZOOM: u32 = 19;
pub const ATTRIBUTION: &str = "\u{a9} OpenStreetMap contributors";

const TILE_CONCURRENCY: usize = 6;
const MAX_CACHED_TILES: usize = 384;
const ONLOAD_HANDLE_KEY: &str = "__crowdTileOnload";
const ONERROR_HANDLE_KEY: &str = "__crowdTileOnerror";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn url(&self) -> String {
        TILE_URL_TEMPLATE
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

/// A tile that intersects the viewport, with its screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub key: TileKey,
    pub screen_x: f64,
    pub screen_y: f64,
    pub size: f64,
}

/// Native tile zoom for a fractional view zoom. Above the native max the
/// zoom-19 tiles are scaled up.
pub fn tile_zoom(zoom: f64) -> u32 {
    (zoom.round().max(0.0) as u32).min(TILE_MAX_ZOOM)
}

/// Tiles covering the viewport, nearest to the centre first.
pub fn visible_tiles(vp: &Viewport) -> Vec<TilePlacement> {
    let z = tile_zoom(vp.zoom);
    let scale = 2f64.powf(vp.zoom - z as f64);
    let size = TILE_SIZE * scale;
    let (cx, cy) = project(vp.center, z as f64);
    let left = cx - vp.width / 2.0 / scale;
    let top = cy - vp.height / 2.0 / scale;
    let right = cx + vp.width / 2.0 / scale;
    let bottom = cy + vp.height / 2.0 / scale;

    let tiles_per_axis = 1i64 << z;
    let x0 = (left / TILE_SIZE).floor() as i64;
    let x1 = (right / TILE_SIZE).floor() as i64;
    let y0 = ((top / TILE_SIZE).floor() as i64).max(0);
    let y1 = ((bottom / TILE_SIZE).floor() as i64).min(tiles_per_axis - 1);

    let mut placements = Vec::new();
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            let wrapped_x = tx.rem_euclid(tiles_per_axis) as u32;
            placements.push(TilePlacement {
                key: TileKey {
                    z,
                    x: wrapped_x,
                    y: ty as u32,
                },
                screen_x: (tx as f64 * TILE_SIZE - left) * scale,
                screen_y: (ty as f64 * TILE_SIZE - top) * scale,
                size,
            });
        }
    }

    let (mid_x, mid_y) = (vp.width / 2.0, vp.height / 2.0);
    placements.sort_by(|a, b| {
        let da = (a.screen_x + a.size / 2.0 - mid_x).powi(2)
            + (a.screen_y + a.size / 2.0 - mid_y).powi(2);
        let db = (b.screen_x + b.size / 2.0 - mid_x).powi(2)
            + (b.screen_y + b.size / 2.0 - mid_y).powi(2);
        da.total_cmp(&db)
    });
    placements
}

enum TileState {
    Queued,
    Loading,
    Ready(HtmlImageElement),
    Failed,
}

/// Image cache for map tiles. Loads are queued with bounded concurrency and
/// `on_ready` fires after every successful load so the map can repaint.
#[derive(Clone)]
pub struct TileCache {
    inner: Rc<CacheInner>,
}

struct CacheInner {
    tiles: RefCell<HashMap<TileKey, TileState>>,
    queue: RefCell<VecDeque<TileKey>>,
    in_flight: Cell<usize>,
    on_ready: Rc<dyn Fn()>,
}

impl TileCache {
    pub fn new(on_ready: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(CacheInner {
                tiles: RefCell::new(HashMap::new()),
                queue: RefCell::new(VecDeque::new()),
                in_flight: Cell::new(0),
                on_ready: Rc::new(on_ready),
            }),
        }
    }

    /// Returns the image if loaded, queueing it otherwise.
    pub fn get_or_request(&self, key: TileKey) -> Option<HtmlImageElement> {
        {
            let tiles = self.inner.tiles.borrow();
            match tiles.get(&key) {
                Some(TileState::Ready(img)) => return Some(img.clone()),
                Some(_) => return None,
                None => {}
            }
        }
        self.inner.tiles.borrow_mut().insert(key, TileState::Queued);
        self.inner.queue.borrow_mut().push_back(key);
        pump_queue(self.inner.clone());
        None
    }

    /// Any loaded tile from a coarser zoom covering `key`, with the source
    /// sub-rectangle in image pixels. Drawn while the exact tile loads.
    pub fn fallback(&self, key: TileKey) -> Option<(HtmlImageElement, f64, f64, f64)> {
        let tiles = self.inner.tiles.borrow();
        for levels_up in 1..=3u32 {
            if levels_up > key.z {
                break;
            }
            let parent = TileKey {
                z: key.z - levels_up,
                x: key.x >> levels_up,
                y: key.y >> levels_up,
            };
            if let Some(TileState::Ready(img)) = tiles.get(&parent) {
                let span = TILE_SIZE / (1u32 << levels_up) as f64;
                let mask = (1u32 << levels_up) - 1;
                let sx = (key.x & mask) as f64 * span;
                let sy = (key.y & mask) as f64 * span;
                return Some((img.clone(), sx, sy, span));
            }
        }
        None
    }

    /// Drops ready tiles of other zoom levels once the cache is over budget.
    pub fn prune(&self, keep_zoom: u32) {
        let mut tiles = self.inner.tiles.borrow_mut();
        if tiles.len() <= MAX_CACHED_TILES {
            return;
        }
        tiles.retain(|key, state| {
            key.z == keep_zoom || matches!(state, TileState::Loading | TileState::Queued)
        });
    }
}

fn pump_queue(inner: Rc<CacheInner>) {
    while inner.in_flight.get() < TILE_CONCURRENCY {
        let Some(key) = inner.queue.borrow_mut().pop_front() else {
            break;
        };
        inner.in_flight.set(inner.in_flight.get() + 1);
        inner.tiles.borrow_mut().insert(key, TileState::Loading);
        load_tile(inner.clone(), key);
    }
}

fn finish(inner: &Rc<CacheInner>, key: TileKey, state: TileState) {
    let ready = matches!(state, TileState::Ready(_));
    inner.tiles.borrow_mut().insert(key, state);
    inner.in_flight.set(inner.in_flight.get().saturating_sub(1));
    if ready {
        (inner.on_ready)();
    }
    pump_queue(inner.clone());
}

fn load_tile(inner: Rc<CacheInner>, key: TileKey) {
    let img = match HtmlImageElement::new() {
        Ok(img) => img,
        Err(_) => {
            finish(&inner, key, TileState::Failed);
            return;
        }
    };
    img.set_cross_origin(Some("anonymous"));

    let img_for_load = img.clone();
    let inner_load = inner.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);
        finish(&inner_load, key, TileState::Ready(img_for_load.clone()));
    });

    let img_for_error = img.clone();
    let inner_error = inner.clone();
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        finish(&inner_error, key, TileState::Failed);
    });

    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY), &onload_js);
    let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY), &onerror_js);
    img.set_src(&key.url());
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowd_shared::LatLng;

    #[test]
    fn url_fills_template() {
        let key = TileKey { z: 17, x: 38_766, y: 48_288 };
        assert_eq!(
            key.url(),
            "https://tile.openstreetmap.org/17/38766/48288.png"
        );
    }

    #[test]
    fn tile_zoom_caps_at_native_max() {
        assert_eq!(tile_zoom(17.2), 17);
        assert_eq!(tile_zoom(17.6), 18);
        assert_eq!(tile_zoom(21.0), TILE_MAX_ZOOM);
    }

    #[test]
    fn visible_tiles_cover_the_viewport() {
        let vp = Viewport::default();
        let tiles = visible_tiles(&vp);
        assert!(!tiles.is_empty());
        let min_x = tiles.iter().map(|t| t.screen_x).fold(f64::MAX, f64::min);
        let min_y = tiles.iter().map(|t| t.screen_y).fold(f64::MAX, f64::min);
        let max_x = tiles.iter().map(|t| t.screen_x + t.size).fold(f64::MIN, f64::max);
        let max_y = tiles.iter().map(|t| t.screen_y + t.size).fold(f64::MIN, f64::max);
        assert!(min_x <= 0.0 && min_y <= 0.0);
        assert!(max_x >= vp.width && max_y >= vp.height);
        assert!(tiles.iter().all(|t| t.key.z == 17));
    }

    #[test]
    fn overzoomed_tiles_are_scaled() {
        let mut vp = Viewport::default();
        vp.set_view(LatLng::new(42.39, -72.53), 21.0);
        let tiles = visible_tiles(&vp);
        assert!(tiles.iter().all(|t| t.key.z == TILE_MAX_ZOOM));
        assert!((tiles[0].size - TILE_SIZE * 4.0).abs() < 1e-9);
    }

    #[test]
    fn nearest_tile_comes_first() {
        let vp = Viewport::default();
        let tiles = visible_tiles(&vp);
        let first = tiles[0];
        assert!(first.screen_x <= vp.width / 2.0 && first.screen_x + first.size >= vp.width / 2.0);
        assert!(first.screen_y <= vp.height / 2.0 && first.screen_y + first.size >= vp.height / 2.0);
    }
}
