use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use crowd_shared::geo::BUILDING_RADIUS_METERS;
use crowd_shared::heat::{OCCUPANCY_GRADIENT, scale_for_display};

use crate::app::Hovered;
use crate::colors::{ROUTE_COLOR, rgba_css};
use crate::dashboard::Dashboard;
use crate::heat::HeatRenderer;
use crate::layers::{MapMarker, MarkerStyle, Popup, building_at, marker_at};
use crate::render_loop::RenderScheduler;
use crate::tiles::{ATTRIBUTION, TileCache, tile_zoom, visible_tiles};
use crate::viewport::Viewport;

const MAP_BACKGROUND: &str = "#dcd8cf";
const CLICK_SLOP_PX: f64 = 5.0;
const ROUTE_OPACITY: f64 = 0.6;
const ROUTE_WEIGHT: f64 = 4.0;
const HOVER_FILL_OPACITY: f64 = 0.3;

/// Device pixel ratio, never below 1.
fn device_pixel_ratio() -> f64 {
    web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .unwrap_or(1.0)
        .max(1.0)
}

/// Pointer position relative to the canvas.
fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, client_x: f64, client_y: f64, fallback: (f64, f64)) -> (f64, f64) {
    canvas_ref
        .get_untracked()
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (client_x - rect.left(), client_y - rect.top())
        })
        .unwrap_or(fallback)
}

fn draw_tiles(ctx: &CanvasRenderingContext2d, vp: &Viewport, cache: &TileCache) {
    ctx.set_image_smoothing_enabled(true);
    for placement in visible_tiles(vp) {
        if let Some(img) = cache.get_or_request(placement.key) {
            let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
                &img,
                placement.screen_x,
                placement.screen_y,
                placement.size,
                placement.size,
            );
        } else if let Some((img, sx, sy, span)) = cache.fallback(placement.key) {
            let _ = ctx
                .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    &img,
                    sx,
                    sy,
                    span,
                    span,
                    placement.screen_x,
                    placement.screen_y,
                    placement.size,
                    placement.size,
                );
        }
    }
    cache.prune(tile_zoom(vp.zoom));
}

fn draw_hover_circle(ctx: &CanvasRenderingContext2d, vp: &Viewport, dashboard: &Dashboard, name: &str) {
    let position = dashboard.buildings.with_untracked(|buildings| {
        buildings
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.position)
    });
    let Some(position) = position else {
        return;
    };
    let (x, y) = vp.to_screen(position);
    let r = vp.meters_to_pixels(BUILDING_RADIUS_METERS, position.lat);
    ctx.begin_path();
    let _ = ctx.arc(x, y, r, 0.0, std::f64::consts::TAU);
    ctx.set_fill_style_str(&rgba_css(255, 255, 255, HOVER_FILL_OPACITY));
    ctx.fill();
    ctx.set_stroke_style_str("#ffffff");
    ctx.set_line_width(3.0);
    ctx.stroke();
}

fn draw_polyline(ctx: &CanvasRenderingContext2d, vp: &Viewport, polyline: &[crowd_shared::LatLng]) {
    if polyline.len() < 2 {
        return;
    }
    let (r, g, b) = ROUTE_COLOR;
    ctx.begin_path();
    for (i, point) in polyline.iter().enumerate() {
        let (x, y) = vp.to_screen(*point);
        if i == 0 {
            ctx.move_to(x, y);
        } else {
            ctx.line_to(x, y);
        }
    }
    ctx.set_stroke_style_str(&rgba_css(r, g, b, ROUTE_OPACITY));
    ctx.set_line_width(ROUTE_WEIGHT);
    ctx.set_line_join("round");
    ctx.set_line_cap("round");
    ctx.stroke();
}

fn draw_marker(ctx: &CanvasRenderingContext2d, vp: &Viewport, marker: &MapMarker) {
    let (x, y) = vp.to_screen(marker.position);
    match marker.style {
        MarkerStyle::Label => {
            ctx.set_font("bold 12px 'Inter', sans-serif");
            ctx.set_text_align("center");
            ctx.set_text_baseline("middle");
            ctx.set_line_join("round");
            ctx.set_line_width(3.0);
            ctx.set_stroke_style_str("rgba(255,255,255,0.9)");
            let _ = ctx.stroke_text(&marker.label, x, y);
            ctx.set_fill_style_str("#000000");
            let _ = ctx.fill_text(&marker.label, x, y);
        }
        MarkerStyle::Numbered(number) => {
            ctx.begin_path();
            let _ = ctx.arc(x, y, 15.0, 0.0, std::f64::consts::TAU);
            ctx.set_fill_style_str("#ffffff");
            ctx.fill();
            ctx.set_stroke_style_str("#000000");
            ctx.set_line_width(2.0);
            ctx.stroke();
            ctx.set_font("bold 14px 'Inter', sans-serif");
            ctx.set_text_align("center");
            ctx.set_text_baseline("middle");
            ctx.set_fill_style_str("#000000");
            let _ = ctx.fill_text(&number.to_string(), x, y + 1.0);
        }
        MarkerStyle::Dot((r, g, b)) => {
            ctx.begin_path();
            let _ = ctx.arc(x, y, 10.0, 0.0, std::f64::consts::TAU);
            ctx.set_fill_style_str(&rgba_css(r, g, b, 0.2));
            ctx.fill();
            ctx.set_stroke_style_str(&rgba_css(r, g, b, 1.0));
            ctx.set_line_width(3.0);
            ctx.stroke();
        }
    }
}

/// Slippy map: OSM tiles, heat layer, hovered building circle, route and
/// markers on one 2D canvas, with a DOM popup on top.
#[component]
pub fn MapCanvas() -> impl IntoView {
    let dashboard: Dashboard = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();
    let Hovered(hovered) = expect_context();
    let mouse_pos: RwSignal<(f64, f64)> = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    // Track drag state
    let is_dragging = Rc::new(Cell::new(false));
    let drag_start_x = Rc::new(Cell::new(0.0f64));
    let drag_start_y = Rc::new(Cell::new(0.0f64));
    let last_x = Rc::new(Cell::new(0.0f64));
    let last_y = Rc::new(Cell::new(0.0f64));
    let pinch_dist = Rc::new(Cell::new(0.0f64));

    // Bumped by the tile cache whenever an image finishes loading.
    let tile_version: RwSignal<u64> = RwSignal::new(0);
    let tile_cache = TileCache::new(move || tile_version.update(|v| *v = v.wrapping_add(1)));

    let heat_renderer: Rc<RefCell<Option<HeatRenderer>>> = Rc::new(RefCell::new(None));
    // Cached 2D context (invalidated on canvas resize)
    let cached_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));

    let scheduler = RenderScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let Some(parent) = canvas.parent_element() else {
            return;
        };
        let w = parent.client_width() as u32;
        let h = parent.client_height() as u32;
        if w == 0 || h == 0 {
            return;
        }

        let vp_size = viewport.with_untracked(|vp| (vp.width, vp.height));
        if vp_size != (w as f64, h as f64) {
            viewport.update_untracked(|vp| vp.resize(w as f64, h as f64));
        }

        let dpr = device_pixel_ratio();
        let pw = (w as f64 * dpr).round() as u32;
        let ph = (h as f64 * dpr).round() as u32;
        if canvas.width() != pw || canvas.height() != ph {
            canvas.set_width(pw);
            canvas.set_height(ph);
            *cached_ctx.borrow_mut() = None;
        }

        if cached_ctx.borrow().is_none() {
            let ctx = canvas
                .get_context("2d")
                .ok()
                .flatten()
                .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok());
            *cached_ctx.borrow_mut() = ctx;
        }
        let ctx_ref = cached_ctx.borrow();
        let Some(ctx) = ctx_ref.as_ref() else {
            return;
        };

        let vp = viewport.get_untracked();
        let _ = ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
        ctx.set_fill_style_str(MAP_BACKGROUND);
        ctx.fill_rect(0.0, 0.0, w as f64, h as f64);

        draw_tiles(ctx, &vp, &tile_cache);

        let gradient = dashboard.source.get_untracked().gradient();
        let screen_points: Vec<(f64, f64, f64)> = dashboard.heat.with_untracked(|heat| {
            scale_for_display(heat, vp.zoom)
                .into_iter()
                .map(|point| {
                    let (x, y) = vp.to_screen(point.position);
                    (x, y, point.intensity)
                })
                .collect()
        });
        let mut renderer = heat_renderer.borrow_mut();
        if renderer.is_none() {
            *renderer = HeatRenderer::new(OCCUPANCY_GRADIENT);
        }
        if let Some(renderer) = renderer.as_mut() {
            renderer.set_gradient(gradient);
            renderer.draw(ctx, &screen_points, vp.zoom, w, h);
        }

        if let Some(name) = hovered.get_untracked() {
            draw_hover_circle(ctx, &vp, &dashboard, &name);
        }

        dashboard.route.with_untracked(|route| {
            if let Some(route) = route {
                draw_polyline(ctx, &vp, &route.layer.polyline);
            }
        });
        dashboard.access_point_markers.with_untracked(|markers| {
            for marker in markers {
                draw_marker(ctx, &vp, marker);
            }
        });
        dashboard.route.with_untracked(|route| {
            if let Some(route) = route {
                for marker in &route.layer.markers {
                    draw_marker(ctx, &vp, marker);
                }
            }
        });
    });

    // Anything visible changed: repaint on the next frame.
    let sched = scheduler.clone();
    Effect::new(move || {
        viewport.track();
        tile_version.track();
        hovered.track();
        dashboard.heat.track();
        dashboard.source.track();
        dashboard.buildings.track();
        dashboard.access_point_markers.track();
        dashboard.route.track();
        sched.mark_dirty();
    });

    // --- Input handlers ---

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let delta = e.delta_y();
        let x = e.offset_x() as f64;
        let y = e.offset_y() as f64;
        viewport.update(|vp| vp.zoom_at(delta, x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            hovered.set(None);
            drag_start_x.set(e.client_x() as f64);
            drag_start_y.set(e.client_y() as f64);
            last_x.set(e.client_x() as f64);
            last_y.set(e.client_y() as f64);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            if is_dragging.get() {
                let dx = e.client_x() as f64 - last_x.get();
                let dy = e.client_y() as f64 - last_y.get();
                last_x.set(e.client_x() as f64);
                last_y.set(e.client_y() as f64);
                viewport.update(|vp| vp.pan(dx, dy));
                return;
            }
            let (x, y) = local_point(
                canvas_ref,
                e.client_x() as f64,
                e.client_y() as f64,
                (e.offset_x() as f64, e.offset_y() as f64),
            );
            let vp = viewport.get_untracked();
            let hit = dashboard
                .buildings
                .with_untracked(|buildings| building_at(buildings, &vp, x, y).map(|b| b.name.clone()));
            if hit != hovered.get_untracked() {
                hovered.set(hit);
            }
            if hovered.get_untracked().is_some() {
                mouse_pos.set((e.client_x() as f64, e.client_y() as f64));
            }
            let over_marker = dashboard.access_point_markers.with_untracked(|aps| {
                dashboard.route.with_untracked(|route| {
                    let route_markers = route.as_ref().map(|r| r.layer.markers.as_slice()).unwrap_or(&[]);
                    marker_at(aps.iter().chain(route_markers.iter()), &vp, x, y).is_some()
                })
            });
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                let cursor = if over_marker || hovered.get_untracked().is_some() {
                    "pointer"
                } else {
                    "grab"
                };
                el.style().set_property("cursor", cursor).ok();
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_click = {
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        move |e: MouseEvent| {
            let dx = (e.client_x() as f64 - drag_start_x.get()).abs();
            let dy = (e.client_y() as f64 - drag_start_y.get()).abs();
            if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
                return;
            }
            let (x, y) = local_point(
                canvas_ref,
                e.client_x() as f64,
                e.client_y() as f64,
                (e.offset_x() as f64, e.offset_y() as f64),
            );
            let vp = viewport.get_untracked();

            let popup = dashboard.access_point_markers.with_untracked(|aps| {
                dashboard.route.with_untracked(|route| {
                    let route_markers = route.as_ref().map(|r| r.layer.markers.as_slice()).unwrap_or(&[]);
                    marker_at(aps.iter().chain(route_markers.iter()), &vp, x, y).map(|marker| Popup {
                        position: marker.position,
                        lines: marker.popup.clone(),
                    })
                })
            });
            if popup.is_some() {
                dashboard.popup.set(popup);
                return;
            }

            let building = dashboard
                .buildings
                .with_untracked(|buildings| building_at(buildings, &vp, x, y).cloned());
            match building {
                Some(building) => dashboard.select_building(building),
                None => {
                    if dashboard.popup.with_untracked(Option::is_some) {
                        dashboard.popup.set(None);
                    }
                }
            }
        }
    };

    let on_pointer_leave = move |_: PointerEvent| {
        if hovered.get_untracked().is_some() {
            hovered.set(None);
        }
    };

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                pinch_dist.set((dx * dx + dy * dy).sqrt());
            }
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                let new_dist = (dx * dx + dy * dy).sqrt();
                let old_dist = pinch_dist.get();

                if old_dist > 0.0 {
                    let mid = local_point(
                        canvas_ref,
                        (t0.client_x() + t1.client_x()) as f64 / 2.0,
                        (t0.client_y() + t1.client_y()) as f64 / 2.0,
                        (0.0, 0.0),
                    );
                    let delta = -(new_dist - old_dist) * 2.0;
                    viewport.update(|vp| vp.zoom_at(delta, mid.0, mid.1));
                }

                pinch_dist.set(new_dist);
            }
        }
    };

    let popup_view = move || {
        dashboard.popup.get().map(|popup| {
            let (x, y) = viewport.with(|vp| vp.to_screen(popup.position));
            view! {
                <div
                    class="map-popup"
                    style=format!(
                        "position: absolute; left: {x}px; top: {y}px; transform: translate(-50%, calc(-100% - 18px)); z-index: 15; background: #ffffff; color: #1a1d2a; border-radius: 6px; padding: 8px 26px 8px 12px; font-family: 'Inter', sans-serif; font-size: 0.75rem; line-height: 1.5; box-shadow: 0 3px 14px rgba(0,0,0,0.4); white-space: nowrap;"
                    )
                    on:pointerdown=|e: PointerEvent| e.stop_propagation()
                    on:click=|e: MouseEvent| e.stop_propagation()
                >
                    <button
                        title="Close"
                        style="position: absolute; top: 2px; right: 4px; background: none; border: none; cursor: pointer; color: #9a9590; font-size: 0.9rem;"
                        on:click=move |_| dashboard.popup.set(None)
                    >
                        "\u{d7}"
                    </button>
                    {popup.lines.into_iter().enumerate().map(|(i, line)| view! {
                        <div style:font-weight=if i == 0 { "600" } else { "400" }>{line}</div>
                    }).collect_view()}
                </div>
            }
        })
    };

    view! {
        <div
            style="position: relative; width: 100%; height: 100%; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
            on:touchstart=on_touch_start
            on:touchmove=on_touch_move
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
            {popup_view}
            <div style="position: absolute; right: 0; bottom: 52px; z-index: 12; background: rgba(255,255,255,0.75); color: #333; font-family: 'Inter', sans-serif; font-size: 0.62rem; padding: 1px 6px; pointer-events: auto;">
                <a href="https://www.openstreetmap.org/copyright" target="_blank" rel="noopener" style="color: #0078a8; text-decoration: none;">
                    {ATTRIBUTION}
                </a>
            </div>
        </div>
    }
}
