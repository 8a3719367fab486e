use gloo_storage::Storage;
use leptos::prelude::*;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;

use std::cell::RefCell;

use crowd_shared::ViewMode;
use crowd_shared::clock::DEFAULT_TRAJECTORY_DATE;

use crate::canvas::MapCanvas;
use crate::controls::ControlPanel;
use crate::dashboard::{Dashboard, DataSource, REFRESH_INTERVAL_MS};
use crate::panels::InfoPanels;
use crate::timeline::TimeBar;
use crate::viewport::Viewport;

const SETTINGS_KEY: &str = "crowd_visual_settings";
const KEYBOARD_PAN_PX: f64 = 80.0;
const KEYBOARD_ZOOM_DELTA: f64 = 120.0;

fn canvas_dimensions() -> (f64, f64) {
    let Some(window) = web_sys::window() else {
        return (1200.0, 800.0);
    };
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(1200.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    (w, h)
}

struct RefreshIntervalBinding {
    window: web_sys::Window,
    interval_id: i32,
    _callback: wasm_bindgen::closure::Closure<dyn Fn()>,
}

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

struct ResizeBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn()>,
}

thread_local! {
    static REFRESH_INTERVAL_BINDING: RefCell<Option<RefreshIntervalBinding>> = const { RefCell::new(None) };
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

/// Name of the building under the cursor. Wrapped so it gets its own
/// context slot next to other `RwSignal<Option<String>>` values.
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<String>>);

/// View preferences kept in localStorage between visits.
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct Settings {
    view_mode: ViewMode,
    source: DataSource,
    date: Option<String>,
    trajectory_date: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::default(),
            source: DataSource::default(),
            date: None,
            trajectory_date: DEFAULT_TRAJECTORY_DATE.to_string(),
        }
    }
}

/// Root application component. Provides global reactive signals via context.
#[component]
pub fn App() -> impl IntoView {
    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    let (w, h) = canvas_dimensions();
    let mut initial_view = Viewport::default();
    initial_view.resize(w, h);
    let viewport: RwSignal<Viewport> = RwSignal::new(initial_view);
    let hovered: RwSignal<Option<String>> = RwSignal::new(None);
    let mouse_pos: RwSignal<(f64, f64)> = RwSignal::new((0.0, 0.0));

    let date = saved
        .date
        .unwrap_or_else(|| saved.source.default_date().to_string());
    let dashboard = Dashboard::new(
        viewport,
        saved.source,
        saved.view_mode,
        date,
        saved.trajectory_date,
    );

    provide_context(dashboard);
    provide_context(viewport);
    provide_context(Hovered(hovered));
    provide_context(mouse_pos);

    // Persist view preferences whenever they change
    Effect::new(move || {
        let settings = Settings {
            view_mode: dashboard.view_mode.get(),
            source: dashboard.source.get(),
            date: Some(dashboard.date_input.get()),
            trajectory_date: dashboard.trajectory_date.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings);
    });

    // Discover buildings and draw the first heatmap on mount
    Effect::new(move || {
        dashboard.initialize_buildings();
    });

    // Periodic refresh of whatever the slider currently shows
    Effect::new(move || {
        use wasm_bindgen::prelude::*;
        let Some(window) = web_sys::window() else {
            return;
        };

        REFRESH_INTERVAL_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                old.window.clear_interval_with_handle(old.interval_id);
            }
        });

        let cb = Closure::<dyn Fn()>::new(move || dashboard.refresh());
        let Ok(interval_id) = window.set_interval_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            REFRESH_INTERVAL_MS as i32,
        ) else {
            return;
        };
        REFRESH_INTERVAL_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(RefreshIntervalBinding {
                window: window.clone(),
                interval_id,
                _callback: cb,
            });
        });
    });

    // Keep the viewport in step with the window size
    Effect::new(move || {
        use wasm_bindgen::prelude::*;
        let Some(window) = web_sys::window() else {
            return;
        };

        RESIZE_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "resize",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler = Closure::<dyn Fn()>::new(move || {
            let (w, h) = canvas_dimensions();
            viewport.update(|vp| vp.resize(w, h));
        });
        if window
            .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            RESIZE_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(ResizeBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    // Global keyboard shortcuts
    Effect::new(move || {
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let key = e.key();
                let target_tag = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    .map(|el| el.tag_name())
                    .unwrap_or_default();

                // Don't intercept when typing in an input
                if target_tag == "INPUT" || target_tag == "TEXTAREA" {
                    if key == "Escape"
                        && let Some(el) = e
                            .target()
                            .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    {
                        el.blur().ok();
                    }
                    return;
                }

                let (cw, ch) = viewport.with_untracked(|vp| (vp.width, vp.height));
                match key.as_str() {
                    " " => {
                        e.prevent_default();
                        dashboard.toggle_animation();
                    }
                    "Escape" => {
                        dashboard.popup.set(None);
                        hovered.set(None);
                    }
                    "c" => dashboard.select_campus(),
                    "h" => dashboard.toggle_view_mode(),
                    "+" | "=" => {
                        e.prevent_default();
                        viewport.update(|vp| vp.zoom_at(-KEYBOARD_ZOOM_DELTA, cw / 2.0, ch / 2.0));
                    }
                    "-" => {
                        e.prevent_default();
                        viewport.update(|vp| vp.zoom_at(KEYBOARD_ZOOM_DELTA, cw / 2.0, ch / 2.0));
                    }
                    "ArrowLeft" => viewport.update(|vp| vp.pan(KEYBOARD_PAN_PX, 0.0)),
                    "ArrowRight" => viewport.update(|vp| vp.pan(-KEYBOARD_PAN_PX, 0.0)),
                    "ArrowUp" => viewport.update(|vp| vp.pan(0.0, KEYBOARD_PAN_PX)),
                    "ArrowDown" => viewport.update(|vp| vp.pan(0.0, -KEYBOARD_PAN_PX)),
                    _ => {}
                }
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    view! {
        <div style="width: 100%; height: 100%; position: relative; overflow: hidden; background: #13161f;">
            <MapCanvas />
            <ControlPanel />
            <InfoPanels />
            <TimeBar />
        </div>
        <Tooltip />
    }
}

/// Tooltip that follows the mouse cursor when hovering a building.
#[component]
fn Tooltip() -> impl IntoView {
    let Hovered(hovered) = expect_context();
    let mouse_pos: RwSignal<(f64, f64)> = expect_context();

    view! {
        {move || {
            let Some(name) = hovered.get() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let (x, y) = mouse_pos.get();
            view! {
                <div
                    style:left=format!("{}px", x + 16.0)
                    style:top=format!("{}px", y - 8.0)
                    style="position: fixed; pointer-events: none; z-index: 100; background: #161921; border: 1px solid #282c3e; border-radius: 6px; box-shadow: 0 4px 16px rgba(0,0,0,0.5); padding: 6px 10px; font-size: 0.78rem; font-weight: 600; color: #e2e0d8; font-family: 'Inter', system-ui, sans-serif; white-space: nowrap;"
                >
                    {name}
                </div>
            }.into_any()
        }}
    }
}
