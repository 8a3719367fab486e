use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crowd_shared::clock::format_display;

use crate::controls::apply_hover;
use crate::dashboard::Dashboard;

const PLAY_SVG: &str = r#"<svg width="12" height="14" viewBox="0 0 12 14" fill="currentColor" xmlns="http://www.w3.org/2000/svg"><path d="M1 1.5v11l10-5.5z"/></svg>"#;
const PAUSE_SVG: &str = r#"<svg width="12" height="14" viewBox="0 0 12 14" fill="currentColor" xmlns="http://www.w3.org/2000/svg"><rect x="1" y="1" width="3.5" height="12" rx="0.75"/><rect x="7.5" y="1" width="3.5" height="12" rx="0.75"/></svg>"#;

const TRANSPORT_STYLE: &str = "width: 32px; height: 32px; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 6px; cursor: pointer; color: #f5c542; display: flex; align-items: center; justify-content: center; flex-shrink: 0; margin-right: 4px; transition: background 0.15s ease, border-color 0.15s ease; touch-action: manipulation;";

/// Time-of-day bar: start/stop, slider, `HH:MM:SS` readout and the
/// occupancy counter.
#[component]
pub fn TimeBar() -> impl IntoView {
    let dashboard: Dashboard = expect_context();
    let playing = dashboard.playing;

    let on_range_input = move |e: web_sys::Event| {
        let Some(target) = e.target() else {
            return;
        };
        let Ok(input) = target.dyn_into::<web_sys::HtmlInputElement>() else {
            return;
        };
        let Ok(value) = input.value().parse::<u32>() else {
            return;
        };
        dashboard.set_slider(value);
    };

    let hover_in = move |e: web_sys::MouseEvent| {
        apply_hover(&e, &[("background", "#232738"), ("border-color", "#3a3f5c")]);
    };
    let hover_out = move |e: web_sys::MouseEvent| {
        apply_hover(&e, &[("background", "#1a1d2a"), ("border-color", "#282c3e")]);
    };

    view! {
        <div
            class="timeline-bar"
            style="position: absolute; bottom: 0; left: 0; right: 0; height: 52px; padding: 0 16px; z-index: 25; display: flex; align-items: center; background: #13161f; border-top: 1px solid rgba(245,197,66,0.15); font-family: 'JetBrains Mono', monospace; font-size: 0.72rem;"
        >
            <button
                title="Start animation"
                style=TRANSPORT_STYLE
                style:opacity=move || if playing.get() { "0.45" } else { "1" }
                inner_html=PLAY_SVG
                on:click=move |_| dashboard.start_animation()
                on:mouseenter=hover_in
                on:mouseleave=hover_out
            />
            <button
                title="Stop animation"
                style=TRANSPORT_STYLE
                style:opacity=move || if playing.get() { "1" } else { "0.45" }
                inner_html=PAUSE_SVG
                on:click=move |_| dashboard.stop_animation()
                on:mouseenter=hover_in
                on:mouseleave=hover_out
            />

            <div style="width: 1px; height: 24px; background: #282c3e; margin: 0 10px; flex-shrink: 0;" />

            <input
                id="timebar"
                type="range"
                class="timeline-slider"
                style="flex: 1; margin: 0 8px; accent-color: #f5c542;"
                min=move || dashboard.slider_bounds().0.to_string()
                max=move || dashboard.slider_bounds().1.to_string()
                prop:value=move || dashboard.slider.get().to_string()
                on:input=on_range_input
            />

            <div style="width: 1px; height: 24px; background: #282c3e; margin: 0 10px; flex-shrink: 0;" />
            <span
                id="time-display"
                style="color: #e2e0d8; flex-shrink: 0; min-width: 72px; text-align: center; font-variant-numeric: tabular-nums;"
            >
                {move || format_display(dashboard.display_minutes())}
            </span>
            <span
                style:display=move || if dashboard.playback_window.get().is_some() { "inline" } else { "none" }
                style="margin-left: 8px; border: 1px solid #3a3f5c; border-radius: 4px; padding: 5px 10px; color: #9a9590; font-size: 0.65rem; font-weight: 700; letter-spacing: 0.05em;"
            >
                "Route"
            </span>
            <div style="width: 1px; height: 24px; background: #282c3e; margin: 0 10px; flex-shrink: 0;" />
            <span
                id="occupancy-counter"
                style="color: #f5c542; flex-shrink: 0; min-width: 220px; text-align: right; font-weight: 600;"
            >
                {move || dashboard.counter.get()}
            </span>
            <span style="color: #5a5860; flex-shrink: 0; margin-left: 12px; font-size: 0.62rem;">
                {move || dashboard.last_updated.get().map(|at| format!("updated {at}")).unwrap_or_default()}
            </span>
        </div>
    }
}
