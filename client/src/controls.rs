use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::colors::gradient_css;
use crate::dashboard::Dashboard;

const BUTTON_STYLE: &str = "background: #1a1d2a; border: 1px solid #282c3e; border-radius: 4px; color: #9a9590; font-family: 'JetBrains Mono', monospace; font-size: 0.68rem; padding: 5px 10px; cursor: pointer; transition: background 0.15s ease, color 0.15s ease, border-color 0.15s ease;";
const ACTIVE_BUTTON_STYLE: &str = "background: #232738; border: 1px solid #f5c542; border-radius: 4px; color: #f5c542; font-family: 'JetBrains Mono', monospace; font-size: 0.68rem; padding: 5px 10px; cursor: pointer;";
const INPUT_STYLE: &str = "background: #1a1d2a; border: 1px solid #282c3e; border-radius: 4px; color: #e2e0d8; font-family: 'JetBrains Mono', monospace; font-size: 0.7rem; padding: 5px 8px; outline: none; min-width: 0; flex: 1;";
const SECTION_LABEL_STYLE: &str = "color: #5a5860; font-size: 0.6rem; font-weight: 700; letter-spacing: 0.08em; text-transform: uppercase; margin: 10px 0 6px 0;";

/// Sets inline style properties on the event's target element.
pub(crate) fn apply_hover(e: &web_sys::MouseEvent, props: &[(&str, &str)]) {
    if let Some(el) = e
        .target()
        .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
    {
        for (name, value) in props {
            el.style().set_property(name, value).ok();
        }
    }
}

fn hover_in(e: web_sys::MouseEvent) {
    apply_hover(&e, &[("background", "#232738"), ("color", "#e2e0d8")]);
}

fn hover_out(e: web_sys::MouseEvent) {
    apply_hover(&e, &[("background", "#1a1d2a"), ("color", "#9a9590")]);
}

fn input_value(e: &web_sys::Event) -> Option<String> {
    let target = e.target()?;
    let input = target.dyn_into::<web_sys::HtmlInputElement>().ok()?;
    Some(input.value())
}

/// Left-hand control column: date, view toggles, building and floor
/// buttons, trajectory lookup and the heat legend.
#[component]
pub fn ControlPanel() -> impl IntoView {
    let dashboard: Dashboard = expect_context();

    let building_buttons = move || {
        let selected = dashboard
            .selected_building
            .with(|b| b.as_ref().map(|b| b.name.clone()));
        dashboard
            .buildings
            .get()
            .into_iter()
            .map(|building| {
                let is_selected = selected.as_deref() == Some(building.name.as_str());
                let label = building.name.clone();
                view! {
                    <button
                        class="building-button"
                        style=if is_selected { ACTIVE_BUTTON_STYLE } else { BUTTON_STYLE }
                        on:click=move |_| dashboard.select_building(building.clone())
                    >
                        {label}
                    </button>
                }
            })
            .collect_view()
    };

    let floor_buttons = move || {
        let count = dashboard.floor_count.get();
        let current = dashboard.selected_floor.get();
        (1..=count)
            .map(|floor| {
                view! {
                    <button
                        class="floor-button"
                        style=if current == Some(floor) { ACTIVE_BUTTON_STYLE } else { BUTTON_STYLE }
                        on:click=move |_| dashboard.select_floor(floor)
                    >
                        {format!("Floor {floor}")}
                    </button>
                }
            })
            .collect_view()
    };

    view! {
        <div
            class="control-panel"
            style="position: absolute; top: 12px; left: 12px; bottom: 64px; width: 260px; z-index: 20; display: flex; flex-direction: column; background: rgba(19,22,31,0.94); border: 1px solid #282c3e; border-radius: 8px; padding: 12px; overflow-y: auto; font-family: 'Inter', sans-serif; color: #e2e0d8;"
        >
            <div style="font-family: 'JetBrains Mono', monospace; font-weight: 700; color: #f5c542; font-size: 0.85rem; letter-spacing: 0.04em;">
                "Crowd Visual"
            </div>

            <div style=SECTION_LABEL_STYLE>"Date"</div>
            <div style="display: flex; gap: 6px;">
                <input
                    id="date-input"
                    type="text"
                    placeholder="YYYY-MM-DD"
                    style=INPUT_STYLE
                    prop:value=move || dashboard.date_input.get()
                    on:input=move |e| {
                        if let Some(value) = input_value(&e) {
                            dashboard.date_input.set(value);
                        }
                    }
                />
                <button
                    id="view-occupancy-button"
                    style=BUTTON_STYLE
                    on:click=move |_| dashboard.view_occupancy()
                    on:mouseenter=hover_in
                    on:mouseleave=hover_out
                >
                    "View occupancy"
                </button>
            </div>

            <div style=SECTION_LABEL_STYLE>"View"</div>
            <div style="display: flex; gap: 6px; flex-wrap: wrap;">
                <button
                    id="toggle-view-button"
                    title="Toggle view mode (H)"
                    style=BUTTON_STYLE
                    on:click=move |_| dashboard.toggle_view_mode()
                    on:mouseenter=hover_in
                    on:mouseleave=hover_out
                >
                    {move || dashboard.view_mode.get().toggle_label()}
                </button>
                <button
                    id="toggle-source-button"
                    style=BUTTON_STYLE
                    on:click=move |_| dashboard.toggle_data_source()
                    on:mouseenter=hover_in
                    on:mouseleave=hover_out
                >
                    {move || dashboard.source.get().toggle_label()}
                </button>
            </div>

            <div style=SECTION_LABEL_STYLE>"Buildings"</div>
            <div id="building-buttons-container" style="display: flex; gap: 4px; flex-wrap: wrap;">
                <button
                    class="building-button"
                    title="Campus view (C)"
                    style=move || if dashboard.selected_building.with(Option::is_none) { ACTIVE_BUTTON_STYLE } else { BUTTON_STYLE }
                    on:click=move |_| dashboard.select_campus()
                >
                    "Campus"
                </button>
                {building_buttons}
            </div>

            <div
                style:display={move || if dashboard.floor_count.get() > 0 { "block" } else { "none" }}
            >
                <div style=SECTION_LABEL_STYLE>"Floors"</div>
                <div id="floor-buttons-container" style="display: flex; gap: 4px; flex-wrap: wrap;">
                    {floor_buttons}
                </div>
            </div>

            <div style=SECTION_LABEL_STYLE>"Trajectory"</div>
            <div style="display: flex; flex-direction: column; gap: 6px;">
                <input
                    id="device-id-input"
                    type="text"
                    placeholder="Device ID"
                    style=INPUT_STYLE
                    prop:value=move || dashboard.device_id.get()
                    on:input=move |e| {
                        if let Some(value) = input_value(&e) {
                            dashboard.device_id.set(value);
                        }
                    }
                    on:keydown=move |e: web_sys::KeyboardEvent| {
                        if e.key() == "Enter" {
                            dashboard.plot_trajectory();
                        }
                    }
                />
                <input
                    id="trajectory-date-input"
                    type="text"
                    placeholder="YYYY-MM-DD"
                    style=INPUT_STYLE
                    prop:value=move || dashboard.trajectory_date.get()
                    on:input=move |e| {
                        if let Some(value) = input_value(&e) {
                            dashboard.trajectory_date.set(value);
                        }
                    }
                />
                <div style="display: flex; gap: 6px;">
                    <button
                        id="view-trajectory-button"
                        style=BUTTON_STYLE
                        on:click=move |_| dashboard.plot_trajectory()
                        on:mouseenter=hover_in
                        on:mouseleave=hover_out
                    >
                        "View trajectory"
                    </button>
                    <button
                        style=BUTTON_STYLE
                        style:display=move || if dashboard.route.with(Option::is_some) { "inline-block" } else { "none" }
                        on:click=move |_| dashboard.clear_trajectory()
                        on:mouseenter=hover_in
                        on:mouseleave=hover_out
                    >
                        "Clear route"
                    </button>
                </div>
            </div>

            <div style="margin-top: auto; padding-top: 12px;">
                <div style=SECTION_LABEL_STYLE>"Occupancy"</div>
                <div style=move || format!(
                    "height: 8px; border-radius: 4px; background: {};",
                    gradient_css(dashboard.source.get().gradient())
                ) />
                <div style="display: flex; justify-content: space-between; color: #5a5860; font-size: 0.6rem; margin-top: 3px; font-family: 'JetBrains Mono', monospace;">
                    <span>"low"</span>
                    <span>"high"</span>
                </div>
            </div>
        </div>
    }
}
