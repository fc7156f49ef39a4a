use airspace_shared::models::PopupData;
use dioxus::prelude::*;

#[component]
pub fn AreaPopup(data: PopupData, left: f64, top: f64, on_close: EventHandler<()>) -> Element {
    rsx! {
        div {
            class: "area-popup",
            style: "left: {left}px; top: {top}px;",
            onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
            onmouseup: move |evt: Event<MouseData>| evt.stop_propagation(),
            button {
                class: "popup-close",
                "aria-label": "Close popup",
                onclick: move |_| on_close.call(()),
                "\u{00d7}"
            }
            div { class: "popup-name", "{data.area_name}" }
            if let Some(id) = &data.area_id {
                div { class: "popup-id", "{id}" }
            }
        }
    }
}
