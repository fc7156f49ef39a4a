use airspace_shared::layers::{LayerId, LayerVisibility};
use dioxus::prelude::*;

// Material "dashboard" and "layers" glyphs, 24x24 viewBox
const DASHBOARD_ICON: &str = "M3 13h8V3H3v10zm0 8h8v-6H3v6zm10 0h8V11h-8v10zm0-18v6h8V3h-8z";
const LAYERS_ICON: &str = "M11.99 18.54l-7.37-5.73L3 14.07l9 7 9-7-1.63-1.27-7.38 5.74zM12 16l7.36-5.73L21 9l-9-7-9 7 1.63 1.27L12 16z";

fn icon_path(layer: LayerId) -> &'static str {
    match layer {
        LayerId::Did => DASHBOARD_ICON,
        LayerId::Airport => LAYERS_ICON,
    }
}

#[component]
pub fn LayerMenu(mut visibility: Signal<LayerVisibility>) -> Element {
    let current = *visibility.read();

    rsx! {
        nav { class: "layer-menu",
            h3 { "Layers" }
            ul {
                for layer in LayerId::ALL {
                    li {
                        key: "{layer.prefix()}",
                        class: if current.get(layer) { "layer-entry active" } else { "layer-entry" },
                        role: "switch",
                        "aria-checked": "{current.get(layer)}",
                        onclick: move |_| {
                            let next = visibility.read().toggled(layer);
                            visibility.set(next);
                        },
                        svg {
                            class: "layer-icon",
                            view_box: "0 0 24 24",
                            path { d: icon_path(layer) }
                        }
                        span { class: "layer-swatch", style: "background: {layer.style().color};" }
                        span { class: "layer-label", "{layer.label()}" }
                    }
                }
            }
        }
    }
}
