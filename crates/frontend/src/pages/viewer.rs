use airspace_shared::layers::LayerVisibility;
use dioxus::prelude::*;

use crate::components::area_map::AreaMap;
use crate::components::layer_menu::LayerMenu;

/// Top-level page. Owns the layer visibility flags; the menu flips them and the map
/// reacts to the change.
#[component]
pub fn Viewer() -> Element {
    let visibility = use_signal(LayerVisibility::default);

    rsx! {
        div { class: "app",
            div { class: "sidebar",
                LayerMenu { visibility: visibility }
            }
            AreaMap { visibility: visibility }
        }
    }
}
