mod api;
mod components;
mod coords;
mod pages;

use dioxus::prelude::*;

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Title { "Airspace Areas" }
        document::Stylesheet { href: CSS }
        pages::viewer::Viewer {}
    }
}

fn main() {
    launch(App);
}
