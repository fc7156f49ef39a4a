use airspace_shared::bounds::QueryBounds;
use airspace_shared::geo::{self, LatLng, Pixel, Viewport, MAX_ZOOM, MIN_ZOOM};
use airspace_shared::layers::{FetchCommand, LayerBoard, LayerId, LayerVisibility};
use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::logger::tracing;
use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;

use crate::api;
use crate::components::area_overlay::{AreaOverlay, OpenPopup};
use crate::components::area_popup::AreaPopup;
use crate::coords;

const MAP_CONTAINER_ID: &str = "area-map-container";

pub const INITIAL_CENTER: LatLng = LatLng::new(35.694644, 139.732008);
pub const INITIAL_ZOOM: u8 = 13;

const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str = "\u{00a9} OpenStreetMap contributors";

/// Drag threshold in pixels; movement below this is treated as a click.
const DRAG_THRESHOLD: f64 = 3.0;

/// Touch drag threshold, larger than mouse because touch is less precise.
const TOUCH_DRAG_THRESHOLD: f64 = 8.0;

/// Quiet period after the last wheel step before the zoom counts as finished.
const WHEEL_SETTLE_MS: u32 = 200;

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Convert a wheel delta (pixels / lines / pages) to a uniform pixel-like value.
fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

/// One integral zoom step per wheel event: scrolling up zooms in.
fn wheel_zoom_target(zoom: u8, delta_y: f64) -> u8 {
    if delta_y < 0.0 {
        zoom.saturating_add(1).min(MAX_ZOOM)
    } else if delta_y > 0.0 {
        zoom.saturating_sub(1).max(MIN_ZOOM)
    } else {
        zoom
    }
}

fn exceeds_threshold(dx: f64, dy: f64, threshold: f64) -> bool {
    dx.abs() > threshold || dy.abs() > threshold
}

/// Bounds of the viewport as query bounds, or `None` while the map has no size.
fn current_bounds(viewport: &Viewport) -> Option<QueryBounds> {
    QueryBounds::from_viewport(viewport.bounds().as_ref())
}

/// Viewport resized to the live container, if it is in the DOM.
fn measured(viewport: Viewport) -> Viewport {
    match coords::container_rect(MAP_CONTAINER_ID) {
        Some(rect) => viewport.with_size(rect.width(), rect.height()),
        None => viewport,
    }
}

// ---------------------------------------------------------------------------
// Fetch plumbing
// ---------------------------------------------------------------------------

/// Spawn one task per fetch command; each result is handed back to the board,
/// which drops it if a newer update for that layer has happened since.
fn dispatch(board: Signal<LayerBoard>, commands: Vec<FetchCommand>) {
    for command in commands {
        let mut board = board;
        spawn(async move {
            let outcome = api::fetch_areas(&command).await;
            if let Err(e) = &outcome {
                tracing::warn!(layer = %command.layer, "area fetch failed: {}", e);
            }
            if !board.write().complete(&command, outcome) {
                tracing::debug!(
                    layer = %command.layer,
                    generation = command.generation,
                    "discarding stale area response"
                );
            }
        });
    }
}

/// Map finished moving (or mounted): refresh every layer for the new bounds.
fn move_end(mut viewport: Signal<Viewport>, mut board: Signal<LayerBoard>) {
    let vp = measured(*viewport.peek());
    viewport.set(vp);
    let Some(bounds) = current_bounds(&vp) else {
        tracing::debug!("map has no size yet, skipping area refresh");
        return;
    };
    let commands = board.write().refresh_all(&bounds);
    dispatch(board, commands);
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

#[component]
pub fn AreaMap(visibility: Signal<LayerVisibility>) -> Element {
    let mut viewport =
        use_signal(|| Viewport::new(INITIAL_CENTER, INITIAL_ZOOM, 0.0, 0.0));
    let mut board = use_signal(|| LayerBoard::new(*visibility.peek()));
    let mut popup = use_signal(|| None::<OpenPopup>);

    // Drag state (mouse)
    let mut is_dragging = use_signal(|| false);
    let mut did_drag = use_signal(|| false);
    let mut drag_start_x = use_signal(|| 0.0_f64);
    let mut drag_start_y = use_signal(|| 0.0_f64);
    let mut drag_start_view = use_signal(|| None::<Viewport>);

    // Touch state
    let mut touch_start_pos = use_signal(|| None::<(f64, f64)>);
    let mut touch_did_pan = use_signal(|| false);

    let mut wheel_seq = use_signal(|| 0u64);

    // Visibility flag changes: only the layer whose flag flipped is updated
    use_effect(move || {
        let vis = *visibility.read();
        let bounds = current_bounds(&viewport.peek());
        let commands = board.write().set_visibility(vis, bounds.as_ref());
        dispatch(board, commands);
    });

    // A popup closes with the overlay it was opened on
    use_effect(move || {
        let board = board.read();
        let stale = popup.peek().as_ref().is_some_and(|p| !p.survives(&board));
        if stale {
            popup.set(None);
        }
    });

    let vp = *viewport.read();
    let tiles = vp.visible_tiles();
    let dragging = *is_dragging.read();
    let container_class = if dragging {
        "map-container dragging"
    } else {
        "map-container"
    };

    let overlays: Vec<(LayerId, String)> = {
        let b = board.read();
        LayerId::ALL
            .into_iter()
            .map(|layer| (layer, b.get(layer).version.to_string()))
            .collect()
    };

    let open_popup = popup
        .read()
        .clone()
        .filter(|p| p.survives(&board.read()));
    let popup_view = open_popup.map(|p| {
        let at = vp.container_point(p.anchor);
        (p.data, at)
    });

    let mut zoom_by = move |step: i16| {
        let current = measured(*viewport.peek());
        let target = (current.zoom as i16 + step).clamp(MIN_ZOOM as i16, MAX_ZOOM as i16) as u8;
        if target == current.zoom {
            return;
        }
        let focus = Pixel::new(current.width / 2.0, current.height / 2.0);
        viewport.set(current.zoomed_at(focus, target));
        move_end(viewport, board);
    };

    rsx! {
        div {
            id: MAP_CONTAINER_ID,
            class: "{container_class}",

            onmounted: move |_| {
                move_end(viewport, board);
            },

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();

                let delta_y = wheel_delta_y(evt.data().delta());
                let current = measured(*viewport.peek());
                let target = wheel_zoom_target(current.zoom, delta_y);
                if target == current.zoom {
                    return;
                }

                let Some(rect) = coords::container_rect(MAP_CONTAINER_ID) else { return };
                let client = evt.data().client_coordinates();
                let focus = coords::client_to_container(client.x, client.y, rect.left(), rect.top());
                viewport.set(current.zoomed_at(focus, target));

                // Coalesce bursts of wheel steps into one move end
                let seq = *wheel_seq.peek() + 1;
                wheel_seq.set(seq);
                spawn(async move {
                    TimeoutFuture::new(WHEEL_SETTLE_MS).await;
                    if *wheel_seq.peek() == seq {
                        move_end(viewport, board);
                    }
                });
            },

            onmousedown: move |evt: Event<MouseData>| {
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let client = evt.client_coordinates();
                is_dragging.set(true);
                did_drag.set(false);
                drag_start_x.set(client.x);
                drag_start_y.set(client.y);
                drag_start_view.set(Some(*viewport.peek()));
            },

            onmousemove: move |evt: Event<MouseData>| {
                if !*is_dragging.read() {
                    return;
                }
                let client = evt.client_coordinates();
                let dx = client.x - *drag_start_x.read();
                let dy = client.y - *drag_start_y.read();

                if !*did_drag.read() && exceeds_threshold(dx, dy, DRAG_THRESHOLD) {
                    did_drag.set(true);
                }
                if *did_drag.read() {
                    if let Some(start) = *drag_start_view.read() {
                        viewport.set(start.panned_by(dx, dy));
                    }
                }
            },

            onmouseup: move |_evt: Event<MouseData>| {
                let was_dragging = *is_dragging.read();
                let was_drag = *did_drag.read();
                is_dragging.set(false);

                if was_dragging && was_drag {
                    move_end(viewport, board);
                } else if was_dragging {
                    // Plain click on the map closes any popup; a shape click reopens it
                    popup.set(None);
                }
            },

            onmouseleave: move |_| {
                if *is_dragging.read() && *did_drag.read() {
                    move_end(viewport, board);
                }
                is_dragging.set(false);
            },

            ondoubleclick: move |evt: Event<MouseData>| {
                evt.prevent_default();
                let Some(rect) = coords::container_rect(MAP_CONTAINER_ID) else { return };
                let client = evt.client_coordinates();
                let focus = coords::client_to_container(client.x, client.y, rect.left(), rect.top());
                let current = measured(*viewport.peek());
                let target = wheel_zoom_target(current.zoom, -1.0);
                if target != current.zoom {
                    viewport.set(current.zoomed_at(focus, target));
                    move_end(viewport, board);
                }
            },

            // --- Touch event handlers ---

            ontouchstart: move |evt: Event<TouchData>| {
                let touches = evt.data().touches();
                if touches.len() == 1 {
                    let t = &touches[0];
                    touch_start_pos.set(Some((t.client_coordinates().x, t.client_coordinates().y)));
                    touch_did_pan.set(false);
                    drag_start_view.set(Some(*viewport.peek()));
                } else {
                    touch_start_pos.set(None);
                }
            },

            ontouchmove: move |evt: Event<TouchData>| {
                let touches = evt.data().touches();
                if touches.len() != 1 {
                    return;
                }
                evt.prevent_default();
                let t = &touches[0];
                let cur = (t.client_coordinates().x, t.client_coordinates().y);
                if let Some(start) = *touch_start_pos.read() {
                    let dx = cur.0 - start.0;
                    let dy = cur.1 - start.1;
                    if !*touch_did_pan.read() && exceeds_threshold(dx, dy, TOUCH_DRAG_THRESHOLD) {
                        touch_did_pan.set(true);
                    }
                    if *touch_did_pan.read() {
                        if let Some(view) = *drag_start_view.read() {
                            viewport.set(view.panned_by(dx, dy));
                        }
                    }
                }
            },

            ontouchend: move |evt: Event<TouchData>| {
                if evt.data().touches().is_empty() {
                    if *touch_did_pan.read() {
                        move_end(viewport, board);
                    }
                    touch_start_pos.set(None);
                    touch_did_pan.set(false);
                }
            },

            ontouchcancel: move |_evt: Event<TouchData>| {
                touch_start_pos.set(None);
                touch_did_pan.set(false);
            },

            div { class: "tile-pane",
                for tile in tiles {
                    img {
                        key: "{tile.coord.z}/{tile.left}/{tile.top}",
                        class: "map-tile",
                        src: geo::tile_url(TILE_URL, tile.coord),
                        style: "left: {tile.left}px; top: {tile.top}px;",
                        draggable: "false",
                        alt: "",
                    }
                }
            }

            div { class: "overlay-pane",
                for (layer, version) in overlays {
                    AreaOverlay {
                        key: "{version}",
                        layer: layer,
                        board: board,
                        viewport: viewport,
                        popup: popup,
                        container_id: MAP_CONTAINER_ID,
                        suppress_click: did_drag,
                    }
                }
            }

            if let Some((data, at)) = popup_view {
                AreaPopup {
                    data: data,
                    left: at.x,
                    top: at.y,
                    on_close: move |_| popup.set(None),
                }
            }

            div {
                class: "zoom-controls",
                onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
                onmouseup: move |evt: Event<MouseData>| evt.stop_propagation(),
                ondoubleclick: move |evt: Event<MouseData>| evt.stop_propagation(),
                button {
                    "aria-label": "Zoom in",
                    disabled: vp.zoom >= MAX_ZOOM,
                    onclick: move |_| zoom_by(1),
                    "+"
                }
                button {
                    "aria-label": "Zoom out",
                    disabled: vp.zoom <= MIN_ZOOM,
                    onclick: move |_| zoom_by(-1),
                    "\u{2212}"
                }
            }

            div { class: "attribution", "{TILE_ATTRIBUTION}" }
        }
    }
}
