use airspace_shared::geo::{LatLng, Viewport};
use airspace_shared::layers::{LayerBoard, LayerId, LayerVersion};
use airspace_shared::models::{Feature, PopupData};
use dioxus::prelude::*;

use crate::coords;

/// An open popup, anchored where its feature was clicked. It belongs to the
/// overlay drawn for `version` of `layer` and closes with it.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPopup {
    pub layer: LayerId,
    pub version: LayerVersion,
    pub anchor: LatLng,
    pub data: PopupData,
}

impl OpenPopup {
    /// True while the overlay the popup was opened on is still the one drawn.
    pub fn survives(&self, board: &LayerBoard) -> bool {
        board.get(self.layer).version == self.version
    }
}

/// One drawable shape: the combined path of a feature's polygons.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureShape {
    pub index: usize,
    pub d: String,
}

/// Project every feature with a drawable geometry into container-space path data.
/// Features without geometry, or whose rings are all degenerate, are skipped.
pub fn feature_shapes(viewport: &Viewport, features: &[Feature]) -> Vec<FeatureShape> {
    features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            let geometry = feature.geometry.as_ref()?;
            let d: String = geometry
                .polygons()
                .into_iter()
                .map(|rings| coords::polygon_path(viewport, rings))
                .collect();
            if d.is_empty() {
                None
            } else {
                Some(FeatureShape { index, d })
            }
        })
        .collect()
}

/// Vector overlay for one layer. The parent keys it by the layer's version, so a
/// new version tears this down and draws the new geometry from scratch.
#[component]
pub fn AreaOverlay(
    layer: LayerId,
    board: Signal<LayerBoard>,
    viewport: Signal<Viewport>,
    mut popup: Signal<Option<OpenPopup>>,
    container_id: &'static str,
    suppress_click: Signal<bool>,
) -> Element {
    let style = layer.style();
    let vp = *viewport.read();
    let shapes = {
        let board = board.read();
        feature_shapes(&vp, board.get(layer).features())
    };

    rsx! {
        svg {
            class: "area-overlay",
            width: "100%",
            height: "100%",
            for shape in shapes {
                path {
                    key: "{shape.index}",
                    d: "{shape.d}",
                    fill: style.color,
                    stroke: style.color,
                    "stroke-width": "{style.weight}",
                    "fill-opacity": "{style.fill_opacity}",
                    "fill-rule": "evenodd",
                    onclick: move |evt: Event<MouseData>| {
                        // A drag that ends over a shape is not a click
                        if *suppress_click.peek() {
                            return;
                        }
                        let client = evt.client_coordinates();
                        let Some(anchor) = coords::client_to_lat_lng(
                            client.x, client.y, container_id, &viewport.peek(),
                        ) else {
                            return;
                        };
                        let opened = {
                            let board = board.peek();
                            let state = board.get(layer);
                            state.features().get(shape.index).map(|feature| OpenPopup {
                                layer,
                                version: state.version.clone(),
                                anchor,
                                data: PopupData::from_feature(feature),
                            })
                        };
                        if opened.is_some() {
                            popup.set(opened);
                        }
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airspace_shared::bounds::QueryBounds;
    use airspace_shared::geo::LatLngBounds;
    use airspace_shared::layers::LayerVisibility;
    use airspace_shared::models::{FeatureCollection, Geometry, AREA_NAME_PROPERTY};
    use serde_json::{json, Map};

    fn viewport() -> Viewport {
        Viewport::new(LatLng::new(35.694644, 139.732008), 13, 800.0, 600.0)
    }

    fn square(lng: f64, lat: f64) -> Vec<Vec<f64>> {
        vec![
            vec![lng, lat],
            vec![lng + 0.01, lat],
            vec![lng + 0.01, lat + 0.01],
            vec![lng, lat + 0.01],
            vec![lng, lat],
        ]
    }

    fn named(geometry: Geometry, name: &str) -> Feature {
        let mut props = Map::new();
        props.insert(AREA_NAME_PROPERTY.to_string(), json!(name));
        Feature::new(geometry, props)
    }

    #[test]
    fn test_shapes_keep_feature_index() {
        let features = vec![
            named(Geometry::Polygon { coordinates: vec![square(139.72, 35.69)] }, "a"),
            Feature {
                kind: "Feature".to_string(),
                geometry: None,
                properties: None,
            },
            named(Geometry::Polygon { coordinates: vec![square(139.74, 35.69)] }, "b"),
        ];
        let shapes = feature_shapes(&viewport(), &features);
        let indices: Vec<usize> = shapes.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_multipolygon_is_one_shape() {
        let features = vec![named(
            Geometry::MultiPolygon {
                coordinates: vec![vec![square(139.72, 35.69)], vec![square(139.75, 35.70)]],
            },
            "split ward",
        )];
        let shapes = feature_shapes(&viewport(), &features);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].d.matches('M').count(), 2);
    }

    #[test]
    fn test_empty_collection_draws_nothing() {
        assert!(feature_shapes(&viewport(), &[]).is_empty());
    }

    fn bounds(north: f64) -> QueryBounds {
        QueryBounds::from_lat_lng_bounds(&LatLngBounds::new(
            LatLng::new(north, 139.8),
            LatLng::new(35.6, 139.6),
        ))
    }

    /// Board with both layers loaded for `bounds(35.75)`.
    fn loaded_board() -> LayerBoard {
        let mut board = LayerBoard::new(LayerVisibility::default());
        for command in board.refresh_all(&bounds(35.75)) {
            let fc = FeatureCollection::new(vec![named(
                Geometry::Polygon { coordinates: vec![square(139.72, 35.69)] },
                "Chiyoda",
            )]);
            assert!(board.complete(&command, Ok(fc)));
        }
        board
    }

    fn popup_on(board: &LayerBoard, layer: LayerId) -> OpenPopup {
        let state = board.get(layer);
        OpenPopup {
            layer,
            version: state.version.clone(),
            anchor: LatLng::new(35.695, 139.725),
            data: PopupData::from_feature(&state.features()[0]),
        }
    }

    #[test]
    fn test_popup_survives_while_overlay_unchanged() {
        let board = loaded_board();
        assert!(popup_on(&board, LayerId::Did).survives(&board));
    }

    #[test]
    fn test_popup_closes_when_its_layer_is_hidden() {
        let mut board = loaded_board();
        let popup = popup_on(&board, LayerId::Did);
        let hidden = LayerVisibility {
            did: false,
            airport: true,
        };
        assert!(board.set_visibility(hidden, Some(&bounds(35.75))).is_empty());
        assert!(!popup.survives(&board));
    }

    #[test]
    fn test_popup_on_other_layer_is_unaffected_by_hide() {
        let mut board = loaded_board();
        let popup = popup_on(&board, LayerId::Airport);
        let hidden = LayerVisibility {
            did: false,
            airport: true,
        };
        board.set_visibility(hidden, Some(&bounds(35.75)));
        assert!(popup.survives(&board));
    }

    #[test]
    fn test_popup_closes_when_refresh_lands() {
        let mut board = loaded_board();
        let popup = popup_on(&board, LayerId::Did);

        let commands = board.refresh_all(&bounds(35.8));
        // Still the old overlay until the new geometry arrives
        assert!(popup.survives(&board));

        for command in commands {
            board.complete(&command, Ok(FeatureCollection::empty()));
        }
        assert!(!popup.survives(&board));
    }
}
