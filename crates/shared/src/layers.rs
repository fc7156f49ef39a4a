//! Per-layer overlay state and the transitions that drive it.
//!
//! `LayerBoard` is the single owner of every layer's visibility, version token
//! and geometry. The UI feeds it events (mount, bounds change, visibility change,
//! fetch completion) and executes the `FetchCommand`s it hands back; it never
//! performs I/O itself.
use std::collections::BTreeMap;
use std::fmt;

use crate::bounds::QueryBounds;
use crate::models::{Feature, FeatureCollection};

/// Version value used while a layer holds no fetched geometry.
pub const EMPTY_VERSION: &str = "0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    Did,
    Airport,
}

impl LayerId {
    pub const ALL: [LayerId; 2] = [LayerId::Did, LayerId::Airport];

    pub fn prefix(self) -> &'static str {
        match self {
            LayerId::Did => "DID",
            LayerId::Airport => "AP",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayerId::Did => "DID",
            LayerId::Airport => "Airport",
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            LayerId::Did => "/api/did_areas",
            LayerId::Airport => "/api/airport_areas",
        }
    }

    pub fn style(self) -> LayerStyle {
        match self {
            LayerId::Did => LayerStyle {
                color: "#ff0000",
                weight: 1.0,
                fill_opacity: 0.2,
            },
            LayerId::Airport => LayerStyle {
                color: "#008000",
                weight: 1.0,
                fill_opacity: 0.2,
            },
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    pub color: &'static str,
    pub weight: f64,
    pub fill_opacity: f64,
}

/// Overlay identity token, `"<PREFIX>_<bounds>"` or `"<PREFIX>_0"`.
/// The overlay is keyed by it, so a new token rebuilds the overlay from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerVersion(String);

impl LayerVersion {
    pub fn empty(layer: LayerId) -> Self {
        LayerVersion(format!("{}_{}", layer.prefix(), EMPTY_VERSION))
    }

    pub fn for_bounds(layer: LayerId, bounds: &QueryBounds) -> Self {
        LayerVersion(format!("{}_{}", layer.prefix(), bounds))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a layer fetch produced no geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerFetchError {
    Network(String),
    Status(u16),
    Decode(String),
}

impl fmt::Display for LayerFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerFetchError::Network(e) => write!(f, "request failed: {}", e),
            LayerFetchError::Status(code) => write!(f, "server responded with status {}", code),
            LayerFetchError::Decode(e) => write!(f, "malformed response body: {}", e),
        }
    }
}

impl std::error::Error for LayerFetchError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPhase {
    /// Created, nothing requested yet.
    Idle,
    Hidden,
    Loading,
    Shown,
    /// Fetch failed; rendered as empty.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerState {
    pub visible: bool,
    pub version: LayerVersion,
    /// `None` after a failed fetch.
    pub geometry: Option<FeatureCollection>,
    pub phase: LayerPhase,
    /// Stamp of the most recent update; only a fetch carrying it may land.
    pub generation: u64,
    pub last_error: Option<LayerFetchError>,
}

impl LayerState {
    fn new(layer: LayerId, visible: bool) -> Self {
        LayerState {
            visible,
            version: LayerVersion::empty(layer),
            geometry: Some(FeatureCollection::empty()),
            phase: LayerPhase::Idle,
            generation: 0,
            last_error: None,
        }
    }

    /// Features to draw; absent geometry draws nothing.
    pub fn features(&self) -> &[Feature] {
        self.geometry
            .as_ref()
            .map(|fc| fc.features.as_slice())
            .unwrap_or(&[])
    }
}

/// Visibility flags as held by the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerVisibility {
    pub did: bool,
    pub airport: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        LayerVisibility {
            did: true,
            airport: true,
        }
    }
}

impl LayerVisibility {
    pub fn get(&self, layer: LayerId) -> bool {
        match layer {
            LayerId::Did => self.did,
            LayerId::Airport => self.airport,
        }
    }

    pub fn toggled(self, layer: LayerId) -> Self {
        match layer {
            LayerId::Did => LayerVisibility {
                did: !self.did,
                ..self
            },
            LayerId::Airport => LayerVisibility {
                airport: !self.airport,
                ..self
            },
        }
    }
}

/// A request the caller must issue: `GET <endpoint>?bounds=<bounds>`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchCommand {
    pub layer: LayerId,
    pub generation: u64,
    pub bounds: QueryBounds,
}

impl FetchCommand {
    /// Path and query, relative to the API origin.
    pub fn path(&self) -> String {
        format!("{}?bounds={}", self.layer.endpoint(), self.bounds)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerBoard {
    layers: BTreeMap<LayerId, LayerState>,
}

impl LayerBoard {
    pub fn new(visibility: LayerVisibility) -> Self {
        let layers = LayerId::ALL
            .into_iter()
            .map(|id| (id, LayerState::new(id, visibility.get(id))))
            .collect();
        LayerBoard { layers }
    }

    pub fn get(&self, layer: LayerId) -> &LayerState {
        // Every LayerId is inserted in `new`
        &self.layers[&layer]
    }

    fn state_mut(&mut self, layer: LayerId) -> &mut LayerState {
        self.layers
            .entry(layer)
            .or_insert_with(|| LayerState::new(layer, false))
    }

    pub fn visibility(&self) -> LayerVisibility {
        LayerVisibility {
            did: self.get(LayerId::Did).visible,
            airport: self.get(LayerId::Airport).visible,
        }
    }

    /// Mount and move-end: update every layer regardless of what changed.
    pub fn refresh_all(&mut self, bounds: &QueryBounds) -> Vec<FetchCommand> {
        LayerId::ALL
            .into_iter()
            .filter_map(|layer| self.update_layer(layer, bounds))
            .collect()
    }

    /// Visible: stamp a new generation and ask for a fetch. Hidden: clear at once.
    pub fn update_layer(&mut self, layer: LayerId, bounds: &QueryBounds) -> Option<FetchCommand> {
        let state = self.state_mut(layer);
        state.generation += 1;
        if state.visible {
            state.phase = LayerPhase::Loading;
            Some(FetchCommand {
                layer,
                generation: state.generation,
                bounds: *bounds,
            })
        } else {
            clear(layer, state);
            None
        }
    }

    /// Apply new menu flags. Only layers whose flag actually changed are updated.
    ///
    /// Without bounds (map not measured yet) a layer being hidden is still cleared,
    /// a layer being shown waits for the next refresh.
    pub fn set_visibility(
        &mut self,
        visibility: LayerVisibility,
        bounds: Option<&QueryBounds>,
    ) -> Vec<FetchCommand> {
        let mut commands = Vec::new();
        for layer in LayerId::ALL {
            let visible = visibility.get(layer);
            let state = self.state_mut(layer);
            if state.visible == visible {
                continue;
            }
            state.visible = visible;
            match bounds {
                Some(b) => commands.extend(self.update_layer(layer, b)),
                None if !visible => {
                    let state = self.state_mut(layer);
                    state.generation += 1;
                    clear(layer, state);
                }
                None => {}
            }
        }
        commands
    }

    /// Land a fetch result. Returns `false` when the result is stale and was dropped.
    pub fn complete(
        &mut self,
        command: &FetchCommand,
        outcome: Result<FeatureCollection, LayerFetchError>,
    ) -> bool {
        let state = self.state_mut(command.layer);
        if state.generation != command.generation {
            return false;
        }
        state.version = LayerVersion::for_bounds(command.layer, &command.bounds);
        match outcome {
            Ok(fc) => {
                state.geometry = Some(fc);
                state.phase = LayerPhase::Shown;
                state.last_error = None;
            }
            Err(e) => {
                state.geometry = None;
                state.phase = LayerPhase::Failed;
                state.last_error = Some(e);
            }
        }
        true
    }
}

fn clear(layer: LayerId, state: &mut LayerState) {
    state.version = LayerVersion::empty(layer);
    state.geometry = Some(FeatureCollection::empty());
    state.phase = LayerPhase::Hidden;
    state.last_error = None;
}
