use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FEATURE_COLLECTION: &str = "FeatureCollection";
pub const FEATURE: &str = "Feature";

/// Feature property holding the human-readable area name.
pub const AREA_NAME_PROPERTY: &str = "area_name";
pub const AREA_ID_PROPERTY: &str = "area_id";

/// GeoJSON position, `[lng, lat]` with an optional altitude.
pub type Position = Vec<f64>;
pub type Ring = Vec<Position>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

impl Geometry {
    /// Every polygon as its list of rings (outer ring first).
    pub fn polygons(&self) -> Vec<&[Ring]> {
        match self {
            Geometry::Polygon { coordinates } => vec![coordinates.as_slice()],
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().map(|p| p.as_slice()).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Map<String, Value>) -> Self {
        Feature {
            kind: FEATURE.to_string(),
            geometry: Some(geometry),
            properties: Some(properties),
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(key)
    }

    /// Property rendered as text; numbers are formatted, other kinds are ignored.
    pub fn property_text(&self, key: &str) -> Option<String> {
        match self.property(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn property_i64(&self, key: &str) -> Option<i64> {
        match self.property(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            kind: FEATURE_COLLECTION.to_string(),
            features,
        }
    }

    /// `{"type": "FeatureCollection", "features": []}`
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::empty()
    }
}

/// What a feature popup displays, projected out of the feature's properties.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupData {
    pub area_name: String,
    pub area_id: Option<String>,
}

impl PopupData {
    pub fn from_feature(feature: &Feature) -> Self {
        PopupData {
            area_name: feature
                .property_text(AREA_NAME_PROPERTY)
                .unwrap_or_default(),
            area_id: feature.property_text(AREA_ID_PROPERTY),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaType {
    Did,
    Airport,
}

impl std::fmt::Display for AreaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AreaType::Did => write!(f, "did"),
            AreaType::Airport => write!(f, "airport"),
        }
    }
}

/// A stored zone: one polygon plus the S2 cells it was indexed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub area_id: String,
    pub area_name: String,
    pub area_type: AreaType,
    pub rings: Vec<Ring>,
    #[serde(default)]
    pub cells: Vec<u64>,
    pub uploaded_at: String,
}

impl Area {
    pub fn to_feature(&self) -> Feature {
        let mut properties = Map::new();
        properties.insert(
            AREA_ID_PROPERTY.to_string(),
            Value::String(self.area_id.clone()),
        );
        properties.insert(
            AREA_NAME_PROPERTY.to_string(),
            Value::String(self.area_name.clone()),
        );
        Feature::new(
            Geometry::Polygon {
                coordinates: self.rings.clone(),
            },
            properties,
        )
    }
}
