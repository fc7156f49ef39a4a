//! Turns uploaded source files into indexed `Area`s.

use std::fmt;
use std::io::Read;

use airspace_shared::geo::LatLng;
use airspace_shared::models::{Area, AreaType, FeatureCollection, Geometry, Ring};

use crate::spatial::{self, Coverer};

pub const DID_ID_PROPERTY: &str = "DIDid";
pub const DID_NAME_PROPERTY: &str = "市町村名称";

// OurAirports airports.csv columns
const COL_IDENT: usize = 1;
const COL_TYPE: usize = 2;
const COL_NAME: usize = 3;
const COL_LATITUDE: usize = 4;
const COL_LONGITUDE: usize = 5;
const COL_ISO_COUNTRY: usize = 8;

const COUNTRY: &str = "JP";

#[derive(Debug, Clone, PartialEq)]
pub enum IngestError {
    Json(String),
    Csv(String),
    /// Feature at this index has no polygon geometry.
    NotAPolygon(usize),
    MissingId(usize),
    /// Outer ring has fewer than three distinct vertices.
    DegenerateRing(String),
    TooLarge { area_id: String, area_km2: f64 },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Json(e) => write!(f, "invalid GeoJSON: {}", e),
            IngestError::Csv(e) => write!(f, "invalid CSV: {}", e),
            IngestError::NotAPolygon(i) => write!(f, "feature {} is not a polygon", i),
            IngestError::MissingId(i) => {
                write!(f, "feature {} has no integer {} property", i, DID_ID_PROPERTY)
            }
            IngestError::DegenerateRing(id) => write!(f, "area {} has a degenerate ring", id),
            IngestError::TooLarge { area_id, area_km2 } => write!(
                f,
                "area {} covers {:.0} km², limit is {:.0} km²",
                area_id,
                area_km2,
                spatial::MAX_AREA_KM2
            ),
        }
    }
}

impl std::error::Error for IngestError {}

/// Validate one outer ring and build the stored area around it.
fn build_area(
    area_id: String,
    area_name: String,
    area_type: AreaType,
    mut rings: Vec<Ring>,
    coverer: &Coverer,
    uploaded_at: &str,
) -> Result<Area, IngestError> {
    let Some(outer) = rings.first_mut() else {
        return Err(IngestError::DegenerateRing(area_id));
    };
    spatial::normalize_ccw(outer);
    let points = spatial::ring_points(outer);
    if points.len() < 3 {
        return Err(IngestError::DegenerateRing(area_id));
    }
    let area_km2 = spatial::area_km2(&points);
    if area_km2 > spatial::MAX_AREA_KM2 {
        return Err(IngestError::TooLarge { area_id, area_km2 });
    }
    Ok(Area {
        cells: coverer.cover_points(&points),
        area_id,
        area_name,
        area_type,
        rings,
        uploaded_at: uploaded_at.to_string(),
    })
}

/// Parse a DID FeatureCollection. The whole upload is rejected on the first bad feature.
pub fn did_areas(
    body: &[u8],
    coverer: &Coverer,
    uploaded_at: &str,
) -> Result<Vec<Area>, IngestError> {
    let fc: FeatureCollection =
        serde_json::from_slice(body).map_err(|e| IngestError::Json(e.to_string()))?;

    fc.features
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            // Only the first polygon of a multipolygon is kept
            let rings = match &feature.geometry {
                Some(Geometry::Polygon { coordinates }) => coordinates.clone(),
                Some(Geometry::MultiPolygon { coordinates }) => coordinates
                    .first()
                    .cloned()
                    .ok_or(IngestError::NotAPolygon(i))?,
                None => return Err(IngestError::NotAPolygon(i)),
            };
            let area_id = feature
                .property_i64(DID_ID_PROPERTY)
                .ok_or(IngestError::MissingId(i))?
                .to_string();
            let area_name = feature
                .property_text(DID_NAME_PROPERTY)
                .unwrap_or_default();
            build_area(area_id, area_name, AreaType::Did, rings, coverer, uploaded_at)
        })
        .collect()
}

/// Result of reading an airports CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct AirportImport {
    pub areas: Vec<Area>,
    /// Japanese, non-closed rows that could not be used (bad coordinates).
    pub skipped: usize,
}

/// Parse an OurAirports `airports.csv`, keeping open Japanese airports and
/// heliports as circular zones.
pub fn airport_areas(
    reader: impl Read,
    coverer: &Coverer,
    uploaded_at: &str,
) -> Result<AirportImport, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut areas = Vec::new();
    let mut skipped = 0;
    for result in rdr.records() {
        let record = result.map_err(|e| IngestError::Csv(e.to_string()))?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        if field(COL_ISO_COUNTRY) != COUNTRY || field(COL_TYPE) == "closed" {
            continue;
        }

        let ident = field(COL_IDENT).to_string();
        let coords = (
            field(COL_LATITUDE).parse::<f64>(),
            field(COL_LONGITUDE).parse::<f64>(),
        );
        let (Ok(lat), Ok(lng)) = coords else {
            tracing::warn!(ident = %ident, "skipping airport with unreadable coordinates");
            skipped += 1;
            continue;
        };
        if ident.is_empty() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            tracing::warn!(ident = %ident, lat, lng, "skipping airport with invalid position");
            skipped += 1;
            continue;
        }

        let radius_km = if field(COL_TYPE) == "heliport" {
            spatial::HELIPORT_RADIUS_KM
        } else {
            spatial::AIRPORT_RADIUS_KM
        };
        let ring = spatial::circle_ring(LatLng::new(lat, lng), radius_km, spatial::CIRCLE_VERTICES);
        let area = build_area(
            ident,
            field(COL_NAME).to_string(),
            AreaType::Airport,
            vec![ring],
            coverer,
            uploaded_at,
        )?;
        areas.push(area);
    }

    Ok(AirportImport { areas, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPLOADED_AT: &str = "2024-05-01T00:00:00+00:00";

    const AIRPORTS_CSV: &str = "\
id,ident,type,name,latitude_deg,longitude_deg,elevation_ft,continent,iso_country,iso_region,municipality
5567,RJTT,large_airport,Tokyo Haneda International Airport,35.552299,139.779999,35,AS,JP,JP-13,Tokyo
5555,RJAA,large_airport,Narita International Airport,35.764702,140.386002,141,AS,JP,JP-12,Narita
300001,JP-0001,heliport,Tokyo Heliport,35.6383,139.8369,3,AS,JP,JP-13,Koto
300002,JP-0002,closed,Old Strip,35.0,139.0,10,AS,JP,JP-14,Nowhere
3682,KJFK,large_airport,John F Kennedy International Airport,40.639801,-73.7789,13,NA,US,US-NY,New York
300003,JP-0003,small_airport,Broken Row,north,139.0,10,AS,JP,JP-14,Nowhere
";

    fn did_body(features: &str) -> Vec<u8> {
        format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features).into_bytes()
    }

    const CHIYODA: &str = r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[139.74,35.67],[139.74,35.70],[139.78,35.70],[139.78,35.67],[139.74,35.67]]]},"properties":{"DIDid":13101,"市町村名称":"千代田区"}}"#;

    #[test]
    fn test_did_upload_builds_area() {
        let areas = did_areas(&did_body(CHIYODA), &Coverer::new(13), UPLOADED_AT).unwrap();
        assert_eq!(areas.len(), 1);
        let a = &areas[0];
        assert_eq!(a.area_id, "13101");
        assert_eq!(a.area_name, "千代田区");
        assert_eq!(a.area_type, AreaType::Did);
        assert!(!a.cells.is_empty());
        assert_eq!(a.uploaded_at, UPLOADED_AT);
    }

    #[test]
    fn test_did_ring_is_normalized_counter_clockwise() {
        // CHIYODA is listed clockwise
        let areas = did_areas(&did_body(CHIYODA), &Coverer::new(13), UPLOADED_AT).unwrap();
        let pts = spatial::ring_points(&areas[0].rings[0]);
        assert!(spatial::signed_area_km2(&pts) > 0.0);
    }

    #[test]
    fn test_did_rejects_oversized_polygon() {
        let huge = r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[138.0,35.0],[140.0,35.0],[140.0,37.0],[138.0,37.0],[138.0,35.0]]]},"properties":{"DIDid":1,"市町村名称":"big"}}"#;
        let err = did_areas(&did_body(huge), &Coverer::new(13), UPLOADED_AT).unwrap_err();
        assert!(matches!(err, IngestError::TooLarge { ref area_id, .. } if area_id == "1"));
    }

    #[test]
    fn test_did_requires_id() {
        let no_id = r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[139.74,35.67],[139.78,35.67],[139.78,35.70],[139.74,35.67]]]},"properties":{"市町村名称":"x"}}"#;
        assert_eq!(
            did_areas(&did_body(no_id), &Coverer::new(13), UPLOADED_AT).unwrap_err(),
            IngestError::MissingId(0)
        );
    }

    #[test]
    fn test_did_rejects_missing_geometry_and_bad_json() {
        let no_geom = r#"{"type":"Feature","geometry":null,"properties":{"DIDid":1}}"#;
        assert_eq!(
            did_areas(&did_body(no_geom), &Coverer::new(13), UPLOADED_AT).unwrap_err(),
            IngestError::NotAPolygon(0)
        );
        assert!(matches!(
            did_areas(b"not json", &Coverer::new(13), UPLOADED_AT),
            Err(IngestError::Json(_))
        ));
    }

    #[test]
    fn test_airport_csv_filters_rows() {
        let import =
            airport_areas(AIRPORTS_CSV.as_bytes(), &Coverer::new(13), UPLOADED_AT).unwrap();
        let ids: Vec<&str> = import.areas.iter().map(|a| a.area_id.as_str()).collect();
        assert_eq!(ids, vec!["RJTT", "RJAA", "JP-0001"]);
        assert_eq!(import.skipped, 1);
        assert_eq!(import.areas[0].area_name, "Tokyo Haneda International Airport");
        assert!(import.areas.iter().all(|a| a.area_type == AreaType::Airport));
    }

    #[test]
    fn test_airport_radius_by_type() {
        let import =
            airport_areas(AIRPORTS_CSV.as_bytes(), &Coverer::new(13), UPLOADED_AT).unwrap();
        // First vertex is due north of the center, the middle one due south
        let radius_of = |a: &Area| {
            let north = &a.rings[0][0];
            let south = &a.rings[0][spatial::CIRCLE_VERTICES / 2];
            spatial::haversine_km(LatLng::new(north[1], north[0]), LatLng::new(south[1], south[0]))
                / 2.0
        };
        assert!((radius_of(&import.areas[0]) - spatial::AIRPORT_RADIUS_KM).abs() < 0.05);
        assert!((radius_of(&import.areas[2]) - spatial::HELIPORT_RADIUS_KM).abs() < 0.05);
        assert_eq!(import.areas[0].rings[0].len(), spatial::CIRCLE_VERTICES + 1);
    }

    #[test]
    fn test_airport_csv_header_only() {
        let import = airport_areas(
            "id,ident,type,name,latitude_deg,longitude_deg\n".as_bytes(),
            &Coverer::new(13),
            UPLOADED_AT,
        )
        .unwrap();
        assert!(import.areas.is_empty());
        assert_eq!(import.skipped, 0);
    }
}
